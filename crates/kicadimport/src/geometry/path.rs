use super::{Angle, Point, EPSILON};
use serde::{Deserialize, Serialize};

fn is_zero(angle: &Angle) -> bool {
    angle.is_zero()
}

/// One vertex of a [`Path`]
///
/// `angle` is the arc angle of the segment from this vertex to the next one
/// (zero for straight segments). It has no meaning on the last vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub angle: Angle,
}

impl Vertex {
    pub fn new(pos: Point, angle: Angle) -> Self {
        Self { pos, angle }
    }
}

/// A sequence of vertices connected by straight or arc segments
///
/// A path is closed if its last vertex equals its first one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    vertices: Vec<Vertex>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vertices(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            vertices: points
                .into_iter()
                .map(|p| Vertex::new(p, Angle::ZERO))
                .collect(),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn add_vertex(&mut self, pos: Point, angle: Angle) {
        self.vertices.push(Vertex::new(pos, angle));
    }

    pub fn first_point(&self) -> Option<Point> {
        self.vertices.first().map(|v| v.pos)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.vertices.last().map(|v| v.pos)
    }

    pub fn is_closed(&self) -> bool {
        match (self.first_point(), self.last_point()) {
            (Some(first), Some(last)) => self.vertices.len() >= 2 && first.approx_eq(last),
            _ => false,
        }
    }

    /// Append the first vertex if the path is not closed yet
    pub fn close(&mut self) {
        if self.vertices.len() >= 2 && !self.is_closed() {
            let first = self.vertices[0].pos;
            self.vertices.push(Vertex::new(first, Angle::ZERO));
        }
    }

    /// Remove the closing vertex, if any
    pub fn open(&mut self) {
        if self.vertices.len() > 2 && self.is_closed() {
            self.vertices.pop();
        }
    }

    /// Remove consecutive duplicate vertices
    pub fn clean(&mut self) {
        let mut cleaned: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        for vertex in self.vertices.drain(..) {
            match cleaned.last_mut() {
                Some(last) if last.pos.approx_eq(vertex.pos) => last.angle = vertex.angle,
                _ => cleaned.push(vertex),
            }
        }
        self.vertices = cleaned;
    }

    pub fn translate(&mut self, offset: Point) {
        for v in &mut self.vertices {
            v.pos += offset;
        }
    }

    pub fn translated(mut self, offset: Point) -> Self {
        self.translate(offset);
        self
    }

    /// Rotate around the origin
    pub fn rotate(&mut self, angle: Angle) {
        for v in &mut self.vertices {
            v.pos = v.pos.rotated(angle);
        }
    }

    pub fn rotated(mut self, angle: Angle) -> Self {
        self.rotate(angle);
        self
    }

    /// Same path traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        let n = self.vertices.len();
        let vertices = (0..n)
            .map(|i| {
                let pos = self.vertices[n - 1 - i].pos;
                let angle = if i + 1 < n {
                    -self.vertices[n - 2 - i].angle
                } else {
                    Angle::ZERO
                };
                Vertex::new(pos, angle)
            })
            .collect();
        Self { vertices }
    }

    /// Append another path, skipping its first vertex if it equals our last one
    pub fn append(&mut self, other: &Path) {
        let mut iter = other.vertices.iter().peekable();
        if let (Some(last), Some(first)) = (self.vertices.last_mut(), iter.peek()) {
            if last.pos.approx_eq(first.pos) {
                last.angle = first.angle;
                iter.next();
            }
        }
        self.vertices.extend(iter);
    }

    /// Points of the path with arc segments approximated by straight lines
    pub fn flattened(&self, max_error: f64) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.vertices.len());
        for (i, vertex) in self.vertices.iter().enumerate() {
            points.push(vertex.pos);
            let Some(next) = self.vertices.get(i + 1) else {
                break;
            };
            if vertex.angle.is_zero() || vertex.pos.approx_eq(next.pos) {
                continue;
            }
            let center = arc_center(vertex.pos, next.pos, vertex.angle);
            let radius = (vertex.pos - center).length();
            let step = if radius > max_error {
                2.0 * (1.0 - max_error / radius).acos().to_degrees()
            } else {
                90.0
            };
            let sweep = vertex.angle.to_deg();
            let count = ((sweep.abs() / step.max(1.0)).ceil() as usize).clamp(1, 360);
            for k in 1..count {
                let a = Angle::deg(sweep * k as f64 / count as f64);
                points.push(vertex.pos.rotated_around(a, center));
            }
        }
        points
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Straight or arc segment
    pub fn line(p1: Point, p2: Point, angle: Angle) -> Self {
        Self::from_vertices(vec![Vertex::new(p1, angle), Vertex::new(p2, Angle::ZERO)])
    }

    /// Closed axis aligned rectangle spanned by two corners
    pub fn rect(p1: Point, p2: Point) -> Self {
        let mut path = Self::from_points([
            p1,
            Point::new(p2.x, p1.y),
            p2,
            Point::new(p1.x, p2.y),
        ]);
        path.close();
        path
    }

    /// Closed rectangle centered at the origin, optionally with rounded corners
    pub fn centered_rect(width: f64, height: f64, radius: f64) -> Self {
        let (w2, h2) = (width / 2.0, height / 2.0);
        let r = radius.clamp(0.0, w2.min(h2));
        if r <= 0.0 {
            return Self::rect(Point::new(-w2, h2), Point::new(w2, -h2));
        }
        let corner = Angle::deg(-90.0);
        let mut path = Self::from_vertices(vec![
            Vertex::new(Point::new(-w2 + r, h2), Angle::ZERO),
            Vertex::new(Point::new(w2 - r, h2), corner),
            Vertex::new(Point::new(w2, h2 - r), Angle::ZERO),
            Vertex::new(Point::new(w2, -h2 + r), corner),
            Vertex::new(Point::new(w2 - r, -h2), Angle::ZERO),
            Vertex::new(Point::new(-w2 + r, -h2), corner),
            Vertex::new(Point::new(-w2, -h2 + r), Angle::ZERO),
            Vertex::new(Point::new(-w2, h2 - r), corner),
            Vertex::new(Point::new(-w2 + r, h2), Angle::ZERO),
        ]);
        path.clean();
        path
    }

    /// Closed circle centered at the origin
    pub fn circle(diameter: f64) -> Self {
        let r = diameter / 2.0;
        let half = Angle::deg(180.0);
        Self::from_vertices(vec![
            Vertex::new(Point::new(r, 0.0), half),
            Vertex::new(Point::new(-r, 0.0), half),
            Vertex::new(Point::new(r, 0.0), Angle::ZERO),
        ])
    }

    /// Closed obround (or circle) centered at the origin
    pub fn obround(width: f64, height: f64) -> Self {
        if width > height {
            let dx = (width - height) / 2.0;
            Self::obround_line(Point::new(-dx, 0.0), Point::new(dx, 0.0), height)
        } else if height > width {
            let dy = (height - width) / 2.0;
            Self::obround_line(Point::new(0.0, dy), Point::new(0.0, -dy), width)
        } else {
            Self::circle(width)
        }
    }

    /// Closed outline of a straight line stroked with round caps
    pub fn obround_line(p1: Point, p2: Point, width: f64) -> Self {
        if p1.approx_eq(p2) {
            return Self::circle(width).translated(p1);
        }
        let n = (p2 - p1).normalized().perpendicular() * (width / 2.0);
        let half = Angle::deg(180.0);
        Self::from_vertices(vec![
            Vertex::new(p1 - n, Angle::ZERO),
            Vertex::new(p2 - n, half),
            Vertex::new(p2 + n, Angle::ZERO),
            Vertex::new(p1 + n, half),
            Vertex::new(p1 - n, Angle::ZERO),
        ])
    }

    /// Closed outline of an arc stroked with round caps
    pub fn arc_obround(p1: Point, p2: Point, angle: Angle, width: f64) -> Self {
        if angle.is_zero() || p1.approx_eq(p2) {
            return Self::obround_line(p1, p2, width);
        }
        let center = arc_center(p1, p2, angle);
        let radius = (p1 - center).length();
        let r = width / 2.0;
        let scale = |p: Point, distance: f64| center + (p - center) * (distance / radius);
        let inner = (radius - r).max(0.0);
        let cap = Angle::deg(180.0_f64.copysign(angle.to_deg()));
        Self::from_vertices(vec![
            Vertex::new(scale(p1, radius + r), angle),
            Vertex::new(scale(p2, radius + r), cap),
            Vertex::new(scale(p2, inner), -angle),
            Vertex::new(scale(p1, inner), cap),
            Vertex::new(scale(p1, radius + r), Angle::ZERO),
        ])
    }

    /// Closed rectangle centered at the origin with chamfered corners
    pub fn chamfered_rect(
        width: f64,
        height: f64,
        chamfer: f64,
        top_left: bool,
        top_right: bool,
        bottom_left: bool,
        bottom_right: bool,
    ) -> Self {
        let (w2, h2) = (width / 2.0, height / 2.0);
        let c = chamfer.clamp(0.0, w2.min(h2));
        let mut points = Vec::with_capacity(9);
        if top_left {
            points.extend([Point::new(-w2, h2 - c), Point::new(-w2 + c, h2)]);
        } else {
            points.push(Point::new(-w2, h2));
        }
        if top_right {
            points.extend([Point::new(w2 - c, h2), Point::new(w2, h2 - c)]);
        } else {
            points.push(Point::new(w2, h2));
        }
        if bottom_right {
            points.extend([Point::new(w2, -h2 + c), Point::new(w2 - c, -h2)]);
        } else {
            points.push(Point::new(w2, -h2));
        }
        if bottom_left {
            points.extend([Point::new(-w2 + c, -h2), Point::new(-w2, -h2 + c)]);
        } else {
            points.push(Point::new(-w2, -h2));
        }
        let mut path = Self::from_points(points);
        path.clean();
        path.close();
        path
    }

    /// Closed trapezoid centered at the origin
    ///
    /// `dy` makes the bottom edge wider than the top edge, `dx` makes the
    /// left edge taller than the right edge.
    pub fn trapezoid(width: f64, height: f64, dy: f64, dx: f64) -> Self {
        let (w2, h2) = (width / 2.0, height / 2.0);
        let mut path = Self::from_points([
            Point::new(-w2 + dy / 2.0, h2 + dx / 2.0),
            Point::new(w2 - dy / 2.0, h2 - dx / 2.0),
            Point::new(w2 + dy / 2.0, -h2 + dx / 2.0),
            Point::new(-w2 - dy / 2.0, -h2 - dx / 2.0),
        ]);
        path.close();
        path
    }
}

/// Center of the arc from `p1` to `p2` with the given sweep angle
pub fn arc_center(p1: Point, p2: Point, angle: Angle) -> Point {
    let chord = p2 - p1;
    let mid = (p1 + p2) * 0.5;
    let half = angle.to_rad() / 2.0;
    let tan = half.tan();
    if tan.abs() < f64::EPSILON {
        return mid;
    }
    mid + chord.perpendicular() * (0.5 / tan)
}

/// Signed sweep angle of the arc starting at `start`, passing through `mid`
/// and ending at `end`
///
/// Returns zero if the points are collinear and a counter-clockwise full
/// circle if `start` and `end` coincide.
pub fn arc_angle_from_3_points(start: Point, mid: Point, end: Point) -> Angle {
    if start.approx_eq(end) {
        return if start.approx_eq(mid) {
            Angle::ZERO
        } else {
            Angle::deg(360.0)
        };
    }
    let (ax, ay) = (start.x, start.y);
    let (bx, by) = (mid.x, mid.y);
    let (cx, cy) = (end.x, end.y);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < EPSILON * EPSILON {
        return Angle::ZERO;
    }
    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let center = Point::new(
        (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d,
        (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d,
    );
    let direction = |p: Point| (p.y - center.y).atan2(p.x - center.x).to_degrees();
    let a_start = direction(start);
    let sweep_ccw = (direction(end) - a_start).rem_euclid(360.0);
    let mid_ccw = (direction(mid) - a_start).rem_euclid(360.0);
    if mid_ccw < sweep_ccw {
        Angle::deg(sweep_ccw)
    } else {
        Angle::deg(sweep_ccw - 360.0)
    }
}
