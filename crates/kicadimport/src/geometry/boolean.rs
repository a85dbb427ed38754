//! Polygon union and hole flattening for custom pad shapes

use super::{Path, Point};
use crate::{Error, Result};
use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Maximum deviation when approximating arcs by line segments
const ARC_TOLERANCE: f64 = 0.005;

/// A filled area, possibly with holes
pub type Region = Polygon<f64>;

fn ring(points: impl IntoIterator<Item = Point>) -> LineString<f64> {
    LineString::from(
        points
            .into_iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

/// Filled area enclosed by a path, `None` for degenerate paths
pub fn region_from_path(path: &Path) -> Option<Region> {
    let points = path.flattened(ARC_TOLERANCE);
    if points.len() < 3 {
        return None;
    }
    let polygon = Polygon::new(ring(points), vec![]);
    (polygon.unsigned_area() > 1e-9).then_some(polygon)
}

/// Ring between two concentric circles
pub fn donut_region(center: Point, outer_diameter: f64, inner_diameter: f64) -> Option<Region> {
    let outer = Path::circle(outer_diameter).translated(center);
    let inner = Path::circle(inner_diameter).translated(center);
    let exterior = region_from_path(&outer)?;
    let interior = ring(inner.flattened(ARC_TOLERANCE));
    Some(Polygon::new(exterior.exterior().clone(), vec![interior]))
}

/// Union of all regions
///
/// The sweep line implementation may panic on degenerate input, which is
/// reported as a runtime error instead.
pub fn unite(regions: Vec<Region>) -> Result<MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| {
        regions
            .into_iter()
            .fold(MultiPolygon::new(vec![]), |acc, region| {
                acc.union(&MultiPolygon::new(vec![region]))
            })
    }))
    .map(|united| united.orient(Direction::Default))
    .map_err(|_| Error::runtime("Failed to unite custom pad shapes."))
}

/// Convert each polygon to a single closed outline
///
/// Holes are connected to the outer ring by a zero-width cut from their
/// vertex nearest to the outline.
pub fn flatten_regions(regions: &MultiPolygon<f64>) -> Vec<Path> {
    regions
        .0
        .iter()
        .filter_map(|polygon| {
            let mut outline = ring_points(polygon.exterior());
            if outline.len() < 3 {
                return None;
            }
            for hole in polygon.interiors() {
                let hole = ring_points(hole);
                if hole.len() >= 3 {
                    outline = cut_in(&outline, &hole);
                }
            }
            let mut path = Path::from_points(outline);
            path.close();
            Some(path)
        })
        .collect()
}

/// Ring vertices without the closing duplicate
fn ring_points(ring: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = ring.coords().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn cut_in(outline: &[Point], hole: &[Point]) -> Vec<Point> {
    let mut best = (0, 0, f64::MAX);
    for (i, o) in outline.iter().enumerate() {
        for (j, h) in hole.iter().enumerate() {
            let distance = (*o - *h).length();
            if distance < best.2 {
                best = (i, j, distance);
            }
        }
    }
    let (i, j, _) = best;
    let mut result = Vec::with_capacity(outline.len() + hole.len() + 2);
    result.extend_from_slice(&outline[..=i]);
    result.extend(hole[j..].iter().chain(hole[..=j].iter()).copied());
    result.extend_from_slice(&outline[i..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unite_overlapping_rects() {
        let a = region_from_path(&Path::centered_rect(2.0, 1.0, 0.0)).unwrap();
        let b = region_from_path(&Path::centered_rect(1.0, 2.0, 0.0)).unwrap();
        let united = unite(vec![a, b]).unwrap();
        assert_eq!(united.0.len(), 1);
        assert_abs_diff_eq!(united.unsigned_area(), 3.0, epsilon = 1e-9);

        let paths = flatten_regions(&united);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed());
        assert!(paths[0].len() >= 13);
    }

    #[test]
    fn test_unite_separated_rects() {
        let a = region_from_path(&Path::centered_rect(1.0, 1.0, 0.0)).unwrap();
        let b = region_from_path(
            &Path::centered_rect(1.0, 1.0, 0.0).translated(Point::new(5.0, 0.0)),
        )
        .unwrap();
        let united = unite(vec![a, b]).unwrap();
        assert_eq!(flatten_regions(&united).len(), 2);
    }

    #[test]
    fn test_donut_is_flattened_to_single_outline() {
        let donut = donut_region(Point::new(0.0, 0.0), 2.0, 1.0).unwrap();
        let united = unite(vec![donut]).unwrap();
        assert_eq!(united.0.len(), 1);
        assert_eq!(united.0[0].interiors().len(), 1);
        let paths = flatten_regions(&united);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed());
    }

    #[test]
    fn test_degenerate_path_has_no_region() {
        let line = Path::line(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Default::default());
        assert!(region_from_path(&line).is_none());
    }
}
