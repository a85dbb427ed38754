//! Geometry primitives shared by the KiCad model and the LibrePCB model
//!
//! All lengths are millimeters, all angles are degrees (counter-clockwise
//! positive).

mod boolean;
mod joiner;
mod path;

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

pub use boolean::{donut_region, flatten_regions, region_from_path, unite, Region};
pub use joiner::TangentPathJoiner;
pub use path::{arc_angle_from_3_points, arc_center, Path, Vertex};

/// Positions closer than this are considered identical (1 nm)
pub const EPSILON: f64 = 1e-6;

/// A 2D point or vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_origin(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }

    /// Rotate around the origin
    pub fn rotated(self, angle: Angle) -> Self {
        let (sin, cos) = angle.to_rad().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn rotated_around(self, angle: Angle, center: Point) -> Self {
        (self - center).rotated(angle) + center
    }

    /// Unit vector in the same direction (zero vector stays zero)
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            self
        }
    }

    /// Perpendicular vector rotated by +90°
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// An angle in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub const fn deg(deg: f64) -> Self {
        Self(deg)
    }

    pub fn from_rad(rad: f64) -> Self {
        Self(rad.to_degrees())
    }

    pub fn to_deg(self) -> f64 {
        self.0
    }

    pub fn to_rad(self) -> f64 {
        self.0.to_radians()
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Equivalent angle in the range [0, 360)
    pub fn mapped_0_360(self) -> Self {
        let v = self.0.rem_euclid(360.0);
        Self(if v >= 360.0 { 0.0 } else { v })
    }

    /// Round to the nearest multiple of `step` degrees
    pub fn rounded(self, step: f64) -> Self {
        Self((self.0 / step).round() * step)
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0 + rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Text alignment, centered by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub h: HAlign,
    pub v: VAlign,
}
