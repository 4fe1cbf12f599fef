//! 2D vector value type and the linear algebra the simulation needs.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A 2D vector with `f32` components, copied by value everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Creates a vector from its components.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the Euclidean magnitude.
    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the unit vector in this direction.
    ///
    /// A zero vector has no direction; it normalizes to zero rather than
    /// dividing by zero.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            Self::new(self.x / mag, self.y / mag)
        } else {
            Self::ZERO
        }
    }

    /// Dot product with another vector.
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (the z component of the 3D cross product).
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Signed angle from this vector to `other`, in radians.
    ///
    /// Positive when `other` lies clockwise of `self` in the simulation's
    /// heading convention (heading direction is `(cos h, -sin h)`).
    pub fn signed_angle(self, other: Vec2) -> f32 {
        self.cross(other).atan2(self.dot(other))
    }

    /// Per-component sign, mapping zero to `+1` so the result is always
    /// usable as an axis direction.
    pub fn sign(self) -> Self {
        Self::new(
            if self.x < 0.0 { -1.0 } else { 1.0 },
            if self.y < 0.0 { -1.0 } else { 1.0 },
        )
    }

    /// Applies a 2x2 linear transform given by its columns.
    pub fn transform(self, col1: Vec2, col2: Vec2) -> Self {
        Self::new(
            col1.x * self.x + col2.x * self.y,
            col1.y * self.x + col2.y * self.y,
        )
    }

    /// Rotates the vector by `theta` radians.
    pub fn rotated(self, theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        self.transform(Vec2::new(cos, sin), Vec2::new(-sin, cos))
    }

    /// Unit vector for a vehicle heading of `h` radians.
    ///
    /// The vertical axis grows downward, so increasing headings turn
    /// anti-clockwise on screen.
    pub fn from_heading(h: f32) -> Self {
        Self::new(h.cos(), -h.sin())
    }

    /// Distance to another point.
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).magnitude()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;

    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self * rhs.x, self * rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}
