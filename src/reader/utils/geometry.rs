use std::ops::{Add, Mul, Sub};

// Point
//------------------------------------------------------------------------------

/// Position in pixel edge coordinates: pixel (x, y) covers [x, x + 1) × [y, y + 1)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    // z component of the 3d cross product. Positive when `other` lies
    // clockwise of `self` on screen, since y grows downward.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn dist(self, other: Self) -> f64 {
        (self - other).norm()
    }

    // Cosine of the angle between two vectors, 1 for zero-length input
    pub fn cos_angle(self, other: Self) -> f64 {
        let den = self.norm() * other.norm();
        if den == 0.0 {
            return 1.0;
        }
        self.dot(other) / den
    }

    /// Cosine between the vector and its nearest image axis, 1 for zero-length
    /// input. A row or column run across a square tilted this way is longer
    /// than the square's side by its inverse.
    pub fn axis_cos(self) -> f64 {
        let norm = self.norm();
        if norm == 0.0 {
            return 1.0;
        }
        self.x.abs().max(self.y.abs()) / norm
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}
