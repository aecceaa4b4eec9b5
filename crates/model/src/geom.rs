use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Vectors shorter than this are left untouched by `normalized` so a
/// degenerate orientation never turns into a division blow-up.
const MIN_LENGTH: f64 = 1e-6;

/// World-space vector or point (meters, right-handed, z up).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// Unit-length copy; near-zero vectors come back unchanged.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > MIN_LENGTH {
            Vec3::new(self.x / len, self.y / len, self.z / len)
        } else {
            self
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Actor pose angles in radians: yaw about z, pitch about y, roll about x.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Orientation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Orientation {
    /// Unit vector along the actor's nose.
    pub fn forward(self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * cy, cp * sy, sp)
    }

    /// Unit vector out the actor's right side.
    pub fn right(self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let (sr, cr) = self.roll.sin_cos();
        Vec3::new(
            cy * sp * sr - sy * cr,
            sy * sp * sr + cy * cr,
            -cp * sr,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_right_are_orthonormal_axes_at_rest() {
        let o = Orientation::default();
        assert!((o.forward().x - 1.0).abs() < 1e-12);
        assert!(o.forward().y.abs() < 1e-12);
        assert!((o.right().y - 1.0).abs() < 1e-12);
        assert!(o.forward().dot(o.right()).abs() < 1e-12);
    }

    #[test]
    fn yawed_quarter_turn_swaps_axes() {
        let o = Orientation {
            yaw: std::f64::consts::FRAC_PI_2,
            ..Default::default()
        };
        let f = o.forward();
        assert!(f.x.abs() < 1e-12 && (f.y - 1.0).abs() < 1e-12);
        let r = o.right();
        assert!((r.x + 1.0).abs() < 1e-12 && r.y.abs() < 1e-12);
    }

    #[test]
    fn normalized_leaves_degenerate_vectors_alone() {
        let tiny = Vec3::new(1e-9, 0.0, 0.0);
        assert_eq!(tiny.normalized(), tiny);
        let unit = Vec3::new(0.0, 3.0, 4.0).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-12);
    }
}
