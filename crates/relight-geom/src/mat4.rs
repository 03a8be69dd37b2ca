use core::ops::Mul;

use crate::Vec3;

/// Unit quaternion rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_axis_angle(axis: Vec3, radians: f32) -> Self {
        let a = axis.normalized();
        let (s, c) = (radians * 0.5).sin_cos();
        Self::new(a.x * s, a.y * s, a.z * s, c)
    }

    /// Yaw (Y), then pitch (X), then roll (Z), all in degrees.
    pub fn from_euler_degrees(pitch: f32, yaw: f32, roll: f32) -> Self {
        let qy = Self::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), yaw.to_radians());
        let qx = Self::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), pitch.to_radians());
        let qz = Self::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), roll.to_radians());
        qy * qx * qz
    }

    pub fn normalized(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
        } else {
            Self::IDENTITY
        }
    }
}

impl Mul for Quat {
    type Output = Quat;
    fn mul(self, r: Quat) -> Quat {
        Quat::new(
            self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
            self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
            self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w,
            self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
        )
    }
}

/// Row-major 4x4 matrix acting on column vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn translation(t: Vec3) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0][3] = t.x;
        out.m[1][3] = t.y;
        out.m[2][3] = t.z;
        out
    }

    pub fn scale(s: Vec3) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0][0] = s.x;
        out.m[1][1] = s.y;
        out.m[2][2] = s.z;
        out
    }

    pub fn rotation(q: Quat) -> Self {
        let q = q.normalized();
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let mut out = Self::IDENTITY;
        out.m[0][0] = 1.0 - 2.0 * (y * y + z * z);
        out.m[0][1] = 2.0 * (x * y - z * w);
        out.m[0][2] = 2.0 * (x * z + y * w);
        out.m[1][0] = 2.0 * (x * y + z * w);
        out.m[1][1] = 1.0 - 2.0 * (x * x + z * z);
        out.m[1][2] = 2.0 * (y * z - x * w);
        out.m[2][0] = 2.0 * (x * z - y * w);
        out.m[2][1] = 2.0 * (y * z + x * w);
        out.m[2][2] = 1.0 - 2.0 * (x * x + y * y);
        out
    }

    /// Translation * rotation * scale.
    pub fn affine(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self::translation(position) * Self::rotation(rotation) * Self::scale(scale)
    }

    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Transforms a normal by the inverse transpose of the upper 3x3 and renormalizes.
    /// Falls back to the plain linear part when that block is singular.
    pub fn transform_normal(&self, n: Vec3) -> Vec3 {
        let m = &self.m;
        // Cofactor matrix equals det * inverse-transpose; the scale drops out on normalize.
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let c10 = m[0][2] * m[2][1] - m[0][1] * m[2][2];
        let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
        let c12 = m[0][1] * m[2][0] - m[0][0] * m[2][1];
        let c20 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
        let c21 = m[0][2] * m[1][0] - m[0][0] * m[1][2];
        let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < 1e-12 {
            return self.transform_vector(n).normalized();
        }
        let out = Vec3::new(
            c00 * n.x + c01 * n.y + c02 * n.z,
            c10 * n.x + c11 * n.y + c12 * n.z,
            c20 * n.x + c21 * n.y + c22 * n.z,
        );
        let out = if det < 0.0 { -out } else { out };
        out.normalized()
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = Mat4 { m: [[0.0; 4]; 4] };
        for r in 0..4 {
            for c in 0..4 {
                out.m[r][c] = (0..4).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        out
    }
}
