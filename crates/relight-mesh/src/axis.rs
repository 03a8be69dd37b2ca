use relight_geom::{Vec2, Vec3};

/// Signed dominant axis of a normal. The sign only separates chart buckets;
/// flattening drops the axis component regardless of sign.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Axis {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::PosX,
        Axis::NegX,
        Axis::PosY,
        Axis::NegY,
        Axis::PosZ,
        Axis::NegZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Component with the largest magnitude; ties resolve X, then Y, then Z.
    /// A zero vector maps to `PosY`.
    pub fn dominant(n: Vec3) -> Axis {
        let a = n.abs();
        if a.x == 0.0 && a.y == 0.0 && a.z == 0.0 {
            return Axis::PosY;
        }
        if a.x >= a.y && a.x >= a.z {
            if n.x >= 0.0 { Axis::PosX } else { Axis::NegX }
        } else if a.y >= a.z {
            if n.y >= 0.0 { Axis::PosY } else { Axis::NegY }
        } else if n.z >= 0.0 {
            Axis::PosZ
        } else {
            Axis::NegZ
        }
    }

    /// 0 = x, 1 = y, 2 = z.
    #[inline]
    pub fn ordinal(self) -> usize {
        self.index() / 2
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        match self {
            Axis::PosX => Vec3::new(1.0, 0.0, 0.0),
            Axis::NegX => Vec3::new(-1.0, 0.0, 0.0),
            Axis::PosY => Vec3::new(0.0, 1.0, 0.0),
            Axis::NegY => Vec3::new(0.0, -1.0, 0.0),
            Axis::PosZ => Vec3::new(0.0, 0.0, 1.0),
            Axis::NegZ => Vec3::new(0.0, 0.0, -1.0),
        }
    }

    /// Projects a point onto the plane perpendicular to this axis.
    #[inline]
    pub fn project(self, p: Vec3) -> Vec2 {
        match self.ordinal() {
            0 => Vec2::new(p.z, p.y),
            1 => Vec2::new(p.x, p.z),
            _ => Vec2::new(p.x, p.y),
        }
    }
}
