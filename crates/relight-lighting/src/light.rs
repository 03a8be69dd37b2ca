use relight_geom::{Rgb, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Distance at which the contribution reaches zero.
    pub range: f32,
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in.
    pub direction: Vec3,
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Point(PointLight),
    Directional(DirectionalLight),
}

/// Light arriving at a surface point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Incident {
    /// Unit vector from the point towards the light.
    pub dir: Vec3,
    /// Shadow ray length; infinite for directional lights.
    pub distance: f32,
    pub radiance: Rgb,
}

impl Light {
    pub fn point(position: Vec3, range: f32, color: Rgb, intensity: f32) -> Self {
        Light::Point(PointLight {
            position,
            range,
            color,
            intensity,
        })
    }

    pub fn directional(direction: Vec3, color: Rgb, intensity: f32) -> Self {
        Light::Directional(DirectionalLight {
            direction: direction.normalized(),
            color,
            intensity,
        })
    }

    /// `None` when `p` is out of range or the light is black.
    pub fn incident(&self, p: Vec3) -> Option<Incident> {
        match *self {
            Light::Point(l) => {
                let to = l.position - p;
                let dist = to.length();
                if dist >= l.range || dist <= f32::EPSILON {
                    return None;
                }
                let falloff = 1.0 - dist / l.range;
                Some(Incident {
                    dir: to / dist,
                    distance: dist,
                    radiance: l.color * (l.intensity * falloff),
                })
                .filter(|i| i.radiance.max_component() > 0.0)
            }
            Light::Directional(l) => {
                let dir = -l.direction.normalized();
                if dir.length_squared() == 0.0 {
                    return None;
                }
                Some(Incident {
                    dir,
                    distance: f32::INFINITY,
                    radiance: l.color * l.intensity,
                })
                .filter(|i| i.radiance.max_component() > 0.0)
            }
        }
    }

    #[inline]
    pub fn color(&self) -> Rgb {
        match self {
            Light::Point(l) => l.color * l.intensity,
            Light::Directional(l) => l.color * l.intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_falls_off_linearly() {
        let l = Light::point(Vec3::new(0.0, 4.0, 0.0), 8.0, Rgb::WHITE, 2.0);
        let i = l.incident(Vec3::ZERO).unwrap();
        assert_eq!(i.dir, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(i.distance, 4.0);
        assert_eq!(i.radiance, Rgb::gray(1.0));
        assert!(l.incident(Vec3::new(0.0, -4.0, 0.0)).is_none());
    }

    #[test]
    fn directional_light_points_back_along_travel() {
        let l = Light::directional(Vec3::new(0.0, -2.0, 0.0), Rgb::WHITE, 1.0);
        let i = l.incident(Vec3::new(5.0, 1.0, -3.0)).unwrap();
        assert_eq!(i.dir, Vec3::new(0.0, 1.0, 0.0));
        assert!(i.distance.is_infinite());
    }
}
