//! Math utilities and helpers.

use glam::Vec3;

/// Ray for grid queries and preview rendering.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// The normalized voxelization cube `[-1, 1]^3`.
    #[inline]
    pub const fn normalized_cube() -> Self {
        Self {
            min: Vec3::NEG_ONE,
            max: Vec3::ONE,
        }
    }

    /// An empty box that any `expand_to_include` call will replace.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Vec3::INFINITY,
            max: Vec3::NEG_INFINITY,
        }
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Ray-AABB intersection test, returns (t_near, t_far) or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv_dir = Vec3::ONE / ray.direction;

        let t1 = (self.min - ray.origin) * inv_dir;
        let t2 = (self.max - ray.origin) * inv_dir;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_near = t_min.max_element();
        let t_far = t_max.min_element();

        if t_near <= t_far && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X * 3.0);
        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(5.0), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn aabb_ray_intersection() {
        let aabb = Aabb::normalized_cube();

        // Ray hitting the box
        let ray = Ray::new(Vec3::new(-3.0, 0.5, 0.5), Vec3::X);
        let (t_near, t_far) = aabb.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t_near, 2.0, epsilon = 1e-3);
        assert_relative_eq!(t_far, 4.0, epsilon = 1e-3);

        // Starting inside clamps the entry to the origin
        let inside = Ray::new(Vec3::ZERO, Vec3::NEG_Y);
        assert_eq!(aabb.intersect_ray(&inside), Some((0.0, 1.0)));

        // Ray missing the box
        let ray = Ray::new(Vec3::new(-3.0, 2.0, 0.5), Vec3::X);
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn empty_aabb_grows_to_points() {
        let mut aabb = Aabb::empty();
        aabb.expand_to_include(Vec3::new(1.0, -2.0, 0.0));
        aabb.expand_to_include(Vec3::new(-1.0, 2.0, 0.5));
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 0.5));
        assert_eq!(aabb.center(), Vec3::new(0.0, 0.0, 0.25));
    }
}
