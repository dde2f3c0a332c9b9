use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// A plane `a*x + b*y + c*z + d == 0`, with `(a,b,c)` unit length.
///
/// `plane.xyz . v + plane.w == 0` for every point `v` on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::Z,
            d: 0.0,
        }
    }
}

impl Plane {
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let normal = (b - a).cross(c - a);
        let len = normal.length();
        if len < 1e-8 {
            return None;
        }
        let normal = normal / len;
        Some(Self {
            normal,
            d: -normal.dot(a),
        })
    }

    /// Signed distance of `p` from the plane; zero for points on the plane.
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }

    pub fn is_coplanar_with(&self, other: &Plane, normal_dot_min: f32, normal_dot_max: f32, offset_eps: f32) -> bool {
        let dir = self.normal.dot(other.normal);
        if dir < normal_dot_min || dir > normal_dot_max {
            return false;
        }
        // Project a point on `self` onto `other` and measure the offset,
        // mirroring `hw_levelmesh.cpp::BuildTileSurfaceLists`.
        let point = self.normal * (-self.d);
        other.distance(point).abs() <= offset_eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_through_origin_quad_is_z_up() {
        let p = Plane::from_points(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!((p.normal - Vec3::Z).length() < 1e-5);
        assert!(p.distance(Vec3::new(5.0, -3.0, 0.0)).abs() < 1e-5);
    }

    #[test]
    fn degenerate_points_have_no_plane() {
        let a = Vec3::ZERO;
        assert!(Plane::from_points(a, a, a).is_none());
    }
}
