use glam::{Mat3, Vec2, Vec3};

/// A rigid (rotation + translation) affine transform, used both for
/// portal teleport/mirror transforms and for the world -> tile-UV
/// transform derived per lightmap tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            translation: Vec3::ZERO,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn transform_position(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.rotation * d
    }
}

/// World-space point `p` on a tile's plane -> `(u, v)` in texel space,
/// as derived by `LightmapTile::SetupTileTransform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileTransform {
    pub origin: Vec3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl TileTransform {
    pub fn to_uv(&self, p: Vec3) -> Vec2 {
        let rel = p - self.origin;
        Vec2::new(self.u_axis.dot(rel), self.v_axis.dot(rel))
    }

    /// `(lu, lv)` normalized by the atlas page edge length, after the
    /// tile has been packed at `(atlas_x, atlas_y)`.
    pub fn to_lightmap_uv(&self, p: Vec3, atlas_x: f32, atlas_y: f32, texture_size: f32) -> Vec2 {
        let uv = self.to_uv(p);
        Vec2::new(
            (uv.x + atlas_x) / texture_size,
            (uv.y + atlas_y) / texture_size,
        )
    }

    /// Inverse of [`TileTransform::to_uv`]: the world point whose tile-UV
    /// projection is `uv`. Valid because `u_axis`/`v_axis` are orthogonal.
    pub fn to_world(&self, uv: Vec2) -> Vec3 {
        let u_len_sq = self.u_axis.length_squared();
        let v_len_sq = self.v_axis.length_squared();
        self.origin + self.u_axis * (uv.x / u_len_sq) + self.v_axis * (uv.y / v_len_sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_noop() {
        let t = AffineTransform::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(t.transform_position(p), p);
        assert_eq!(t.transform_direction(p), p);
        assert!(t.is_identity());
    }

    #[test]
    fn tile_transform_maps_origin_to_zero() {
        let tt = TileTransform {
            origin: Vec3::new(10.0, 0.0, 0.0),
            u_axis: Vec3::X,
            v_axis: Vec3::Y,
        };
        assert_eq!(tt.to_uv(Vec3::new(10.0, 0.0, 0.0)), Vec2::ZERO);
        assert_eq!(tt.to_uv(Vec3::new(11.0, 2.0, 0.0)), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn to_world_inverts_to_uv() {
        let tt = TileTransform {
            origin: Vec3::new(3.0, -2.0, 5.0),
            u_axis: Vec3::X * 2.0,
            v_axis: Vec3::Y * 2.0,
        };
        let p = Vec3::new(9.0, 4.0, 5.0);
        let uv = tt.to_uv(p);
        let back = tt.to_world(uv);
        assert!((back - p).length() < 1e-4);
    }
}
