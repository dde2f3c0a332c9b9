use lmbake_math::{TileTransform, Vec3};

use crate::levelmesh::Surface;

/// Packed location of a tile within the atlas. `(w, h)` are fixed at tile
/// creation; `(array_index, x, y)` are filled in once the rectangle packer
/// has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasLocation {
    pub array_index: i32,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl AtlasLocation {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

#[derive(Debug, Clone)]
pub struct LightmapTile {
    pub atlas_location: AtlasLocation,
    pub transform: TileTransform,
    pub surfaces: Vec<u32>,
    pub needs_update: bool,
    pub type_index: i32,
}

/// One texel of border kept inside a tile's rectangle so bilinear sampling
/// at the edge never bleeds into a neighbouring tile on the atlas page.
const TILE_BORDER_TEXELS: u32 = 1;

/// Chooses a world-space tangent/bitangent basis on `surface`'s plane so
/// that its bounds project to `[0, w] x [0, h]` in integer texels (plus a
/// one-texel border), per the plane's sampling density `texels_per_unit`.
///
/// Returns the tile's transform and its `(w, h)` in texels.
pub fn derive_tile_transform(surface: &Surface, texels_per_unit: f32) -> (TileTransform, u32, u32) {
    let normal = surface.plane.normal;

    // Any vector not parallel to `normal` gives a stable tangent basis.
    let helper = if normal.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let u_dir = normal.cross(helper).normalize();
    let v_dir = normal.cross(u_dir).normalize();

    let corners = surface.bounds.corners();
    let mut min_u = f32::MAX;
    let mut min_v = f32::MAX;
    let mut max_u = f32::MIN;
    let mut max_v = f32::MIN;
    for c in corners {
        let u = u_dir.dot(c) * texels_per_unit;
        let v = v_dir.dot(c) * texels_per_unit;
        min_u = min_u.min(u);
        min_v = min_v.min(v);
        max_u = max_u.max(u);
        max_v = max_v.max(v);
    }

    let border = TILE_BORDER_TEXELS as f32;
    let w = ((max_u - min_u).ceil() as u32 + 2 * TILE_BORDER_TEXELS).max(1);
    let h = ((max_v - min_v).ceil() as u32 + 2 * TILE_BORDER_TEXELS).max(1);

    // `origin` only needs to reproduce the (min_u - border, min_v - border)
    // projection along `u_dir`/`v_dir`; its component along `normal` is
    // irrelevant since `to_uv` only dots against the tangent axes.
    let origin = u_dir * ((min_u - border) / texels_per_unit) + v_dir * ((min_v - border) / texels_per_unit);

    let transform = TileTransform {
        origin,
        u_axis: u_dir * texels_per_unit,
        v_axis: v_dir * texels_per_unit,
    };

    (transform, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levelmesh::MeshLocation;
    use lmbake_math::{BBox, Plane};

    #[test]
    fn derived_transform_maps_bounds_into_tile_with_border() {
        let plane = Plane::from_points(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
        )
        .unwrap();
        let mut bounds = BBox::from_point(Vec3::new(0.0, 0.0, 0.0));
        bounds.add_point(Vec3::new(4.0, 4.0, 0.0));

        let surface = Surface::new(MeshLocation::default(), plane, bounds, 0);
        let (transform, w, h) = derive_tile_transform(&surface, 1.0);

        assert!(w >= 4 && h >= 4);
        let uv_min = transform.to_uv(surface.bounds.min);
        let uv_max = transform.to_uv(surface.bounds.max);
        assert!(uv_min.x >= 0.0 && uv_min.y >= 0.0);
        assert!(uv_max.x <= w as f32 && uv_max.y <= h as f32);
    }
}
