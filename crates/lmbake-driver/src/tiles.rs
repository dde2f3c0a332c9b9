use lmbake_mesh::tile::derive_tile_transform;
use lmbake_mesh::{LevelMesh, LightmapTile};
use tracing::warn;

/// Allocates one [`LightmapTile`] per eligible surface and wires up
/// `surface.lightmap_tile_index`. Sky surfaces and degenerate planes are
/// skipped (tile index stays -1) rather than failing the whole mesh.
pub fn build_tiles(mesh: &mut LevelMesh, texels_per_unit: f32) {
    for i in 0..mesh.surfaces.len() {
        if mesh.surfaces[i].is_sky {
            continue;
        }
        if mesh.surfaces[i].bounds.extent().length() < 1e-4 {
            warn!(surface = i, "skipping degenerate surface: zero-area bounds");
            continue;
        }

        let (transform, w, h) = derive_tile_transform(&mesh.surfaces[i], texels_per_unit);
        let tile_index = mesh.lightmap_tiles.len();
        mesh.lightmap_tiles.push(LightmapTile {
            atlas_location: lmbake_mesh::AtlasLocation {
                array_index: -1,
                x: 0,
                y: 0,
                w,
                h,
            },
            transform,
            surfaces: Vec::new(),
            needs_update: true,
            type_index: tile_index as i32,
        });
        mesh.surfaces[i].lightmap_tile_index = tile_index as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbake_math::{BBox, Plane, Vec3};
    use lmbake_mesh::levelmesh::{MeshLocation, Surface};

    #[test]
    fn build_tiles_skips_sky_surfaces() {
        let mut mesh = LevelMesh::new(256);
        mesh.surfaces.clear();

        let plane = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        let mut bounds = BBox::from_point(Vec3::ZERO);
        bounds.add_point(Vec3::new(4.0, 4.0, 0.0));

        let mut sky = Surface::new(MeshLocation::default(), plane, bounds, 0);
        sky.is_sky = true;
        mesh.surfaces.push(sky);
        mesh.surfaces.push(Surface::new(MeshLocation::default(), plane, bounds, 0));

        build_tiles(&mut mesh, 4.0);

        assert_eq!(mesh.surfaces[0].lightmap_tile_index, -1);
        assert_eq!(mesh.surfaces[1].lightmap_tile_index, 0);
        assert_eq!(mesh.lightmap_tiles.len(), 1);
    }
}
