use crate::levelmesh::LevelMesh;
use crate::packer::RectPacker;

/// Packs every `LightmapTile`'s rectangle into one or more
/// `lm_texture_size x lm_texture_size` atlas pages starting at
/// `lightmap_start_index`, then writes back each lit surface's vertex
/// lightmap UVs and array index. Tiles are sorted by height descending,
/// then width descending, before insertion.
pub fn pack_lightmap_atlas(mesh: &mut LevelMesh, lightmap_start_index: i32) {
    let mut order: Vec<usize> = (0..mesh.lightmap_tiles.len()).collect();
    order.sort_by(|&a, &b| {
        let ta = &mesh.lightmap_tiles[a].atlas_location;
        let tb = &mesh.lightmap_tiles[b].atlas_location;
        ta.h.cmp(&tb.h).reverse().then(ta.w.cmp(&tb.w).reverse())
    });

    let mut packer = RectPacker::new(mesh.lm_texture_size);
    for idx in order {
        let loc = mesh.lightmap_tiles[idx].atlas_location;
        let packed = packer.insert(loc.w, loc.h);
        let loc = &mut mesh.lightmap_tiles[idx].atlas_location;
        loc.x = packed.x;
        loc.y = packed.y;
        loc.array_index = lightmap_start_index + packed.page as i32;
    }

    mesh.lm_texture_count = packer.num_pages();

    let texture_size = mesh.lm_texture_size as f32;
    for surface_idx in 0..mesh.surfaces.len() {
        let tile_index = mesh.surfaces[surface_idx].lightmap_tile_index;
        if tile_index < 0 {
            continue;
        }
        let tile = &mesh.lightmap_tiles[tile_index as usize];
        let (transform, array_index, atlas_x, atlas_y) = (
            tile.transform,
            tile.atlas_location.array_index,
            tile.atlas_location.x as f32,
            tile.atlas_location.y as f32,
        );

        let loc = mesh.surfaces[surface_idx].mesh_location;
        for v in &mut mesh.vertices[loc.start_vert as usize..(loc.start_vert + loc.num_verts) as usize] {
            let uv = transform.to_lightmap_uv(v.pos, atlas_x, atlas_y, texture_size);
            v.lightmap_uv = uv;
            v.lightmap_index = array_index as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levelmesh::{MeshLocation, Surface, Vertex};
    use crate::tile::{AtlasLocation, LightmapTile};
    use lmbake_math::{BBox, Plane, TileTransform, Vec2, Vec3};

    fn mesh_with_tiles(sizes: &[(u32, u32)]) -> LevelMesh {
        let mut mesh = LevelMesh::new(64);
        mesh.vertices.clear();
        mesh.indices.clear();
        mesh.surfaces.clear();
        mesh.lightmap_tiles.clear();

        for &(w, h) in sizes {
            let start_vert = mesh.vertices.len() as u32;
            mesh.vertices.push(Vertex::new(Vec3::ZERO, Vec2::ZERO, Vec3::Z));
            mesh.vertices.push(Vertex::new(Vec3::new(w as f32, 0.0, 0.0), Vec2::ZERO, Vec3::Z));
            mesh.vertices.push(Vertex::new(Vec3::new(w as f32, h as f32, 0.0), Vec2::ZERO, Vec3::Z));

            let plane = Plane::from_points(
                mesh.vertices[start_vert as usize].pos,
                mesh.vertices[start_vert as usize + 1].pos,
                mesh.vertices[start_vert as usize + 2].pos,
            )
            .unwrap();
            let mut bounds = BBox::from_point(mesh.vertices[start_vert as usize].pos);
            bounds.add_point(mesh.vertices[start_vert as usize + 2].pos);

            let mut surface = Surface::new(
                MeshLocation {
                    start_vert,
                    num_verts: 3,
                    start_index: 0,
                    num_indices: 0,
                },
                plane,
                bounds,
                0,
            );
            surface.lightmap_tile_index = mesh.lightmap_tiles.len() as i32;
            mesh.surfaces.push(surface);

            mesh.lightmap_tiles.push(LightmapTile {
                atlas_location: AtlasLocation {
                    array_index: 0,
                    x: 0,
                    y: 0,
                    w,
                    h,
                },
                transform: TileTransform {
                    origin: Vec3::ZERO,
                    u_axis: Vec3::X,
                    v_axis: Vec3::Y,
                },
                surfaces: Vec::new(),
                needs_update: true,
                type_index: 0,
            });
        }

        mesh
    }

    #[test]
    fn packed_tiles_write_back_vertex_lightmap_uvs() {
        let mut mesh = mesh_with_tiles(&[(8, 8), (16, 4)]);
        pack_lightmap_atlas(&mut mesh, 0);

        for v in &mesh.vertices {
            assert!(v.lightmap_index >= 0.0);
            assert!(v.lightmap_uv.x >= 0.0 && v.lightmap_uv.x <= 1.0);
            assert!(v.lightmap_uv.y >= 0.0 && v.lightmap_uv.y <= 1.0);
        }
    }

    #[test]
    fn texture_count_reflects_pages_used() {
        let mut mesh = mesh_with_tiles(&[(64, 64), (64, 64)]);
        pack_lightmap_atlas(&mut mesh, 0);
        assert_eq!(mesh.lm_texture_count, 2);
    }
}
