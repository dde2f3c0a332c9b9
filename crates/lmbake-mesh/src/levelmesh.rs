use bytemuck::{Pod, Zeroable};
use lmbake_math::{AffineTransform, BBox, Plane, Vec2, Vec3};
use tracing::debug;

use crate::bvh::Bvh;
use crate::error::MeshError;
use crate::tile::LightmapTile;

/// A single mesh vertex. Layout matches the GPU vertex buffer directly.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub pos: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
    pub lightmap_uv: Vec2,
    /// -1.0 when the vertex has not been assigned to any lightmap page.
    pub lightmap_index: f32,
}

impl Vertex {
    pub fn new(pos: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self {
            pos,
            uv,
            normal,
            lightmap_uv: Vec2::ZERO,
            lightmap_index: -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeshLocation {
    pub start_vert: u32,
    pub num_verts: u32,
    pub start_index: u32,
    pub num_indices: u32,
}

/// A convex, coplanar polygon triangulated into the mesh; the unit of
/// lighting.
#[derive(Debug, Clone)]
pub struct Surface {
    pub mesh_location: MeshLocation,
    pub plane: Plane,
    pub bounds: BBox,
    pub sector_group: i32,
    /// 0 = no portal.
    pub portal_index: usize,
    pub is_sky: bool,
    pub alpha: f32,
    pub texture_id: u32,
    pub always_update: bool,
    /// -1 if unlit.
    pub lightmap_tile_index: i32,
    pub lights: Vec<u32>,
    /// Filled in by `build_plane_groups`.
    pub(crate) plane_group: i32,
    /// 0 = not emissive. Otherwise the distance over which a bounce ray's
    /// emissive contribution falls off to zero.
    pub emissive_distance: f32,
    pub emissive_color: Vec3,
    pub emissive_intensity: f32,
}

impl Surface {
    pub fn new(mesh_location: MeshLocation, plane: Plane, bounds: BBox, sector_group: i32) -> Self {
        Self {
            mesh_location,
            plane,
            bounds,
            sector_group,
            portal_index: 0,
            is_sky: false,
            alpha: 1.0,
            texture_id: 0,
            always_update: false,
            lightmap_tile_index: -1,
            lights: Vec::new(),
            plane_group: -1,
            emissive_distance: 0.0,
            emissive_color: Vec3::ZERO,
            emissive_intensity: 0.0,
        }
    }
}

/// Affine transform applied to position and direction when a ray crosses
/// this portal's surface. Index 0 is always the identity sentinel.
#[derive(Debug, Clone, Copy)]
pub struct Portal {
    pub transform: AffineTransform,
}

impl Default for Portal {
    fn default() -> Self {
        Self {
            transform: AffineTransform::identity(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub origin: Vec3,
    pub radius: f32,
    pub intensity: Vec3,
    /// -1 for omni lights.
    pub inner_angle_cos: f32,
    pub outer_angle_cos: f32,
    pub spot_dir: Vec3,
}

/// Tile-pixel accounting returned by [`LevelMesh::gather_tile_pixel_stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeshTileStats {
    pub tiles_total: usize,
    pub tiles_dirty: usize,
    pub pixels_total: u64,
    pub pixels_dirty: u64,
}

/// The lowest below-world coordinate used for the placeholder geometry
/// inserted by [`LevelMesh::add_empty_mesh`] when the scene has no surfaces.
const EMPTY_MESH_MIN: f32 = -100001.0;
const EMPTY_MESH_MAX: f32 = -100000.0;

/// Fixed bias subtracted from a trace's max distance before the first
/// segment is cast, and added back per-portal-hop to avoid immediately
/// re-hitting the portal plane.
const TRACE_START_BIAS: f32 = 10.0;
const TRACE_PORTAL_BIAS: f32 = 2.0;
const TRACE_MAX_PORTAL_HOPS: u32 = 16;

/// The full scene: vertices/indices, surfaces, portals, lights and the
/// lightmap tiles derived from them. Owns its BVH; callers must call
/// [`LevelMesh::update_collision`] after mutating geometry.
pub struct LevelMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub surfaces: Vec<Surface>,
    pub portals: Vec<Portal>,
    pub lights: Vec<Light>,
    pub lightmap_tiles: Vec<LightmapTile>,
    pub lm_texture_size: u32,
    pub lm_texture_count: u32,
    bvh: Option<Bvh>,
}

impl LevelMesh {
    pub fn new(lm_texture_size: u32) -> Self {
        let mut mesh = Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            surfaces: Vec::new(),
            portals: vec![Portal::default()],
            lights: Vec::new(),
            lightmap_tiles: Vec::new(),
            lm_texture_size,
            lm_texture_count: 0,
            bvh: None,
        };
        mesh.add_empty_mesh_if_needed();
        mesh.update_collision();
        mesh
    }

    /// Inserts a degenerate placeholder box below the world if the mesh has
    /// no geometry, so acceleration-structure builds never see zero
    /// triangles.
    pub fn add_empty_mesh_if_needed(&mut self) {
        if !self.vertices.is_empty() {
            return;
        }

        let lo = EMPTY_MESH_MIN;
        let hi = EMPTY_MESH_MAX;
        let corners = [
            Vec3::new(lo, lo, lo),
            Vec3::new(hi, lo, lo),
            Vec3::new(hi, hi, lo),
            Vec3::new(lo, lo, lo),
            Vec3::new(lo, hi, lo),
            Vec3::new(hi, hi, lo),
            Vec3::new(lo, lo, hi),
            Vec3::new(hi, lo, hi),
            Vec3::new(hi, hi, hi),
            Vec3::new(lo, lo, hi),
            Vec3::new(lo, hi, hi),
            Vec3::new(hi, hi, hi),
        ];
        for c in corners {
            self.vertices.push(Vertex::new(c, Vec2::ZERO, Vec3::Z));
        }
        self.indices.extend(0..12u32);
    }

    pub fn update_collision(&mut self) {
        let positions: Vec<Vec3> = self.vertices.iter().map(|v| v.pos).collect();
        self.bvh = Some(Bvh::build(&positions, &self.indices));
    }

    pub fn get_surface(&self, index: usize) -> &Surface {
        &self.surfaces[index]
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// First-hit CPU trace, following portal transforms. Mirrors the
    /// original engine's bias/cap behaviour: a 10-unit start bias keeps the
    /// origin off the casting surface, each portal hop re-originates 2
    /// units past the portal plane, and the loop is capped at 16 hops to
    /// guard against portal cycles.
    pub fn trace(&self, start: Vec3, direction: Vec3, max_dist: f32) -> Option<&Surface> {
        self.trace_index(start, direction, max_dist).map(|i| &self.surfaces[i])
    }

    /// Same as [`LevelMesh::trace`] but returns the hit surface's index
    /// instead of a reference, for callers that need to cross-check it
    /// against a surface id obtained some other way.
    pub fn trace_index(&self, start: Vec3, direction: Vec3, max_dist: f32) -> Option<usize> {
        let bvh = self.bvh.as_ref()?;

        let mut max_dist = (max_dist - TRACE_START_BIAS).max(0.0);
        let mut origin = start;
        let mut direction = direction;
        let mut hit_surface_idx: Option<usize> = None;

        for _ in 0..TRACE_MAX_PORTAL_HOPS {
            let hit = bvh.find_first_hit(origin, direction, max_dist);
            if !hit.is_hit() {
                return None;
            }

            let surface_idx = self.surface_index_for_triangle(hit.triangle as usize);
            hit_surface_idx = Some(surface_idx);
            let surface = &self.surfaces[surface_idx];

            if surface.portal_index == 0 {
                break;
            }

            let portal = &self.portals[surface.portal_index];
            let travel_dist = hit.fraction * max_dist + TRACE_PORTAL_BIAS;
            if travel_dist >= max_dist {
                break;
            }

            let crossing = origin + direction * travel_dist;
            origin = portal.transform.transform_position(crossing);
            direction = portal.transform.transform_direction(direction);
            max_dist -= travel_dist;
        }

        hit_surface_idx
    }

    /// Maps a BVH triangle number (the order triangles appear in `indices`)
    /// back to the surface that contains it via `MeshLocation`.
    fn surface_index_for_triangle(&self, triangle: usize) -> usize {
        let index_pos = (triangle * 3) as u32;
        self.surfaces
            .iter()
            .position(|s| {
                index_pos >= s.mesh_location.start_index
                    && index_pos < s.mesh_location.start_index + s.mesh_location.num_indices
            })
            .unwrap_or(0)
    }

    pub fn gather_tile_pixel_stats(&self) -> LevelMeshTileStats {
        let mut stats = LevelMeshTileStats {
            tiles_total: self.lightmap_tiles.len(),
            ..Default::default()
        };
        for tile in &self.lightmap_tiles {
            let area = tile.atlas_location.area();
            stats.pixels_total += area;
            if tile.needs_update {
                stats.tiles_dirty += 1;
                stats.pixels_dirty += area;
            }
        }
        stats
    }

    /// Builds plane groups and, for each lit surface, the list of coplanar
    /// neighbours whose bounds project into its tile's UV rectangle. Ported
    /// from the engine's `BuildTileSurfaceLists`.
    pub fn build_tile_surface_lists(&mut self) {
        const NORMAL_DOT_MIN: f32 = 0.999;
        const NORMAL_DOT_MAX: f32 = 1.01;
        const OFFSET_EPS: f32 = 0.1;

        struct PlaneGroup {
            plane: Plane,
            sector_group: i32,
            surfaces: Vec<usize>,
        }

        let mut groups: Vec<PlaneGroup> = Vec::new();
        let mut group_of_surface = vec![0usize; self.surfaces.len()];

        for (i, surface) in self.surfaces.iter().enumerate() {
            let mut found = None;
            for (gi, group) in groups.iter().enumerate() {
                if group.sector_group == surface.sector_group
                    && surface
                        .plane
                        .is_coplanar_with(&group.plane, NORMAL_DOT_MIN, NORMAL_DOT_MAX, OFFSET_EPS)
                {
                    found = Some(gi);
                    break;
                }
            }

            let gi = found.unwrap_or_else(|| {
                groups.push(PlaneGroup {
                    plane: surface.plane,
                    sector_group: surface.sector_group,
                    surfaces: Vec::new(),
                });
                groups.len() - 1
            });

            groups[gi].surfaces.push(i);
            group_of_surface[i] = gi;
        }

        for (i, surface) in self.surfaces.iter_mut().enumerate() {
            surface.plane_group = group_of_surface[i] as i32;
        }

        for tile in &mut self.lightmap_tiles {
            tile.surfaces.clear();
        }

        for i in 0..self.surfaces.len() {
            let target = &self.surfaces[i];
            if target.lightmap_tile_index < 0 {
                continue;
            }
            let tile_index = target.lightmap_tile_index as usize;
            let group_members = groups[group_of_surface[i]].surfaces.clone();

            for &j in &group_members {
                if j != i {
                    let other = &self.surfaces[j];
                    let transform = &self.lightmap_tiles[tile_index].transform;
                    let min_uv = transform.to_uv(other.bounds.min);
                    let max_uv = transform.to_uv(other.bounds.max);
                    if max_uv.x < 0.0 || max_uv.y < 0.0 || min_uv.x > 1.0 || min_uv.y > 1.0 {
                        continue;
                    }
                }
                self.lightmap_tiles[tile_index].surfaces.push(j as u32);
            }
        }

        debug!(groups = groups.len(), "built plane groups");
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        for (i, surface) in self.surfaces.iter().enumerate() {
            if surface.portal_index >= self.portals.len() {
                return Err(MeshError::InvalidPortalIndex {
                    index: i,
                    portal: surface.portal_index,
                });
            }
            if surface.lightmap_tile_index >= self.lightmap_tiles.len() as i32 {
                return Err(MeshError::InvalidTileIndex {
                    index: i,
                    tile: surface.lightmap_tile_index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbake_math::TileTransform;

    fn quad_mesh() -> LevelMesh {
        let mut mesh = LevelMesh::new(256);
        mesh.vertices.clear();
        mesh.indices.clear();

        mesh.vertices.push(Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.vertices.push(Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.vertices.push(Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.vertices.push(Vertex::new(Vec3::new(-1.0, 1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);

        let plane = Plane::from_points(
            mesh.vertices[0].pos,
            mesh.vertices[1].pos,
            mesh.vertices[2].pos,
        )
        .unwrap();
        let bounds = {
            let mut b = BBox::from_point(mesh.vertices[0].pos);
            for v in &mesh.vertices[1..] {
                b.add_point(v.pos);
            }
            b
        };
        mesh.surfaces.push(Surface::new(
            MeshLocation {
                start_vert: 0,
                num_verts: 4,
                start_index: 0,
                num_indices: 6,
            },
            plane,
            bounds,
            0,
        ));

        mesh.update_collision();
        mesh
    }

    #[test]
    fn trace_hits_quad_and_resolves_to_its_surface() {
        let mesh = quad_mesh();
        let hit = mesh.trace(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, -1.0), 100.0);
        assert!(hit.is_some());
    }

    #[test]
    fn trace_beyond_max_dist_misses() {
        let mesh = quad_mesh();
        let hit = mesh.trace(Vec3::new(0.0, 0.0, 1000.0), Vec3::new(0.0, 0.0, -1.0), 5.0);
        assert!(hit.is_none());
    }

    #[test]
    fn empty_mesh_guard_inserts_placeholder_geometry() {
        let mesh = LevelMesh::new(256);
        assert_eq!(mesh.vertices.len(), 12);
        assert_eq!(mesh.indices.len(), 12);
        for v in &mesh.vertices {
            assert!(v.pos.x <= EMPTY_MESH_MAX && v.pos.x >= EMPTY_MESH_MIN);
        }
    }

    #[test]
    fn portal_zero_is_identity() {
        let mesh = LevelMesh::new(256);
        assert!(mesh.portals[0].transform.is_identity());
    }

    #[test]
    fn build_tile_surface_lists_always_includes_primary() {
        let mut mesh = quad_mesh();
        mesh.surfaces[0].lightmap_tile_index = 0;
        mesh.lightmap_tiles.push(LightmapTile {
            atlas_location: crate::tile::AtlasLocation {
                array_index: 0,
                x: 0,
                y: 0,
                w: 8,
                h: 8,
            },
            transform: TileTransform {
                origin: Vec3::new(-1.0, -1.0, 0.0),
                u_axis: Vec3::X,
                v_axis: Vec3::Y,
            },
            surfaces: Vec::new(),
            needs_update: true,
            type_index: 0,
        });

        mesh.build_tile_surface_lists();
        assert_eq!(mesh.lightmap_tiles[0].surfaces, vec![0]);
    }
}
