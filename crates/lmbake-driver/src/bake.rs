use lmbake_gpu::dispatch::{dispatch_ambient, dispatch_bounce, dispatch_direct, TileBindings};
use lmbake_gpu::images::{upload_storage_buffer, TileImages};
use lmbake_gpu::{AccelerationStructure, GpuContext, LightGpu, RayTracePipelines, SurfaceInfoGpu, TileUniforms};
use lmbake_mesh::levelmesh::Light;
use lmbake_mesh::LevelMesh;
use lmbake_io::LightmapPage;
use tracing::debug;

use crate::config::BakeConfig;
use crate::error::DriverError;
use crate::tiles::build_tiles;

fn surface_info_buffer(mesh: &LevelMesh) -> Vec<SurfaceInfoGpu> {
    mesh.surfaces
        .iter()
        .map(|s| SurfaceInfoGpu {
            normal: s.plane.normal.into(),
            emissive_distance: s.emissive_distance,
            emissive_color: s.emissive_color.into(),
            emissive_intensity: s.emissive_intensity,
            is_sky: if s.is_sky { 1.0 } else { 0.0 },
            sampling_distance: 4.0,
            _pad: [0.0; 2],
        })
        .collect()
}

fn surface_of_primitive_buffer(mesh: &LevelMesh) -> Vec<u32> {
    let triangle_count = mesh.indices.len() / 3;
    let mut out = vec![0u32; triangle_count];
    for (i, surface) in mesh.surfaces.iter().enumerate() {
        let first_tri = (surface.mesh_location.start_index / 3) as usize;
        let num_tris = (surface.mesh_location.num_indices / 3) as usize;
        for t in first_tri..(first_tri + num_tris).min(triangle_count) {
            out[t] = i as u32;
        }
    }
    out
}

fn light_buffer(lights: &[Light]) -> Vec<LightGpu> {
    lights
        .iter()
        .map(|l| LightGpu {
            origin: l.origin.into(),
            radius: l.radius,
            color: l.intensity.normalize_or_zero().into(),
            intensity: l.intensity.length(),
            spot_dir: l.spot_dir.into(),
            inner_angle_cos: l.inner_angle_cos,
            outer_angle_cos: l.outer_angle_cos,
            _pad: [0.0; 3],
        })
        .collect()
}

/// Offset used to place a validation-trace origin above/below a texel's
/// world position along the tile's plane normal.
const TEXEL_TRACE_OFFSET: f32 = 10.0;

/// Projects a surface's vertex ring into `transform`'s tile-UV space.
fn surface_polygon_uv(mesh: &LevelMesh, surface_index: usize, transform: &lmbake_math::TileTransform) -> Vec<lmbake_math::Vec2> {
    let loc = mesh.surfaces[surface_index].mesh_location;
    let start = loc.start_vert as usize;
    let end = start + loc.num_verts as usize;
    mesh.vertices[start..end].iter().map(|v| transform.to_uv(v.pos)).collect()
}

/// Consistent cross-product-sign test against a convex polygon's edges;
/// surfaces are documented as convex coplanar polygons, so this is exact.
fn point_in_convex_polygon(poly: &[lmbake_math::Vec2], p: lmbake_math::Vec2) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        let edge = b - a;
        let to_p = p - a;
        let cross = edge.x * to_p.y - edge.y * to_p.x;
        if cross.abs() > 1e-4 {
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
    }
    true
}

/// Finds which of `tile`'s candidate surfaces (built by
/// `LevelMesh::build_tile_surface_lists`) actually contains `uv`, or -1 if
/// the texel falls outside every one of them (tile padding, a rounded-up
/// tile corner, etc.).
fn surface_at_uv(mesh: &LevelMesh, tile: &lmbake_mesh::LightmapTile, uv: lmbake_math::Vec2) -> i32 {
    for &surf_idx in &tile.surfaces {
        let poly = surface_polygon_uv(mesh, surf_idx as usize, &tile.transform);
        if point_in_convex_polygon(&poly, uv) {
            return surf_idx as i32;
        }
    }
    -1
}

/// Builds the per-texel `(world_position, surface_id)` table for a tile's
/// `start_positions` image. A texel's surface is resolved by testing it
/// against the tile's coplanar candidate list
/// (`LevelMesh::build_tile_surface_lists`), then confirmed with a CPU
/// portal-aware trace straight through the tile's plane; texels outside
/// every candidate surface, or whose confirming trace disagrees, are
/// marked with surface id -1 so the GPU passes skip them.
fn start_positions_for_tile(mesh: &LevelMesh, tile_index: usize) -> Vec<[f32; 4]> {
    let tile = &mesh.lightmap_tiles[tile_index];
    let w = tile.atlas_location.w;
    let h = tile.atlas_location.h;
    let normal = tile.transform.u_axis.cross(tile.transform.v_axis).normalize_or_zero();
    let mut out = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let uv = lmbake_math::Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let world = tile.transform.to_world(uv);
            let candidate = surface_at_uv(mesh, tile, uv);
            let confirmed = candidate >= 0
                && mesh.trace_index(world + normal * TEXEL_TRACE_OFFSET, -normal, 2.0 * TEXEL_TRACE_OFFSET)
                    == Some(candidate as usize);
            if confirmed {
                out.push([world.x, world.y, world.z, candidate as f32]);
            } else {
                out.push([0.0, 0.0, 0.0, -1.0]);
            }
        }
    }
    out
}

/// Runs a full bake: builds tiles, packs the atlas, uploads GPU buffers,
/// and processes every tile through direct -> bounces -> ambient occlusion
/// before reading back the atlas pages. Tile processing order does not
/// matter; this implementation processes tiles sequentially.
pub fn bake(mesh: &mut LevelMesh, lights: &[Light], config: &BakeConfig) -> Result<Vec<LightmapPage>, DriverError> {
    mesh.lm_texture_size = config.atlas_size;

    const TEXELS_PER_UNIT: f32 = 1.0;
    build_tiles(mesh, TEXELS_PER_UNIT);
    mesh.build_tile_surface_lists();
    mesh.validate()?;

    for tile in &mesh.lightmap_tiles {
        if tile.atlas_location.w > config.atlas_size || tile.atlas_location.h > config.atlas_size {
            return Err(lmbake_gpu::GpuError::TileTooLarge {
                w: tile.atlas_location.w,
                h: tile.atlas_location.h,
                max: config.atlas_size,
            }
            .into());
        }
    }

    lmbake_mesh::atlas::pack_lightmap_atlas(mesh, 0);
    if mesh.lm_texture_count > config.max_atlas_pages {
        return Err(lmbake_gpu::GpuError::OutOfMemory {
            requested: mesh.lm_texture_count,
            ceiling: config.max_atlas_pages,
        }
        .into());
    }

    let gpu = pollster::block_on(GpuContext::new())?;
    let accel = AccelerationStructure::build(&gpu.device, &gpu.queue, &mesh.vertices, &mesh.indices)?;
    let pipelines = RayTracePipelines::create(&gpu.device);

    let surface_info = upload_storage_buffer(&gpu.device, "lmbake-surface-info", &surface_info_buffer(mesh));
    let surface_of_primitive = upload_storage_buffer(&gpu.device, "lmbake-surface-of-primitive", &surface_of_primitive_buffer(mesh));
    let light_gpu = light_buffer(lights);
    let light_buf = upload_storage_buffer(&gpu.device, "lmbake-lights", &light_gpu);

    let mut pages = vec![LightmapPage::blank(config.atlas_size); mesh.lm_texture_count.max(1) as usize];

    for tile_index in 0..mesh.lightmap_tiles.len() {
        let (w, h, array_index, atlas_x, atlas_y) = {
            let loc = mesh.lightmap_tiles[tile_index].atlas_location;
            (loc.w, loc.h, loc.array_index, loc.x, loc.y)
        };

        let images = TileImages::new(&gpu.device, w, h);
        let start_data = start_positions_for_tile(mesh, tile_index);
        images.upload_start_positions(&gpu.queue, &start_data);

        let uniforms = TileUniforms {
            sun_dir: config.sun_direction.into(),
            sample_count: config.sample_count,
            sun_color: config.sun_color.into(),
            bounce_index: 0,
            tile_width: w,
            tile_height: h,
            ao_distance: config.ao_distance,
            bounce_clip_distance: config.bounce_clip_distance,
            read_positions_image: 0,
            _pad2: [0; 3],
        };
        let bindings = TileBindings::create(
            &gpu.device,
            &pipelines,
            &accel,
            &images,
            &surface_of_primitive,
            &surface_info,
            &light_buf,
            uniforms,
        );

        dispatch_direct(&gpu.device, &gpu.queue, &pipelines, &bindings, w, h, 0, light_gpu.len() as u32);

        for bounce in 0..config.bounce_count {
            let is_first = bounce == 0;
            bindings.update_uniforms(
                &gpu.queue,
                TileUniforms {
                    read_positions_image: if is_first { 0 } else { 1 },
                    bounce_index: bounce,
                    ..uniforms
                },
            );
            for sample in 0..config.sample_count {
                dispatch_bounce(&gpu.device, &gpu.queue, &pipelines, &bindings, w, h, sample, is_first);
            }

            bindings.update_uniforms(&gpu.queue, TileUniforms { read_positions_image: 1, ..uniforms });
            dispatch_direct(&gpu.device, &gpu.queue, &pipelines, &bindings, w, h, 0, light_gpu.len() as u32);
        }

        dispatch_ambient(&gpu.device, &gpu.queue, &pipelines, &bindings, w, h);

        let texels = images.read_outputs(&gpu.device, &gpu.queue);
        let page = &mut pages[array_index.max(0) as usize];
        for ty in 0..h {
            for tx in 0..w {
                let src = texels[(ty * w + tx) as usize];
                let dst_x = atlas_x + tx;
                let dst_y = atlas_y + ty;
                let idx = (dst_y * config.atlas_size + dst_x) as usize;
                page.texels[idx] = [src[0], src[1], src[2]];
            }
        }

        debug!(tile = tile_index, "tile bake complete");
    }

    Ok(pages)
}
