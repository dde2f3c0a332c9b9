use bytemuck::{Pod, Zeroable};
use lmbake_math::Vec3;

/// GPU-side per-surface metadata, uploaded as a read-only storage buffer
/// and indexed by surface id.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SurfaceInfoGpu {
    pub normal: [f32; 3],
    pub emissive_distance: f32,
    pub emissive_color: [f32; 3],
    pub emissive_intensity: f32,
    /// 0/1, widened to f32 so the struct stays a flat float buffer.
    pub is_sky: f32,
    pub sampling_distance: f32,
    pub _pad: [f32; 2],
}

/// GPU-side light record. Index 0 is always the sun (directional) light;
/// the direct pass special-cases it.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct LightGpu {
    pub origin: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub spot_dir: [f32; 3],
    pub inner_angle_cos: f32,
    pub outer_angle_cos: f32,
    pub _pad: [f32; 3],
}

impl LightGpu {
    pub fn omni(origin: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            origin: origin.into(),
            radius,
            color: color.into(),
            intensity,
            spot_dir: [0.0, 0.0, -1.0],
            inner_angle_cos: -1.0,
            outer_angle_cos: -1.0,
            _pad: [0.0; 3],
        }
    }
}

/// Per-tile-dispatch uniform buffer: sun direction/color and sampling
/// parameters. The light index window itself travels as a push constant
/// since it changes every pass within a tile.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct TileUniforms {
    pub sun_dir: [f32; 3],
    pub sample_count: u32,
    pub sun_color: [f32; 3],
    pub bounce_index: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub ao_distance: f32,
    pub bounce_clip_distance: f32,
    /// 0 = read path vertex from `start_positions` (first bounce / the
    /// initial direct pass); 1 = read from `positions` (further bounces,
    /// and the direct-at-bounce-vertex re-pass).
    pub read_positions_image: u32,
    pub _pad2: [u32; 3],
}

/// Discriminant for the five ray-trace compute passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PassType {
    Direct = 0,
    FirstBounce = 1,
    FurtherBounce = 2,
    Ambient = 3,
}

/// Push constants bound at `ShaderStages::COMPUTE`, carrying the light
/// index window for the current dispatch.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct LightWindowPushConstants {
    pub light_start: u32,
    pub light_end: u32,
    pub pad: [i32; 2],
}
