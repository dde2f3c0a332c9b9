/// Tunable parameters for one bake run. Defaults mirror the source
/// engine's hard-coded values, promoted here to configuration so AO
/// distance and bounce clip distance are adjustable per run.
#[derive(Debug, Clone, Copy)]
pub struct BakeConfig {
    /// Samples per pass (direct shadow jitter, bounce hemisphere, AO).
    pub sample_count: u32,
    /// Number of indirect bounces beyond the first.
    pub bounce_count: u32,
    /// Atlas page edge length (`LMTextureSize`), must be a power of two.
    pub atlas_size: u32,
    /// Max ray distance for the ambient-occlusion pass.
    pub ao_distance: f32,
    /// Max ray distance for bounce rays.
    pub bounce_clip_distance: f32,
    /// Hard ceiling on atlas pages; exceeding it is a fatal packing error.
    pub max_atlas_pages: u32,
    pub sun_direction: lmbake_math::Vec3,
    pub sun_color: lmbake_math::Vec3,
    pub debug_atlas: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            sample_count: 16,
            bounce_count: 1,
            atlas_size: 1024,
            ao_distance: 100.0,
            bounce_clip_distance: 2000.0,
            max_atlas_pages: 64,
            sun_direction: lmbake_math::Vec3::new(0.0, 0.0, -1.0),
            sun_color: lmbake_math::Vec3::ONE,
            debug_atlas: false,
        }
    }
}
