pub mod accel;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod types;

pub use accel::AccelerationStructure;
pub use device::GpuContext;
pub use error::GpuError;
pub use images::TileImages;
pub use pipeline::RayTracePipelines;
pub use types::{LightGpu, LightWindowPushConstants, PassType, SurfaceInfoGpu, TileUniforms};

/// Energy-throughput heuristic applied to bounce weight per hop; inherited
/// from the source engine as a flat constant rather than physically derived.
pub const BOUNCE_ENERGY_FRACTION: f32 = 0.25;
