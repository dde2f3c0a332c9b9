use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("acceleration structure build failed for {resource}: {reason}")]
    AccelBuild { resource: String, reason: String },

    #[error("tile {w}x{h} exceeds atlas page size {max}; shrink the surface or raise --size")]
    TileTooLarge { w: u32, h: u32, max: u32 },

    #[error("atlas page budget exceeded: {requested} pages requested, ceiling is {ceiling}")]
    OutOfMemory { requested: u32, ceiling: u32 },
}
