use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Gpu(#[from] lmbake_gpu::GpuError),

    #[error(transparent)]
    Mesh(#[from] lmbake_mesh::MeshError),
}
