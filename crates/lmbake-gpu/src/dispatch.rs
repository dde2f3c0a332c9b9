use wgpu::util::DeviceExt;

use crate::accel::AccelerationStructure;
use crate::images::TileImages;
use crate::pipeline::RayTracePipelines;
use crate::types::{LightWindowPushConstants, TileUniforms};

const WORKGROUP_SIZE: u32 = 8;

fn workgroup_count(extent: u32) -> u32 {
    extent.div_ceil(WORKGROUP_SIZE)
}

/// The per-tile GPU resources that stay bound across all passes within a
/// tile's dispatch sequence.
pub struct TileBindings {
    pub bind_group: wgpu::BindGroup,
    pub uniform_buffer: wgpu::Buffer,
}

impl TileBindings {
    pub fn create(
        device: &wgpu::Device,
        pipelines: &RayTracePipelines,
        accel: &AccelerationStructure,
        images: &TileImages,
        surface_of_primitive: &wgpu::Buffer,
        surface_info: &wgpu::Buffer,
        lights: &wgpu::Buffer,
        uniforms: TileUniforms,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lmbake-tile-uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lmbake-tile-bind-group"),
            layout: &pipelines.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::AccelerationStructure(&accel.tlas),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&images.start_positions_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&images.positions_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&images.outputs_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: surface_of_primitive.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: surface_info.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: lights.as_entire_binding(),
                },
            ],
        });

        Self {
            bind_group,
            uniform_buffer,
        }
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: TileUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }
}

fn dispatch(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &wgpu::ComputePipeline,
    bindings: &TileBindings,
    push_constants: LightWindowPushConstants,
    width: u32,
    height: u32,
    label: &str,
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bindings.bind_group, &[]);
        pass.set_push_constants(0, bytemuck::bytes_of(&push_constants));
        pass.dispatch_workgroups(workgroup_count(width), workgroup_count(height), 1);
    }
    queue.submit(std::iter::once(encoder.finish()));
}

pub fn dispatch_direct(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &RayTracePipelines,
    bindings: &TileBindings,
    width: u32,
    height: u32,
    light_start: u32,
    light_end: u32,
) {
    dispatch(
        device,
        queue,
        &pipelines.direct,
        bindings,
        LightWindowPushConstants {
            light_start,
            light_end,
            pad: [0, 0],
        },
        width,
        height,
        "lmbake-direct-dispatch",
    );
}

/// `sample_index` rides in `light_start`/`light_end` since the direct
/// pass's light window has no meaning for a bounce dispatch.
pub fn dispatch_bounce(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &RayTracePipelines,
    bindings: &TileBindings,
    width: u32,
    height: u32,
    sample_index: u32,
    is_first_bounce: bool,
) {
    let pipeline = if is_first_bounce { &pipelines.first_bounce } else { &pipelines.further_bounce };
    dispatch(
        device,
        queue,
        pipeline,
        bindings,
        LightWindowPushConstants {
            light_start: sample_index,
            light_end: sample_index,
            pad: [0, 0],
        },
        width,
        height,
        "lmbake-bounce-dispatch",
    );
}

pub fn dispatch_ambient(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &RayTracePipelines,
    bindings: &TileBindings,
    width: u32,
    height: u32,
) {
    dispatch(
        device,
        queue,
        &pipelines.ambient,
        bindings,
        LightWindowPushConstants {
            light_start: 0,
            light_end: 0,
            pad: [0, 0],
        },
        width,
        height,
        "lmbake-ambient-dispatch",
    );
}
