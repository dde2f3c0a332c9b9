use std::borrow::Cow;

use crate::types::LightWindowPushConstants;

/// Concatenates the shared struct/helper source ahead of a pass's own
/// source, since WGSL has no module system naga can resolve across files.
fn load_shader(pass_source: &str) -> String {
    format!("{}\n{}", include_str!("shader/common.wgsl"), pass_source)
}

pub fn bind_group_layout_descriptor() -> wgpu::BindGroupLayoutDescriptor<'static> {
    wgpu::BindGroupLayoutDescriptor {
        label: Some("lmbake-raytrace-bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::AccelerationStructure { vertex_return: false },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::ReadOnly,
                    format: wgpu::TextureFormat::Rgba32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::ReadWrite,
                    format: wgpu::TextureFormat::Rgba32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::ReadWrite,
                    format: wgpu::TextureFormat::Rgba32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 5,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 6,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 7,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    }
}

/// The five ray-trace compute pipelines sharing one bind group layout and
/// push-constant range.
pub struct RayTracePipelines {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub direct: wgpu::ComputePipeline,
    pub first_bounce: wgpu::ComputePipeline,
    pub further_bounce: wgpu::ComputePipeline,
    pub ambient: wgpu::ComputePipeline,
}

impl RayTracePipelines {
    pub fn create(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&bind_group_layout_descriptor());

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lmbake-raytrace-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..std::mem::size_of::<LightWindowPushConstants>() as u32,
            }],
        });

        let direct_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lmbake-direct"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(load_shader(include_str!("shader/direct.wgsl")))),
        });
        let bounce_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lmbake-bounce"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(load_shader(include_str!("shader/bounce.wgsl")))),
        });
        let ambient_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lmbake-ambient"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(load_shader(include_str!("shader/ambient.wgsl")))),
        });

        let make_pipeline = |module: &wgpu::ShaderModule, entry_point: &str, label: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };

        let direct = make_pipeline(&direct_module, "direct_main", "lmbake-direct-pipeline");
        // The first-bounce and further-bounce passes share one shader; they
        // differ only in `TileUniforms::read_positions_image`.
        let first_bounce = make_pipeline(&bounce_module, "bounce_main", "lmbake-first-bounce-pipeline");
        let further_bounce = make_pipeline(&bounce_module, "bounce_main", "lmbake-further-bounce-pipeline");
        let ambient = make_pipeline(&ambient_module, "ambient_main", "lmbake-ambient-pipeline");

        Self {
            bind_group_layout,
            direct,
            first_bounce,
            further_bounce,
            ambient,
        }
    }
}
