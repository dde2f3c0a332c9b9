use wgpu::util::DeviceExt;

/// The three persistent float image attachments used within one tile's
/// dispatch: `start_positions` is written once before the direct pass
/// and never touched again; `positions`/`outputs` are read-write across
/// bounce iterations.
pub struct TileImages {
    pub start_positions: wgpu::Texture,
    pub start_positions_view: wgpu::TextureView,
    pub positions: wgpu::Texture,
    pub positions_view: wgpu::TextureView,
    pub outputs: wgpu::Texture,
    pub outputs_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

fn make_storage_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

impl TileImages {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (start_positions, start_positions_view) = make_storage_texture(device, "lmbake-start-positions", width, height);
        let (positions, positions_view) = make_storage_texture(device, "lmbake-positions", width, height);
        let (outputs, outputs_view) = make_storage_texture(device, "lmbake-outputs", width, height);
        Self {
            start_positions,
            start_positions_view,
            positions,
            positions_view,
            outputs,
            outputs_view,
            width,
            height,
        }
    }

    /// Uploads the texel -> (world position, surface id) table computed on
    /// the CPU (from the tile's transform and the owning surfaces) into
    /// `start_positions`, and clears `outputs` to zero.
    pub fn upload_start_positions(&self, queue: &wgpu::Queue, data: &[[f32; 4]]) {
        debug_assert_eq!(data.len(), (self.width * self.height) as usize);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.start_positions,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 16),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        let zero = vec![[0.0f32; 4]; (self.width * self.height) as usize];
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.outputs,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&zero),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 16),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Blocking readback of `outputs`, used at the tile boundary to copy
    /// the accumulated radiance into the atlas page.
    pub fn read_outputs(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Vec<[f32; 4]> {
        let bytes_per_row = (self.width * 16).div_ceil(256) * 256;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lmbake-readback"),
            size: (bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lmbake-readback-encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.outputs,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().expect("tile readback map failed");

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity((self.width * self.height) as usize);
        for row in 0..self.height {
            let row_start = (row * bytes_per_row) as usize;
            let row_bytes = &data[row_start..row_start + (self.width * 16) as usize];
            let texels: &[[f32; 4]] = bytemuck::cast_slice(row_bytes);
            out.extend_from_slice(texels);
        }
        drop(data);
        buffer.unmap();
        out
    }
}

/// Uploads a read-only storage buffer (surface-index, surface-info, or
/// light data) shared by every tile in the bake.
pub fn upload_storage_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, data: &[T]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::STORAGE,
    })
}
