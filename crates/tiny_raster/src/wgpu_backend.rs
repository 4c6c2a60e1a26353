//! wgpu implementation of the [`Gpu`] contract.
//!
//! GL-style calls are recorded into a per-frame draw list. Uniform values
//! live on the program; every draw snapshots the current program's vertex
//! and fragment blocks into consecutive 256-byte slots of one uniform
//! buffer, bound with dynamic offsets. `finish_frame` encodes a single
//! render pass over the surface texture and submits it.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::gpu::ProgramUniforms;
use crate::shaders::{link, ProgramLayout, UniformBlock, UNIFORM_BLOCK_SIZE};
use crate::{
    BufferId, Capability, Gpu, ProgramId, RenderError, UniformLocation, UniformValue,
    VertexArrayId, Vertex,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Uniform slots reserved up front; the buffer grows on demand.
const INITIAL_UNIFORM_SLOTS: u64 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    depth_test: bool,
    srgb: bool,
}

struct GpuProgram {
    label: String,
    uniforms: ProgramUniforms,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

struct DrawCommand {
    key: PipelineKey,
    buffer: BufferId,
    first: u32,
    count: u32,
    vertex_offset: u32,
    fragment_offset: u32,
}

pub struct WgpuGpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    srgb_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_data: Vec<u8>,

    programs: HashMap<ProgramId, GpuProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    buffers: HashMap<BufferId, GpuBuffer>,
    vertex_arrays: HashMap<VertexArrayId, BufferId>,
    next_id: u32,

    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    depth_test: bool,
    srgb: bool,
    clear_color: [f32; 4],
    draws: Vec<DrawCommand>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuGpu {
    /// Create a device and configure a surface for the given window.
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("TinyRender Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure the surface with a linear format and allow sRGB views of
        // it, so FramebufferSrgb can be toggled per frame.
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .first()
            .copied()
            .ok_or(RenderError::NoAdapter)?
            .remove_srgb_suffix();
        let srgb_format = format.add_srgb_suffix();

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: if srgb_format != format {
                vec![srgb_format]
            } else {
                vec![]
            },
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} (sRGB view {:?})",
            config.width,
            config.height,
            format,
            srgb_format
        );

        let depth_view = create_depth_view(&device, config.width, config.height);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Block Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });

        // Group 0 feeds the vertex stage, group 1 the fragment stage.
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Layout"),
            bind_group_layouts: &[&uniform_layout, &uniform_layout],
            push_constant_ranges: &[],
        });

        let (uniform_buffer, uniform_bind_group) = create_uniform_buffer(
            &device,
            &uniform_layout,
            INITIAL_UNIFORM_SLOTS * UNIFORM_BLOCK_SIZE,
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            srgb_format,
            depth_view,
            uniform_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_data: Vec::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            next_id: 0,
            current_program: None,
            bound_vertex_array: None,
            depth_test: false,
            srgb: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            draws: Vec::new(),
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Linear format of the surface; overlays render in this format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }

    /// Reconfigure the surface, e.g. after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.frame = None;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, self.config.width, self.config.height);
    }

    /// Take the frame submitted by the last `finish_frame`, to draw an
    /// overlay into it before presenting. Untaken frames are presented by
    /// the next `finish_frame`.
    pub fn take_frame(&mut self) -> Option<wgpu::SurfaceTexture> {
        self.frame.take()
    }

    fn next_handle(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn create_pipeline(
        &self,
        label: &str,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        layout: &ProgramLayout,
        depth_test: bool,
        srgb: bool,
    ) -> wgpu::RenderPipeline {
        let format = if srgb {
            self.srgb_format
        } else {
            self.config.format
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: layout.vertex.entry_point(),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: layout.fragment.entry_point(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                // The pass always has a depth attachment; a disabled test
                // neither rejects nor writes fragments.
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_test,
                    depth_compare: if depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
    }

    fn upload_uniforms(&mut self) {
        if self.uniform_data.is_empty() {
            return;
        }

        let needed = self.uniform_data.len() as u64;
        if needed > self.uniform_buffer.size() {
            let capacity = needed.next_power_of_two();
            let (buffer, bind_group) =
                create_uniform_buffer(&self.device, &self.uniform_layout, capacity);
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            log::debug!("Grew uniform buffer to {} bytes", capacity);
        }

        self.queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_data);
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_uniform_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    size: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Uniform Blocks"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Uniform Block Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
            }),
        }],
    });

    (buffer, bind_group)
}

impl Gpu for WgpuGpu {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        let layout = link(vertex, fragment)?;
        let label = layout.label();

        // Shader and pipeline validation errors surface here, the way a GL
        // link step would report them.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(layout.vertex.name),
            source: wgpu::ShaderSource::Wgsl(layout.vertex.source.into()),
        });
        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(layout.fragment.name),
            source: wgpu::ShaderSource::Wgsl(layout.fragment.source.into()),
        });

        let mut pipelines = Vec::with_capacity(4);
        for depth_test in [false, true] {
            for srgb in [false, true] {
                let pipeline = self.create_pipeline(
                    &label,
                    &vertex_module,
                    &fragment_module,
                    &layout,
                    depth_test,
                    srgb,
                );
                pipelines.push((depth_test, srgb, pipeline));
            }
        }

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("Program '{}' failed to compile", label);
            return Err(RenderError::Compile {
                program: label,
                diagnostic: error.to_string(),
            });
        }

        let program = ProgramId(self.next_handle());
        for (depth_test, srgb, pipeline) in pipelines {
            let key = PipelineKey {
                program,
                depth_test,
                srgb,
            };
            self.pipelines.insert(key, pipeline);
        }
        self.programs.insert(
            program,
            GpuProgram {
                uniforms: ProgramUniforms::new(&layout),
                label,
            },
        );

        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(removed) = self.programs.remove(&program) {
            log::debug!("Deleted program '{}'", removed.label);
        }
        self.pipelines.retain(|key, _| key.program != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, RenderError> {
        if vertices.is_empty() {
            return Err(RenderError::Upload("vertex data is empty".to_string()));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Upload(error.to_string()));
        }

        let id = BufferId(self.next_handle());
        self.buffers.insert(
            id,
            GpuBuffer {
                buffer,
                vertex_count: vertices.len() as u32,
            },
        );
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(removed) = self.buffers.remove(&buffer) {
            removed.buffer.destroy();
        }
    }

    fn create_vertex_array(&mut self, buffer: BufferId) -> Result<VertexArrayId, RenderError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(RenderError::UnknownBuffer(buffer));
        }
        let id = VertexArrayId(self.next_handle());
        self.vertex_arrays.insert(id, buffer);
        Ok(id)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn is_program(&self, program: ProgramId) -> bool {
        self.programs.contains_key(&program)
    }

    fn is_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn is_vertex_array(&self, vertex_array: VertexArrayId) -> bool {
        self.vertex_arrays.contains_key(&vertex_array)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let index = self.programs.get(&program)?.uniforms.find(name)?;
        Some(UniformLocation { program, index })
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        let Some(location) = location else {
            return;
        };
        if self.current_program != Some(location.program) {
            log::warn!("Uniform set on {:?}, which is not in use", location.program);
            return;
        }
        if let Some(program) = self.programs.get_mut(&location.program) {
            program.uniforms.set(location.index, value);
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn enable(&mut self, capability: Capability) {
        match capability {
            Capability::DepthTest => self.depth_test = true,
            Capability::FramebufferSrgb => self.srgb = true,
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        let (Some(program_id), Some(vertex_array)) = (self.current_program, self.bound_vertex_array)
        else {
            log::warn!("Draw without a program and vertex array bound");
            return;
        };
        let (Some(program), Some(&buffer)) = (
            self.programs.get(&program_id),
            self.vertex_arrays.get(&vertex_array),
        ) else {
            return;
        };
        let available = self.buffers.get(&buffer).map_or(0, |b| b.vertex_count);
        if first.saturating_add(count) > available {
            log::warn!(
                "Draw of {} vertices from {} exceeds buffer of {}",
                count,
                first,
                available
            );
            return;
        }

        // Snapshot both uniform blocks for this draw.
        let slot = UNIFORM_BLOCK_SIZE as usize;
        let vertex_offset = self.uniform_data.len();
        let fragment_offset = vertex_offset + slot;
        self.uniform_data.resize(fragment_offset + slot, 0);
        program.uniforms.write_block(
            UniformBlock::Vertex,
            &mut self.uniform_data[vertex_offset..fragment_offset],
        );
        program.uniforms.write_block(
            UniformBlock::Fragment,
            &mut self.uniform_data[fragment_offset..],
        );

        self.draws.push(DrawCommand {
            key: PipelineKey {
                program: program_id,
                depth_test: self.depth_test,
                srgb: self.srgb,
            },
            buffer,
            first,
            count,
            vertex_offset: vertex_offset as u32,
            fragment_offset: fragment_offset as u32,
        });
    }

    fn finish_frame(&mut self) -> Result<(), RenderError> {
        if let Some(previous) = self.frame.take() {
            previous.present();
        }

        let draws = std::mem::take(&mut self.draws);
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                self.uniform_data.clear();
                return Err(e.into());
            }
        };

        let view_format = if self.srgb {
            self.srgb_format
        } else {
            self.config.format
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(view_format),
            ..Default::default()
        });

        self.upload_uniforms();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let [r, g, b, a] = self.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &draws {
                let (Some(pipeline), Some(buffer)) =
                    (self.pipelines.get(&draw.key), self.buffers.get(&draw.buffer))
                else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.vertex_offset]);
                render_pass.set_bind_group(1, &self.uniform_bind_group, &[draw.fragment_offset]);
                render_pass.set_vertex_buffer(0, buffer.buffer.slice(..));
                render_pass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.uniform_data.clear();
        self.frame = Some(frame);
        Ok(())
    }
}
