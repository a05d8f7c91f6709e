//! # canvas-ui-wgpu
//!
//! WGPU rendering backend for canvas-ui.
//!
//! [`WgpuBackend`] implements [`canvas_ui::RenderBackend`]. Every quad record
//! is one instance of a shared unit quad; batches arrive already sorted and
//! are drawn in that order into a persistent canvas texture, which is then
//! copied to the swapchain. With partial redraw enabled the canvas keeps the
//! previous frame, so only regions drawn this frame change.
//!
//! [`WinitInputAdapter`] converts winit window events into
//! [`canvas_ui::InputEvent`]s.

mod input;
mod vertex;

pub use input::*;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use canvas_ui::{
    BlendMode, Color, CompletedBatch, FrameDamage, FrameInfo, QuadVertex, RenderBackend, RenderError,
    RenderResult, ShaderId, ShaderKind, TextureDescriptor, TextureFormat, TextureId,
    WidgetInstance, QUAD_INDICES,
};
use canvas_ui_macros::Settings;
use winit::window::Window;

const INITIAL_VERTEX_CAPACITY: usize = 1024;
const INITIAL_INSTANCE_CAPACITY: usize = 256;

/// Surface and canvas options
#[derive(Clone, Debug, PartialEq, Settings)]
pub struct WgpuBackendConfig {
    /// Canvas clear color for full redraws
    pub clear_color: Color,
    pub present_mode: wgpu::PresentMode,
    /// Keep the previous frame between frames that are not full redraws
    pub partial_redraw: bool,
    #[settings(range(min = 1, max = 3))]
    pub max_frame_latency: u32,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::srgba(30, 30, 46, 255),
            present_mode: wgpu::PresentMode::AutoVsync,
            partial_redraw: true,
            max_frame_latency: 2,
        }
    }
}

/// A compiled shader program; its [`ShaderId`] is its index plus one
struct CompiledShader {
    kind: ShaderKind,
    module: wgpu::ShaderModule,
}

struct GpuTexture {
    // Kept alive for the bind group
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Offscreen target that persists between frames
struct CanvasTarget {
    size: [u32; 2],
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    /// Contents are undefined until the first clear
    fresh: bool,
}

#[derive(Clone, Debug)]
enum DrawCommand {
    Batch {
        shader: ShaderId,
        texture: TextureId,
        blend: BlendMode,
        range: Range<u32>,
    },
    Instances {
        shader: ShaderId,
        range: Range<u32>,
    },
}

impl DrawCommand {
    fn pipeline_key(&self) -> (ShaderId, BlendMode) {
        match self {
            DrawCommand::Batch { shader, blend, .. } => (*shader, *blend),
            DrawCommand::Instances { shader, .. } => (*shader, BlendMode::Alpha),
        }
    }
}

/// Draws recorded between `begin_frame` and `end_frame`
#[derive(Default)]
struct FrameRecording {
    info: FrameInfo,
    vertices: Vec<QuadVertex>,
    instances: Vec<WidgetInstance>,
    draws: Vec<DrawCommand>,
}

impl FrameRecording {
    fn reset(&mut self, info: FrameInfo) {
        self.info = info;
        self.vertices.clear();
        self.instances.clear();
        self.draws.clear();
    }
}

/// WGPU implementation of [`RenderBackend`]
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    options: WgpuBackendConfig,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    globals_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    quad_layout: wgpu::PipelineLayout,
    instance_layout: wgpu::PipelineLayout,
    shaders: Vec<CompiledShader>,
    pipelines: HashMap<(ShaderId, BlendMode), wgpu::RenderPipeline>,
    blit_pipeline: wgpu::RenderPipeline,

    /// Index is the [`TextureId`]; slot 0 is the built-in white texture
    textures: Vec<Option<GpuTexture>>,

    unit_quad_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,

    canvas: Option<CanvasTarget>,
    frame: FrameRecording,
    pending: Option<wgpu::SurfaceTexture>,
}

impl WgpuBackend {
    /// Create a backend rendering into `window`
    pub async fn new(window: Arc<Window>, options: WgpuBackendConfig) -> RenderResult<Self> {
        let options = options.sanitized();
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Initialization(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Canvas UI Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::Initialization(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(first_format) = surface_caps.formats.first().copied() else {
            return Err(RenderError::Surface("surface reports no formats".to_string()));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(first_format);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: options.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: options.max_frame_latency,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "wgpu backend on {:?} ({:?}), surface {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format
        );

        Ok(Self::with_device(surface, device, queue, surface_config, options))
    }

    fn with_device(
        surface: wgpu::Surface<'static>,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_config: wgpu::SurfaceConfiguration,
        options: WgpuBackendConfig,
    ) -> Self {
        // Globals: screen size and output encoding
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas UI Globals Buffer"),
            size: std::mem::size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas UI Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas UI Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas UI Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas UI Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let quad_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas UI Quad Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &texture_layout],
            immediate_size: 0,
        });

        let instance_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas UI Instance Pipeline Layout"),
            bind_group_layouts: &[&globals_layout],
            immediate_size: 0,
        });

        let blit_pipeline = create_blit_pipeline(&device, &texture_layout, surface_config.format);

        let unit_quad_buffer = create_init_buffer(
            &device,
            "Canvas UI Unit Quad Buffer",
            bytemuck::cast_slice(&vertex::UNIT_QUAD),
            wgpu::BufferUsages::VERTEX,
        );
        let quad_index_buffer = create_init_buffer(
            &device,
            "Canvas UI Quad Index Buffer",
            bytemuck::cast_slice(&QUAD_INDICES),
            wgpu::BufferUsages::INDEX,
        );

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas UI Vertex Buffer"),
            size: (INITIAL_VERTEX_CAPACITY * QuadVertex::SIZE) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas UI Instance Buffer"),
            size: (INITIAL_INSTANCE_CAPACITY * WidgetInstance::SIZE) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut backend = Self {
            surface,
            device,
            queue,
            surface_config,
            options,
            globals_buffer,
            globals_bind_group,
            globals_layout,
            texture_layout,
            sampler,
            quad_layout,
            instance_layout,
            shaders: Vec::new(),
            pipelines: HashMap::new(),
            blit_pipeline,
            textures: Vec::new(),
            unit_quad_buffer,
            quad_index_buffer,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            canvas: None,
            frame: FrameRecording::default(),
            pending: None,
        };

        let white = backend.upload_texture(&TextureDescriptor {
            label: "Canvas UI White Texture",
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            data: &[255, 255, 255, 255],
        });
        backend.textures.push(Some(white));
        backend
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn options(&self) -> &WgpuBackendConfig {
        &self.options
    }

    // ========== Resources ==========

    fn upload_texture(&self, desc: &TextureDescriptor<'_>) -> GpuTexture {
        let format = match desc.format {
            // Pixel bytes are sRGB encoded; the shader decodes after sampling
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
        };
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            desc.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel() as u32),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.texture_bind_group(desc.label, &view);
        GpuTexture {
            _texture: texture,
            bind_group,
        }
    }

    fn texture_bind_group(&self, label: &str, view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn ensure_canvas(&mut self) {
        let size = [self.surface_config.width, self.surface_config.height];
        if self.canvas.as_ref().is_some_and(|c| c.size == size) {
            return;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas UI Canvas Texture"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.surface_config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.texture_bind_group("Canvas UI Canvas Bind Group", &view);
        log::debug!("canvas texture {}x{}", size[0], size[1]);
        self.canvas = Some(CanvasTarget {
            size,
            view,
            bind_group,
            fresh: true,
        });
    }

    fn ensure_pipeline(&mut self, key: (ShaderId, BlendMode)) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }
        let (shader_id, blend) = key;
        let Some(shader) = shader_id
            .0
            .checked_sub(1)
            .and_then(|index| self.shaders.get(index as usize))
        else {
            log::warn!("draw with unknown shader {shader_id:?} skipped");
            return false;
        };

        let (layout, instance_desc, fragment) = match shader.kind {
            ShaderKind::Shape => (&self.quad_layout, vertex::quad_vertex_desc(), "fs_shape"),
            ShaderKind::Glyph => (&self.quad_layout, vertex::quad_vertex_desc(), "fs_glyph"),
            ShaderKind::Image => (&self.quad_layout, vertex::quad_vertex_desc(), "fs_image"),
            ShaderKind::WidgetInstance => {
                (&self.instance_layout, vertex::widget_instance_desc(), "fs_main")
            }
        };

        let label = format!("Canvas UI {} Pipeline ({blend:?})", shader.kind.name());
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &shader.module,
                entry_point: Some("vs_main"),
                buffers: &[vertex::unit_quad_desc(), instance_desc],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader.module,
                entry_point: Some(fragment),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_config.format,
                    blend: Some(blend_state(blend)),
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
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        log::debug!("created pipeline {label}");
        self.pipelines.insert(key, pipeline);
        true
    }

    fn upload_frame(&mut self) {
        let vertices = &self.frame.vertices;
        if vertices.len() > self.vertex_capacity {
            self.vertex_capacity = (vertices.len() * 2).next_power_of_two();
            self.vertex_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Canvas UI Vertex Buffer"),
                size: (self.vertex_capacity * QuadVertex::SIZE) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }

        let instances = &self.frame.instances;
        if instances.len() > self.instance_capacity {
            self.instance_capacity = (instances.len() * 2).next_power_of_two();
            self.instance_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Canvas UI Instance Buffer"),
                size: (self.instance_capacity * WidgetInstance::SIZE) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }

        let encode_srgb = if self.surface_config.format.is_srgb() {
            0.0
        } else {
            1.0
        };
        let globals = [
            self.surface_config.width as f32,
            self.surface_config.height as f32,
            encode_srgb,
            0.0,
        ];
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&globals));
    }

    fn clear_color(&self) -> wgpu::Color {
        let c = self.options.clear_color;
        let channel = |v: f32| {
            if self.surface_config.format.is_srgb() {
                v as f64
            } else {
                linear_to_srgb(v) as f64
            }
        };
        wgpu::Color {
            r: channel(c.r),
            g: channel(c.g),
            b: channel(c.b),
            a: c.a as f64,
        }
    }

    fn acquire(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                None
            }
            Err(err) => {
                log::warn!("failed to acquire surface texture: {err}");
                None
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_frame(&mut self, frame: &FrameInfo) {
        if let Some(stale) = self.pending.take() {
            log::warn!("frame {} began before the previous one was presented", frame.number);
            drop(stale);
        }
        self.frame.reset(*frame);
    }

    fn create_shader(&mut self, kind: ShaderKind) -> RenderResult<ShaderId> {
        let source = match kind {
            ShaderKind::Shape | ShaderKind::Glyph | ShaderKind::Image => {
                include_str!("shaders/quad.wgsl")
            }
            ShaderKind::WidgetInstance => include_str!("shaders/widget_instance.wgsl"),
        };
        let label = format!("Canvas UI {} Shader", kind.name());
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(RenderError::ShaderCompilation {
                shader: kind.name().to_string(),
                log: errors.join("\n"),
            });
        }

        self.shaders.push(CompiledShader { kind, module });
        Ok(ShaderId(self.shaders.len() as u32))
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> RenderResult<TextureId> {
        desc.validate()?;
        let limit = self.device.limits().max_texture_dimension_2d;
        if desc.width > limit || desc.height > limit {
            return Err(RenderError::TextureCreation {
                width: desc.width,
                height: desc.height,
                reason: format!("exceeds device limit {limit}"),
            });
        }

        let texture = self.upload_texture(desc);
        // Reuse a freed slot; slot 0 stays the white texture
        let slot = self
            .textures
            .iter()
            .skip(1)
            .position(Option::is_none)
            .map(|i| i + 1);
        let index = match slot {
            Some(index) => {
                self.textures[index] = Some(texture);
                index
            }
            None => {
                self.textures.push(Some(texture));
                self.textures.len() - 1
            }
        };
        Ok(TextureId(index as u32))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if texture == TextureId::WHITE {
            return;
        }
        if let Some(slot) = self.textures.get_mut(texture.0 as usize) {
            *slot = None;
        }
    }

    fn draw_batch(&mut self, batch: &CompletedBatch) {
        if batch.vertices.is_empty() {
            return;
        }
        let start = self.frame.vertices.len() as u32;
        self.frame.vertices.extend_from_slice(&batch.vertices);
        let end = self.frame.vertices.len() as u32;
        self.frame.draws.push(DrawCommand::Batch {
            shader: batch.state.shader,
            texture: batch.state.texture,
            blend: batch.state.blend,
            range: start..end,
        });
    }

    fn draw_instances(&mut self, shader: ShaderId, instances: &[WidgetInstance]) {
        if instances.is_empty() {
            return;
        }
        let start = self.frame.instances.len() as u32;
        self.frame.instances.extend_from_slice(instances);
        let end = self.frame.instances.len() as u32;
        self.frame.draws.push(DrawCommand::Instances {
            shader,
            range: start..end,
        });
    }

    fn end_frame(&mut self, damage: &FrameDamage) {
        let Some(surface_texture) = self.acquire() else {
            return;
        };

        self.ensure_canvas();
        self.upload_frame();
        let keys: Vec<_> = self.frame.draws.iter().map(DrawCommand::pipeline_key).collect();
        for key in keys {
            self.ensure_pipeline(key);
        }

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        let clear = self.frame.info.full_redraw || !self.options.partial_redraw || canvas.fresh;
        canvas.fresh = false;
        let load = if clear {
            wgpu::LoadOp::Clear(self.clear_color())
        } else {
            wgpu::LoadOp::Load
        };
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };
        // Partial frames draw only inside the damage
        let scissor = if clear {
            None
        } else {
            damage_scissor(damage, canvas.size)
        };
        let skip_draws = matches!(scissor, Some([_, _, w, h]) if w == 0 || h == 0);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Canvas UI Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas UI Canvas Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &canvas.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            pass.set_vertex_buffer(0, self.unit_quad_buffer.slice(..));
            pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            if let Some([x, y, w, h]) = scissor.filter(|_| !skip_draws) {
                pass.set_scissor_rect(x, y, w, h);
            }
            let draws: &[DrawCommand] = if skip_draws { &[] } else { &self.frame.draws };

            let white = self.textures.first().and_then(Option::as_ref);
            for draw in draws {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline_key()) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                match draw {
                    DrawCommand::Batch { texture, range, .. } => {
                        let bound = self
                            .textures
                            .get(texture.0 as usize)
                            .and_then(Option::as_ref)
                            .or(white);
                        let Some(bound) = bound else {
                            continue;
                        };
                        pass.set_bind_group(1, &bound.bind_group, &[]);
                        pass.set_vertex_buffer(1, self.vertex_buffer.slice(..));
                        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, range.clone());
                    }
                    DrawCommand::Instances { range, .. } => {
                        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, range.clone());
                    }
                }
            }
        }

        let target = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas UI Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &canvas.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        log::trace!(
            "frame {}: {} draws, {} quads, {} instances{}",
            self.frame.info.number,
            self.frame.draws.len(),
            self.frame.vertices.len(),
            self.frame.instances.len(),
            if clear {
                " (cleared)"
            } else if damage.full_redraw {
                " (full damage)"
            } else {
                ""
            }
        );
        self.pending = Some(surface_texture);
    }

    fn present(&mut self) {
        if let Some(frame) = self.pending.take() {
            frame.present();
        }
    }

    fn resize(&mut self, size: [u32; 2]) {
        if size[0] == 0 || size[1] == 0 {
            return;
        }
        self.surface_config.width = size[0];
        self.surface_config.height = size[1];
        self.surface.configure(&self.device, &self.surface_config);
        self.canvas = None;
    }
}

/// Scissor `[x, y, width, height]` covering a partial frame's damage, clamped
/// to the canvas. `None` when the whole canvas is damaged or nothing is.
fn damage_scissor(damage: &FrameDamage, size: [u32; 2]) -> Option<[u32; 4]> {
    if damage.full_redraw {
        return None;
    }
    let bounds = damage.bounds?;
    let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);
    let x0 = clamp(bounds.min[0].floor(), size[0]);
    let y0 = clamp(bounds.min[1].floor(), size[1]);
    let x1 = clamp(bounds.max[0].ceil(), size[0]).max(x0);
    let y1 = clamp(bounds.max[1].ceil(), size[1]).max(y0);
    Some([x0, y0, x1 - x0, y1 - y0])
}

fn blend_state(blend: BlendMode) -> wgpu::BlendState {
    match blend {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Premultiplied => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
        BlendMode::Multiply => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Dst,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        },
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn create_init_buffer(
    device: &wgpu::Device,
    label: &str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: contents.len() as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: true,
    });
    buffer
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(contents);
    buffer.unmap();
    buffer
}

fn create_blit_pipeline(
    device: &wgpu::Device,
    texture_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Canvas UI Blit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Canvas UI Blit Pipeline Layout"),
        bind_group_layouts: &[texture_layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Canvas UI Blit Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
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
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
