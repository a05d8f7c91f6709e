//! GPU seam between the batching renderer and a concrete graphics API.

use crate::error::{RenderError, Result};
use crate::{CompletedBatch, Rect, ShaderId, TextureId, WidgetInstance};

/// Shader programs the renderer requests at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// SDF rect/circle/segment evaluation
    Shape,
    /// Atlas coverage for text
    Glyph,
    /// Textured quads (images, shadow 9-patches)
    Image,
    /// Instanced widget path
    WidgetInstance,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [
        ShaderKind::Shape,
        ShaderKind::Glyph,
        ShaderKind::Image,
        ShaderKind::WidgetInstance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ShaderKind::Shape => "shape",
            ShaderKind::Glyph => "glyph",
            ShaderKind::Image => "image",
            ShaderKind::WidgetInstance => "widget_instance",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    /// Single-channel coverage (glyph atlases, shadow masks)
    R8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::R8 => 1,
        }
    }
}

/// Parameters for [`RenderBackend::create_texture`]
#[derive(Clone, Debug)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Tightly packed pixel rows
    pub data: &'a [u8],
}

impl TextureDescriptor<'_> {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidTextureSize {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize * self.format.bytes_per_pixel();
        if self.data.len() != expected {
            return Err(RenderError::TextureCreation {
                width: self.width,
                height: self.height,
                reason: format!("expected {expected} bytes, got {}", self.data.len()),
            });
        }
        Ok(())
    }
}

/// Per-frame parameters passed to [`RenderBackend::begin_frame`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    pub viewport: [u32; 2],
    /// When false, only regions drawn this frame changed and the backend
    /// must preserve the previous contents everywhere else.
    pub full_redraw: bool,
}

/// Final damage of a frame, passed to [`RenderBackend::end_frame`].
///
/// Unlike [`FrameInfo::full_redraw`], which is fixed when the frame begins,
/// this includes regions drawn during the frame. `full_redraw` is also set
/// when the dirty rect tracker overflowed, in which case `bounds` is `None`
/// and the whole surface counts as damaged.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameDamage {
    pub full_redraw: bool,
    /// Union of the dirty rects; `None` when clean or in full-redraw mode
    pub bounds: Option<Rect>,
}

impl FrameDamage {
    pub fn is_empty(&self) -> bool {
        !self.full_redraw && self.bounds.is_none()
    }
}

/// Graphics API driven by the [`crate::Renderer`].
///
/// Calls arrive in frame order: `begin_frame`, any number of draws, `end_frame`,
/// then `present`. Batches are handed over already sorted.
pub trait RenderBackend {
    fn begin_frame(&mut self, frame: &FrameInfo);

    /// Compile a shader program. Failures are non-fatal.
    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderId>;

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn draw_batch(&mut self, batch: &CompletedBatch);

    fn draw_instances(&mut self, shader: ShaderId, instances: &[WidgetInstance]);

    /// Submit the frame. Drawing outside `damage` must not change what was
    /// already on screen.
    fn end_frame(&mut self, damage: &FrameDamage);

    fn present(&mut self);

    /// Surface resize notification
    fn resize(&mut self, _size: [u32; 2]) {}
}

/// A draw recorded by [`HeadlessBackend`]
#[derive(Debug, Clone)]
pub enum RecordedDraw {
    Batch(CompletedBatch),
    Instances {
        shader: ShaderId,
        instances: Vec<WidgetInstance>,
    },
}

/// Backend that records draws instead of issuing them.
///
/// Used by tests and by the demo when no adapter is available.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub viewport: [u32; 2],
    pub last_frame: Option<FrameInfo>,
    pub frames_begun: u32,
    pub frames_presented: u32,
    /// Draws issued since the last `begin_frame`
    pub draws: Vec<RecordedDraw>,
    pub live_textures: Vec<TextureId>,
    /// Damage passed to the most recent `end_frame`
    pub last_damage: Option<FrameDamage>,
    pub fail_shader: Option<ShaderKind>,
    pub fail_textures: bool,
    next_shader: u32,
    next_texture: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make compilation of `kind` fail
    pub fn with_failing_shader(mut self, kind: ShaderKind) -> Self {
        self.fail_shader = Some(kind);
        self
    }

    pub fn with_failing_textures(mut self) -> Self {
        self.fail_textures = true;
        self
    }

    pub fn batches(&self) -> impl Iterator<Item = &CompletedBatch> {
        self.draws.iter().filter_map(|d| match d {
            RecordedDraw::Batch(b) => Some(b),
            RecordedDraw::Instances { .. } => None,
        })
    }

    pub fn instanced_draws(&self) -> impl Iterator<Item = &[WidgetInstance]> {
        self.draws.iter().filter_map(|d| match d {
            RecordedDraw::Instances { instances, .. } => Some(instances.as_slice()),
            RecordedDraw::Batch(_) => None,
        })
    }
}

impl RenderBackend for HeadlessBackend {
    fn begin_frame(&mut self, frame: &FrameInfo) {
        self.viewport = frame.viewport;
        self.last_frame = Some(*frame);
        self.frames_begun += 1;
        self.draws.clear();
    }

    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderId> {
        if self.fail_shader == Some(kind) {
            return Err(RenderError::ShaderCompilation {
                shader: kind.name().to_string(),
                log: "forced failure".to_string(),
            });
        }
        self.next_shader += 1;
        Ok(ShaderId(self.next_shader))
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<TextureId> {
        desc.validate()?;
        if self.fail_textures {
            return Err(RenderError::TextureCreation {
                width: desc.width,
                height: desc.height,
                reason: "forced failure".to_string(),
            });
        }
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.live_textures.push(id);
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.live_textures.retain(|t| *t != texture);
    }

    fn draw_batch(&mut self, batch: &CompletedBatch) {
        self.draws.push(RecordedDraw::Batch(batch.clone()));
    }

    fn draw_instances(&mut self, shader: ShaderId, instances: &[WidgetInstance]) {
        self.draws.push(RecordedDraw::Instances {
            shader,
            instances: instances.to_vec(),
        });
    }

    fn end_frame(&mut self, damage: &FrameDamage) {
        self.last_damage = Some(*damage);
    }

    fn present(&mut self) {
        self.frames_presented += 1;
    }

    fn resize(&mut self, size: [u32; 2]) {
        self.viewport = size;
    }
}
