//! Batch records and sort keys
//!
//! Every primitive is submitted as one [`QuadVertex`]. The shader expands each
//! record into two triangles using [`QUAD_INDICES`], so vertex caps and batch
//! sizes count primitives rather than corners.

use crate::Rect;

/// Index pattern expanding one quad record into two triangles
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Clip rectangle used when no clip is active
pub const NO_CLIP: [f32; 4] = [-1.0e7, -1.0e7, 1.0e7, 1.0e7];

/// Shape evaluated by the fragment shader for a quad record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShapeKind {
    /// Rounded rectangle SDF (corner radius 0 = sharp)
    Rect = 0,
    /// Circle SDF; a transparent fill with a stroke yields a ring
    Circle = 1,
    /// Capsule between `params[0..2]` and `params[2..4]`
    Segment = 2,
    /// Coverage sampled from a glyph atlas, tinted by fill
    Glyph = 3,
    /// Texture sampled at `uv`, modulated by fill
    Image = 4,
}

/// Per-primitive record uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct QuadVertex {
    /// Center position in screen-space pixels (transform applied)
    pub center: [f32; 2],
    /// Half-size (width/2, height/2) in pixels
    pub half_size: [f32; 2],
    /// Rotation in radians
    pub rotation: f32,
    /// [`ShapeKind`] discriminant
    pub shape: u32,
    /// Fill color (RGBA, 0-255, opacity applied)
    pub fill: [u8; 4],
    /// Stroke color (RGBA, 0-255, opacity applied)
    pub stroke: [u8; 4],
    /// Stroke width in pixels (0 = no stroke)
    pub stroke_width: f32,
    pub corner_radius: f32,
    /// Shape-specific parameters (segment endpoints)
    pub params: [f32; 4],
    /// Texture coordinates `[u0, v0, u1, v1]`
    pub uv: [f32; 4],
    /// Screen-space clip `[min_x, min_y, max_x, max_y]`
    pub clip: [f32; 4],
}

impl QuadVertex {
    pub const SIZE: usize = std::mem::size_of::<QuadVertex>();

    pub fn shape_kind(&self) -> ShapeKind {
        match self.shape {
            1 => ShapeKind::Circle,
            2 => ShapeKind::Segment,
            3 => ShapeKind::Glyph,
            4 => ShapeKind::Image,
            _ => ShapeKind::Rect,
        }
    }

    /// Axis-aligned bounds ignoring rotation and stroke
    pub fn bounds(&self) -> Rect {
        Rect::new(
            [
                self.center[0] - self.half_size[0],
                self.center[1] - self.half_size[1],
            ],
            [
                self.center[0] + self.half_size[0],
                self.center[1] + self.half_size[1],
            ],
        )
    }
}

impl Default for QuadVertex {
    fn default() -> Self {
        Self {
            center: [0.0; 2],
            half_size: [0.0; 2],
            rotation: 0.0,
            shape: ShapeKind::Rect as u32,
            fill: [0; 4],
            stroke: [0; 4],
            stroke_width: 0.0,
            corner_radius: 0.0,
            params: [0.0; 4],
            uv: [0.0, 0.0, 1.0, 1.0],
            clip: NO_CLIP,
        }
    }
}

/// Draw layer, coarsest component of the sort key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Layer {
    Background = 0,
    #[default]
    Content = 1,
    Overlay = 2,
    Modal = 3,
}

/// Color blending applied by the pipeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum BlendMode {
    #[default]
    Alpha = 0,
    Premultiplied = 1,
    Additive = 2,
    Multiply = 3,
    Opaque = 4,
}

impl BlendMode {
    pub const ALL: [BlendMode; 5] = [
        BlendMode::Alpha,
        BlendMode::Premultiplied,
        BlendMode::Additive,
        BlendMode::Multiply,
        BlendMode::Opaque,
    ];
}

/// Handle to a compiled shader program; 0 is the invalid program
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

impl ShaderId {
    pub const INVALID: ShaderId = ShaderId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Handle to a backend texture; 0 is the built-in white texture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const WHITE: TextureId = TextureId(0);
}

/// Packed 64-bit ordering key: `layer(8) | shader(16) | texture(24) | blend(16)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey(pub u64);

impl SortKey {
    pub fn new(layer: Layer, shader: ShaderId, texture: TextureId, blend: BlendMode) -> Self {
        let layer = (layer as u64) & 0xFF;
        let shader = (shader.0 as u64) & 0xFFFF;
        let texture = (texture.0 as u64) & 0xFF_FFFF;
        let blend = (blend as u64) & 0xFFFF;
        SortKey(layer << 56 | shader << 40 | texture << 16 | blend)
    }

    pub fn layer(&self) -> u8 {
        (self.0 >> 56) as u8
    }
}

/// GPU state shared by every record in a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchState {
    pub layer: Layer,
    pub shader: ShaderId,
    pub texture: TextureId,
    pub blend: BlendMode,
}

impl BatchState {
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.layer, self.shader, self.texture, self.blend)
    }
}

/// The batch currently accepting primitives
#[derive(Debug)]
pub struct RenderBatch {
    pub state: BatchState,
    pub vertices: Vec<QuadVertex>,
}

impl RenderBatch {
    pub fn new(state: BatchState) -> Self {
        Self {
            state,
            vertices: Vec::new(),
        }
    }

    /// Whether a primitive with `state` can join without exceeding `cap`
    pub fn accepts(&self, state: &BatchState, cap: usize) -> bool {
        self.state == *state && self.vertices.len() < cap
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub(crate) fn complete(self, sequence: u32) -> CompletedBatch {
        CompletedBatch {
            sort_key: self.state.sort_key(),
            state: self.state,
            vertices: self.vertices,
            sequence,
        }
    }
}

/// An immutable batch waiting for the sorted flush
#[derive(Debug, Clone)]
pub struct CompletedBatch {
    pub sort_key: SortKey,
    pub state: BatchState,
    pub vertices: Vec<QuadVertex>,
    /// Submission order within the frame
    pub sequence: u32,
}

impl CompletedBatch {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Indices issued once the shader expands each record
    pub fn index_count(&self) -> usize {
        self.vertices.len() * QUAD_INDICES.len()
    }
}
