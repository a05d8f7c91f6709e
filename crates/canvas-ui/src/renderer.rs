use canvas_ui_macros::Settings;
use glam::{Affine2, Vec2};

use crate::backend::{FrameDamage, FrameInfo, RenderBackend, ShaderKind, TextureDescriptor};
use crate::batch::{
    BatchState, BlendMode, CompletedBatch, Layer, QuadVertex, RenderBatch, ShaderId, ShapeKind,
    TextureId, NO_CLIP,
};
use crate::dirty::DirtyRectTracker;
use crate::instance::WidgetInstance;
use crate::occlusion::OcclusionTracker;
use crate::shadow::{ShadowCache, ShadowKey};
use crate::state_stack::{RenderState, StateStack};
use crate::text::{FontMetrics, TextStyle};
use crate::{Color, Point, Rect};

/// Renderer limits and feature switches
#[derive(Clone, Debug, PartialEq, Settings)]
pub struct RendererConfig {
    /// Quad records per batch before a forced flush
    #[settings(range(min = 1, max = 1_000_000))]
    pub max_batch_vertices: usize,
    /// Widget instances per instanced draw
    #[settings(range(min = 1, max = 1_000_000))]
    pub max_instances: usize,
    /// Tracked dirty rects before falling back to full redraw
    #[settings(range(min = 1, max = 64))]
    pub max_dirty_rects: usize,
    /// Expansion applied when testing whether dirty rects merge
    #[settings(range(min = 0.0, max = 256.0))]
    pub dirty_merge_distance: f32,
    /// Cached shadow 9-patches kept alive
    #[settings(range(min = 1, max = 4096))]
    pub shadow_cache_capacity: usize,
    pub occlusion_culling: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_batch_vertices: 10_000,
            max_instances: 10_000,
            max_dirty_rects: crate::dirty::DEFAULT_MAX_DIRTY_RECTS,
            dirty_merge_distance: crate::dirty::DEFAULT_MERGE_DISTANCE,
            shadow_cache_capacity: 64,
            occlusion_culling: true,
        }
    }
}

/// Counters for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub batches: usize,
    pub draw_calls: usize,
    pub vertices: usize,
    pub indices: usize,
    pub instances: usize,
    pub instanced_draws: usize,
    pub culled_widgets: usize,
    /// Primitives dropped because their shader is unusable
    pub skipped_draws: usize,
    /// Primitives dropped because they lie outside the active clip
    pub clipped: usize,
}

/// A compiled (or failed) shader program
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    pub kind: ShaderKind,
    pub id: ShaderId,
    /// Human-readable failure log, if compilation failed
    pub log: Option<String>,
}

impl ShaderProgram {
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

/// Batching renderer.
///
/// Primitives are appended to a current batch while their GPU state matches;
/// completed batches are sorted by [`crate::SortKey`] and handed to the
/// [`RenderBackend`] once per flush.
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    config: RendererConfig,
    shaders: Vec<ShaderProgram>,

    state: RenderState,
    layers: StateStack<Layer>,
    blends: StateStack<BlendMode>,

    current: Option<RenderBatch>,
    completed: Vec<CompletedBatch>,
    flushed: Vec<CompletedBatch>,
    instances: Vec<WidgetInstance>,
    sequence: u32,

    dirty: DirtyRectTracker,
    occlusion: OcclusionTracker,
    shadows: ShadowCache,
    font: Option<Box<dyn FontMetrics>>,

    stats: FrameStats,
    last_stats: FrameStats,
    frame: u64,
    viewport: [u32; 2],
    in_frame: bool,
}

impl Renderer {
    pub fn new(mut backend: Box<dyn RenderBackend>, config: RendererConfig) -> Self {
        let config = config.sanitized();

        let shaders = ShaderKind::ALL
            .iter()
            .map(|&kind| match backend.create_shader(kind) {
                Ok(id) => ShaderProgram {
                    kind,
                    id,
                    log: None,
                },
                Err(err) => {
                    log::warn!("shader '{}' unusable: {err}", kind.name());
                    ShaderProgram {
                        kind,
                        id: ShaderId::INVALID,
                        log: Some(err.to_string()),
                    }
                }
            })
            .collect();

        let mut occlusion = OcclusionTracker::new();
        occlusion.set_enabled(config.occlusion_culling);

        // Nothing has been drawn yet
        let mut dirty = DirtyRectTracker::new(config.max_dirty_rects, config.dirty_merge_distance);
        dirty.mark_full_redraw();

        Self {
            backend,
            shaders,
            state: RenderState::default(),
            layers: StateStack::new("layer", Layer::Content),
            blends: StateStack::new("blend", BlendMode::Alpha),
            current: None,
            completed: Vec::new(),
            flushed: Vec::new(),
            instances: Vec::new(),
            sequence: 0,
            dirty,
            occlusion,
            shadows: ShadowCache::new(config.shadow_cache_capacity),
            font: None,
            stats: FrameStats::default(),
            last_stats: FrameStats::default(),
            frame: 0,
            viewport: [0, 0],
            in_frame: false,
            config,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    pub fn resize(&mut self, size: [u32; 2]) {
        self.viewport = size;
        self.backend.resize(size);
        self.dirty.mark_full_redraw();
    }

    // ========== Shaders ==========

    pub fn shader(&self, kind: ShaderKind) -> &ShaderProgram {
        // ShaderKind::ALL order matches `shaders`
        let index = ShaderKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.shaders[index]
    }

    pub fn is_valid(&self, kind: ShaderKind) -> bool {
        self.shader(kind).is_valid()
    }

    /// Whether SDF shapes (rects, circles, lines) can be drawn
    pub fn has_sdf_support(&self) -> bool {
        self.is_valid(ShaderKind::Shape)
    }

    // ========== Frame lifecycle ==========

    pub fn begin_frame(&mut self, viewport: [u32; 2]) {
        if self.in_frame {
            log::warn!("begin_frame called twice without end_frame");
            self.end_frame();
        }
        self.frame += 1;
        self.viewport = viewport;
        self.in_frame = true;
        self.stats = FrameStats::default();
        self.flushed.clear();
        self.sequence = 0;
        self.state.reset();
        self.layers.clear();
        self.blends.clear();
        self.occlusion.begin_frame();
        self.backend.begin_frame(&FrameInfo {
            number: self.frame,
            viewport,
            full_redraw: self.dirty.is_full_redraw(),
        });
    }

    /// Flush everything pending and close the frame
    pub fn end_frame(&mut self) -> FrameStats {
        self.render_sorted_batches();
        self.flush_instances();
        self.occlusion.end_frame();
        let damage = self.frame_damage();
        self.backend.end_frame(&damage);
        // Shadows used this frame are submitted now, so overflow can go
        self.shadows.trim(self.backend.as_mut());

        if !self.state.is_balanced() || self.layers.depth() > 0 || self.blends.depth() > 0 {
            log::warn!("render state stacks unbalanced at end of frame {}", self.frame);
        }

        self.stats.culled_widgets = self.occlusion.stats().culled;
        self.last_stats = self.stats;
        self.in_frame = false;

        log::trace!(
            "frame {}: {} batches, {} draw calls, {} vertices, {} instances, {} culled",
            self.frame,
            self.stats.batches,
            self.stats.draw_calls,
            self.stats.vertices,
            self.stats.instances,
            self.stats.culled_widgets
        );
        self.stats
    }

    pub fn present(&mut self) {
        self.backend.present();
        self.dirty.clear();
    }

    /// Damage accumulated so far; cleared by [`Renderer::present`]
    pub fn frame_damage(&self) -> FrameDamage {
        FrameDamage {
            full_redraw: self.dirty.is_full_redraw(),
            bounds: self.dirty.bounding_rect(),
        }
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    /// Counters accumulated so far in the current frame
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    // ========== State stacks ==========

    pub fn push_transform(&mut self, transform: Affine2) {
        self.state.push_transform(transform);
    }

    pub fn pop_transform(&mut self) {
        self.state.transform.pop();
    }

    pub fn push_clip(&mut self, rect: Rect) {
        self.state.push_clip(rect);
    }

    pub fn pop_clip(&mut self) {
        self.state.clip.pop();
    }

    pub fn push_opacity(&mut self, opacity: f32) {
        self.state.push_opacity(opacity);
    }

    pub fn pop_opacity(&mut self) {
        self.state.opacity.pop();
    }

    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn pop_layer(&mut self) {
        self.layers.pop();
    }

    pub fn push_blend_mode(&mut self, blend: BlendMode) {
        self.blends.push(blend);
    }

    pub fn pop_blend_mode(&mut self) {
        self.blends.pop();
    }

    pub fn with_transform<R>(&mut self, transform: Affine2, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_transform(transform);
        let result = f(self);
        self.pop_transform();
        result
    }

    pub fn with_clip<R>(&mut self, rect: Rect, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_clip(rect);
        let result = f(self);
        self.pop_clip();
        result
    }

    pub fn with_opacity<R>(&mut self, opacity: f32, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_opacity(opacity);
        let result = f(self);
        self.pop_opacity();
        result
    }

    pub fn with_layer<R>(&mut self, layer: Layer, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_layer(layer);
        let result = f(self);
        self.pop_layer();
        result
    }

    pub fn with_blend_mode<R>(&mut self, blend: BlendMode, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_blend_mode(blend);
        let result = f(self);
        self.pop_blend_mode();
        result
    }

    pub fn current_transform(&self) -> Affine2 {
        self.state.transform.top()
    }

    pub fn current_clip(&self) -> Option<Rect> {
        self.state.clip.top()
    }

    pub fn current_opacity(&self) -> f32 {
        self.state.opacity.top()
    }

    pub fn current_layer(&self) -> Layer {
        self.layers.top()
    }

    // ========== Primitives ==========

    pub fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.draw_rounded_rect(rect, 0.0, color, None);
    }

    /// Rounded rectangle with an optional inner border `(width, color)`
    pub fn draw_rounded_rect(
        &mut self,
        rect: Rect,
        corner_radius: f32,
        fill: Color,
        border: Option<(f32, Color)>,
    ) {
        let (stroke_width, stroke) = border.unwrap_or((0.0, Color::transparent()));
        let max_radius = rect.width().min(rect.height()) * 0.5;
        let center = rect.center();
        self.submit_shape(
            QuadVertex {
                center: [center.x, center.y],
                half_size: [rect.width() * 0.5, rect.height() * 0.5],
                shape: ShapeKind::Rect as u32,
                corner_radius: corner_radius.clamp(0.0, max_radius.max(0.0)),
                ..Default::default()
            },
            fill,
            stroke,
            stroke_width,
        );
    }

    pub fn draw_rect_outline(&mut self, rect: Rect, width: f32, color: Color) {
        self.draw_rounded_rect(rect, 0.0, Color::transparent(), Some((width, color)));
    }

    pub fn draw_circle(&mut self, center: Point, radius: f32, color: Color) {
        self.draw_circle_with_stroke(center, radius, color, None);
    }

    pub fn draw_circle_with_stroke(
        &mut self,
        center: Point,
        radius: f32,
        fill: Color,
        stroke: Option<(f32, Color)>,
    ) {
        let (stroke_width, stroke) = stroke.unwrap_or((0.0, Color::transparent()));
        self.submit_shape(
            QuadVertex {
                center: [center.x, center.y],
                half_size: [radius, radius],
                shape: ShapeKind::Circle as u32,
                corner_radius: radius,
                ..Default::default()
            },
            fill,
            stroke,
            stroke_width,
        );
    }

    /// Hollow circle; the ring lies inside `radius`
    pub fn draw_ring(&mut self, center: Point, radius: f32, thickness: f32, color: Color) {
        self.draw_circle_with_stroke(center, radius, Color::transparent(), Some((thickness, color)));
    }

    /// Line segment with round caps, batched with other shapes
    pub fn draw_line_batched(&mut self, from: Point, to: Point, width: f32, color: Color) {
        let half_width = width * 0.5;
        let min = [from.x.min(to.x) - half_width, from.y.min(to.y) - half_width];
        let max = [from.x.max(to.x) + half_width, from.y.max(to.y) + half_width];
        let bounds = Rect::new(min, max);
        let center = bounds.center();
        self.submit_shape(
            QuadVertex {
                center: [center.x, center.y],
                half_size: [bounds.width() * 0.5, bounds.height() * 0.5],
                shape: ShapeKind::Segment as u32,
                params: [from.x, from.y, to.x, to.y],
                corner_radius: half_width,
                ..Default::default()
            },
            color,
            Color::transparent(),
            0.0,
        );
    }

    /// Textured quad; `uv` is `[u0, v0, u1, v1]`
    pub fn draw_texture(&mut self, rect: Rect, texture: TextureId, uv: [f32; 4], tint: Color) {
        let center = rect.center();
        let vertex = QuadVertex {
            center: [center.x, center.y],
            half_size: [rect.width() * 0.5, rect.height() * 0.5],
            shape: ShapeKind::Image as u32,
            uv,
            ..Default::default()
        };
        self.submit(vertex, ShaderKind::Image, texture, tint, Color::transparent(), 0.0);
    }

    pub fn set_font_metrics(&mut self, metrics: Box<dyn FontMetrics>) {
        self.font = Some(metrics);
    }

    pub fn font_metrics(&self) -> Option<&dyn FontMetrics> {
        self.font.as_deref()
    }

    /// `[width, height]` of a single line, or `None` without a metrics provider
    pub fn measure_text(&self, text: &str, style: &TextStyle) -> Option<[f32; 2]> {
        self.font.as_ref().map(|font| font.measure(text, style))
    }

    /// Draw a single line with its top-left corner at `origin`.
    ///
    /// Returns the advance width, or `None` (drawing nothing) when no font
    /// metrics provider is installed.
    pub fn draw_text(
        &mut self,
        text: &str,
        origin: Point,
        style: &TextStyle,
        color: Color,
    ) -> Option<f32> {
        let font = self.font.as_ref()?;
        let layout = font.layout(text, style);
        let atlas = font.atlas();

        for glyph in &layout.glyphs {
            let rect = Rect::from_min_size(
                [origin.x + glyph.offset[0], origin.y + glyph.offset[1]],
                glyph.size,
            );
            let center = rect.center();
            let vertex = QuadVertex {
                center: [center.x, center.y],
                half_size: [rect.width() * 0.5, rect.height() * 0.5],
                shape: ShapeKind::Glyph as u32,
                uv: glyph.uv,
                ..Default::default()
            };
            self.submit(vertex, ShaderKind::Glyph, atlas, color, Color::transparent(), 0.0);
        }
        Some(layout.width)
    }

    /// Soft drop shadow behind `rect`, drawn from a cached 9-patch
    pub fn draw_shadow(&mut self, rect: Rect, blur: f32, spread: f32, offset: [f32; 2], color: Color) {
        if !self.is_valid(ShaderKind::Image) {
            self.stats.skipped_draws += 1;
            return;
        }
        let key = ShadowKey::new(blur, spread, color);
        let Some(patch) = self
            .shadows
            .get_or_create(self.backend.as_mut(), key, self.frame)
        else {
            return;
        };

        let outer = rect
            .translate(offset[0], offset[1])
            .expand(patch.falloff * 0.5 + spread.max(0.0).ceil());
        let border = (patch.border as f32)
            .min(outer.width() * 0.5)
            .min(outer.height() * 0.5);

        let texel = 1.0 / patch.size as f32;
        let uv_edge = patch.border as f32 * texel;
        let xs = [outer.min[0], outer.min[0] + border, outer.max[0] - border, outer.max[0]];
        let ys = [outer.min[1], outer.min[1] + border, outer.max[1] - border, outer.max[1]];
        let us = [0.0, uv_edge, 1.0 - uv_edge, 1.0];

        for row in 0..3 {
            for col in 0..3 {
                let cell = Rect::new([xs[col], ys[row]], [xs[col + 1], ys[row + 1]]);
                if cell.is_empty() {
                    continue;
                }
                self.draw_texture(
                    cell,
                    patch.texture,
                    [us[col], us[row], us[col + 1], us[row + 1]],
                    Color::WHITE,
                );
            }
        }
    }

    fn submit_shape(&mut self, vertex: QuadVertex, fill: Color, stroke: Color, stroke_width: f32) {
        self.submit(vertex, ShaderKind::Shape, TextureId::WHITE, fill, stroke, stroke_width);
    }

    /// Bake the state stacks into `vertex` and append it to the current batch
    fn submit(
        &mut self,
        mut vertex: QuadVertex,
        kind: ShaderKind,
        texture: TextureId,
        fill: Color,
        stroke: Color,
        stroke_width: f32,
    ) {
        let shader = self.shader(kind).id;
        if !shader.is_valid() {
            self.stats.skipped_draws += 1;
            return;
        }

        let opacity = self.state.opacity.top();
        vertex.fill = fill.multiply_alpha(opacity).to_rgba8();
        vertex.stroke = stroke.multiply_alpha(opacity).to_rgba8();
        vertex.stroke_width = stroke_width;

        let transform = self.state.transform.top();
        if transform != Affine2::IDENTITY {
            apply_transform(&mut vertex, &transform);
        }

        if let Some(clip) = self.state.clip.top() {
            let reach = Vec2::from(vertex.half_size).length() + vertex.stroke_width;
            let bounds = Rect::from_center_size(
                Point::new(vertex.center[0], vertex.center[1]),
                [reach * 2.0, reach * 2.0],
            );
            if clip.is_empty() || !clip.intersects(&bounds) {
                self.stats.clipped += 1;
                return;
            }
            vertex.clip = [clip.min[0], clip.min[1], clip.max[0], clip.max[1]];
        } else {
            vertex.clip = NO_CLIP;
        }

        let state = BatchState {
            layer: self.layers.top(),
            shader,
            texture,
            blend: self.blends.top(),
        };

        let cap = self.config.max_batch_vertices;
        let fits = self
            .current
            .as_ref()
            .is_some_and(|batch| batch.accepts(&state, cap));
        if !fits {
            self.flush_current_batch();
            self.current = Some(RenderBatch::new(state));
        }
        if let Some(batch) = self.current.as_mut() {
            batch.vertices.push(vertex);
        }
    }

    // ========== Batching ==========

    /// Move the current batch, if any, to the completed list
    pub fn flush_current_batch(&mut self) {
        if let Some(batch) = self.current.take() {
            if !batch.is_empty() {
                let sequence = self.sequence;
                self.sequence += 1;
                self.completed.push(batch.complete(sequence));
            }
        }
    }

    /// Batches completed but not yet issued
    pub fn completed_batches(&self) -> &[CompletedBatch] {
        &self.completed
    }

    /// Batches issued to the backend this frame, in draw order
    pub fn flushed_batches(&self) -> &[CompletedBatch] {
        &self.flushed
    }

    /// Sort pending batches by key and issue one draw call per batch.
    ///
    /// The sort is stable, so batches sharing a key keep submission order.
    pub fn render_sorted_batches(&mut self) {
        self.flush_current_batch();
        if self.completed.is_empty() {
            return;
        }

        let mut batches = std::mem::take(&mut self.completed);
        batches.sort_by_key(|batch| (batch.sort_key, batch.sequence));

        for batch in &batches {
            self.backend.draw_batch(batch);
            self.stats.batches += 1;
            self.stats.draw_calls += 1;
            self.stats.vertices += batch.vertex_count();
            self.stats.indices += batch.index_count();
        }
        self.flushed.extend(batches);
    }

    /// Alias of [`Renderer::render_sorted_batches`]
    pub fn flush_batches(&mut self) {
        self.render_sorted_batches();
    }

    // ========== Instancing ==========

    /// Queue an instance; transform and opacity are applied here
    pub fn add_widget_instance(&mut self, instance: WidgetInstance) {
        if !self.is_valid(ShaderKind::WidgetInstance) {
            self.stats.skipped_draws += 1;
            return;
        }
        if self.instances.len() >= self.config.max_instances {
            self.flush_instances();
        }

        let mut instance = instance.transformed(self.state.transform.top());
        let opacity = self.state.opacity.top();
        if opacity < 1.0 {
            instance.color[3] = (instance.color[3] as f32 * opacity).round() as u8;
            instance.border_color[3] = (instance.border_color[3] as f32 * opacity).round() as u8;
        }
        self.instances.push(instance);
    }

    pub fn pending_instances(&self) -> usize {
        self.instances.len()
    }

    /// Issue all queued instances as one instanced draw
    pub fn flush_instances(&mut self) {
        if self.instances.is_empty() {
            return;
        }
        let shader = self.shader(ShaderKind::WidgetInstance).id;
        self.backend.draw_instances(shader, &self.instances);
        self.stats.instances += self.instances.len();
        self.stats.instanced_draws += 1;
        self.stats.draw_calls += 1;
        self.instances.clear();
    }

    // ========== Textures ==========

    /// Create a texture, returning `None` (after logging) on failure
    pub fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Option<TextureId> {
        match self.backend.create_texture(desc) {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("texture '{}' creation failed: {err}", desc.label);
                None
            }
        }
    }

    pub fn destroy_texture(&mut self, texture: TextureId) {
        if texture != TextureId::WHITE {
            self.backend.destroy_texture(texture);
        }
    }

    pub fn shadow_cache(&self) -> &ShadowCache {
        &self.shadows
    }

    // ========== Dirty rects & occlusion ==========

    pub fn add_dirty_rect(&mut self, rect: Rect) {
        self.dirty.add_dirty_rect(rect);
    }

    pub fn mark_full_redraw(&mut self) {
        self.dirty.mark_full_redraw();
    }

    pub fn dirty_rects(&self) -> &DirtyRectTracker {
        &self.dirty
    }

    pub fn dirty_rects_mut(&mut self) -> &mut DirtyRectTracker {
        &mut self.dirty
    }

    pub fn occlusion(&self) -> &OcclusionTracker {
        &self.occlusion
    }

    pub fn occlusion_mut(&mut self) -> &mut OcclusionTracker {
        &mut self.occlusion
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shadows.clear(self.backend.as_mut());
    }
}

/// Map a quad through an affine transform.
///
/// Non-uniform scale is applied along the quad's own axes, which is exact for
/// axis-aligned scale and approximate under shear.
fn apply_transform(vertex: &mut QuadVertex, transform: &Affine2) {
    let x_axis = transform.matrix2.x_axis;
    let y_axis = transform.matrix2.y_axis;
    let sx = x_axis.length();
    let sy = y_axis.length();
    let uniform = sx.min(sy);

    let center = transform.transform_point2(Vec2::from(vertex.center));
    vertex.center = center.into();
    vertex.half_size = [vertex.half_size[0] * sx, vertex.half_size[1] * sy];
    vertex.rotation += x_axis.y.atan2(x_axis.x);
    vertex.corner_radius *= uniform;
    vertex.stroke_width *= uniform;

    if vertex.shape_kind() == ShapeKind::Segment {
        let a = transform.transform_point2(Vec2::new(vertex.params[0], vertex.params[1]));
        let b = transform.transform_point2(Vec2::new(vertex.params[2], vertex.params[3]));
        vertex.params = [a.x, a.y, b.x, b.y];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessBackend, SortKey};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    /// Backend the test keeps a handle to after the renderer owns it.
    /// Counts batches sampling a texture that was already destroyed.
    struct SharedBackend {
        inner: Rc<RefCell<HeadlessBackend>>,
        dead_texture_draws: Rc<Cell<usize>>,
    }

    impl RenderBackend for SharedBackend {
        fn begin_frame(&mut self, frame: &FrameInfo) {
            self.inner.borrow_mut().begin_frame(frame);
        }

        fn create_shader(&mut self, kind: ShaderKind) -> crate::RenderResult<ShaderId> {
            self.inner.borrow_mut().create_shader(kind)
        }

        fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> crate::RenderResult<TextureId> {
            self.inner.borrow_mut().create_texture(desc)
        }

        fn destroy_texture(&mut self, texture: TextureId) {
            self.inner.borrow_mut().destroy_texture(texture);
        }

        fn draw_batch(&mut self, batch: &CompletedBatch) {
            let texture = batch.state.texture;
            let mut inner = self.inner.borrow_mut();
            if texture != TextureId::WHITE && !inner.live_textures.contains(&texture) {
                self.dead_texture_draws.set(self.dead_texture_draws.get() + 1);
            }
            inner.draw_batch(batch);
        }

        fn draw_instances(&mut self, shader: ShaderId, instances: &[WidgetInstance]) {
            self.inner.borrow_mut().draw_instances(shader, instances);
        }

        fn end_frame(&mut self, damage: &FrameDamage) {
            self.inner.borrow_mut().end_frame(damage);
        }

        fn present(&mut self) {
            self.inner.borrow_mut().present();
        }
    }

    fn shared_renderer(
        config: RendererConfig,
    ) -> (Renderer, Rc<RefCell<HeadlessBackend>>, Rc<Cell<usize>>) {
        let inner = Rc::new(RefCell::new(HeadlessBackend::new()));
        let dead = Rc::new(Cell::new(0));
        let backend = SharedBackend {
            inner: inner.clone(),
            dead_texture_draws: dead.clone(),
        };
        (Renderer::new(Box::new(backend), config), inner, dead)
    }

    fn rect(i: usize) -> Rect {
        Rect::from_min_size([i as f32, 0.0], [10.0, 10.0])
    }

    #[test]
    fn test_identical_rects_split_at_cap() {
        let mut r = renderer();
        r.begin_frame([800, 600]);
        for i in 0..12_001 {
            r.draw_rect(rect(i % 100), Color::WHITE);
        }
        r.flush_current_batch();
        let sizes: Vec<usize> = r.completed_batches().iter().map(|b| b.vertex_count()).collect();
        assert_eq!(sizes, vec![10_000, 2_001]);

        let stats = r.end_frame();
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.vertices, 12_001);
        assert_eq!(stats.indices, 12_001 * 6);
    }

    #[test]
    fn test_sorted_batches_are_non_decreasing() {
        let mut r = renderer();
        r.begin_frame([800, 600]);

        r.with_layer(Layer::Overlay, |r| r.draw_rect(rect(0), Color::WHITE));
        r.draw_texture(rect(1), TextureId(7), [0.0, 0.0, 1.0, 1.0], Color::WHITE);
        r.with_layer(Layer::Background, |r| {
            r.with_blend_mode(BlendMode::Additive, |r| r.draw_circle(Point::new(5.0, 5.0), 3.0, Color::WHITE))
        });
        r.draw_rect(rect(2), Color::BLACK);
        r.with_layer(Layer::Modal, |r| r.draw_rect(rect(3), Color::WHITE));
        r.draw_line_batched(Point::new(0.0, 0.0), Point::new(10.0, 10.0), 1.0, Color::WHITE);

        r.render_sorted_batches();
        let keys: Vec<SortKey> = r.flushed_batches().iter().map(|b| b.sort_key).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let layers: Vec<Layer> = r.flushed_batches().iter().map(|b| b.state.layer).collect();
        assert_eq!(layers.first(), Some(&Layer::Background));
        assert_eq!(layers.last(), Some(&Layer::Modal));
        r.end_frame();
    }

    #[test]
    fn test_state_change_breaks_batch() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        r.draw_rect(rect(0), Color::WHITE);
        r.draw_rect(rect(1), Color::WHITE);
        r.with_blend_mode(BlendMode::Multiply, |r| r.draw_rect(rect(2), Color::WHITE));
        r.draw_rect(rect(3), Color::WHITE);
        r.flush_current_batch();
        let sizes: Vec<usize> = r.completed_batches().iter().map(|b| b.vertex_count()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
        r.end_frame();
    }

    #[test]
    fn test_clip_changes_do_not_break_batches() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        r.draw_rect(rect(0), Color::WHITE);
        r.with_clip(Rect::new([0.0, 0.0], [50.0, 50.0]), |r| r.draw_rect(rect(1), Color::WHITE));
        r.flush_current_batch();
        assert_eq!(r.completed_batches().len(), 1);
        let clip = r.completed_batches()[0].vertices[1].clip;
        assert_eq!(clip, [0.0, 0.0, 50.0, 50.0]);
        r.end_frame();
    }

    #[test]
    fn test_fully_clipped_primitive_is_dropped() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        r.with_clip(Rect::new([0.0, 0.0], [5.0, 5.0]), |r| {
            r.draw_rect(Rect::new([50.0, 50.0], [60.0, 60.0]), Color::WHITE)
        });
        assert_eq!(r.stats().clipped, 1);
        let stats = r.end_frame();
        assert_eq!(stats.batches, 0);
    }

    #[test]
    fn test_scoped_wrappers_keep_stacks_balanced() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        let inner_opacity = r.with_transform(Affine2::from_translation(Vec2::new(10.0, 0.0)), |r| {
            r.with_opacity(0.5, |r| {
                r.with_clip(Rect::new([0.0, 0.0], [100.0, 100.0]), |r| {
                    r.with_layer(Layer::Overlay, |r| r.current_opacity())
                })
            })
        });
        assert_eq!(inner_opacity, 0.5);
        assert_eq!(r.current_transform(), Affine2::IDENTITY);
        assert_eq!(r.current_clip(), None);
        assert_eq!(r.current_opacity(), 1.0);
        assert_eq!(r.current_layer(), Layer::Content);
        r.end_frame();
    }

    #[test]
    fn test_transform_and_opacity_are_baked() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        r.with_transform(Affine2::from_translation(Vec2::new(100.0, 50.0)), |r| {
            r.with_opacity(0.5, |r| {
                r.draw_rect(Rect::new([0.0, 0.0], [10.0, 20.0]), Color::WHITE)
            })
        });
        r.flush_current_batch();
        let v = r.completed_batches()[0].vertices[0];
        assert_eq!(v.center, [105.0, 60.0]);
        assert_eq!(v.half_size, [5.0, 10.0]);
        assert_eq!(v.fill, [255, 255, 255, 128]);
        r.end_frame();
    }

    #[test]
    fn test_failed_shader_makes_draws_noops() {
        let backend = HeadlessBackend::new().with_failing_shader(ShaderKind::Shape);
        let mut r = Renderer::new(Box::new(backend), RendererConfig::default());
        assert!(!r.has_sdf_support());
        assert!(r.shader(ShaderKind::Shape).log.is_some());
        assert!(r.is_valid(ShaderKind::Image));

        r.begin_frame([100, 100]);
        r.draw_rect(rect(0), Color::WHITE);
        r.draw_circle(Point::new(1.0, 1.0), 1.0, Color::WHITE);
        r.draw_texture(rect(0), TextureId::WHITE, [0.0, 0.0, 1.0, 1.0], Color::WHITE);
        let stats = r.end_frame();
        assert_eq!(stats.skipped_draws, 2);
        assert_eq!(stats.vertices, 1);
    }

    #[test]
    fn test_text_without_metrics_is_noop() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        let width = r.draw_text("hello", Point::zero(), &TextStyle::default(), Color::WHITE);
        assert_eq!(width, None);
        assert_eq!(r.end_frame().vertices, 0);
    }

    #[test]
    fn test_text_emits_one_glyph_per_character() {
        let mut r = renderer();
        r.set_font_metrics(Box::new(crate::MonospaceMetrics::default()));
        r.begin_frame([100, 100]);
        let width = r.draw_text("abc", Point::zero(), &TextStyle::sized(10.0), Color::WHITE);
        assert!(width.is_some());
        assert_eq!(r.end_frame().vertices, 3);
    }

    #[test]
    fn test_instances_flush_in_one_draw() {
        let mut r = renderer();
        r.begin_frame([100, 100]);
        for i in 0..25 {
            r.add_widget_instance(WidgetInstance::from_rect(rect(i), Color::WHITE));
        }
        assert_eq!(r.pending_instances(), 25);
        let stats = r.end_frame();
        assert_eq!(stats.instanced_draws, 1);
        assert_eq!(stats.instances, 25);
    }

    #[test]
    fn test_instance_cap_forces_flush() {
        let config = RendererConfig::default().with_max_instances(10);
        let mut r = Renderer::new(Box::new(HeadlessBackend::new()), config);
        r.begin_frame([100, 100]);
        for i in 0..25 {
            r.add_widget_instance(WidgetInstance::from_rect(rect(i), Color::WHITE));
        }
        let stats = r.end_frame();
        assert_eq!(stats.instanced_draws, 3);
    }

    #[test]
    fn test_shadow_is_nine_patch_and_cached() {
        let mut r = renderer();
        r.begin_frame([200, 200]);
        let target = Rect::new([50.0, 50.0], [150.0, 150.0]);
        r.draw_shadow(target, 4.0, 2.0, [0.0, 2.0], Color::rgba(0.0, 0.0, 0.0, 0.5));
        r.draw_shadow(target, 4.0, 2.0, [0.0, 2.0], Color::rgba(0.0, 0.0, 0.0, 0.5));
        assert_eq!(r.shadow_cache().len(), 1);
        assert_eq!(r.shadow_cache().hit_stats(), (1, 1));
        let stats = r.end_frame();
        assert_eq!(stats.vertices, 18);
    }

    #[test]
    fn test_shadows_beyond_capacity_stay_alive_for_their_frame() {
        let config = RendererConfig::default().with_shadow_cache_capacity(2);
        let (mut r, backend, dead) = shared_renderer(config);
        let target = Rect::new([50.0, 50.0], [150.0, 150.0]);

        r.begin_frame([200, 200]);
        for blur in 1..=5 {
            r.draw_shadow(target, blur as f32, 0.0, [0.0, 0.0], Color::BLACK);
        }
        assert_eq!(r.shadow_cache().len(), 5);
        r.end_frame();
        assert_eq!(dead.get(), 0);
        assert!(backend.borrow().draws.len() >= 5);

        // Trimmed once the frame was submitted
        assert_eq!(r.shadow_cache().len(), 2);
        assert_eq!(backend.borrow().live_textures.len(), 2);
    }

    #[test]
    fn test_end_frame_reports_final_damage() {
        let (mut r, backend, _) = shared_renderer(RendererConfig::default());
        r.begin_frame([800, 600]);
        r.end_frame();
        r.present();

        r.begin_frame([800, 600]);
        r.add_dirty_rect(Rect::from_min_size([10.0, 10.0], [20.0, 20.0]));
        r.end_frame();
        let damage = backend.borrow().last_damage.unwrap();
        assert!(!damage.full_redraw);
        assert_eq!(damage.bounds, Some(Rect::from_min_size([10.0, 10.0], [20.0, 20.0])));
        r.present();

        // Overflowing the tracker mid-frame: begin_frame saw a partial frame
        r.begin_frame([800, 600]);
        assert!(!backend.borrow().last_frame.unwrap().full_redraw);
        for i in 0..12 {
            r.add_dirty_rect(Rect::from_min_size([i as f32 * 60.0, 0.0], [10.0, 10.0]));
        }
        r.end_frame();
        let damage = backend.borrow().last_damage.unwrap();
        assert!(damage.full_redraw);
        assert!(damage.bounds.is_none());
        r.present();
        assert!(r.frame_damage().is_empty());
    }

    #[test]
    fn test_config_builders_clamp() {
        let config = RendererConfig::default().with_max_dirty_rects(1000);
        assert_eq!(config.max_dirty_rects, 64);
    }
}
