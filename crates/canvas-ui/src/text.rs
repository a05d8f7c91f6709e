//! Backend-agnostic text metrics.
//!
//! The core never shapes or rasterizes glyphs. A [`FontMetrics`] provider turns a
//! string into positioned glyph quads with atlas coordinates, and the renderer
//! emits one glyph record per quad.

use crate::TextureId;

/// Style passed to the metrics provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    /// Backend-defined font family (None = default family)
    pub family: Option<&'static str>,
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 13.0,
            family: None,
            bold: false,
        }
    }
}

impl TextStyle {
    pub fn sized(font_size: f32) -> Self {
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// One positioned glyph relative to the text origin (top-left of the line box)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    /// Offset of the glyph's top-left corner from the pen origin
    pub offset: [f32; 2],
    pub size: [f32; 2],
    /// Horizontal advance to the next glyph
    pub advance: f32,
    /// Atlas coordinates `[u0, v0, u1, v1]`
    pub uv: [f32; 4],
}

/// Measured single-line text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub width: f32,
    pub height: f32,
    pub glyphs: Vec<GlyphQuad>,
}

/// Font metrics provider supplied by the application shell.
pub trait FontMetrics {
    /// Shape a single line of text.
    fn layout(&self, text: &str, style: &TextStyle) -> TextLayout;

    /// Atlas texture the returned UVs refer to.
    fn atlas(&self) -> TextureId;

    /// Width of the shaped line, without producing glyph quads where possible.
    fn measure(&self, text: &str, style: &TextStyle) -> [f32; 2] {
        let layout = self.layout(text, style);
        [layout.width, layout.height]
    }
}

/// Fixed-advance metrics that render every glyph as a solid cell.
///
/// Used headless and by demos that run without a font atlas. Spaces produce an
/// advance but no glyph.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    /// Advance as a fraction of the font size
    pub advance_ratio: f32,
    pub line_height_ratio: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            line_height_ratio: 1.2,
        }
    }
}

impl FontMetrics for MonospaceMetrics {
    fn layout(&self, text: &str, style: &TextStyle) -> TextLayout {
        let advance = style.font_size * self.advance_ratio;
        let height = style.font_size * self.line_height_ratio;
        let glyph_top = (height - style.font_size) * 0.5;

        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                glyphs.push(GlyphQuad {
                    offset: [pen + advance * 0.1, glyph_top],
                    size: [advance * 0.8, style.font_size],
                    advance,
                    uv: [0.0, 0.0, 1.0, 1.0],
                });
            }
            pen += advance;
        }

        TextLayout {
            width: pen,
            height,
            glyphs,
        }
    }

    fn atlas(&self) -> TextureId {
        TextureId::WHITE
    }

    fn measure(&self, text: &str, style: &TextStyle) -> [f32; 2] {
        [
            text.chars().count() as f32 * style.font_size * self.advance_ratio,
            style.font_size * self.line_height_ratio,
        ]
    }
}
