/// RGBA color in linear space with values in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub const fn transparent() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Convert sRGB color (0-255) to linear space
    #[inline]
    pub const fn srgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        const fn srgb_to_linear(c: u8) -> f32 {
            let x = c as f32 / 255.0;
            if x <= 0.04045 {
                x / 12.92
            } else {
                // Polynomial fit of ((x + 0.055) / 1.055)^2.4, usable in const context
                let t = (x + 0.055) / 1.055;
                t * t * (0.5870 * t + 0.4130)
            }
        }

        Self::rgba(
            srgb_to_linear(r),
            srgb_to_linear(g),
            srgb_to_linear(b),
            a as f32 / 255.0,
        )
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    /// Multiply the alpha channel, used by the opacity stack
    pub fn multiply_alpha(mut self, factor: f32) -> Self {
        self.a *= factor;
        self
    }

    /// Component-wise linear interpolation, `t = 0` yields `self`
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Quantize to 8-bit channels (the vertex color format)
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Pack into a single `0xRRGGBBAA` word, used as a cache key
    pub fn pack_rgba(&self) -> u32 {
        u32::from_be_bytes(self.to_rgba8())
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 0.999
    }

    /// Relative luminance (0.0 to 1.0)
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

/// Catppuccin color palette
pub mod catppuccin {
    pub mod mocha {
        use crate::color::Color;

        pub const ROSEWATER: Color = Color::srgba(245, 224, 220, 255);
        pub const MAUVE: Color = Color::srgba(203, 166, 247, 255);
        pub const RED: Color = Color::srgba(243, 139, 168, 255);
        pub const PEACH: Color = Color::srgba(250, 179, 135, 255);
        pub const YELLOW: Color = Color::srgba(249, 226, 175, 255);
        pub const GREEN: Color = Color::srgba(166, 227, 161, 255);
        pub const TEAL: Color = Color::srgba(148, 226, 213, 255);
        pub const SAPPHIRE: Color = Color::srgba(116, 199, 236, 255);
        pub const BLUE: Color = Color::srgba(137, 180, 250, 255);
        pub const LAVENDER: Color = Color::srgba(180, 190, 254, 255);
        pub const TEXT: Color = Color::srgba(205, 214, 244, 255);
        pub const SUBTEXT0: Color = Color::srgba(166, 173, 200, 255);
        pub const OVERLAY1: Color = Color::srgba(127, 132, 156, 255);
        pub const OVERLAY0: Color = Color::srgba(108, 112, 134, 255);
        pub const SURFACE2: Color = Color::srgba(88, 91, 112, 255);
        pub const SURFACE1: Color = Color::srgba(69, 71, 90, 255);
        pub const SURFACE0: Color = Color::srgba(49, 50, 68, 255);
        pub const BASE: Color = Color::srgba(30, 30, 46, 255);
        pub const MANTLE: Color = Color::srgba(24, 24, 37, 255);
        pub const CRUST: Color = Color::srgba(17, 17, 27, 255);
    }

    pub mod latte {
        use crate::color::Color;

        pub const ROSEWATER: Color = Color::srgba(220, 138, 120, 255);
        pub const MAUVE: Color = Color::srgba(136, 57, 239, 255);
        pub const RED: Color = Color::srgba(210, 15, 57, 255);
        pub const PEACH: Color = Color::srgba(254, 100, 11, 255);
        pub const YELLOW: Color = Color::srgba(223, 142, 29, 255);
        pub const GREEN: Color = Color::srgba(64, 160, 43, 255);
        pub const TEAL: Color = Color::srgba(23, 146, 153, 255);
        pub const SAPPHIRE: Color = Color::srgba(32, 159, 181, 255);
        pub const BLUE: Color = Color::srgba(30, 102, 245, 255);
        pub const LAVENDER: Color = Color::srgba(114, 135, 253, 255);
        pub const TEXT: Color = Color::srgba(76, 79, 105, 255);
        pub const SUBTEXT0: Color = Color::srgba(108, 111, 133, 255);
        pub const OVERLAY1: Color = Color::srgba(140, 143, 161, 255);
        pub const OVERLAY0: Color = Color::srgba(156, 160, 176, 255);
        pub const SURFACE2: Color = Color::srgba(172, 176, 190, 255);
        pub const SURFACE1: Color = Color::srgba(188, 192, 204, 255);
        pub const SURFACE0: Color = Color::srgba(204, 208, 218, 255);
        pub const BASE: Color = Color::srgba(239, 241, 245, 255);
        pub const MANTLE: Color = Color::srgba(230, 233, 239, 255);
        pub const CRUST: Color = Color::srgba(220, 224, 232, 255);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_rgba_orders_channels() {
        let c = Color::rgba(1.0, 0.0, 0.0, 1.0);
        assert_eq!(c.pack_rgba(), 0xFF0000FF);
    }

    #[test]
    fn test_lerp_quarter() {
        let bg = Color::rgba(0.0, 0.0, 0.0, 1.0);
        let axis = Color::rgba(1.0, 0.4, 0.0, 1.0);
        let mixed = bg.lerp(&axis, 0.25);
        assert!((mixed.r - 0.25).abs() < 1e-6);
        assert!((mixed.g - 0.1).abs() < 1e-6);
        assert_eq!(mixed.a, 1.0);
    }
}
