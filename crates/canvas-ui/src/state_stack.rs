use glam::{Affine2, Vec2};

use crate::Rect;

/// A stack with an implicit base entry that can never be popped.
///
/// `pop` on a stack holding only its base is ignored and reported with a
/// warning, so an unbalanced caller cannot corrupt the frame state.
#[derive(Debug, Clone)]
pub struct StateStack<T: Copy> {
    base: T,
    entries: Vec<T>,
    name: &'static str,
}

impl<T: Copy> StateStack<T> {
    pub fn new(name: &'static str, base: T) -> Self {
        Self {
            base,
            entries: Vec::new(),
            name,
        }
    }

    pub fn top(&self) -> T {
        self.entries.last().copied().unwrap_or(self.base)
    }

    pub fn push(&mut self, value: T) {
        self.entries.push(value);
    }

    pub fn pop(&mut self) -> Option<T> {
        let popped = self.entries.pop();
        if popped.is_none() {
            log::warn!("unbalanced pop on {} stack", self.name);
        }
        popped
    }

    /// Number of pushed entries above the base
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::warn!(
                "{} stack still held {} entries at frame end",
                self.name,
                self.entries.len()
            );
        }
        self.entries.clear();
    }
}

/// Transform, clip and opacity stacks applied to every submitted primitive
#[derive(Debug, Clone)]
pub struct RenderState {
    pub transform: StateStack<Affine2>,
    pub clip: StateStack<Option<Rect>>,
    pub opacity: StateStack<f32>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            transform: StateStack::new("transform", Affine2::IDENTITY),
            clip: StateStack::new("clip", None),
            opacity: StateStack::new("opacity", 1.0),
        }
    }
}

impl RenderState {
    /// Compose `local` with the current transform and push the result
    pub fn push_transform(&mut self, local: Affine2) {
        let composed = self.transform.top() * local;
        self.transform.push(composed);
    }

    /// Intersect `rect` (in local space) with the current clip and push it.
    ///
    /// The clip is stored as the screen-space bounding box of the transformed
    /// rect. A disjoint clip pushes an empty rect so everything is discarded.
    pub fn push_clip(&mut self, rect: Rect) {
        let screen = transform_rect(&self.transform.top(), &rect);
        let clipped = match self.clip.top() {
            Some(current) => current
                .intersect(&screen)
                .unwrap_or(Rect::new(screen.min, screen.min)),
            None => screen,
        };
        self.clip.push(Some(clipped));
    }

    pub fn push_opacity(&mut self, opacity: f32) {
        let combined = self.opacity.top() * opacity.clamp(0.0, 1.0);
        self.opacity.push(combined);
    }

    pub fn reset(&mut self) {
        self.transform.clear();
        self.clip.clear();
        self.opacity.clear();
    }

    pub fn is_balanced(&self) -> bool {
        self.transform.depth() == 0 && self.clip.depth() == 0 && self.opacity.depth() == 0
    }
}

/// Screen-space bounding box of `rect` under `affine`
pub fn transform_rect(affine: &Affine2, rect: &Rect) -> Rect {
    let corners = [
        Vec2::new(rect.min[0], rect.min[1]),
        Vec2::new(rect.max[0], rect.min[1]),
        Vec2::new(rect.max[0], rect.max[1]),
        Vec2::new(rect.min[0], rect.max[1]),
    ]
    .map(|c| affine.transform_point2(c));

    let min = corners.iter().fold(Vec2::splat(f32::MAX), |acc, c| acc.min(*c));
    let max = corners.iter().fold(Vec2::splat(f32::MIN), |acc, c| acc.max(*c));
    Rect::new(min.into(), max.into())
}
