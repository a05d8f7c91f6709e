//! # canvas-ui
//!
//! Graphics backend agnostic core of the Canvas UI toolkit.
//!
//! This crate owns the value types and the batching renderer with zero
//! dependencies on any specific graphics API. GPU work goes through the
//! [`RenderBackend`] trait, implemented by `canvas-ui-wgpu` and by the
//! in-crate [`HeadlessBackend`].
//!
//! ## Primitives
//!
//! - [`Point`], [`Rect`], [`Color`] - geometry and color values
//! - [`InputEvent`] - normalized platform input
//! - [`Theme`] - named colors and alpha constants
//!
//! ## Rendering
//!
//! - [`Renderer`] - batches primitives by [`BatchState`] and flushes them
//!   sorted by [`SortKey`]
//! - [`WidgetInstance`] - instanced widget path
//! - [`DirtyRectTracker`] / [`OcclusionTracker`] - per-frame redraw and culling helpers
//! - [`FontMetrics`] - text metrics provider supplied by the application

mod backend;
mod batch;
mod color;
mod dirty;
mod error;
mod input;
mod instance;
mod occlusion;
mod primitives;
mod renderer;
mod shadow;
mod state_stack;
mod text;
mod theme;

pub use backend::*;
pub use batch::*;
pub use color::*;
pub use dirty::*;
pub use error::{RenderError, Result as RenderResult};
pub use input::*;
pub use instance::*;
pub use occlusion::*;
pub use primitives::*;
pub use renderer::*;
pub use shadow::*;
pub use state_stack::*;
pub use text::*;
pub use theme::*;

/// Re-exported so downstream crates share one math version
pub use glam;
