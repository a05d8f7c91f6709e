//! # canvas-ui-editor
//!
//! Region layout and editor spaces for canvas-ui.
//!
//! The window is partitioned by a [`RegionTree`]: each region is either a
//! leaf hosting an [`Editor`] or a split with two children and a
//! [`canvas_ui_interactive::RegionSplitter`] between them. Regions carry
//! [`RegionFlags`] and draw only while some update bit is set.
//!
//! [`Canvas`] wraps the tree, a [`canvas_ui::Renderer`] and the active
//! [`canvas_ui::Theme`] behind frame and event entry points.
//!
//! ## 3D viewport
//!
//! - [`Camera3D`] - quaternion orbit camera
//! - [`NavigationHandler`] - mouse, trackpad and keyboard navigation
//! - [`NavigationGizmo`] - clickable orientation gizmo
//! - [`GridRenderer`] - ground-plane grid scaled with camera distance

mod camera;
mod canvas;
mod editor;
mod gizmo;
mod grid;
mod navigation;
mod panels;
mod region;
mod region_menu;
mod tree;
mod viewport;

pub use camera::*;
pub use canvas::*;
pub use editor::*;
pub use gizmo::*;
pub use grid::*;
pub use navigation::*;
pub use panels::*;
pub use region::*;
pub use region_menu::*;
pub use tree::*;
pub use viewport::*;
