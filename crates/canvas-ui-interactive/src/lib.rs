//! # canvas-ui-interactive
//!
//! Interactive widgets for canvas-ui.
//!
//! Widgets implement [`Widget`] and are composed onto regions through a
//! [`WidgetManager`]. The region splitter drag logic lives here too so the
//! region tree only has to feed it pointer positions.

mod context_menu;
mod dropdown;
mod manager;
mod splitter;
mod widget;

pub use context_menu::*;
pub use dropdown::*;
pub use manager::*;
pub use splitter::*;
pub use widget::*;
