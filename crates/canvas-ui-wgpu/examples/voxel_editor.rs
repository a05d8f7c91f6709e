//! Voxel editor shell: a 3D viewport with properties, outliner and timeline
//! regions, driven by the canvas region tree.
//!
//! Middle-drag orbits the viewport, Shift+middle pans, the wheel zooms.
//! Drag the gaps between regions to resize them and use a region header to
//! switch its editor. F2 toggles the light theme, Escape quits.
//!
//! Falls back to the headless backend when no GPU adapter is available, so
//! the event loop still runs (without drawing) on machines without one.

use std::sync::Arc;
use std::time::Instant;

use canvas_ui::{HeadlessBackend, InputEventKind, Key, NamedKey, Rect, RenderBackend, Theme};
use canvas_ui_editor::{Canvas, CanvasConfig, EditorKind, RedrawPolicy};
use canvas_ui_interactive::SplitDirection;
use canvas_ui_wgpu::{WgpuBackend, WgpuBackendConfig, WinitInputAdapter};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

struct VoxelEditorApp {
    window: Option<Arc<Window>>,
    canvas: Option<Canvas>,
    input: WinitInputAdapter,
    last_update: Instant,
    light_theme: bool,
}

impl VoxelEditorApp {
    fn new() -> Self {
        Self {
            window: None,
            canvas: None,
            // The canvas works in physical pixels
            input: WinitInputAdapter::new(1.0),
            last_update: Instant::now(),
            light_theme: false,
        }
    }

    fn build_canvas(window: Arc<Window>) -> Canvas {
        let size = window.inner_size();
        let size = [size.width.max(1), size.height.max(1)];

        let backend: Box<dyn RenderBackend> =
            match pollster::block_on(WgpuBackend::new(window, WgpuBackendConfig::default())) {
                Ok(backend) => Box::new(backend),
                Err(err) => {
                    log::warn!("GPU unavailable ({err}), falling back to the headless backend");
                    Box::new(HeadlessBackend::new())
                }
            };

        let mut canvas = Canvas::new(backend, CanvasConfig::default(), size);
        let root = canvas.create_region(
            Rect::from_min_size([0.0, 0.0], [size[0] as f32, size[1] as f32]),
            EditorKind::Viewport3D,
        );

        // Viewport | side panels, then a timeline strip under the viewport
        let tree = canvas.tree_mut();
        let Some((main, side)) = tree.split(root, SplitDirection::Vertical, 0.72) else {
            log::warn!("window too small for the default layout");
            return canvas;
        };
        if let Some((_, timeline)) = tree.split(main, SplitDirection::Horizontal, 0.8) {
            tree.set_editor_kind(timeline, EditorKind::Timeline);
        }
        if let Some((outliner, _)) = tree.split(side, SplitDirection::Horizontal, 0.4) {
            tree.set_editor_kind(outliner, EditorKind::Outliner);
        }
        log::info!("layout ready with {} regions", tree.len());

        canvas
    }

    fn redraw(&mut self) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        canvas.begin_frame();
        let drawn = canvas.render();
        let stats = canvas.end_frame();
        canvas.present_frame();
        log::trace!(
            "drew {drawn} regions in {} batches ({} quads)",
            stats.batches,
            stats.vertices
        );
    }

    fn toggle_theme(&mut self) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        self.light_theme = !self.light_theme;
        canvas.set_theme(if self.light_theme {
            Theme::light()
        } else {
            Theme::dark()
        });
    }
}

impl ApplicationHandler for VoxelEditorApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Voxel Editor")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 800));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        self.canvas = Some(Self::build_canvas(window.clone()));
        self.last_update = Instant::now();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                if let Some(canvas) = self.canvas.as_mut() {
                    canvas.resize([size.width, size.height]);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                return;
            }
            _ => {}
        }

        let Some(input) = self.input.convert(&event) else {
            return;
        };
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        if canvas.handle_event(&input) {
            return;
        }

        if input.kind == InputEventKind::KeyPress {
            match input.key {
                Some(Key::Named(NamedKey::Escape)) => event_loop.exit(),
                Some(Key::Named(NamedKey::F(2))) => self.toggle_theme(),
                _ => {}
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;

        let (Some(canvas), Some(window)) = (self.canvas.as_mut(), self.window.as_ref()) else {
            return;
        };
        let animating = canvas.update(dt);
        let continuous = canvas.tree().config().redraw_policy == RedrawPolicy::Continuous;

        if animating || continuous || canvas.needs_redraw() {
            window.request_redraw();
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("failed to create event loop: {err}");
            return;
        }
    };

    let mut app = VoxelEditorApp::new();
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {err}");
    }
}
