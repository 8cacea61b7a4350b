use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// The runtime calls `on_start` once before the first `on_frame` of the initial
/// window, `on_frame` once per redraw, and `on_exit` once while the GPU is still
/// alive, so GPU-owning state can release its resources deterministically.
pub trait App {
    /// Called once the first window and its GPU context exist.
    fn on_start(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once before the windows and their GPU contexts are dropped.
    fn on_exit(&mut self) {}
}
