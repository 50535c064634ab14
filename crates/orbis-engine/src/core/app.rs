use winit::event::WindowEvent;

use super::ctx::{FrameCtx, WindowCtx};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

pub trait App {
    /// Every window event except `RedrawRequested`, before the runtime's own
    /// resize handling.
    fn on_window_event(&mut self, window: &WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        let _ = (window, event);
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Last call before the window and its GPU context are dropped.
    fn on_exit(&mut self) {}
}
