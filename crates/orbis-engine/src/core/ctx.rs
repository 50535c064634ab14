use winit::dpi::PhysicalSize;
use winit::window::{CursorIcon, Window, WindowId};

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    #[inline]
    pub fn physical_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn aspect(&self) -> f32 {
        let size = self.physical_size();
        size.width.max(1) as f32 / size.height.max(1) as f32
    }

    pub fn set_cursor(&self, cursor: CursorIcon) {
        self.window.set_cursor(cursor);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// Handed to [`App::on_frame`](super::App::on_frame) once per redraw.
///
/// `'a` spans the callback; `'w` is the window borrow held by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'w> FrameCtx<'_, 'w> {
    /// Acquires the surface texture, lets `draw` fill it and presents it.
    ///
    /// Surface errors are resolved here: lost or outdated surfaces are
    /// reconfigured and the frame dropped, out-of-memory exits. An error from
    /// `draw` is logged; the frame is still presented.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&Gpu<'w>, &GpuFrame) -> anyhow::Result<()>,
    {
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return AppControl::Continue;
        }

        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => AppControl::Continue,
                };
            }
        };

        if let Err(err) = draw(&*self.gpu, &frame) {
            log::error!("frame {} failed: {err:#}", self.time.frame_index);
        }

        self.window.window.pre_present_notify();
        self.gpu.present(frame);
        AppControl::Continue
    }
}
