use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::FrameClock;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub redraw: RedrawMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "orbis".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            redraw: RedrawMode::Continuous,
        }
    }
}

/// When the runtime asks the window for another frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum RedrawMode {
    /// Every time the loop goes idle.
    #[default]
    Continuous,
    /// Only after a window event.
    OnDemand,
}

/// Requests from inside a frame callback, applied once it returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn set_redraw_mode(&mut self, mode: RedrawMode) {
        self.commands.push(Command::SetRedraw(mode));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

#[derive(Debug)]
enum Command {
    SetRedraw(RedrawMode),
    Exit,
}

/// Entry point: opens one window and drives `app` until it exits or the
/// window closes.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit event loop")?;
        let mut state = AppState {
            redraw: config.redraw,
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
        };
        event_loop.run_app(&mut state).context("winit event loop terminated with error")?;
        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    window: Window,
    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A: App + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    redraw: RedrawMode,
    window: Option<WindowEntry>,
    exit_requested: bool,
}

impl<A: App + 'static> AppState<A> {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = event_loop.create_window(attrs).context("failed to create window")?;
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.take().is_some() {
            self.app.on_exit();
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, ctx: RuntimeCtx) {
        for command in ctx.commands {
            match command {
                Command::SetRedraw(mode) => self.redraw = mode,
                Command::Exit => self.exit_requested = true,
            }
        }
        if self.exit_requested {
            self.shutdown(event_loop);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        let Some(entry) = self.window.as_mut() else { return };
        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();

        let control = entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx { id, window: fields.window },
                gpu: fields.gpu,
                time,
                runtime: &mut runtime,
            };
            app.on_frame(&mut ctx)
        });

        if control == AppControl::Exit {
            runtime.exit();
        }
        self.apply(event_loop, runtime);
    }
}

impl<A: App + 'static> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            log::error!("failed to open window: {err:#}");
            self.shutdown(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
        if self.redraw == RedrawMode::Continuous {
            if let Some(entry) = &self.window {
                entry.with_window(|w| w.request_redraw());
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if matches!(event, WindowEvent::RedrawRequested) {
            self.redraw(event_loop, id);
            return;
        }

        let Some(entry) = self.window.as_mut() else { return };
        let app = &mut self.app;
        let control = entry.with_window(|window| app.on_window_event(&WindowCtx { id, window }, &event));
        if control == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.shutdown(event_loop);
                return;
            }
            WindowEvent::Resized(size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(size));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(size));
            }
            _ => {}
        }

        if self.redraw == RedrawMode::OnDemand {
            entry.with_window(|w| w.request_redraw());
        }
    }
}
