use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use orbis_engine::backend::WgpuBackend;
use orbis_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use orbis_engine::time::AnimationLoop;
use orbis_engine::window::CursorIcon;
use orbis_engine::{EngineResult, Renderer, RendererConfig};

use crate::config::GlobeConfig;
use crate::orbit::OrbitControls;
use crate::scene::GlobeScene;

pub struct GlobeApp {
    config: GlobeConfig,
    globe: GlobeScene,
    orbit: OrbitControls,
    animation: AnimationLoop,
    /// Created on the first frame, once the surface format is known.
    renderer: Option<Renderer<WgpuBackend>>,
}

impl GlobeApp {
    pub fn new(config: GlobeConfig) -> EngineResult<Self> {
        let globe = GlobeScene::build(&config, 16.0 / 9.0)?;
        let orbit = OrbitControls::new(config.radius);
        Ok(Self { config, globe, orbit, animation: AnimationLoop::running(), renderer: None })
    }
}

impl App for GlobeApp {
    fn on_window_event(&mut self, window: &WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed && !event.repeat => {
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => return AppControl::Exit,
                    Key::Named(NamedKey::Space) => {
                        self.animation.toggle();
                        log::info!("rotation {}", if self.animation.is_running() { "resumed" } else { "paused" });
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.set_size(size.width, size.height);
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                ElementState::Pressed => {
                    self.orbit.begin_drag();
                    window.set_cursor(CursorIcon::Grabbing);
                }
                ElementState::Released => {
                    self.orbit.end_drag();
                    window.set_cursor(CursorIcon::Default);
                }
            },
            WindowEvent::CursorMoved { position, .. } => self.orbit.pointer_moved(position.x, position.y),
            WindowEvent::MouseWheel { delta, .. } => self.orbit.scroll(*delta),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if let Some(tick) = self.animation.tick(&ctx.time) {
            if let Err(err) = self.globe.spin(self.config.rotation_speed * tick.dt) {
                log::warn!("spin failed: {err}");
            }
        }
        if let Err(err) = self.orbit.apply(&mut self.globe.scene, self.globe.camera, ctx.window.aspect()) {
            log::warn!("camera update failed: {err}");
        }

        let size = ctx.window.physical_size();
        let renderer = self.renderer.get_or_insert_with(|| {
            let gpu = &*ctx.gpu;
            let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone(), gpu.surface_format());
            log::info!("renderer created for {:?}", gpu.surface_format());
            let mut renderer = Renderer::new(backend, RendererConfig::default());
            renderer.set_size(size.width, size.height);
            renderer
        });

        let globe = &mut self.globe;
        ctx.render(|_, frame| {
            let (w, h) = frame.size();
            renderer.backend_mut().set_output(frame.view.clone(), w, h);
            let info = renderer.render(&mut globe.scene, globe.camera)?;
            if info.frame % 600 == 0 {
                log::debug!("frame {}: {} draws, {} triangles, {} skipped", info.frame, info.draw_calls, info.triangles, info.skipped);
            }
            Ok(())
        })
    }

    fn on_exit(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
            log::info!("renderer disposed after {} frames", renderer.info().frames);
        }
    }
}
