use super::FrameTime;

/// Animation time for one frame of a running loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationTick {
    pub dt: f32,
    /// Seconds of running time since the first start; pauses don't count.
    pub elapsed: f64,
    /// Frames advanced while running.
    pub frame: u64,
}

/// Start/stop gate in front of the frame clock.
///
/// The runtime keeps redrawing regardless; the loop decides whether a frame
/// advances animation. Stopping only affects later ticks, never the frame in
/// progress.
#[derive(Debug, Clone, Default)]
pub struct AnimationLoop {
    running: bool,
    elapsed: f64,
    frame: u64,
}

impl AnimationLoop {
    /// A loop that is already running.
    pub fn running() -> Self {
        Self { running: true, ..Self::default() }
    }

    pub fn start(&mut self) {
        if !self.running {
            log::debug!("animation loop started at {:.2}s", self.elapsed);
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            log::debug!("animation loop stopped at {:.2}s", self.elapsed);
        }
        self.running = false;
    }

    pub fn toggle(&mut self) {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advances by `time.dt` when running.
    pub fn tick(&mut self, time: &FrameTime) -> Option<AnimationTick> {
        if !self.running {
            return None;
        }
        self.elapsed += f64::from(time.dt);
        self.frame += 1;
        Some(AnimationTick { dt: time.dt, elapsed: self.elapsed, frame: self.frame })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame(dt: f32) -> FrameTime {
        FrameTime { dt, now: Instant::now(), frame_index: 0 }
    }

    #[test]
    fn stopped_loop_does_not_advance() {
        let mut anim = AnimationLoop::default();
        assert_eq!(anim.tick(&frame(0.5)), None);

        anim.start();
        assert_eq!(anim.tick(&frame(0.5)).map(|t| t.frame), Some(1));
        anim.stop();
        assert_eq!(anim.tick(&frame(0.5)), None);
        anim.toggle();
        let t = anim.tick(&frame(0.25)).unwrap();
        assert_eq!(t.elapsed, 0.75);
        assert_eq!(t.frame, 2);
    }
}
