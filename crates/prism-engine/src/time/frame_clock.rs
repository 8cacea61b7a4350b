use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,

    /// Exponentially smoothed frames per second.
    pub fps: f32,
}

/// Produces `FrameTime` snapshots with clamped delta time and a smoothed frame rate.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// report a multi-second frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    fps: f32,
}

/// Weight of the newest sample in the fps average.
const FPS_SMOOTHING: f32 = 0.1;

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            fps: 0.0,
        }
    }

    /// Resets the baseline, e.g. after the window was restored.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max)
            .as_secs_f32();
        self.last = now;

        let instant_fps = 1.0 / dt;
        self.fps = if self.frame_index == 0 {
            instant_fps
        } else {
            self.fps + (instant_fps - self.fps) * FPS_SMOOTHING
        };

        let ft = FrameTime {
            dt,
            now,
            frame_index: self.frame_index,
            fps: self.fps,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_from_zero() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let a = clock.tick_at(start + Duration::from_millis(16));
        let b = clock.tick_at(start + Duration::from_millis(32));
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn fps_converges_on_steady_rate() {
        let mut clock = FrameClock::new();
        let mut t = clock.last;
        let mut ft = clock.tick_at(t);
        for _ in 0..200 {
            t += Duration::from_millis(10);
            ft = clock.tick_at(t);
        }
        assert!((ft.fps - 100.0).abs() < 1.0, "fps = {}", ft.fps);
    }
}
