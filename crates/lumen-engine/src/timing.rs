//! Frame pacing for the demo loop.
//!
//! Particle ticks are fixed-size, so the loop converts wall-clock time into a
//! whole number of ticks with an accumulator. Rendering runs every frame.

use std::time::{Duration, Instant};

/// Upper bound on ticks run for a single frame.
pub const MAX_TICKS_PER_FRAME: u32 = 10;

/// Longest frame delta fed into the accumulator.
const MAX_FRAME_DT: f32 = 0.25;

/// Converts frame time into fixed simulation ticks.
#[derive(Debug)]
pub struct TickClock {
    /// Seconds per tick
    tick_dt: f32,
    /// Unconsumed time
    accumulator: f32,
    /// Start of the previous frame
    last_frame: Instant,
    /// Whether ticks are suspended
    paused: bool,
    /// Ticks handed out so far
    total_ticks: u64,
}

impl TickClock {
    /// Creates a clock producing `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            last_frame: Instant::now(),
            paused: false,
            total_ticks: 0,
        }
    }

    /// Measures time since the last frame and returns the ticks to run.
    pub fn frame(&mut self) -> u32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.accumulate(dt)
    }

    /// Adds `dt` seconds and returns the ticks to run.
    ///
    /// While paused, time is discarded. At most [`MAX_TICKS_PER_FRAME`] ticks
    /// are returned; a backlog beyond that is dropped.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        if self.paused {
            return 0;
        }

        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);
        let mut ticks = 0;
        while self.accumulator >= self.tick_dt && ticks < MAX_TICKS_PER_FRAME {
            self.accumulator -= self.tick_dt;
            ticks += 1;
        }

        if self.accumulator > self.tick_dt * 2.0 {
            self.accumulator = 0.0;
        }

        self.total_ticks += u64::from(ticks);
        ticks
    }

    /// Flips the paused state. Returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.accumulator = 0.0;
        self.paused
    }

    /// Whether ticks are suspended.
    #[must_use]
    #[allow(dead_code)]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Seconds per tick.
    #[must_use]
    #[allow(dead_code)]
    pub const fn tick_dt(&self) -> f32 {
        self.tick_dt
    }

    /// Ticks handed out since creation.
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Restarts timing, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.accumulator = 0.0;
    }
}

/// Sleeps away the rest of a frame when VSync is off.
#[derive(Debug)]
pub struct FrameLimiter {
    frame_budget: Duration,
    frame_start: Instant,
    enabled: bool,
}

impl FrameLimiter {
    /// Creates a limiter for `target_fps`; disabled when `vsync` is on.
    #[must_use]
    pub fn new(target_fps: u32, vsync: bool) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            frame_start: Instant::now(),
            enabled: !vsync,
        }
    }

    /// Marks the start of a frame.
    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Blocks until the frame budget is used up.
    pub fn sleep_remainder(&self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.frame_start.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }

    /// Time allotted per frame.
    #[must_use]
    #[allow(dead_code)]
    pub const fn frame_budget(&self) -> Duration {
        self.frame_budget
    }
}

/// Averages frame rate over fixed intervals for logging.
#[derive(Debug)]
pub struct FpsCounter {
    /// Frames since last report
    frame_count: u32,
    /// Time of last report
    last_report: Instant,
    /// Report interval
    interval: Duration,
}

impl FpsCounter {
    /// Creates a counter reporting every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            frame_count: 0,
            last_report: Instant::now(),
            interval,
        }
    }

    /// Counts a frame. Returns `(fps, frame_time_ms)` once per interval.
    pub fn tick(&mut self) -> Option<(f32, f32)> {
        self.frame_count += 1;

        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f32();
        let fps = self.frame_count as f32 / secs;
        let frame_time = secs / self.frame_count as f32 * 1000.0;
        self.frame_count = 0;
        self.last_report = Instant::now();
        Some((fps, frame_time))
    }
}
