//! Frame clock for the simulation loop.
//!
//! Source staleness ("has this hand moved in the last 100 ms?") is computed
//! from timestamps on this clock rather than from timer callbacks, so every
//! reader sees the same notion of "now" within a frame.
//!
//! # Example
//!
//! ```ignore
//! use bodyflow::time::Time;
//!
//! let mut time = Time::new();
//!
//! // In your frame loop:
//! let (now, delta) = time.update();
//! simulation.update(now, &inputs)?;
//! ```

use std::time::{Duration, Instant};

/// Wall-clock frame timer with pause and fixed-step support.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    /// Seconds since start, excluding paused spans.
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    paused: bool,
    /// Accumulated time spent paused.
    pause_elapsed: Duration,
    /// When set, every update advances by this many seconds.
    fixed_delta: Option<f32>,
}

impl Time {
    /// Create a new clock starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            paused: false,
            pause_elapsed: Duration::ZERO,
            fixed_delta: None,
        }
    }

    /// Advance the clock. Call once per frame.
    ///
    /// Returns `(now, delta)` in seconds.
    pub fn update(&mut self) -> (f32, f32) {
        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, 0.0);
        }

        let now = Instant::now();
        match self.fixed_delta {
            Some(step) => {
                self.delta_secs = step;
                self.elapsed_secs += step;
            }
            None => {
                self.delta_secs = now.duration_since(self.last_frame).as_secs_f32();
                self.elapsed_secs = (now.duration_since(self.start) - self.pause_elapsed).as_secs_f32();
            }
        }
        self.last_frame = now;
        self.frame_count += 1;

        (self.elapsed_secs, self.delta_secs)
    }

    /// Seconds since start, excluding paused spans.
    #[inline]
    pub fn now(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            let now = Instant::now();
            self.pause_elapsed += now.duration_since(self.last_frame);
            self.last_frame = now;
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Advance by a fixed step on every update instead of wall time.
    ///
    /// The headless renderer uses this to produce identical frames run to run.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
