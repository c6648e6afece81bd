//! Frame clock for the simulation loop.
//!
//! The fluid is advanced by a fixed amount of simulated time per rendered
//! frame, independent of how long the frame took. [`Time`] keeps that step,
//! the pause flag, a time scale and the bookkeeping the host wants to show
//! (frame count, simulated seconds, measured FPS).
//!
//! # Example
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // once per rendered frame
//! if let Some(dt) = time.tick() {
//!     simulator.update(&mut buffers, dt);
//! }
//! println!("frame {} at {:.1} fps", time.frame(), time.fps());
//! ```

use std::time::{Duration, Instant};

/// Default simulated time per frame, in seconds.
pub const DEFAULT_FRAME_STEP: f32 = 1.0 / 100.0;

/// Fixed-step frame clock.
#[derive(Debug, Clone)]
pub struct Time {
    /// Simulated seconds advanced per unpaused frame, before scaling.
    frame_step: f32,
    time_scale: f32,
    paused: bool,
    /// Frames ticked, paused or not.
    frame_count: u64,
    /// Frames that advanced the simulation.
    step_count: u64,
    simulated: f64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
}

impl Time {
    pub fn new() -> Self {
        Self::with_frame_step(DEFAULT_FRAME_STEP)
    }

    pub fn with_frame_step(frame_step: f32) -> Self {
        Self {
            frame_step,
            time_scale: 1.0,
            paused: false,
            frame_count: 0,
            step_count: 0,
            simulated: 0.0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: Instant::now(),
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Count a frame and return the simulated time to advance, or `None`
    /// while paused.
    pub fn tick(&mut self) -> Option<f32> {
        self.frame_count += 1;

        let now = Instant::now();
        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        if self.paused {
            return None;
        }

        let dt = self.delta();
        self.step_count += 1;
        self.simulated += dt as f64;
        Some(dt)
    }

    /// Scaled simulated time per frame.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.frame_step * self.time_scale
    }

    #[inline]
    pub fn frame_step(&self) -> f32 {
        self.frame_step
    }

    pub fn set_frame_step(&mut self, step: f32) {
        self.frame_step = step.max(0.0);
    }

    /// Frames ticked so far, including paused ones.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames that advanced the simulation.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.step_count
    }

    /// Total simulated seconds.
    #[inline]
    pub fn simulated(&self) -> f64 {
        self.simulated
    }

    /// Measured frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = slow motion
    ///
    /// Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Back to frame 0, unpaused.
    pub fn reset(&mut self) {
        *self = Self {
            time_scale: self.time_scale,
            ..Self::with_frame_step(self.frame_step)
        };
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert!(!time.is_paused());
        assert_eq!(time.delta(), 0.01);
    }

    #[test]
    fn test_tick_advances_fixed_step() {
        let mut time = Time::new();
        assert_eq!(time.tick(), Some(0.01));
        assert_eq!(time.tick(), Some(0.01));
        assert_eq!(time.frame(), 2);
        assert!((time.simulated() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_pause_counts_frames_but_not_steps() {
        let mut time = Time::new();
        time.set_paused(true);
        assert_eq!(time.tick(), None);
        assert_eq!(time.frame(), 1);
        assert_eq!(time.steps(), 0);

        time.toggle_pause();
        assert!(time.tick().is_some());
        assert_eq!(time.steps(), 1);
    }

    #[test]
    fn test_time_scale() {
        let mut time = Time::with_frame_step(0.02);
        time.set_time_scale(0.5);
        assert_eq!(time.tick(), Some(0.01));

        time.set_time_scale(-1.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut time = Time::with_frame_step(0.005);
        time.set_time_scale(2.0);
        time.tick();
        time.reset();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.delta(), 0.01);
    }
}
