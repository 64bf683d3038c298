use std::time::{Duration, Instant};

/// Pause-aware playback time for the shader's time uniforms.
///
/// Elapsed time is measured from a rebased start epoch; pausing freezes the
/// value and resuming shifts the epoch forward by the paused duration, so
/// `elapsed` is continuous across the boundary. The `*_at` variants take an
/// explicit instant so the semantics can be tested without sleeping.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started: Instant,
    paused_at: Option<Instant>,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(now: Instant) -> Self {
        Self {
            started: now,
            paused_at: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Time since the logical start, frozen while paused.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.paused_at
            .unwrap_or(now)
            .saturating_duration_since(self.started)
    }

    /// Flips between running and paused without changing `elapsed`.
    pub fn toggle_pause(&mut self) {
        self.toggle_pause_at(Instant::now());
    }

    pub fn toggle_pause_at(&mut self, now: Instant) {
        match self.paused_at.take() {
            Some(frozen) => self.started += now.saturating_duration_since(frozen),
            None => self.paused_at = Some(now),
        }
    }

    /// Rebases the start epoch to `now`, zeroing `elapsed`. The paused flag
    /// is left as it is.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.started = now;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }
}
