// ---------------------------------------------------------------------------
// Mission clock: elapsed-since-undock with pause-aware accounting
// ---------------------------------------------------------------------------

/// Measures time since undock minus time spent paused.
///
/// Callers supply monotone `now` timestamps (seconds); the clock never
/// samples wall time itself, so tests drive it with synthetic values. The
/// displayed elapsed value freezes at the pause instant while paused and
/// latches permanently (until the next undock) at the dock instant.
#[derive(Debug, Clone)]
pub struct MissionClock {
    undock_at: f64,
    paused_accum: f64,
    paused_since: Option<f64>,
    frozen: Option<f64>,
}

impl MissionClock {
    /// A clock for a vehicle that starts docked: display latched at zero.
    pub fn new_docked() -> Self {
        Self {
            undock_at: 0.0,
            paused_accum: 0.0,
            paused_since: None,
            frozen: Some(0.0),
        }
    }

    /// Start a fresh run: clears the dock latch and the accumulated pause.
    pub fn undock(&mut self, now: f64) {
        self.undock_at = now;
        self.paused_accum = 0.0;
        self.paused_since = None;
        self.frozen = None;
    }

    pub fn pause(&mut self, now: f64) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    pub fn resume(&mut self, now: f64) {
        if let Some(since) = self.paused_since.take() {
            self.paused_accum += now - since;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Latch the display value at the dock instant.
    pub fn freeze(&mut self, now: f64) {
        self.frozen = Some(self.elapsed(now));
    }

    /// Elapsed unpaused seconds since undock.
    pub fn elapsed(&self, now: f64) -> f64 {
        if let Some(frozen) = self.frozen {
            return frozen;
        }
        let reference = self.paused_since.unwrap_or(now);
        reference - self.undock_at - self.paused_accum
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
