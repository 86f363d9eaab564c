use std::time::Duration;

pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Fixed-cadence frame timer driven by an external millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameScheduler {
    interval_ms: u64,
    next_due: Option<u64>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL_MS)
    }
}

impl FrameScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_due: None,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.next_due = Some(now_ms + self.interval_ms);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Returns `true` once per elapsed interval. Missed ticks are coalesced into one.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        let behind = (now_ms - due) / self.interval_ms;
        self.next_due = Some(due + (behind + 1) * self.interval_ms);
        true
    }

    /// How long the caller may block before the next tick. `None` when stopped.
    pub fn time_until_due(&self, now_ms: u64) -> Option<Duration> {
        self.next_due
            .map(|due| Duration::from_millis(due.saturating_sub(now_ms)))
    }
}
