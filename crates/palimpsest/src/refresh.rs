//! Redraw coalescing and the cursor blink clock.

use std::time::{Duration, Instant};

/// Cursor blink cycles per second (one on-phase plus one off-phase per cycle).
pub const CURSOR_BLINK_RATE: f32 = 1.75;

#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Blink phase after `elapsed` since the cursor timer was reset. Starts "on".
pub fn blink_phase(elapsed: Duration) -> bool {
    ((elapsed.as_secs_f32() * CURSOR_BLINK_RATE) as u64) % 2 == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCause {
    Requested,
    CursorBlink,
}

/// Coalesces redraw requests between two frames.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    pending: bool,
    last_blink: bool,
}

impl RefreshGate {
    /// The first frame always needs drawing.
    pub fn new() -> Self {
        Self {
            pending: true,
            last_blink: true,
        }
    }

    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consumes the pending flag. A change of blink phase since the previous
    /// call also counts as a required refresh.
    pub fn consume(&mut self, blink: bool) -> Option<RefreshCause> {
        let blink_changed = blink != self.last_blink;
        self.last_blink = blink;
        if self.pending {
            self.pending = false;
            Some(RefreshCause::Requested)
        } else if blink_changed {
            Some(RefreshCause::CursorBlink)
        } else {
            None
        }
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}
