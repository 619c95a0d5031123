//! Anti-bounce filtering
//!
//! A transponder sitting still in the read field produces a burst of
//! identical detections. Each reader keeps a per-tag sliding window: a tag
//! is accepted when it was never seen before or when at least the configured
//! window has elapsed since its last accepted detection. Acceptance moves
//! the window forward.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-reader anti-bounce filter
#[derive(Debug)]
pub struct AntiBounce {
    window: Duration,
    last_accepted: HashMap<String, Instant>,
}

impl AntiBounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Decide whether a detection of `tag_id` at `at` passes the filter
    ///
    /// Boundary is inclusive: a detection exactly one window after the last
    /// accepted one is accepted again.
    pub fn accept(&mut self, tag_id: &str, at: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(tag_id) {
            if at.duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(tag_id.to_string(), at);
        true
    }

    /// Configured window size
    pub fn window(&self) -> Duration {
        self.window
    }
}
