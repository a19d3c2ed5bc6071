//! Time-windowed duplicate suppression for inbound operations.

use std::time::{Duration, Instant};

use hashbrown::HashMap;
use serde::Deserialize;

use crate::op::Operation;

/// Default suppression window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15);

/// Dedup tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Suppression window in milliseconds.
    pub window_ms: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW.as_millis() as u64,
        }
    }
}

/// Signature → last-seen cache.
///
/// The filter owns no timer; expired entries are swept on every call.
#[derive(Debug)]
pub struct DedupFilter {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl DedupFilter {
    /// Creates a filter with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Creates a filter from config.
    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms))
    }

    /// Suppression decision against the wall clock.
    pub fn should_suppress(&mut self, op: &Operation) -> bool {
        self.should_suppress_at(op, Instant::now())
    }

    /// Suppression decision at `now`.
    ///
    /// Anchor operations are never suppressed and never recorded. A suppressed
    /// operation does not refresh its entry, so a stream of retries cannot
    /// keep one signature alive forever.
    pub fn should_suppress_at(&mut self, op: &Operation, now: Instant) -> bool {
        self.sweep(now);

        if op.is_anchor() {
            return false;
        }

        let sig = signature(op);
        let recent = self
            .seen
            .get(&sig)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.window);
        if recent {
            return true;
        }

        self.seen.insert(sig, now);
        false
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when no signatures are tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.seen
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }
}

/// `lowercase(kind) | normalized text`.
pub fn signature(op: &Operation) -> String {
    format!("{}|{}", op.kind.as_str().to_lowercase(), normalize_whitespace(op.text()))
}

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
