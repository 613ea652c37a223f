#![forbid(unsafe_code)]

//! Coalesce bursts of triggers into one deferred run per tick.
//!
//! High-frequency sources (pointer moves, mutation records) must not cause
//! more than one unit of work per rendered frame. [`TickCoalescer`] is the
//! in-flight flag for one such unit:
//!
//! 1. a trigger calls [`TickCoalescer::request`]; only the first request of a
//!    tick returns `true`, and the caller schedules exactly one deferred run;
//! 2. the deferred run calls [`TickCoalescer::begin`], which clears the flag
//!    before the work starts so triggers raised during the work schedule the
//!    next tick.
//!
//! The primitive does not know what a tick is; the host decides (an
//! animation frame in browsers, a test step in headless runs). Scheduled
//! runs are never cancelled.
//!
//! ```
//! use aberration_core::schedule::TickCoalescer;
//!
//! let mut pending = TickCoalescer::new();
//! assert!(pending.request());
//! assert!(!pending.request());
//! assert!(pending.begin());
//! assert!(pending.request());
//! ```

/// Once-per-tick scheduling flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCoalescer {
    pending: bool,
    requests: u64,
    runs: u64,
}

impl TickCoalescer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: false,
            requests: 0,
            runs: 0,
        }
    }

    /// Record a trigger. Returns `true` when the caller must schedule a run.
    #[must_use]
    pub fn request(&mut self) -> bool {
        self.requests = self.requests.saturating_add(1);
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Start a scheduled run, clearing the flag.
    ///
    /// Returns whether a run was actually pending. A stray call reports
    /// `false` and changes nothing.
    pub fn begin(&mut self) -> bool {
        let was_pending = core::mem::take(&mut self.pending);
        if was_pending {
            self.runs = self.runs.saturating_add(1);
        }
        was_pending
    }

    /// Whether a run is scheduled and has not started yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Total triggers recorded.
    #[must_use]
    pub const fn requests(&self) -> u64 {
        self.requests
    }

    /// Total runs started.
    #[must_use]
    pub const fn runs(&self) -> u64 {
        self.runs
    }
}
