#![forbid(unsafe_code)]

//! Optional host observation capabilities.
//!
//! Both flags gate an enhancement, never core behavior: without them the
//! initial scan and pointer-driven masking still work.

/// Observer APIs available in the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Subtree mutation observation. Enables clone transform sync after
    /// creation and re-scans on inserted content.
    pub mutation_observer: bool,
    /// Element resize observation. Enables clearing stale masks on resize.
    pub resize_observer: bool,
}

impl HostCapabilities {
    /// Every optional capability present.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            mutation_observer: true,
            resize_observer: true,
        }
    }

    /// No optional capability present.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            mutation_observer: false,
            resize_observer: false,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::full()
    }
}
