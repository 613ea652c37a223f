#![forbid(unsafe_code)]

//! Core: overlay lifecycle, clone synchronization, and pointer-driven masking
//! for the chromatic aberration hover effect.
//!
//! # Role
//! `aberration-core` owns all state of the effect: which elements are
//! wrapped, their clones, pause flags, and the per-frame mask computation.
//! It never touches a browser API directly. Everything live goes through the
//! [`dom::DomHost`] trait, and every callback the engine wants registered is
//! queued as a [`dom::HostCommand`] for the host to wire up.
//!
//! Design goals:
//! - **Host-driven**: the embedding environment pushes pointer, mutation,
//!   resize and frame notifications into [`engine::Engine`].
//! - **Deterministic**: no clocks, no threads; the same notification sequence
//!   always produces the same document.
//! - **Degrades quietly**: absent observer capabilities and per-target
//!   failures never escape the engine.
//!
//! [`memory_dom::MemoryDom`] is a complete in-memory host, used for headless
//! runs and by the test suites.

pub mod addressing;
pub mod capabilities;
pub mod clone_sync;
pub mod dom;
pub mod engine;
pub mod filter;
pub mod geometry;
pub mod mask;
pub mod memory_dom;
pub mod overlay;
pub mod schedule;
pub mod settings;

pub use capabilities::HostCapabilities;
pub use dom::{DomHost, DomTree, FrameTask, HostCommand, HostError, PauseSignal, Subscription};
pub use engine::{DocumentReadiness, Engine, WrapperPointerKind};
pub use geometry::{Point, Rect};
pub use settings::{ColorMode, Palette, Settings, SettingsError, TrackingMode};

/// Marker class carried by every generated wrapper.
pub const WRAPPER_CLASS: &str = "cah-wrap";
/// Marker class carried by every overlay layer.
pub const OVERLAY_CLASS: &str = "cah-overlay";
/// Marker class carried by every clone.
pub const CLONE_CLASS: &str = "cah-clone";
