#![forbid(unsafe_code)]

//! Browser host for the chromatic aberration hover engine.
//!
//! On load the module reads the `window.cahSettings` payload, probes for
//! `MutationObserver` and `ResizeObserver`, and starts an
//! [`aberration_core::Engine`] over the live document. Every subscription
//! the engine asks for is wired to a real listener, observer or animation
//! frame that forwards back into the engine.
//!
//! Two functions are exported to JavaScript: `overlayCount()` and
//! `rescan()`.
//!
//! Only [`console_log`] is compiled on native targets.

pub mod console_log;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{WebDom, WebNode, overlay_count, rescan};
