#![forbid(unsafe_code)]

//! Host DOM abstraction.
//!
//! The engine talks to the live document through two traits:
//! - [`DomTree`]: read-only structure, enough for path addressing.
//! - [`DomHost`]: everything else the overlay lifecycle needs.
//!
//! Observation is inverted: instead of registering callbacks, the engine
//! queues [`HostCommand`] values. The host drains them, wires each
//! [`Subscription`] to whatever primitive it has (`MutationObserver`,
//! `ResizeObserver`, event listeners, `requestAnimationFrame`) and forwards
//! notifications back into the engine's `handle_*` entry points.

use core::fmt::Debug;
use core::hash::Hash;

use crate::geometry::Rect;

/// Host DOM error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The selector could not be parsed by the host.
    InvalidSelector(String),
    /// The node is not attached where the operation requires it.
    Detached,
    /// Any other host-side failure, with the host's message.
    Operation(String),
}

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSelector(selector) => write!(f, "invalid selector: {selector}"),
            Self::Detached => write!(f, "node is detached"),
            Self::Operation(msg) => write!(f, "host operation failed: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Read-only element structure.
pub trait DomTree {
    /// Identity handle for an element. Two handles compare equal iff they
    /// refer to the same live node.
    type Node: Clone + Eq + Hash + Debug;

    /// Parent element, or `None` at the top of the element tree or for a
    /// detached node.
    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element children in document order (text nodes excluded).
    fn element_children(&self, node: &Self::Node) -> Vec<Self::Node>;
}

/// Live-document operations used by the overlay engine.
pub trait DomHost: DomTree {
    /// All elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Node>, HostError>;

    /// Whether `node` carries `class` in its class list.
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Add `class` to the class list of `node`.
    fn add_class(&mut self, node: &Self::Node, class: &str) -> Result<(), HostError>;

    /// Computed `display` value, if the host can resolve one.
    fn computed_display(&self, node: &Self::Node) -> Option<String>;

    /// Create a detached element with the given tag name.
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, HostError>;

    /// Insert `node` into `parent` immediately before `reference`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: &Self::Node,
    ) -> Result<(), HostError>;

    /// Move `child` to the end of `parent`'s children.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// Deep-copy `node` and its whole subtree into a new detached element.
    fn deep_clone(&mut self, node: &Self::Node) -> Result<Self::Node, HostError>;

    /// Set an attribute.
    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &str,
    ) -> Result<(), HostError>;

    /// Remove an attribute; absent attributes are ignored.
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Inline style property value; empty when unset.
    fn style_property(&self, node: &Self::Node, property: &str) -> String;

    /// Set an inline style property; an empty value removes it.
    fn set_style_property(
        &mut self,
        node: &Self::Node,
        property: &str,
        value: &str,
    ) -> Result<(), HostError>;

    /// All descendant elements of `node` in document order, excluding `node`.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Bounding client rectangle.
    fn bounding_rect(&self, node: &Self::Node) -> Rect;
}

/// Pause state transition requested by an external custom event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseSignal {
    Pause,
    Resume,
}

impl PauseSignal {
    /// The paused flag this signal drives towards.
    #[must_use]
    pub const fn paused(self) -> bool {
        matches!(self, Self::Pause)
    }
}

/// Batched work to run on the next animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTask {
    /// Repaint every mask from the latest window pointer position.
    Repaint,
    /// Re-scan the document for new targets.
    Rescan,
}

/// A notification stream the engine wants the host to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription<N> {
    /// `style` attribute changes anywhere in the subtree of `target`,
    /// delivered to `Engine::handle_style_mutation`.
    StyleMutations { target: N },
    /// Box-size changes of `target`, delivered to `Engine::handle_resize`.
    Resize { target: N },
    /// Named custom events dispatched on `target`, delivered to
    /// `Engine::handle_pause_signal`.
    PauseSignals {
        target: N,
        pause_event: String,
        resume_event: String,
    },
    /// Pointer enter/move/leave on `wrapper`, delivered to
    /// `Engine::handle_wrapper_pointer` keyed by `target`.
    WrapperPointer { target: N, wrapper: N },
    /// Window-level pointer moves, delivered to
    /// `Engine::handle_window_pointer_move`.
    WindowPointer,
    /// Child-list changes anywhere under the document body, delivered to
    /// `Engine::handle_child_list_mutation`.
    ChildListMutations,
    /// One-shot notification once the document has finished parsing,
    /// delivered to `Engine::handle_document_ready`.
    DocumentReady,
}

/// Work the host must perform on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand<N> {
    Subscribe(Subscription<N>),
    /// Schedule one call of `Engine::run_frame` with this task.
    RequestFrame(FrameTask),
}
