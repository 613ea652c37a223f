#![forbid(unsafe_code)]

//! Overlay records and the DOM work that builds them.
//!
//! Each target is wrapped like this:
//!
//! ```text
//! <span|div class="cah-wrap" style="display: ..; position: relative">
//!   <target .../>
//!   <span class="cah-overlay" aria-hidden inert ...>
//!     <target-copy class=".. cah-clone"/>
//!   </span>
//! </span|div>
//! ```
//!
//! The wrapper tag follows the target's computed display so surrounding
//! layout is preserved. Records are never torn down; they live as long as
//! the page.

use std::collections::HashMap;

use crate::clone_sync::{build_clone, prime_transforms};
use crate::dom::{DomHost, HostError};
use crate::mask::clear_mask;
use crate::{OVERLAY_CLASS, WRAPPER_CLASS};

const OVERLAY_TRANSITION: &str = "opacity 0.18s ease";
const OVERLAY_ATTRIBUTES: [(&str, &str); 4] = [
    ("aria-hidden", "true"),
    ("role", "presentation"),
    ("data-nosnippet", "true"),
    ("inert", "true"),
];
const INHERITED_TYPOGRAPHY: [&str; 3] = ["font-size", "font-family", "line-height"];

/// Per-target overlay state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRecord<N> {
    /// Positioning container around the target.
    pub wrapper: N,
    /// Non-interactive layer holding the mask, filter and clone.
    pub overlay: N,
    /// Visual mirror of the target.
    pub clone: N,
    paused: bool,
    wiring: Wiring,
}

/// Which host subscriptions were requested for a record.
///
/// Listeners are never removed, so this only documents what the record is
/// being fed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wiring {
    pub style_sync: bool,
    pub resize: bool,
    pub pointer: bool,
}

impl<N> OverlayRecord<N> {
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub const fn wiring(&self) -> Wiring {
        self.wiring
    }

    pub(crate) fn set_wiring(&mut self, wiring: Wiring) {
        self.wiring = wiring;
    }
}

impl<N: Clone> OverlayRecord<N> {
    /// Move to `paused`, suppressing or restoring the overlay.
    ///
    /// Any transition also clears the mask so no stale cutout shows before
    /// the next pointer event. Returns `false` (and does nothing) when the
    /// record is already in that state.
    pub fn set_paused<H>(&mut self, host: &mut H, paused: bool) -> Result<bool, HostError>
    where
        H: DomHost<Node = N> + ?Sized,
    {
        if self.paused == paused {
            return Ok(false);
        }
        self.paused = paused;
        let (opacity, visibility) = if paused { ("0", "hidden") } else { ("", "") };
        host.set_style_property(&self.overlay, "opacity", opacity)?;
        host.set_style_property(&self.overlay, "visibility", visibility)?;
        clear_mask(host, &self.overlay)?;
        Ok(true)
    }
}

/// Identity-keyed map of every wrapped target.
#[derive(Debug, Clone)]
pub struct OverlayRegistry<N> {
    records: HashMap<N, OverlayRecord<N>>,
}

impl<N> Default for OverlayRegistry<N> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + core::hash::Hash> OverlayRegistry<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, target: &N) -> bool {
        self.records.contains_key(target)
    }

    #[must_use]
    pub fn get(&self, target: &N) -> Option<&OverlayRecord<N>> {
        self.records.get(target)
    }

    pub fn get_mut(&mut self, target: &N) -> Option<&mut OverlayRecord<N>> {
        self.records.get_mut(target)
    }

    /// Register `record` for `target`. An existing record always wins; the
    /// return value says whether the insert took place.
    pub fn insert(&mut self, target: N, record: OverlayRecord<N>) -> bool {
        if self.records.contains_key(&target) {
            return false;
        }
        self.records.insert(target, record);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&N, &OverlayRecord<N>)> {
        self.records.iter()
    }
}

/// Wrapper element category and normalized display for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperLayout {
    pub tag: &'static str,
    pub display: String,
}

impl WrapperLayout {
    /// Pick an inline-compatible (`span`) or block-compatible (`div`)
    /// wrapper. Plain `inline` becomes `inline-block` so the wrapper can
    /// establish a positioning context.
    #[must_use]
    pub fn for_display(computed: Option<&str>) -> Self {
        let display = computed
            .map(str::trim)
            .filter(|display| !display.is_empty())
            .unwrap_or("inline-block");
        let tag = if display.starts_with("inline") {
            "span"
        } else {
            "div"
        };
        let display = if display == "inline" {
            "inline-block"
        } else {
            display
        };
        Self {
            tag,
            display: display.to_owned(),
        }
    }
}

/// Whether `node` is a wrapper or sits anywhere inside one.
pub fn inside_wrapper<H: DomHost + ?Sized>(host: &H, node: &H::Node) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if host.has_class(&candidate, WRAPPER_CLASS) {
            return true;
        }
        current = host.parent_element(&candidate);
    }
    false
}

/// Wrap `target` and build its overlay layer and clone.
///
/// Returns `Ok(None)` when the target has no parent to be wrapped in. The
/// returned record starts unpaused with a cleared mask and primed clone
/// transforms; subscriptions are the caller's job.
pub fn build_overlay<H: DomHost + ?Sized>(
    host: &mut H,
    target: &H::Node,
    filter: &str,
) -> Result<Option<OverlayRecord<H::Node>>, HostError> {
    let Some(parent) = host.parent_element(target) else {
        return Ok(None);
    };
    let layout = WrapperLayout::for_display(host.computed_display(target).as_deref());

    let wrapper = host.create_element(layout.tag)?;
    host.add_class(&wrapper, WRAPPER_CLASS)?;
    host.set_style_property(&wrapper, "display", &layout.display)?;
    host.set_style_property(&wrapper, "position", "relative")?;
    host.insert_before(&parent, &wrapper, target)?;
    host.append_child(&wrapper, target)?;

    let overlay = host.create_element("span")?;
    host.add_class(&overlay, OVERLAY_CLASS)?;
    for (name, value) in OVERLAY_ATTRIBUTES {
        host.set_attribute(&overlay, name, value)?;
    }
    host.set_style_property(&overlay, "filter", filter)?;
    host.set_style_property(&overlay, "transition", OVERLAY_TRANSITION)?;
    for property in INHERITED_TYPOGRAPHY {
        host.set_style_property(&overlay, property, "inherit")?;
    }

    let clone = build_clone(host, target)?;
    host.append_child(&overlay, &clone)?;
    host.append_child(&wrapper, &overlay)?;

    clear_mask(host, &overlay)?;
    prime_transforms(host, target, &clone)?;

    Ok(Some(OverlayRecord {
        wrapper,
        overlay,
        clone,
        paused: false,
        wiring: Wiring::default(),
    }))
}
