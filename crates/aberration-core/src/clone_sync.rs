#![forbid(unsafe_code)]

//! Shadow clones and transform synchronization.
//!
//! Only the `transform` style channel is mirrored from a target onto its
//! clone. Other inline style or attribute changes on the original are not
//! reflected; the clone is a snapshot plus live transforms.

use tracing::trace;

use crate::CLONE_CLASS;
use crate::addressing::{path_to, resolve_path};
use crate::capabilities::HostCapabilities;
use crate::dom::{DomHost, HostCommand, HostError, Subscription};

/// Inline style property mirrored onto clones.
pub const TRANSFORM: &str = "transform";

/// Result of mirroring one style change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The transform was copied onto the clone counterpart.
    Applied,
    /// The changed node is not inside the target subtree.
    OutsideTarget,
    /// The path has no counterpart in the clone (structures diverged).
    Unresolved,
}

/// Deep-copy `element` for use inside an overlay.
///
/// Every `id` in the copy is removed so the document never holds duplicate
/// ids, and the copy is tagged with [`CLONE_CLASS`].
pub fn build_clone<H: DomHost + ?Sized>(
    host: &mut H,
    element: &H::Node,
) -> Result<H::Node, HostError> {
    let clone = host.deep_clone(element)?;
    host.remove_attribute(&clone, "id");
    for node in host.descendants(&clone) {
        host.remove_attribute(&node, "id");
    }
    host.add_class(&clone, CLONE_CLASS)?;
    Ok(clone)
}

/// Copy current transforms from `element` and its descendants onto `clone`.
///
/// Descendants are paired by document order, which matches only while
/// neither tree has changed structurally since cloning. The root transform
/// is always copied (empty included); descendants only when set.
pub fn prime_transforms<H: DomHost + ?Sized>(
    host: &mut H,
    element: &H::Node,
    clone: &H::Node,
) -> Result<(), HostError> {
    let root = host.style_property(element, TRANSFORM);
    host.set_style_property(clone, TRANSFORM, &root)?;

    let originals = host.descendants(element);
    let copies = host.descendants(clone);
    for (original, copy) in originals.iter().zip(&copies) {
        let transform = host.style_property(original, TRANSFORM);
        if !transform.is_empty() {
            host.set_style_property(copy, TRANSFORM, &transform)?;
        }
    }
    Ok(())
}

/// The subscription that keeps `target`'s clone in sync, if the host can
/// observe mutations at all.
#[must_use]
pub fn observe_style_changes<N: Clone>(
    target: &N,
    capabilities: HostCapabilities,
) -> Option<HostCommand<N>> {
    capabilities.mutation_observer.then(|| {
        HostCommand::Subscribe(Subscription::StyleMutations {
            target: target.clone(),
        })
    })
}

/// Mirror the transform of `changed` (the target or one of its descendants)
/// onto the matching node of `clone`.
pub fn sync_style_change<H: DomHost + ?Sized>(
    host: &mut H,
    element: &H::Node,
    clone: &H::Node,
    changed: &H::Node,
) -> Result<SyncOutcome, HostError> {
    let counterpart = if changed == element {
        clone.clone()
    } else {
        let Some(path) = path_to(&*host, element, changed) else {
            return Ok(SyncOutcome::OutsideTarget);
        };
        let Some(node) = resolve_path(&*host, clone, &path) else {
            trace!(
                target: "aberration_core::clone_sync",
                ?path,
                "no clone counterpart for changed node"
            );
            return Ok(SyncOutcome::Unresolved);
        };
        node
    };
    let transform = host.style_property(changed, TRANSFORM);
    host.set_style_property(&counterpart, TRANSFORM, &transform)?;
    Ok(SyncOutcome::Applied)
}
