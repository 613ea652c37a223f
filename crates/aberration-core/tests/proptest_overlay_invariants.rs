//! Property-based tests for structural addressing and scan invariants.
//!
//! Documents are random element trees under the body of a [`MemoryDom`].
//!
//! 1. **Path round trip**: for any descendant, resolving the computed path
//!    from the same root lands on the same node.
//! 2. **Foreign nodes**: a node outside the root's subtree has no path.
//! 3. **Clone correspondence**: a path computed on an original resolves to
//!    a node of the same tag in a fresh deep clone.
//! 4. **Scan idempotence**: a second scan over an unchanged document
//!    creates nothing, and each target is wrapped exactly once.
//! 5. **Nesting guard**: no clone node is ever registered as a target.
//! 6. **Unique ids**: cloning never duplicates an `id` in the document.

use aberration_core::addressing::{path_to, resolve_path};
use aberration_core::memory_dom::{MemoryDom, NodeId};
use aberration_core::{
    CLONE_CLASS, DomHost, DomTree, Engine, HostCapabilities, Settings, WRAPPER_CLASS,
};
use proptest::prelude::*;

const TAGS: [&str; 4] = ["div", "span", "img", "a"];
const SELECTOR_POOL: [&str; 6] = ["img", "a img", "div", "span", ".hot", "div .hot"];

// ── Helpers ─────────────────────────────────────────────────────────────

/// One generated element: a parent pick, a tag, and whether it is `.hot`.
type Spec = (usize, usize, bool);

fn tree_strategy() -> impl Strategy<Value = Vec<Spec>> {
    prop::collection::vec((any::<usize>(), 0..TAGS.len(), any::<bool>()), 1..24)
}

/// Build the document. Node `i` hangs off the body or any earlier node.
fn build(specs: &[Spec]) -> (MemoryDom, Vec<NodeId>) {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let mut nodes: Vec<NodeId> = Vec::with_capacity(specs.len());
    for (i, &(pick, tag, hot)) in specs.iter().enumerate() {
        let slot = pick % (i + 1);
        let parent = if slot == i { body } else { nodes[slot] };
        let node = dom.append_new(&parent, TAGS[tag]);
        dom.set_attribute(&node, "id", &format!("n{i}")).unwrap();
        if hot {
            dom.add_class(&node, "hot").unwrap();
        }
        nodes.push(node);
    }
    (dom, nodes)
}

fn is_inclusive_descendant(dom: &MemoryDom, root: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if candidate == root {
            return true;
        }
        current = dom.parent_element(&candidate);
    }
    false
}

fn has_ancestor_class(dom: &MemoryDom, node: NodeId, class: &str) -> bool {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if dom.has_class(&candidate, class) {
            return true;
        }
        current = dom.parent_element(&candidate);
    }
    false
}

fn selectors_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(0..SELECTOR_POOL.len(), 0..4)
        .prop_map(|picks| picks.into_iter().map(|i| SELECTOR_POOL[i].to_owned()).collect())
}

// ── Addressing ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn path_round_trips_inside_subtree(
        specs in tree_strategy(),
        root_pick in any::<usize>(),
        target_pick in any::<usize>(),
    ) {
        let (dom, nodes) = build(&specs);
        let root = nodes[root_pick % nodes.len()];
        let target = nodes[target_pick % nodes.len()];

        let path = path_to(&dom, &root, &target);
        if is_inclusive_descendant(&dom, root, target) {
            let path = path.expect("descendant must have a path");
            prop_assert_eq!(resolve_path(&dom, &root, &path), Some(target));
        } else {
            prop_assert_eq!(path, None, "foreign node must have no path");
        }
    }

    #[test]
    fn body_reaches_every_node(specs in tree_strategy()) {
        let (dom, nodes) = build(&specs);
        let body = dom.body();
        for node in nodes {
            let path = path_to(&dom, &body, &node).expect("attached node has a path");
            prop_assert_eq!(resolve_path(&dom, &body, &path), Some(node));
        }
    }

    #[test]
    fn path_transfers_to_fresh_clone(
        specs in tree_strategy(),
        target_pick in any::<usize>(),
    ) {
        let (mut dom, nodes) = build(&specs);
        let root = nodes[0];
        let descendants = dom.descendants(&root);
        prop_assume!(!descendants.is_empty());
        let target = descendants[target_pick % descendants.len()];

        let copy = dom.deep_clone(&root).unwrap();
        let path = path_to(&dom, &root, &target).unwrap();
        let counterpart = resolve_path(&dom, &copy, &path).expect("clone has the same shape");
        prop_assert_eq!(dom.tag(&counterpart), dom.tag(&target));
        prop_assert_ne!(counterpart, target);
    }
}

// ── Scanning ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn scan_is_idempotent(
        specs in tree_strategy(),
        selectors in selectors_strategy(),
    ) {
        let (dom, _) = build(&specs);
        let settings = Settings { selectors: selectors.clone(), ..Settings::default() };
        let mut engine = Engine::new(dom, settings, HostCapabilities::full());

        let created = engine.scan();
        prop_assert_eq!(engine.scan(), 0, "second scan must create nothing");
        prop_assert_eq!(engine.overlay_count(), created);

        // Wrappers copied into a clone are inert markup, not records.
        let dom = engine.host();
        let live_wrappers = dom
            .query_selector_all(&format!(".{WRAPPER_CLASS}"))
            .unwrap()
            .into_iter()
            .filter(|wrapper| !has_ancestor_class(dom, *wrapper, CLONE_CLASS))
            .count();
        prop_assert_eq!(live_wrappers, created, "one wrapper per record");
        if selectors.is_empty() {
            prop_assert_eq!(created, 0);
        }
    }

    #[test]
    fn every_match_is_wrapped_or_guarded(
        specs in tree_strategy(),
        selectors in selectors_strategy(),
    ) {
        let (dom, _) = build(&specs);
        let settings = Settings { selectors: selectors.clone(), ..Settings::default() };
        let mut engine = Engine::new(dom, settings, HostCapabilities::full());
        engine.scan();

        let dom = engine.host();
        for selector in &selectors {
            for element in dom.query_selector_all(selector).unwrap() {
                let registered = engine.overlay(&element).is_some();
                prop_assert!(
                    registered || has_ancestor_class(dom, element, WRAPPER_CLASS),
                    "unwrapped match {:?} for {}", element, selector
                );
                if let Some(record) = engine.overlay(&element) {
                    prop_assert_eq!(dom.parent_element(&element), Some(record.wrapper));
                    prop_assert!(!has_ancestor_class(dom, element, CLONE_CLASS));
                }
            }
        }
    }

    #[test]
    fn ids_stay_unique_after_cloning(
        specs in tree_strategy(),
        selectors in selectors_strategy(),
    ) {
        let (dom, _) = build(&specs);
        let settings = Settings { selectors, ..Settings::default() };
        let mut engine = Engine::new(dom, settings, HostCapabilities::none());
        engine.scan();

        for i in 0..specs.len() {
            let matches = engine.host().query_selector_all(&format!("#n{i}")).unwrap();
            prop_assert_eq!(matches.len(), 1, "id n{} duplicated", i);
        }
    }
}
