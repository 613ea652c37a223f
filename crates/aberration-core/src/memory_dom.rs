#![forbid(unsafe_code)]

//! In-memory document implementing [`DomHost`].
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. The model covers
//! exactly what the overlay engine observes: tag names, attributes (classes
//! and ids included), inline styles, a computed `display`, and a bounding
//! rectangle that callers set explicitly since there is no layout.
//!
//! Selector support is deliberately small: compound selectors built from a
//! tag name or `*`, `#id` and `.class` parts, joined by the descendant
//! combinator (whitespace). Anything else is rejected as
//! [`HostError::InvalidSelector`].

use std::collections::BTreeMap;

use crate::dom::{DomHost, DomTree, HostError};
use crate::geometry::Rect;

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "br", "code", "em", "i", "img", "label", "small", "span", "strong", "sub",
    "sup", "svg",
];

/// Arena handle for a [`MemoryDom`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    display: Option<String>,
    rect: Rect,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            display: None,
            rect: Rect::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(String::as_str)
            .unwrap_or_default()
            .split_ascii_whitespace()
    }
}

/// Headless document rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    body: NodeId,
}

impl MemoryDom {
    /// Create a document containing only an empty `body`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("body")],
            body: NodeId(0),
        }
    }

    /// The document body.
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes ever created, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Create a detached element.
    pub fn create(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(tag));
        id
    }

    /// Create an element and append it to `parent`.
    pub fn append_new(&mut self, parent: &NodeId, tag: &str) -> NodeId {
        let id = self.create(tag);
        self.attach(*parent, id, None);
        id
    }

    /// Detach `node` from its parent, keeping its subtree intact.
    pub fn remove(&mut self, node: &NodeId) {
        self.detach(*node);
    }

    /// Lowercased tag name.
    #[must_use]
    pub fn tag(&self, node: &NodeId) -> &str {
        &self.data(*node).tag
    }

    /// Attribute value, if set.
    #[must_use]
    pub fn attribute(&self, node: &NodeId, name: &str) -> Option<&str> {
        self.data(*node).attributes.get(name).map(String::as_str)
    }

    /// Class list in declaration order.
    #[must_use]
    pub fn classes(&self, node: &NodeId) -> Vec<String> {
        self.data(*node).classes().map(str::to_owned).collect()
    }

    /// Override the computed `display` reported when no inline `display`
    /// is set.
    pub fn set_computed_display(&mut self, node: &NodeId, display: &str) {
        self.data_mut(*node).display = Some(display.to_owned());
    }

    /// Set the rectangle reported by [`DomHost::bounding_rect`].
    pub fn set_rect(&mut self, node: &NodeId, rect: Rect) {
        self.data_mut(*node).rect = rect;
    }

    /// Whether `node` is reachable from the body.
    #[must_use]
    pub fn is_attached(&self, node: &NodeId) -> bool {
        let mut current = Some(*node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.data(id).parent;
        }
        false
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0 as usize]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.0 as usize]
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.data_mut(node).parent.take() {
            self.data_mut(parent).children.retain(|child| *child != node);
        }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId, index: Option<usize>) {
        self.detach(node);
        self.data_mut(node).parent = Some(parent);
        let children = &mut self.data_mut(parent).children;
        match index {
            Some(index) => children.insert(index, node),
            None => children.push(node),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.data(id).parent;
        }
        false
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.data(node).children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let mut copy = self.data(node).clone();
        copy.parent = None;
        copy.children = Vec::new();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(copy);
        for child in self.data(node).children.clone() {
            let child_copy = self.clone_subtree(child);
            self.attach(id, child_copy, None);
        }
        id
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let data = self.data(node);
        if let Some(tag) = &compound.tag
            && *tag != data.tag
        {
            return false;
        }
        if let Some(id) = &compound.id
            && data.attributes.get("id") != Some(id)
        {
            return false;
        }
        compound
            .classes
            .iter()
            .all(|class| data.classes().any(|have| have == class))
    }

    fn matches_chain(&self, node: NodeId, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }
        let mut remaining = ancestors;
        let mut current = self.data(node).parent;
        while let Some((next, rest)) = remaining.split_last() {
            let Some(id) = current else {
                return false;
            };
            if self.matches_compound(id, next) {
                remaining = rest;
            }
            current = self.data(id).parent;
        }
        true
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree for MemoryDom {
    type Node = NodeId;

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.data(*node).parent
    }

    fn element_children(&self, node: &NodeId) -> Vec<NodeId> {
        self.data(*node).children.clone()
    }
}

impl DomHost for MemoryDom {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, HostError> {
        let chain = parse_selector(selector)?;
        let mut scope = vec![self.body];
        self.collect_descendants(self.body, &mut scope);
        Ok(scope
            .into_iter()
            .filter(|node| self.matches_chain(*node, &chain))
            .collect())
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.data(*node).classes().any(|have| have == class)
    }

    fn add_class(&mut self, node: &NodeId, class: &str) -> Result<(), HostError> {
        if self.has_class(node, class) {
            return Ok(());
        }
        let attributes = &mut self.data_mut(*node).attributes;
        let list = attributes.entry("class".to_owned()).or_default();
        if !list.is_empty() {
            list.push(' ');
        }
        list.push_str(class);
        Ok(())
    }

    fn computed_display(&self, node: &NodeId) -> Option<String> {
        let data = self.data(*node);
        if let Some(display) = data.styles.get("display") {
            return Some(display.clone());
        }
        if let Some(display) = &data.display {
            return Some(display.clone());
        }
        let default = if INLINE_TAGS.contains(&data.tag.as_str()) {
            "inline"
        } else {
            "block"
        };
        Some(default.to_owned())
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, HostError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(HostError::Operation(format!("invalid tag name: {tag:?}")));
        }
        Ok(self.create(tag))
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        node: &NodeId,
        reference: &NodeId,
    ) -> Result<(), HostError> {
        if self.is_inclusive_ancestor(*node, *parent) {
            return Err(HostError::Operation(
                "cannot insert a node into its own subtree".to_owned(),
            ));
        }
        if node == reference {
            return Ok(());
        }
        if !self.data(*parent).children.contains(reference) {
            return Err(HostError::Detached);
        }
        self.detach(*node);
        let index = self
            .data(*parent)
            .children
            .iter()
            .position(|child| child == reference)
            .ok_or(HostError::Detached)?;
        self.attach(*parent, *node, Some(index));
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        if self.is_inclusive_ancestor(*child, *parent) {
            return Err(HostError::Operation(
                "cannot append a node into its own subtree".to_owned(),
            ));
        }
        self.attach(*parent, *child, None);
        Ok(())
    }

    fn deep_clone(&mut self, node: &NodeId) -> Result<NodeId, HostError> {
        Ok(self.clone_subtree(*node))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), HostError> {
        self.data_mut(*node)
            .attributes
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        self.data_mut(*node).attributes.remove(name);
    }

    fn style_property(&self, node: &NodeId, property: &str) -> String {
        self.data(*node)
            .styles
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn set_style_property(
        &mut self,
        node: &NodeId,
        property: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let styles = &mut self.data_mut(*node).styles;
        if value.is_empty() {
            styles.remove(property);
        } else {
            styles.insert(property.to_owned(), value.to_owned());
        }
        Ok(())
    }

    fn descendants(&self, node: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(*node, &mut out);
        out
    }

    fn bounding_rect(&self, node: &NodeId) -> Rect {
        self.data(*node).rect
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

fn parse_selector(selector: &str) -> Result<Vec<Compound>, HostError> {
    let invalid = || HostError::InvalidSelector(selector.to_owned());
    let chain = selector
        .split_ascii_whitespace()
        .map(|part| parse_compound(part).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()?;
    if chain.is_empty() {
        return Err(invalid());
    }
    Ok(chain)
}

fn parse_compound(part: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = part;
    if let Some(tail) = rest.strip_prefix('*') {
        rest = tail;
    } else {
        let end = rest.find(['.', '#']).unwrap_or(rest.len());
        if end > 0 {
            compound.tag = Some(identifier(&rest[..end])?.to_ascii_lowercase());
        }
        rest = &rest[end..];
    }
    while let Some(marker) = rest.chars().next() {
        let body = rest.get(1..)?;
        let end = body.find(['.', '#']).unwrap_or(body.len());
        let name = identifier(&body[..end])?.to_owned();
        match marker {
            '.' => compound.classes.push(name),
            '#' if compound.id.is_none() => compound.id = Some(name),
            _ => return None,
        }
        rest = &body[end..];
    }
    Some(compound)
}

fn identifier(raw: &str) -> Option<&str> {
    let valid = !raw.is_empty()
        && !raw.starts_with(|c: char| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(raw)
}
