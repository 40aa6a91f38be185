//! DOM Tree (arena-based allocation)
//!
//! Nodes live in an arena addressed by [`NodeId`]; mutations rewrite the
//! sibling/child links in place. Detached subtrees stay allocated until the
//! tree itself is dropped.

use std::rc::Rc;

use crate::event_target::{ListenerEntry, Phase};
use crate::{DomResult, ElementData, Event, Node, NodeData, NodeId, NodeType, StructureError};

/// Arena-based DOM tree
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Get a node by ID. Ids are only minted by this tree, so a miss is a
    /// caller bug.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes ever allocated (detached nodes included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    pub fn create_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::with_data(data));
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Element(ElementData::new(tag.into())))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Text(content.into()))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.create_node(NodeData::Comment(content.into()))
    }

    pub fn create_document(&mut self) -> NodeId {
        self.create_node(NodeData::Document)
    }

    /// Create a transient container whose children are spliced on insert
    pub fn create_fragment(&mut self) -> NodeId {
        self.create_node(NodeData::DocumentFragment)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Ordered iterator over a node's children
    pub fn child_nodes(&self, id: NodeId) -> ChildNodes<'_> {
        ChildNodes {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    pub fn has_child_nodes(&self, id: NodeId) -> bool {
        self.node(id).first_child.is_some()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.child_nodes(id).count()
    }

    /// Position of `child` among `parent`'s children
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.child_nodes(parent).position(|c| c == child)
    }

    /// Whether `other` is a descendant of `id`
    pub fn contains(&self, id: NodeId, other: NodeId) -> bool {
        self.child_nodes(id)
            .any(|child| child == other || self.contains(child, other))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.node(id).prev_sibling;
        while let Some(sibling) = current {
            if self.node(sibling).node_type() == NodeType::Element {
                return Some(sibling);
            }
            current = self.node(sibling).prev_sibling;
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.node(id).next_sibling;
        while let Some(sibling) = current {
            if self.node(sibling).node_type() == NodeType::Element {
                return Some(sibling);
            }
            current = self.node(sibling).next_sibling;
        }
        None
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert `new_node` immediately before `reference` (append when the
    /// reference is None).
    ///
    /// A document fragment is spliced: all its children move into the
    /// parent contiguously at the reference position, in original order,
    /// and the fragment is left empty. A plain node is detached from any
    /// existing parent first — a node has at most one parent at any time.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        if let Some(r) = reference {
            if self.node(r).parent != Some(parent) {
                return Err(StructureError::ReferenceNotChild);
            }
        }

        if Some(new_node) == reference {
            return Ok(new_node);
        }

        tracing::trace!(?parent, node = ?new_node, ?reference, "insert_before");

        if self.node(new_node).node_type() == NodeType::DocumentFragment {
            self.splice_fragment(parent, new_node, reference);
        } else {
            self.detach(new_node);
            self.link_before(parent, new_node, reference);
        }

        Ok(new_node)
    }

    /// Append a child (insert with a null reference)
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, node, None)
    }

    /// Unlink a child, clearing its sibling/parent pointers.
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> DomResult<NodeId> {
        if self.node(node).parent != Some(parent) {
            return Err(StructureError::RemoveNonChild);
        }
        tracing::trace!(?parent, ?node, "remove_child");
        self.unlink(parent, node);
        Ok(node)
    }

    /// Swap `old_child` for `new_child` at the same position, returning the
    /// detached `old_child`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if self.node(old_child).parent != Some(parent) {
            return Err(StructureError::ReplaceNonChild);
        }

        let reference = self.node(old_child).next_sibling;
        self.unlink(parent, old_child);
        self.insert_before(parent, new_child, reference)?;
        Ok(old_child)
    }

    /// Replace `node` in its parent with `replacements`, detaching `node`.
    /// No-op when the node has no parent.
    pub fn replace_with(&mut self, node: NodeId, replacements: &[NodeId]) -> DomResult<()> {
        let Some(parent) = self.node(node).parent else {
            return Ok(());
        };

        let reference = self.node(node).next_sibling;
        self.unlink(parent, node);
        for &replacement in replacements {
            self.insert_before(parent, replacement, reference)?;
        }
        Ok(())
    }

    /// Detach a node from its parent, if it has one.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            self.unlink(parent, node);
        }
    }

    /// Clone a node. A shallow clone copies identity/type and, for
    /// elements, all namespaced attributes; `deep` re-creates the whole
    /// subtree in original order.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        let data = self.node(node).data.clone();
        let clone = self.create_node(data);

        if deep {
            let mut current = self.node(node).first_child;
            while let Some(child) = current {
                let next = self.node(child).next_sibling;
                let child_clone = self.clone_node(child, true);
                self.link_before(clone, child_clone, None);
                current = next;
            }
        }

        clone
    }

    fn unlink(&mut self, parent: NodeId, node: NodeId) {
        let (prev, next) = {
            let n = self.node(node);
            (n.prev_sibling, n.next_sibling)
        };

        if self.node(parent).first_child == Some(node) {
            self.node_mut(parent).first_child = next;
        }
        if self.node(parent).last_child == Some(node) {
            self.node_mut(parent).last_child = prev;
        }
        if let Some(p) = prev {
            self.node_mut(p).next_sibling = next;
        }
        if let Some(n) = next {
            self.node_mut(n).prev_sibling = prev;
        }

        let n = self.node_mut(node);
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Link an already-detached node before `reference` (append on None).
    fn link_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.node_mut(node).parent = Some(parent);

        match reference {
            Some(r) => {
                let prev = self.node(r).prev_sibling;
                self.node_mut(node).prev_sibling = prev;
                self.node_mut(node).next_sibling = Some(r);
                self.node_mut(r).prev_sibling = Some(node);
            }
            None => {
                let prev = self.node(parent).last_child;
                self.node_mut(node).prev_sibling = prev;
                self.node_mut(node).next_sibling = None;
                self.node_mut(parent).last_child = Some(node);
            }
        }

        match self.node(node).prev_sibling {
            Some(p) => self.node_mut(p).next_sibling = Some(node),
            None => self.node_mut(parent).first_child = Some(node),
        }
    }

    /// Move all of a fragment's children into `parent` at the reference
    /// position, leaving the fragment empty.
    fn splice_fragment(&mut self, parent: NodeId, fragment: NodeId, reference: Option<NodeId>) {
        let (first, last) = {
            let f = self.node(fragment);
            (f.first_child, f.last_child)
        };
        let (Some(first), Some(last)) = (first, last) else {
            return;
        };

        let mut current = Some(first);
        while let Some(child) = current {
            self.node_mut(child).parent = Some(parent);
            current = self.node(child).next_sibling;
        }

        match reference {
            Some(r) => {
                let prev = self.node(r).prev_sibling;
                self.node_mut(first).prev_sibling = prev;
                self.node_mut(last).next_sibling = Some(r);
                self.node_mut(r).prev_sibling = Some(last);
            }
            None => {
                let prev = self.node(parent).last_child;
                self.node_mut(first).prev_sibling = prev;
                self.node_mut(last).next_sibling = None;
            }
        }

        match self.node(first).prev_sibling {
            Some(p) => self.node_mut(p).next_sibling = Some(first),
            None => self.node_mut(parent).first_child = Some(first),
        }
        match self.node(last).next_sibling {
            Some(n) => self.node_mut(n).prev_sibling = Some(last),
            None => self.node_mut(parent).last_child = Some(last),
        }

        let f = self.node_mut(fragment);
        f.first_child = None;
        f.last_child = None;
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch an event on `target`, walking the ancestor chain for the
    /// capture (root-first) and bubble (target-first) phases.
    ///
    /// Returns `false` if the event was cancelable and a handler prevented
    /// the default action.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> bool {
        if event.target.is_none() || event.current_target.is_none() {
            event.target = Some(target);
            event.current_target = Some(target);
        }

        let ty = event.event_type().to_owned();
        let mut capture_stores: Vec<(NodeId, Vec<Rc<ListenerEntry>>)> = Vec::new();
        let mut bubble_stores: Vec<(NodeId, Vec<Rc<ListenerEntry>>)> = Vec::new();

        if event.bubbles() || event.captures() {
            let mut current = Some(target);
            while let Some(id) = current {
                let node = self.node(id);
                if event.captures() {
                    if let Some(store) = node.events.snapshot(&ty, Phase::Capture) {
                        capture_stores.insert(0, (id, store));
                    }
                }
                if event.bubbles() {
                    if let Some(store) = node.events.snapshot(&ty, Phase::Bubble) {
                        bubble_stores.push((id, store));
                    }
                }
                current = node.parent;
            }
        }

        if !event.captures() {
            if let Some(store) = self.node(target).events.snapshot(&ty, Phase::Capture) {
                capture_stores.push((target, store));
            }
        }
        if !event.bubbles() {
            if let Some(store) = self.node(target).events.snapshot(&ty, Phase::Bubble) {
                bubble_stores.push((target, store));
            }
        }

        for (owner, store) in &capture_stores {
            self.dispatch_to_store(*owner, store, &ty, Phase::Capture, event);
            if !event.bubbles() || event.propagation_stopped {
                return !event.default_prevented();
            }
        }

        for (owner, store) in &bubble_stores {
            self.dispatch_to_store(*owner, store, &ty, Phase::Bubble, event);
            if !event.bubbles() || event.propagation_stopped {
                return !event.default_prevented();
            }
        }

        !event.default_prevented()
    }

    fn dispatch_to_store(
        &self,
        owner: NodeId,
        store: &[Rc<ListenerEntry>],
        ty: &str,
        phase: Phase,
        event: &mut Event,
    ) {
        let cancelable = event.cancelable();
        for entry in store {
            if entry.removed.get() {
                continue;
            }
            event.passive = !cancelable || entry.passive;
            event.current_target = Some(owner);

            // A once listener unregisters before the handler runs.
            if entry.once {
                self.node(owner).events.remove_entry(ty, phase, entry.id);
            }

            (entry.handler.borrow_mut())(event);

            if event.immediate_propagation_stopped {
                return;
            }
        }
    }
}

/// Iterator over a node's children
pub struct ChildNodes<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for ChildNodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}
