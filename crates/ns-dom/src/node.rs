//! DOM Node
//!
//! Link fields plus node-specific data. Sibling/child pointers are kept
//! mutually consistent by the mutation methods on [`crate::Tree`].

use crate::{EventTarget, NodeId};

/// Node kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Document,
    DocumentFragment,
}

/// DOM Node
#[derive(Debug)]
pub struct Node {
    /// Parent node (None if detached or root)
    pub(crate) parent: Option<NodeId>,
    /// First child
    pub(crate) first_child: Option<NodeId>,
    /// Last child (for O(1) append)
    pub(crate) last_child: Option<NodeId>,
    /// Previous sibling
    pub(crate) prev_sibling: Option<NodeId>,
    /// Next sibling
    pub(crate) next_sibling: Option<NodeId>,
    /// Node-specific data
    pub(crate) data: NodeData,
    /// Listener registries (capture and bubble phase)
    pub(crate) events: EventTarget,
}

impl Node {
    pub(crate) fn with_data(data: NodeData) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data,
            events: EventTarget::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn events(&self) -> &EventTarget {
        &self.events
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::DocumentFragment => NodeType::DocumentFragment,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
        }
    }

    /// DOM node name (`#text`, `#comment`, tag name, ...)
    pub fn node_name(&self) -> &str {
        match &self.data {
            NodeData::Document => "#document",
            NodeData::DocumentFragment => "#document-fragment",
            NodeData::Element(e) => &e.tag,
            NodeData::Text(_) => "#text",
            NodeData::Comment(_) => "#comment",
        }
    }

    /// Whether this node type may hold children.
    #[inline]
    pub fn is_parent_node(&self) -> bool {
        matches!(
            self.data,
            NodeData::Document | NodeData::DocumentFragment | NodeData::Element(_)
        )
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get literal value if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Transient container; inserting it splices its children
    DocumentFragment,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name
    pub tag: String,
    /// Namespaced attributes
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value (null namespace)
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attr_ns(None, name)
    }

    /// Get a namespaced attribute value
    pub fn get_attr_ns(&self, ns: Option<&str>, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.as_deref() == ns && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute (null namespace)
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.set_attr_ns(None, name, value);
    }

    /// Set a namespaced attribute, overwriting an existing one
    pub fn set_attr_ns(&mut self, ns: Option<&str>, name: &str, value: impl Into<String>) {
        let value = value.into();
        for attr in self.attrs.iter_mut() {
            if attr.ns.as_deref() == ns && attr.name == name {
                attr.value = value;
                return;
            }
        }
        self.attrs.push(Attribute {
            ns: ns.map(str::to_owned),
            name: name.to_owned(),
            value,
        });
    }

    /// Remove an attribute, returning its former value
    pub fn remove_attr(&mut self, ns: Option<&str>, name: &str) -> Option<String> {
        let idx = self
            .attrs
            .iter()
            .position(|a| a.ns.as_deref() == ns && a.name == name)?;
        Some(self.attrs.remove(idx).value)
    }
}

/// Namespaced attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub ns: Option<String>,
    pub name: String,
    pub value: String,
}
