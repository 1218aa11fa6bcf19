//! Node metadata shared between the remote document and the mirror.
//!
//! A [`NodeFront`] is the local, cached view of a node that lives in a
//! (possibly remote) document. The remote side owns the node; the mirror
//! only ever holds the handle plus whatever metadata the last fetch
//! reported.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node in the remote document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Doctype,
    Document,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cached metadata for a remote node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFront {
    pub handle: NodeHandle,
    pub kind: NodeKind,

    /// Lower-case tag name for elements, `#text`, `#comment`, `#document`
    /// or the doctype name otherwise
    pub name: String,

    /// Attributes in document order, names unique
    #[serde(default)]
    pub attributes: Vec<Attribute>,

    /// Inline prefix of the node value (text and comment nodes)
    #[serde(default)]
    pub short_value: String,

    /// True when `short_value` is only a prefix of the full value
    #[serde(default)]
    pub incomplete_value: bool,

    pub num_children: usize,

    /// Back reference only; the mirror never walks ownership through it
    pub parent: Option<NodeHandle>,

    #[serde(default)]
    pub is_document_element: bool,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub public_id: Option<String>,

    #[serde(default)]
    pub system_id: Option<String>,
}

impl NodeFront {
    pub fn has_children(&self) -> bool {
        self.num_children > 0
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Nodes the user may not delete or restructure
    pub fn is_structural_root(&self) -> bool {
        self.is_document_element
            || matches!(self.kind, NodeKind::Doctype | NodeKind::Document)
    }
}

/// Paging request for a children fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenOptions {
    /// Maximum number of nodes to return, `None` for all of them
    pub max_nodes: Option<usize>,

    /// Child the returned window should be centered on
    pub center: Option<NodeHandle>,
}

/// A contiguous run of a node's children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenWindow {
    pub nodes: Vec<NodeFront>,

    /// The window starts at the first real child
    pub has_first: bool,

    /// The window ends at the last real child
    pub has_last: bool,
}

impl ChildrenWindow {
    pub fn is_complete(&self) -> bool {
        self.has_first && self.has_last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
    DocumentUnload,
}

/// One entry of the remote mutation feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeHandle,

    /// Parent of the unloaded document, for `DocumentUnload`
    #[serde(default)]
    pub target_parent: Option<NodeHandle>,

    /// Changed attribute, for `Attributes`
    #[serde(default)]
    pub attribute_name: Option<String>,
}

impl MutationRecord {
    pub fn attributes(target: NodeHandle, name: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            target_parent: None,
            attribute_name: Some(name.into()),
        }
    }

    pub fn character_data(target: NodeHandle) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            target_parent: None,
            attribute_name: None,
        }
    }

    pub fn child_list(target: NodeHandle) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            target_parent: None,
            attribute_name: None,
        }
    }

    pub fn document_unload(target: NodeHandle, target_parent: Option<NodeHandle>) -> Self {
        Self {
            kind: MutationKind::DocumentUnload,
            target,
            target_parent,
            attribute_name: None,
        }
    }
}

/// Single attribute change sent to the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum AttributeOp {
    Set { name: String, value: String },
    Remove { name: String },
}

impl AttributeOp {
    pub fn name(&self) -> &str {
        match self {
            AttributeOp::Set { name, .. } | AttributeOp::Remove { name } => name,
        }
    }
}

/// Handle to a node value fetched out of band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongString {
    pub id: u64,
    pub length: usize,
}
