//! # Edit Actions
//!
//! The reversible remote edits a user can make from the markup view.
//!
//! ## Design Principles
//!
//! 1. **Paired**: every edit is recorded as a forward action and the
//!    action that restores the prior state
//! 2. **Data, not closures**: actions are plain values so an async driver
//!    can execute them against the remote walker
//! 3. **Not atomic**: an attribute batch is applied one operation at a
//!    time by the remote side and may partially succeed
//!
//! ## Action Semantics
//!
//! ### ModifyAttributes
//! - Applies the batch in order; later operations on the same name win
//!
//! ### ReplaceElement
//! - Inserts `new` before `old`, moves all of `old`'s children into `new`,
//!   then detaches `old`. Its inverse is the same action with the roles
//!   swapped.
//!
//! ### RemoveNode / InsertNode
//! - Removal detaches the node (which was retained beforehand); insertion
//!   puts it back before the sibling that followed it

use markup_common::{AttributeOp, NodeHandle};
use serde::{Deserialize, Serialize};

/// Ordered attribute set/remove operations for one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEditBatch {
    ops: Vec<AttributeOp>,
}

impl AttributeEditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.ops.push(AttributeOp::Set {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn remove_attribute(&mut self, name: impl Into<String>) {
        self.ops.push(AttributeOp::Remove { name: name.into() });
    }

    pub fn ops(&self) -> &[AttributeOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// A reversible edit against the remote document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditAction {
    ModifyAttributes {
        node: NodeHandle,
        batch: AttributeEditBatch,
    },

    /// Replace the whole value of a text or comment node
    SetNodeValue { node: NodeHandle, value: String },

    /// Swap `old` out of the tree for `new`, carrying the children over
    ReplaceElement { old: NodeHandle, new: NodeHandle },

    RemoveNode { node: NodeHandle },

    InsertNode {
        node: NodeHandle,
        parent: NodeHandle,
        before: Option<NodeHandle>,
    },
}

impl EditAction {
    /// Node the action is about
    pub fn target(&self) -> NodeHandle {
        match self {
            EditAction::ModifyAttributes { node, .. }
            | EditAction::SetNodeValue { node, .. }
            | EditAction::RemoveNode { node }
            | EditAction::InsertNode { node, .. } => *node,
            EditAction::ReplaceElement { new, .. } => *new,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditAction::ModifyAttributes { .. } => "modify-attributes",
            EditAction::SetNodeValue { .. } => "set-node-value",
            EditAction::ReplaceElement { .. } => "replace-element",
            EditAction::RemoveNode { .. } => "remove-node",
            EditAction::InsertNode { .. } => "insert-node",
        }
    }
}
