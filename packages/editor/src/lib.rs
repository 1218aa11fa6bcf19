//! # Markup Editor
//!
//! Turns in-place edits of a markup tree into reversible remote edits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ user types into a node editor               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: text → intent → action pair         │
//! │  - NodeEditor per node kind                 │
//! │  - Tolerant attribute-string parser         │
//! │  - Forward + reverse attribute batches      │
//! │  - Bounded undo/redo stack                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ view: executes EditActions on the walker    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Remote is source of truth**: editors only describe what should
//!    change; the mutation feed confirms it
//! 2. **Every edit is paired**: the reverse is captured before the edit runs
//! 3. **Input never fails hard**: bad attribute syntax degrades to fewer
//!    attributes
//!
//! ## Usage
//!
//! ```rust
//! use markup_common::names::is_valid_attribute_name;
//! use markup_common::{Attribute, NodeFront, NodeHandle, NodeKind};
//! use markup_editor::{EditField, EditIntent, NodeEditor};
//!
//! let front = NodeFront {
//!     handle: NodeHandle(1),
//!     kind: NodeKind::Element,
//!     name: "div".into(),
//!     attributes: vec![Attribute::new("class", "a")],
//!     short_value: String::new(),
//!     incomplete_value: false,
//!     num_children: 0,
//!     parent: None,
//!     is_document_element: false,
//!     hidden: false,
//!     public_id: None,
//!     system_id: None,
//! };
//!
//! let mut editor = NodeEditor::for_node(&front);
//! let intent = editor
//!     .on_commit(
//!         EditField::Attribute("class".into()),
//!         r#"class="b""#,
//!         true,
//!         is_valid_attribute_name,
//!     )
//!     .unwrap();
//! assert!(matches!(intent, Some(EditIntent::ModifyAttributes { .. })));
//! ```

mod attr_parser;
mod editors;
mod errors;
mod mutations;
mod undo_stack;

pub use attr_parser::{parse_attribute_values, ParsedAttribute};
pub use editors::{
    quote_attribute_value, DoctypeEditor, EditField, EditIntent, ElementEditor, GenericEditor,
    NodeEditor, TextEditor, ELLIPSIS,
};
pub use errors::EditorError;
pub use mutations::{AttributeEditBatch, EditAction};
pub use undo_stack::{Action, UndoEntry, UndoStack, DEFAULT_UNDO_DEPTH};
