//! Error types for the editor

use markup_common::NodeKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Invalid tag name: {0:?}")]
    InvalidTagName(String),

    #[error("{field} is not editable on {kind:?} nodes")]
    NotEditable { kind: NodeKind, field: &'static str },

    #[error("The document element cannot be renamed")]
    DocumentElement,
}
