//! Error types for the markup view

use crate::mirror::MirrorId;
use markup_common::{NodeHandle, RemoteError};
use markup_editor::EditorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Container {0:?} no longer exists")]
    StaleContainer(MirrorId),

    #[error("Node has not been imported: {0}")]
    NotImported(NodeHandle),

    #[error("Fetching children of {node} failed: {source}")]
    Remote {
        node: NodeHandle,
        #[source]
        source: RemoteError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type MarkupResult<T> = Result<T, MarkupError>;
