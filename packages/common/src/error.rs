use crate::node::NodeHandle;
use thiserror::Error;

/// Failure reported by the remote side of the markup mirror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeHandle),

    #[error("String contains an invalid character: {0:?}")]
    InvalidCharacter(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Long string {0} was already released")]
    LongStringReleased(u64),

    #[error("Remote document disconnected")]
    Disconnected,

    #[error("Remote failure: {0}")]
    Failed(String),
}

impl From<String> for RemoteError {
    fn from(s: String) -> Self {
        RemoteError::Failed(s)
    }
}

impl From<&str> for RemoteError {
    fn from(s: &str) -> Self {
        RemoteError::Failed(s.to_string())
    }
}
