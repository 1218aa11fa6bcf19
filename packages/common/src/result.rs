use crate::error::RemoteError;

/// Result of a call through the remote walker
pub type RemoteResult<T> = Result<T, RemoteError>;
