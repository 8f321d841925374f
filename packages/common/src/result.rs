use crate::error::SyncError;

/// Common Result type alias
pub type SyncResult<T> = Result<T, SyncError>;
