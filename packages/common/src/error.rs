use std::fmt::Display;
use thiserror::Error;

/// Errors raised by the synchronization engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network or auth failure talking to the design service. The cached
    /// document is left untouched.
    #[error("Remote fetch failed: {cause}")]
    RemoteFetchFailed { cause: String },

    /// A state record could not be written or read. The mutation that
    /// triggered the write has already been rolled back in memory.
    #[error("Persistence failed: {cause}")]
    PersistenceFailed { cause: String },

    /// Children were requested for a leaf layer.
    #[error("Layer {layer_id} is not expandable")]
    NotExpandable { layer_id: String },

    #[error("Unknown layer: {layer_id}")]
    UnknownLayer { layer_id: String },

    #[error("File is not attached to a design document")]
    NotAttached,

    #[error("No active file")]
    NoActiveFile,

    /// A newer request for the same file made this one obsolete before its
    /// fetch finished.
    #[error("Request superseded by a newer one")]
    Superseded,

    /// The controller's event loop has exited; requests can no longer be served.
    #[error("Sync controller stopped")]
    ControllerStopped,
}

impl SyncError {
    pub fn remote_fetch_failed(cause: impl Display) -> Self {
        SyncError::RemoteFetchFailed {
            cause: cause.to_string(),
        }
    }

    pub fn persistence_failed(cause: impl Display) -> Self {
        SyncError::PersistenceFailed {
            cause: cause.to_string(),
        }
    }

    pub fn not_expandable(layer_id: impl Into<String>) -> Self {
        SyncError::NotExpandable {
            layer_id: layer_id.into(),
        }
    }

    pub fn unknown_layer(layer_id: impl Into<String>) -> Self {
        SyncError::UnknownLayer {
            layer_id: layer_id.into(),
        }
    }

    /// Whether the error should be shown to the user as a message rather than
    /// only logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            SyncError::NotExpandable { .. } | SyncError::Superseded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SyncError::remote_fetch_failed("403 Forbidden");
        assert_eq!(err.to_string(), "Remote fetch failed: 403 Forbidden");

        let err = SyncError::not_expandable("1:2");
        assert_eq!(err.to_string(), "Layer 1:2 is not expandable");
        assert!(!err.is_user_facing());
        assert!(!SyncError::Superseded.is_user_facing());
    }

    #[test]
    fn test_persistence_error_is_user_facing() {
        let err = SyncError::persistence_failed("disk full");
        assert!(err.is_user_facing());
        assert!(matches!(err, SyncError::PersistenceFailed { .. }));
    }
}
