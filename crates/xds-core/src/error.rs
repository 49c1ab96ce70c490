//! Error types for the cache layer.
//!
//! Every failure in the cache layer is local-recover-and-log: callers log
//! an [`XdsError`] and carry on with the previous state. The conversion to
//! [`tonic::Status`] exists for the serving layer, which may surface some of
//! these errors on the wire.

/// Error type for cache, translation, and publishing operations.
///
/// # Example
///
/// ```rust
/// use xds_core::XdsError;
///
/// fn validate(name: &str) -> Result<(), XdsError> {
///     if name.is_empty() {
///         return Err(XdsError::InvalidCluster {
///             name: name.to_string(),
///             reason: "cluster name is empty".to_string(),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(validate("").is_err());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum XdsError {
    /// A service cluster or one of its backends failed validation.
    #[error("invalid cluster {name:?}: {reason}")]
    InvalidCluster {
        /// Name of the offending cluster (may be empty).
        name: String,
        /// Why validation failed.
        reason: String,
    },

    /// An address-change callback received an object it does not handle.
    #[error("{operation}: unexpected object of kind {kind}")]
    UnexpectedObject {
        /// The entry point that received the object (`on_add`, ...).
        operation: &'static str,
        /// Kind of the object that was received.
        kind: String,
    },

    /// The snapshot store refused a snapshot.
    #[error("snapshot {version} rejected: {reason}")]
    SnapshotRejected {
        /// Version of the rejected snapshot.
        version: String,
        /// Why the snapshot was rejected.
        reason: String,
    },

    /// Malformed or unknown type URL.
    #[error("invalid type URL: {type_url}")]
    InvalidTypeUrl {
        /// The invalid type URL.
        type_url: String,
    },

    /// Requested resource doesn't exist.
    #[error("resource not found: {type_url}/{name}")]
    ResourceNotFound {
        /// The type URL of the resource.
        type_url: String,
        /// The name of the resource.
        name: String,
    },

    /// Watch subscription was closed.
    #[error("watch closed: watch_id={watch_id}")]
    WatchClosed {
        /// ID of the closed watch.
        watch_id: u64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl XdsError {
    /// Create an internal error from any error type.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for [`XdsError::InvalidCluster`].
    pub fn invalid_cluster(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCluster {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convert to tonic::Status for the serving layer.
impl From<XdsError> for tonic::Status {
    fn from(err: XdsError) -> Self {
        match &err {
            XdsError::InvalidTypeUrl { .. }
            | XdsError::InvalidCluster { .. }
            | XdsError::Configuration(_) => tonic::Status::invalid_argument(err.to_string()),
            XdsError::ResourceNotFound { .. } => tonic::Status::not_found(err.to_string()),
            XdsError::UnexpectedObject { .. }
            | XdsError::SnapshotRejected { .. }
            | XdsError::Internal { .. } => tonic::Status::internal(err.to_string()),
            XdsError::WatchClosed { .. } => tonic::Status::cancelled(err.to_string()),
        }
    }
}
