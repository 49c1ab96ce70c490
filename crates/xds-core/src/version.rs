//! Snapshot version identifiers.
//!
//! Versions are opaque: the serving layer compares them for equality to
//! decide whether a client is up to date, never for ordering.

use std::fmt;

/// Opaque version identifier for published resources.
///
/// An empty version represents "nothing received yet".
///
/// # Example
///
/// ```rust
/// use xds_core::ResourceVersion;
///
/// let v = ResourceVersion::generate();
/// assert!(!v.is_empty());
/// assert!(ResourceVersion::empty().is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Create a version from an existing string.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Generate a fresh, globally unique version.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create an empty resource version (initial state).
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Check if the version is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourceVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceVersion {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ResourceVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
