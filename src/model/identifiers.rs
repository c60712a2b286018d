//! Core identifier newtypes with smart constructors.
//!
//! All identifiers validate non-empty strings at construction time.
//! Lifecycle callbacks carry both identifiers explicitly; nothing in the
//! crate recovers a viewer from an opaque session object.

use std::fmt;

/// The end user for whom scroll state and settings are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(String);

impl ViewerId {
    /// Smart constructor: validates non-empty viewer ID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidViewerId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidViewerId::Empty);
        }
        Ok(Self(raw))
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One connected display instance of a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Smart constructor: validates non-empty session ID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidSessionId::Empty);
        }
        Ok(Self(raw))
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== Error Types =====

/// Rejected [`ViewerId`] input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidViewerId {
    /// The raw string was empty.
    #[error("Viewer ID cannot be empty")]
    Empty,
}

/// Rejected [`SessionId`] input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSessionId {
    /// The raw string was empty.
    #[error("Session ID cannot be empty")]
    Empty,
}

// ===== Tests =====
