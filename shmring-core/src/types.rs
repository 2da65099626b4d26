// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers and small value types.
//!
//! Validated inputs follow the "Newtype" pattern so an invalid segment name
//! can never reach the platform layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of a segment name.
pub const MAX_NAME_LEN: usize = 100;

/// Validated segment identifier.
/// Non-empty, at most 100 chars of `[A-Za-z0-9._-]`, not starting with a dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SegmentName(String);

impl SegmentName {
    /// Create a new SegmentName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "name",
                value: name,
                reason: "Segment name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(ConfigError::InvalidFieldValue {
                field: "name",
                value: name.clone(),
                reason: format!(
                    "Segment name too long: {} chars (max {})",
                    name.len(),
                    MAX_NAME_LEN
                ),
            });
        }

        if name.starts_with('.') {
            return Err(ConfigError::InvalidFieldValue {
                field: "name",
                value: name,
                reason: "Segment name cannot start with '.'".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ConfigError::InvalidFieldValue {
                field: "name",
                value: name,
                reason: "Segment name must contain only ASCII alphanumerics, '-', '_' and '.'"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SegmentName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SegmentName> for String {
    fn from(name: SegmentName) -> Self {
        name.0
    }
}

/// Protection of a mapped view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl AccessMode {
    /// Whether views in this mode accept writes.
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    pub(crate) const fn prot(&self) -> libc::c_int {
        match self {
            Self::ReadOnly => libc::PROT_READ,
            Self::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Successful outcome of a create call.
///
/// Failure is the `Err` arm, so together with `Result` this is the
/// failed / created-new / attached-existing tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new object was created and zero-filled.
    CreatedNew,
    /// An existing object was attached; its content was left untouched.
    CreatedExisting,
}

impl CreateOutcome {
    pub const fn is_new(&self) -> bool {
        matches!(self, Self::CreatedNew)
    }
}

impl fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedNew => write!(f, "created new"),
            Self::CreatedExisting => write!(f, "attached to existing"),
        }
    }
}

/// How the most recent lock acquisition was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock was free or released normally by its previous holder.
    Acquired,
    /// The previous holder died while holding the lock.
    Abandoned,
}
