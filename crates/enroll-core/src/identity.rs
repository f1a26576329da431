//! # Identity Newtypes
//!
//! Identifier newtypes used throughout the enrollment core. Each is a
//! distinct type: you cannot pass a [`RegistrationId`] where a [`SubjectId`]
//! is expected.
//!
//! ## Validation
//!
//! All identifiers are opaque strings issued by the catalog service, the
//! timeslot service, or the registration store. Construction trims
//! surrounding whitespace and rejects empty input and control characters.
//!
//! ## Registration identifiers
//!
//! Locally created registrations compose their identifier from the subject,
//! a process-wide monotonic counter, and the creation time in milliseconds:
//! `reg_{subject}_{counter}_{millis}`. Selecting the same subject twice in
//! the same millisecond still yields distinct identifiers because the counter
//! never repeats. Rehydrated registrations reuse the server identifier.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn validated(kind: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyIdentifier { kind });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier {
            kind,
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Identifier of a subject in the catalog (e.g. a database object id, or a
/// plain name such as `"Math"` in tests).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject identifier, rejecting empty or control-character input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        validated("subject", raw.as_ref()).map(Self)
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a registration in the record store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Compose the identifier of a locally created registration.
    pub fn compose(subject: &SubjectId, counter: u64, created_at_millis: i64) -> Self {
        Self(format!("reg_{subject}_{counter}_{created_at_millis}"))
    }

    /// Wrap an identifier issued elsewhere (typically the submission service).
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        validated("registration", raw.as_ref()).map(Self)
    }

    /// Whether this identifier was composed locally rather than issued by
    /// the submission service.
    pub fn is_local(&self) -> bool {
        self.0.starts_with("reg_")
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RegistrationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RegistrationId> for String {
    fn from(id: RegistrationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a concrete timeslot issued by the timeslot service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeslotId(String);

impl TimeslotId {
    /// Create a timeslot identifier, rejecting empty or control-character input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        validated("timeslot", raw.as_ref()).map(Self)
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TimeslotId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimeslotId> for String {
    fn from(id: TimeslotId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TimeslotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
