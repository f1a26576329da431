//! Request and response types for the enrollment service.
//!
//! Response types use `#[serde(default)]` and ignore unknown fields so that
//! additions on the server side do not break older clients.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use enroll_core::{RegistrationId, SubjectId, TimeslotId};

// -- Catalog -----------------------------------------------------------------

/// A subject as listed by `GET /user/subjects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectListing {
    #[serde(rename = "_id", alias = "id")]
    pub id: SubjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// -- Options -----------------------------------------------------------------

/// One selectable value with its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionEntry {
    pub value: String,
    #[serde(default)]
    pub label_en: String,
    #[serde(default)]
    pub label_ar: String,
}

impl OptionEntry {
    /// English label, or the raw value when no label is given.
    pub fn label(&self) -> &str {
        if self.label_en.is_empty() {
            &self.value
        } else {
            &self.label_en
        }
    }
}

/// The configuration choices offered by `GET /user/options`. Stored as-is;
/// values are not validated against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOptions {
    pub group_types: Vec<OptionEntry>,
    pub group_levels: Vec<OptionEntry>,
    pub education_types: Vec<OptionEntry>,
    pub grades: Vec<OptionEntry>,
}

impl ConfigOptions {
    pub fn is_empty(&self) -> bool {
        self.group_types.is_empty()
            && self.group_levels.is_empty()
            && self.education_types.is_empty()
            && self.grades.is_empty()
    }
}

// -- Submission --------------------------------------------------------------

/// Multipart body of `POST /user/applications/submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub grade: String,
    pub subject_id: SubjectId,
    pub group_type: String,
    pub group_level: String,
    pub education_type: String,
    pub schedule_day: String,
    pub schedule_time: String,
    pub timeslot_id: Option<TimeslotId>,
    /// Read from disk at send time.
    pub payment_proof: Option<PathBuf>,
}

impl SubmissionRequest {
    /// Text fields in wire order, without the file part.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("fullName", self.full_name.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("grade", self.grade.clone()),
            ("subjectId", self.subject_id.to_string()),
            ("groupType", self.group_type.clone()),
            ("groupLevel", self.group_level.clone()),
            ("educationType", self.education_type.clone()),
            ("scheduleDay", self.schedule_day.clone()),
            ("scheduleTime", self.schedule_time.clone()),
        ];
        if let Some(id) = &self.timeslot_id {
            fields.push(("timeslotId", id.to_string()));
        }
        fields
    }
}

/// The identifier the service assigned to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub server_id: RegistrationId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionResponse {
    #[serde(default)]
    pub data: Option<CreatedResource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResource {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
}

// -- Status lookup -----------------------------------------------------------

/// Subject reference embedded in an application record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubject {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An application as returned by `GET /user/applications/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    /// Raw status string, e.g. `Pending`, `approved`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub subject: Option<ApplicationSubject>,
    #[serde(default)]
    pub has_deleted_references: bool,
}

/// The service answers either with the record itself or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Outcome of a status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
    Found(ApplicationStatus),
    /// The service does not know this identifier (404 or 400).
    NotFound,
}
