//! # Registration Records
//!
//! A [`Registration`] tracks one enrollment attempt for one subject. Its
//! editable parts are explicit records rather than loose bags of fields:
//!
//! - [`RegistrationConfig`]: the four configuration choices, each empty
//!   until set.
//! - [`Schedule`]: the chosen timeslot, absent until a slot is selected.
//! - [`FormData`]: the personal details and payment proof, absent until the
//!   form is submitted. Validated at construction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use enroll_core::{RegistrationId, SubjectId, TimeslotId, Timestamp};

use crate::catalog::Subject;
use crate::state::RegistrationState;

// ─── Configuration ───────────────────────────────────────────────────

/// One of the four configuration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigKey {
    GroupType,
    GroupLevel,
    EducationType,
    Grade,
}

impl ConfigKey {
    /// Every configuration key, in form order.
    pub const ALL: [ConfigKey; 4] = [
        Self::GroupType,
        Self::GroupLevel,
        Self::EducationType,
        Self::Grade,
    ];

    /// The wire name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupType => "groupType",
            Self::GroupLevel => "groupLevel",
            Self::EducationType => "educationType",
            Self::Grade => "grade",
        }
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigKey {
    type Err = UnknownConfigKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownConfigKey(s.to_string()))
    }
}

/// A configuration key name that is not one of the four known fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown configuration key {0:?}")]
pub struct UnknownConfigKey(pub String);

/// The configuration choices of a registration. Empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationConfig {
    pub group_type: String,
    pub group_level: String,
    pub education_type: String,
    pub grade: String,
}

impl RegistrationConfig {
    /// Read one field.
    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::GroupType => &self.group_type,
            ConfigKey::GroupLevel => &self.group_level,
            ConfigKey::EducationType => &self.education_type,
            ConfigKey::Grade => &self.grade,
        }
    }

    /// Overwrite one field.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let slot = match key {
            ConfigKey::GroupType => &mut self.group_type,
            ConfigKey::GroupLevel => &mut self.group_level,
            ConfigKey::EducationType => &mut self.education_type,
            ConfigKey::Grade => &mut self.grade,
        };
        *slot = value.into();
    }

    /// True only when all four fields are non-empty.
    pub fn is_complete(&self) -> bool {
        ConfigKey::ALL.into_iter().all(|k| !self.get(k).is_empty())
    }

    /// Keys that are still unset.
    pub fn missing(&self) -> Vec<ConfigKey> {
        ConfigKey::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_empty())
            .collect()
    }
}

// ─── Schedule ────────────────────────────────────────────────────────

/// The timeslot chosen for a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Day code (e.g. `Sat`).
    pub day: String,
    /// Display label of the time period (e.g. `8-10 AM`).
    pub time: String,
    pub start_time: String,
    pub end_time: String,
    /// Assigned teacher, or a placeholder such as `TBA`.
    pub teacher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeslot_id: Option<TimeslotId>,
}

// ─── Form data ───────────────────────────────────────────────────────

/// Handle to the payment-proof file attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Reasons a submission form is rejected at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormDataError {
    /// A required personal field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The email address is not plausibly an address.
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
}

/// Personal details submitted with a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// Taken from the configuration, not typed by the student.
    pub grade: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<PaymentProof>,
}

impl FormData {
    /// Build form data, trimming fields and rejecting empty required ones.
    pub fn new(
        full_name: &str,
        email: &str,
        phone: &str,
        grade: &str,
        payment_proof: Option<PaymentProof>,
    ) -> Result<Self, FormDataError> {
        let full_name = required("full name", full_name)?;
        let email = required("email", email)?;
        let phone = required("phone", phone)?;
        if !is_plausible_email(&email) {
            return Err(FormDataError::InvalidEmail(email));
        }
        Ok(Self {
            full_name,
            email,
            phone,
            grade: grade.trim().to_string(),
            payment_proof,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, FormDataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormDataError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

// ─── Transition records ──────────────────────────────────────────────

/// Record of an accepted state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RegistrationState,
    pub to: RegistrationState,
    pub timestamp: Timestamp,
    /// Whether the transition bypassed the transition table.
    pub via_override: bool,
}

// ─── Registration ────────────────────────────────────────────────────

/// One in-progress or completed enrollment attempt for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    /// Lookup-only reference into the catalog.
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub icon: String,
    pub color: String,
    pub state: RegistrationState,
    pub config: RegistrationConfig,
    pub schedule: Option<Schedule>,
    pub form_data: Option<FormData>,
    /// 1-based ordinal among registrations created for the same subject.
    /// Fixed at creation.
    pub registration_number: u32,
    /// Submission time; set on entry to `submitted`.
    pub timestamp: Option<Timestamp>,
    /// Identifier issued by the submission service, once known.
    pub server_id: Option<RegistrationId>,
    pub transitions: Vec<TransitionRecord>,
}

impl Registration {
    /// A fresh draft for `subject`.
    pub fn new_draft(id: RegistrationId, subject: &Subject, registration_number: u32) -> Self {
        Self {
            id,
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            icon: subject.icon.clone(),
            color: subject.color.clone(),
            state: RegistrationState::Draft,
            config: RegistrationConfig::default(),
            schedule: None,
            form_data: None,
            registration_number,
            timestamp: None,
            server_id: None,
            transitions: Vec::new(),
        }
    }

    /// Display name with the per-subject ordinal, e.g. `Physics #2`.
    pub fn display_name(&self) -> String {
        format!("{} #{}", self.subject_name, self.registration_number)
    }

    /// Whether abandoning this registration discards it from the store.
    pub fn is_discardable(&self) -> bool {
        self.state == RegistrationState::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn config_key_parses_wire_names() {
        assert_eq!("groupType".parse::<ConfigKey>(), Ok(ConfigKey::GroupType));
        assert_eq!("EDUCATIONTYPE".parse::<ConfigKey>(), Ok(ConfigKey::EducationType));
        assert!("colour".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn config_set_and_get() {
        let mut cfg = RegistrationConfig::default();
        cfg.set(ConfigKey::GroupLevel, "advanced");
        assert_eq!(cfg.get(ConfigKey::GroupLevel), "advanced");
        assert_eq!(cfg.missing(), vec![
            ConfigKey::GroupType,
            ConfigKey::EducationType,
            ConfigKey::Grade,
        ]);
    }

    #[test]
    fn form_data_trims_and_validates() {
        let form = FormData::new(" Layla Hassan ", "layla@example.com", "0100", "G10", None).unwrap();
        assert_eq!(form.full_name, "Layla Hassan");
        assert_eq!(form.grade, "G10");
    }

    #[test]
    fn form_data_rejects_missing_fields() {
        assert_eq!(
            FormData::new("", "a@b.co", "1", "G1", None),
            Err(FormDataError::MissingField("full name"))
        );
        assert_eq!(
            FormData::new("A", "a@b.co", "  ", "G1", None),
            Err(FormDataError::MissingField("phone"))
        );
    }

    #[test]
    fn form_data_rejects_bad_email() {
        assert!(matches!(
            FormData::new("A", "not-an-address", "1", "G1", None),
            Err(FormDataError::InvalidEmail(_))
        ));
        assert!(matches!(
            FormData::new("A", "a@localhost", "1", "G1", None),
            Err(FormDataError::InvalidEmail(_))
        ));
    }

    #[test]
    fn schedule_serializes_camel_case_and_skips_absent_fields() {
        let schedule = Schedule {
            day: "Sat".into(),
            time: "8-10 AM".into(),
            start_time: "08:00".into(),
            end_time: "10:00".into(),
            teacher: "Dr. Ahmed".into(),
            group_name: None,
            timeslot_id: None,
        };
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["startTime"], "08:00");
        assert!(json.get("groupName").is_none());
    }

    proptest! {
        #[test]
        fn config_complete_iff_all_fields_set(
            group_type in prop::option::of("[a-z]{1,8}"),
            group_level in prop::option::of("[a-z]{1,8}"),
            education_type in prop::option::of("[a-z]{1,8}"),
            grade in prop::option::of("[A-Z0-9]{1,4}"),
        ) {
            let all_set = group_type.is_some() && group_level.is_some()
                && education_type.is_some() && grade.is_some();
            let cfg = RegistrationConfig {
                group_type: group_type.unwrap_or_default(),
                group_level: group_level.unwrap_or_default(),
                education_type: education_type.unwrap_or_default(),
                grade: grade.unwrap_or_default(),
            };
            prop_assert_eq!(cfg.is_complete(), all_set);
        }
    }
}
