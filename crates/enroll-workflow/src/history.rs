//! # Local Application History
//!
//! Summaries of submitted applications, kept on disk so registrations
//! survive restarts and can be reconciled with the enrollment service.
//!
//! The file is a JSON array. Entries are read leniently: unknown fields are
//! ignored, and an element that is not a valid summary is loaded as an
//! entry without an identifier so that rehydration prunes it instead of
//! failing the whole file.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use enroll_core::RegistrationId;
use enroll_state::{FormData, Registration, Schedule};

/// Prefix of identifiers minted client-side by an older frontend. Such
/// entries were never known to the service and are pruned.
pub const LEGACY_ID_PREFIX: &str = "APP_";

// ─── Entries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySubject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySchedule {
    pub day: String,
    pub time: String,
    pub start_time: String,
    pub end_time: String,
    pub teacher: String,
    pub timeslot_id: Option<String>,
    pub group_name: String,
}

impl From<&Schedule> for HistorySchedule {
    fn from(s: &Schedule) -> Self {
        Self {
            day: s.day.clone(),
            time: s.time.clone(),
            start_time: s.start_time.clone(),
            end_time: s.end_time.clone(),
            teacher: s.teacher.clone(),
            timeslot_id: s.timeslot_id.as_ref().map(|t| t.to_string()),
            group_name: s.group_name.clone().unwrap_or_default(),
        }
    }
}

/// One submitted application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEntry {
    pub id: Option<String>,
    /// Older files stored the service identifier here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub status: String,
    pub subject: Option<HistorySubject>,
    pub schedule: Option<HistorySchedule>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub grade: String,
    pub group_type: String,
    pub group_level: String,
    pub education_type: String,
    pub submitted_at: Option<String>,
    pub has_payment_proof: bool,
}

impl HistoryEntry {
    /// Summary of a freshly submitted registration, stored under `id`.
    pub fn from_registration(registration: &Registration, id: &RegistrationId) -> Self {
        let form = registration.form_data.as_ref();
        let (full_name, email, phone) = form
            .map(|f| (f.full_name.clone(), f.email.clone(), f.phone.clone()))
            .unwrap_or_default();
        Self {
            id: Some(id.to_string()),
            server_id: None,
            status: registration.state.as_str().to_string(),
            subject: Some(HistorySubject {
                id: Some(registration.subject_id.to_string()),
                name: Some(registration.subject_name.clone()),
            }),
            schedule: registration.schedule.as_ref().map(HistorySchedule::from),
            full_name,
            email,
            phone,
            grade: registration.config.grade.clone(),
            group_type: registration.config.group_type.clone(),
            group_level: registration.config.group_level.clone(),
            education_type: registration.config.education_type.clone(),
            submitted_at: registration.timestamp.as_ref().map(|t| t.to_iso8601()),
            has_payment_proof: form.is_some_and(|f| f.payment_proof.is_some()),
        }
    }

    /// The identifier this entry is keyed by: `id`, else the legacy
    /// `serverId`. Blank values count as absent.
    pub fn key(&self) -> Option<&str> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|k| !k.is_empty())
        }
        present(&self.id).or_else(|| present(&self.server_id))
    }

    /// Client-minted identifier from an older frontend.
    pub fn is_legacy(&self) -> bool {
        self.key().is_some_and(|k| k.starts_with(LEGACY_ID_PREFIX))
    }
}

// ─── Storage ─────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to access history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("history file {} is not a JSON array: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persistence for application summaries.
pub trait HistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError>;
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError>;
}

/// History kept in a JSON file. A missing file is an empty history.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HistoryError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&content).map_err(|e| HistoryError::Json {
                path: self.path.clone(),
                source: e,
            })?;

        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value).unwrap_or_else(|e| {
                    tracing::warn!(index, error = %e, "malformed history entry");
                    HistoryEntry::default()
                })
            })
            .collect())
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let io_err = |e| HistoryError::Io {
            path: self.path.clone(),
            source: e,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(entries).map_err(|e| HistoryError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), entries = entries.len(), "history saved");
        Ok(())
    }
}

/// In-memory history.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: RefCell<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: RefCell::new(entries),
        }
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.borrow().clone()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        *self.entries.borrow_mut() = entries.to_vec();
        Ok(())
    }
}

// ─── Profile ─────────────────────────────────────────────────────────

/// Personal details remembered for prefilling the next form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl From<&FormData> for Profile {
    fn from(form: &FormData) -> Self {
        Self {
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
        }
    }
}

/// Profile kept in a JSON file next to the history.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The saved profile, or `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<Profile>, HistoryError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| HistoryError::Json {
                    path: self.path.clone(),
                    source: e,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    pub fn save(&self, profile: &Profile) -> Result<(), HistoryError> {
        let io_err = |e| HistoryError::Io {
            path: self.path.clone(),
            source: e,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(profile).map_err(|e| HistoryError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("none.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("nested/deeper/apps.json"));
        let entry = HistoryEntry {
            id: Some("66b0c1".into()),
            status: "pending".into(),
            ..Default::default()
        };
        store.save(&[entry.clone()]).unwrap();
        assert_eq!(store.load().unwrap(), vec![entry]);
    }

    #[test]
    fn legacy_and_malformed_entries_load_leniently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(
            &path,
            r#"[
                {"serverId": "66b0c1", "status": "Pending", "extra": 1},
                {"id": "APP_1700000000_abc", "serverId": "66b0c2"},
                42,
                {"status": "pending"}
            ]"#,
        )
        .unwrap();

        let entries = JsonFileHistory::new(&path).load().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].key(), Some("66b0c1"));
        assert!(entries[1].is_legacy());
        assert_eq!(entries[2].key(), None);
        assert_eq!(entries[3].key(), None);
    }

    #[test]
    fn blank_id_falls_back_to_server_id() {
        let entry = HistoryEntry {
            id: Some(" ".into()),
            server_id: Some("66b0c3".into()),
            ..Default::default()
        };
        assert_eq!(entry.key(), Some("66b0c3"));
        assert!(!entry.is_legacy());

        let neither = HistoryEntry {
            id: Some(String::new()),
            server_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(neither.key(), None);
    }

    #[test]
    fn non_array_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, r#"{"id": "x"}"#).unwrap();
        assert!(matches!(
            JsonFileHistory::new(&path).load(),
            Err(HistoryError::Json { .. })
        ));
    }

    #[test]
    fn blank_id_counts_as_absent() {
        let entry = HistoryEntry {
            id: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(entry.key(), None);
    }

    #[test]
    fn profile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        assert_eq!(store.load().unwrap(), None);
        let profile = Profile {
            full_name: "Omar Ali".into(),
            email: "omar@example.com".into(),
            phone: "0100".into(),
        };
        store.save(&profile).unwrap();
        assert_eq!(store.load().unwrap(), Some(profile));
    }

    #[test]
    fn memory_history_replaces_on_save() {
        let store = MemoryHistory::default();
        store.save(&[HistoryEntry::default()]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
        store.save(&[]).unwrap();
        assert!(store.snapshot().is_empty());
    }
}
