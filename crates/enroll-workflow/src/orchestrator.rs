//! # Workflow Orchestrator
//!
//! Sequences user intents over the registration machine: pick a subject,
//! fill in the configuration, view the timeslot grid, pick a slot, submit.
//! Durable state lives in the [`RegistrationMachine`]; the orchestrator only
//! keeps the last loaded grid and options for the current view.
//!
//! ## Remote failures
//!
//! Failures of the enrollment service never reach the machine. Catalog and
//! options failures keep the last known data, grid failures degrade to the
//! synthetic grid when allowed, and a failed submission still advances the
//! local registration. Each degradation is reported as a [`Notice`].

use thiserror::Error;

use enroll_core::{RegistrationId, SubjectId, Timestamp, TimeslotId};
use enroll_client::{ConfigOptions, EnrollmentBackend, StatusLookup, SubmissionRequest};
use enroll_schedule::{
    load_time_slots, select_slot, CellStatus, GridLoadError, GridQuery, LoadedGrid,
    SelectionError, TimeslotSource,
};
use enroll_state::catalog::icon_for;
use enroll_state::{
    ConfigKey, FormData, Registration, RegistrationConfig, RegistrationError,
    RegistrationMachine, RegistrationState, Schedule, Subject, DELETED_SUBJECT_COLOR,
    DELETED_SUBJECT_NAME,
};

use crate::config::WorkflowConfig;
use crate::history::{HistoryEntry, HistoryError, HistorySchedule, HistoryStore, Profile, ProfileStore};
use crate::notice::{Notice, NoticeLevel};

/// Subject identifier given to restored entries whose subject reference
/// was lost.
const ORPHAN_SUBJECT_ID: &str = "deleted";
const ORPHAN_SUBJECT_META: &str = "Data deleted";

// ─── Errors ──────────────────────────────────────────────────────────

/// Intents refused by the workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("configuration incomplete, missing: {}", join_keys(missing))]
    ConfigIncomplete { missing: Vec<ConfigKey> },

    #[error("no timeslot selected")]
    ScheduleNotSelected,

    #[error("timeslot grid not loaded")]
    NoGridLoaded,

    #[error("no selectable timeslot on {day} at {start_time}")]
    SlotUnavailable {
        day: String,
        start_time: String,
        status: Option<CellStatus>,
    },

    #[error("payment proof is {size} bytes, limit is {limit}")]
    PaymentProofTooLarge { size: u64, limit: u64 },

    #[error("unknown subject {0:?}")]
    UnknownSubject(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Grid(#[from] GridLoadError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

fn join_keys(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(ConfigKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── Reports ─────────────────────────────────────────────────────────

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// The registration as it stands after submission.
    pub registration: Registration,
    /// Identifier issued by the service; `None` when the call failed.
    pub server_id: Option<RegistrationId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrateReport {
    pub restored: usize,
    /// Entries dropped from the history file.
    pub pruned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    pub checked: usize,
    /// Registrations moved to a reviewer decision.
    pub updated: usize,
    /// History entries the service no longer knows.
    pub removed: usize,
    pub failed: usize,
}

/// One line of the registered-subjects list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSummary {
    pub id: RegistrationId,
    pub display_name: String,
    pub state: RegistrationState,
    pub color: String,
    pub schedule: Option<Schedule>,
}

// ─── Workflow ────────────────────────────────────────────────────────

/// Drives one enrollment session.
#[derive(Debug)]
pub struct Workflow<B, H> {
    machine: RegistrationMachine,
    backend: B,
    history: H,
    profile: ProfileStore,
    config: WorkflowConfig,
    options: ConfigOptions,
    grid: Option<LoadedGrid>,
    notices: Vec<Notice>,
}

impl<B, H> Workflow<B, H>
where
    B: EnrollmentBackend + TimeslotSource,
    H: HistoryStore,
{
    pub fn new(backend: B, history: H, config: WorkflowConfig) -> Self {
        Self {
            machine: RegistrationMachine::new(),
            backend,
            history,
            profile: ProfileStore::new(config.profile_path.clone()),
            config,
            options: ConfigOptions::default(),
            grid: None,
            notices: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn machine(&self) -> &RegistrationMachine {
        &self.machine
    }

    /// Mutable access, e.g. to subscribe to machine events.
    pub fn machine_mut(&mut self) -> &mut RegistrationMachine {
        &mut self.machine
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn options(&self) -> &ConfigOptions {
        &self.options
    }

    pub fn grid(&self) -> Option<&LoadedGrid> {
        self.grid.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Personal details saved by the last submission, for prefilling.
    pub fn saved_profile(&self) -> Result<Option<Profile>, WorkflowError> {
        Ok(self.profile.load()?)
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(message = %notice.message, "notice"),
            NoticeLevel::Warning => tracing::warn!(message = %notice.message, "notice"),
        }
        self.notices.push(notice);
    }

    // ── Catalog and options ──────────────────────────────────────────

    /// Refresh the subject catalog. On failure the previous catalog stays.
    pub async fn load_catalog(&mut self) -> &[Subject] {
        match self.backend.fetch_subjects().await {
            Ok(listing) => {
                let palette = &self.config.color_palette;
                let subjects = listing
                    .into_iter()
                    .enumerate()
                    .map(|(position, l)| Subject::from_listing(l.id, &l.name, position, palette))
                    .collect::<Vec<_>>();
                tracing::info!(subjects = subjects.len(), "subject catalog loaded");
                self.machine.load_subjects(subjects);
            }
            Err(e) => {
                tracing::warn!(error = %e, "subject catalog fetch failed");
                self.notify(Notice::warning(
                    "subjects could not be loaded; showing the last known list",
                ));
            }
        }
        self.machine.catalog().all()
    }

    /// Refresh the configuration choices. On failure the previous choices
    /// stay.
    pub async fn load_options(&mut self) -> &ConfigOptions {
        match self.backend.fetch_options().await {
            Ok(options) => self.options = options,
            Err(e) => {
                tracing::warn!(error = %e, "options fetch failed");
                self.notify(Notice::warning(
                    "configuration options could not be loaded",
                ));
            }
        }
        &self.options
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Start a registration for the subject named by id or display name,
    /// or clear the selection with `None`.
    pub fn choose_subject(
        &mut self,
        subject: Option<&str>,
    ) -> Result<Option<RegistrationId>, WorkflowError> {
        let subject_id = match subject {
            Some(raw) => Some(
                self.machine
                    .catalog()
                    .resolve(raw)
                    .map(|s| s.id.clone())
                    .ok_or_else(|| WorkflowError::UnknownSubject(raw.to_string()))?,
            ),
            None => None,
        };
        self.grid = None;
        Ok(self.machine.set_active_subject(subject_id.as_ref())?)
    }

    /// Set one configuration field. The loaded grid is dropped when the
    /// group type changes or the configuration is no longer complete.
    pub fn set_config(&mut self, key: ConfigKey, value: &str) -> Result<(), WorkflowError> {
        self.machine.update_config(key, value.trim())?;
        if key == ConfigKey::GroupType || !self.machine.is_config_complete() {
            self.grid = None;
        }
        Ok(())
    }

    /// Fetch the grid for the active subject and group type.
    pub async fn view_schedule(&mut self) -> Result<&LoadedGrid, WorkflowError> {
        let active = self
            .machine
            .active_registration()
            .ok_or(RegistrationError::NoActiveRegistration)?;
        require_complete(&active.config)?;
        let query = GridQuery::new(
            Some(active.subject_id.clone()),
            Some(active.config.group_type.clone()),
        );

        let loaded = load_time_slots(&self.backend, &query, self.config.synthetic_fallback).await?;
        if loaded.is_degraded() {
            self.notify(Notice::warning(
                "live timeslots are unavailable; showing sample availability",
            ));
        }
        Ok(self.grid.insert(loaded))
    }

    /// Select the cell at `day` / `start_time` of the loaded grid.
    pub fn pick_slot(&mut self, day: &str, start_time: &str) -> Result<Schedule, WorkflowError> {
        let active = self
            .machine
            .active_registration()
            .ok_or(RegistrationError::NoActiveRegistration)?;
        require_complete(&active.config)?;
        let grid = self.grid.as_ref().ok_or(WorkflowError::NoGridLoaded)?;
        let unavailable = |status| WorkflowError::SlotUnavailable {
            day: day.to_string(),
            start_time: start_time.to_string(),
            status,
        };
        let cell = grid
            .grid
            .find_cell(day, start_time)
            .cloned()
            .ok_or_else(|| unavailable(None))?;

        select_slot(&mut self.machine, &cell).map_err(|e| match e {
            SelectionError::NotSelectable { status } => unavailable(Some(status)),
            SelectionError::Registration(e) => e.into(),
        })
    }

    /// Go back to the grid to choose another slot.
    pub fn change_schedule(&mut self) -> Result<(), WorkflowError> {
        Ok(self.machine.request_different_slot()?)
    }

    /// Clear configuration, schedule and form data of the active
    /// registration.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        self.machine.reset_config()?;
        self.grid = None;
        Ok(())
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Submit the active registration.
    ///
    /// The local registration advances to `pending` even when the service
    /// call fails; the failure becomes a warning notice and the history
    /// entry is keyed by the local identifier.
    pub async fn submit(&mut self, form: FormData) -> Result<SubmissionOutcome, WorkflowError> {
        let active = self
            .machine
            .active_registration()
            .ok_or(RegistrationError::NoActiveRegistration)?;
        let schedule = match (&active.state, &active.schedule) {
            (RegistrationState::ScheduleSelected, Some(schedule)) => schedule.clone(),
            _ => return Err(WorkflowError::ScheduleNotSelected),
        };
        require_complete(&active.config)?;
        if let Some(proof) = &form.payment_proof {
            let limit = self.config.max_payment_proof_bytes;
            if proof.size_bytes > limit {
                return Err(WorkflowError::PaymentProofTooLarge {
                    size: proof.size_bytes,
                    limit,
                });
            }
        }
        let request = submission_request(&active.subject_id, &active.config, &schedule, &form);

        let server_id = match self.backend.submit_application(&request).await {
            Ok(receipt) => Some(receipt.server_id),
            Err(e) => {
                tracing::warn!(error = %e, subject_id = %request.subject_id, "submission to enrollment service failed");
                self.notify(Notice::warning(format!(
                    "the enrollment service did not confirm your application ({e}); it was saved locally"
                )));
                None
            }
        };

        self.machine.set_form_data(form.clone())?;
        let mut registration = self.machine.submit_registration()?;
        if let Some(server_id) = &server_id {
            self.machine
                .attach_server_id(&registration.id, server_id.clone())?;
            registration.server_id = Some(server_id.clone());
        }

        let history_id = server_id.clone().unwrap_or_else(|| registration.id.clone());
        self.record_submission(HistoryEntry::from_registration(&registration, &history_id));
        if let Err(e) = self.profile.save(&Profile::from(&form)) {
            tracing::warn!(error = %e, "failed to save profile");
        }

        self.notify(Notice::info(format!(
            "{} submitted for review",
            registration.display_name()
        )));
        Ok(SubmissionOutcome {
            registration,
            server_id,
        })
    }

    fn record_submission(&mut self, entry: HistoryEntry) {
        let result = self.history.load().and_then(|mut entries| {
            entries.push(entry);
            self.history.save(&entries)
        });
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to record submission in history");
            self.notify(Notice::warning(format!(
                "your application was submitted but could not be saved locally: {e}"
            )));
        }
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Restore submitted applications from local history.
    ///
    /// Entries without an identifier and legacy client-minted ones are
    /// dropped, and the file is rewritten when anything was dropped.
    pub fn rehydrate(&mut self) -> Result<RehydrateReport, WorkflowError> {
        let entries = self.history.load()?;
        let mut report = RehydrateReport::default();
        let mut kept = Vec::with_capacity(entries.len());

        for entry in entries {
            match self.restore(&entry) {
                Some(registration) => {
                    tracing::debug!(
                        registration_id = %registration.id,
                        state = %registration.state,
                        "restored registration"
                    );
                    self.machine.insert_rehydrated(registration);
                    report.restored += 1;
                    kept.push(entry);
                }
                None => {
                    tracing::debug!(key = ?entry.key(), "pruning history entry");
                    report.pruned += 1;
                }
            }
        }

        if report.pruned > 0 {
            self.history.save(&kept)?;
        }
        tracing::info!(restored = report.restored, pruned = report.pruned, "history rehydrated");
        Ok(report)
    }

    fn restore(&self, entry: &HistoryEntry) -> Option<Registration> {
        if entry.is_legacy() {
            return None;
        }
        let id = RegistrationId::new(entry.key()?).ok()?;

        let stored = entry.subject.clone().unwrap_or_default();
        let subject_id = stored
            .id
            .as_deref()
            .and_then(|raw| SubjectId::new(raw).ok());
        let subject = match subject_id.as_ref().and_then(|sid| self.machine.get_subject(sid)) {
            Some(subject) => subject.clone(),
            None => {
                let name = stored
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| DELETED_SUBJECT_NAME.to_string());
                let id = match subject_id {
                    Some(id) => id,
                    None => SubjectId::new(ORPHAN_SUBJECT_ID).ok()?,
                };
                Subject {
                    id,
                    icon: icon_for(&name),
                    name,
                    meta: ORPHAN_SUBJECT_META.to_string(),
                    color: DELETED_SUBJECT_COLOR.to_string(),
                }
            }
        };

        let registration_number = match self.machine.get_registration(&id) {
            Some(existing) => existing.registration_number,
            None => self.machine.registration_count_for_subject(&subject.id) + 1,
        };

        let mut registration = Registration::new_draft(id.clone(), &subject, registration_number);
        registration.state = RegistrationState::from_server_status(&entry.status);
        registration.config = RegistrationConfig {
            group_type: entry.group_type.clone(),
            group_level: entry.group_level.clone(),
            education_type: entry.education_type.clone(),
            grade: entry.grade.clone(),
        };
        registration.schedule = entry.schedule.as_ref().map(restore_schedule);
        if !entry.full_name.is_empty() || !entry.email.is_empty() || !entry.phone.is_empty() {
            registration.form_data = Some(FormData {
                full_name: entry.full_name.clone(),
                email: entry.email.clone(),
                phone: entry.phone.clone(),
                grade: entry.grade.clone(),
                payment_proof: None,
            });
        }
        registration.timestamp = entry
            .submitted_at
            .as_deref()
            .and_then(|s| Timestamp::parse_lenient(s).ok());
        registration.server_id = (!id.is_local()).then_some(id);
        Some(registration)
    }

    /// Ask the service for decisions on pending registrations.
    ///
    /// Accepted and rejected applications are moved to the decided state.
    /// An application the service does not know is removed from history
    /// while the in-memory registration stays. Lookup failures leave
    /// everything untouched.
    pub async fn resync_statuses(&mut self) -> Result<ResyncReport, WorkflowError> {
        let targets: Vec<(RegistrationId, RegistrationId)> = self
            .machine
            .get_subjects_by_state(RegistrationState::Pending)
            .into_iter()
            .filter_map(|r| r.server_id.clone().map(|sid| (r.id.clone(), sid)))
            .collect();

        let mut report = ResyncReport::default();
        let mut history = self.history.load()?;

        for (id, server_id) in targets {
            report.checked += 1;
            match self.backend.application_status(&server_id).await {
                Ok(StatusLookup::Found(application)) => {
                    let state = RegistrationState::from_server_status(&application.status);
                    if state == RegistrationState::Pending {
                        continue;
                    }
                    self.machine.apply_override(&id, state)?;
                    for entry in history
                        .iter_mut()
                        .filter(|e| e.key() == Some(server_id.as_str()))
                    {
                        entry.status = state.as_str().to_string();
                    }
                    tracing::info!(registration_id = %id, %state, "application decided");
                    report.updated += 1;
                }
                Ok(StatusLookup::NotFound) => {
                    history.retain(|e| e.key() != Some(server_id.as_str()));
                    tracing::warn!(server_id = %server_id, "application unknown to service, dropped from history");
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!(server_id = %server_id, error = %e, "status lookup failed");
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            self.notify(Notice::warning(format!(
                "could not refresh the status of {} application(s)",
                report.failed
            )));
        }
        if report.updated > 0 || report.removed > 0 {
            self.history.save(&history)?;
        }
        Ok(report)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Registrations handed to reviewers: pending first, then accepted,
    /// then rejected. Store order within each group.
    pub fn registered_summaries(&self) -> Vec<RegisteredSummary> {
        [
            RegistrationState::Pending,
            RegistrationState::Accepted,
            RegistrationState::Rejected,
        ]
        .into_iter()
        .flat_map(|state| self.machine.get_subjects_by_state(state))
        .map(|r| RegisteredSummary {
            id: r.id.clone(),
            display_name: r.display_name(),
            state: r.state,
            color: r.color.clone(),
            schedule: r.schedule.clone(),
        })
        .collect()
    }
}

fn require_complete(config: &RegistrationConfig) -> Result<(), WorkflowError> {
    if config.is_complete() {
        Ok(())
    } else {
        Err(WorkflowError::ConfigIncomplete {
            missing: config.missing(),
        })
    }
}

fn restore_schedule(stored: &HistorySchedule) -> Schedule {
    Schedule {
        day: stored.day.clone(),
        time: stored.time.clone(),
        start_time: stored.start_time.clone(),
        end_time: stored.end_time.clone(),
        teacher: stored.teacher.clone(),
        group_name: Some(stored.group_name.clone()).filter(|g| !g.is_empty()),
        timeslot_id: stored
            .timeslot_id
            .as_deref()
            .and_then(|t| TimeslotId::new(t).ok()),
    }
}

fn submission_request(
    subject_id: &SubjectId,
    config: &RegistrationConfig,
    schedule: &Schedule,
    form: &FormData,
) -> SubmissionRequest {
    SubmissionRequest {
        full_name: form.full_name.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        grade: config.grade.clone(),
        subject_id: subject_id.clone(),
        group_type: config.group_type.clone(),
        group_level: config.group_level.clone(),
        education_type: config.education_type.clone(),
        schedule_day: schedule.day.clone(),
        schedule_time: schedule.time.clone(),
        timeslot_id: schedule.timeslot_id.clone(),
        payment_proof: form.payment_proof.as_ref().map(|p| p.path.clone()),
    }
}
