//! # enroll-workflow -- Enrollment Workflow Orchestrator
//!
//! Ties the registration machine, the timeslot grid and the enrollment
//! service together into one session:
//!
//! 1. `load_catalog` / `load_options` fetch subjects and choices.
//! 2. `choose_subject` starts a draft; `set_config` fills it in.
//! 3. `view_schedule` loads the grid once the configuration is complete.
//! 4. `pick_slot` selects an available cell.
//! 5. `submit` sends the application and records it in local history.
//!
//! On startup `rehydrate` restores earlier submissions from the history
//! file and `resync_statuses` picks up reviewer decisions.

pub mod config;
pub mod history;
pub mod notice;
pub mod orchestrator;

pub use config::{ConfigLoadError, WorkflowConfig, DEFAULT_MAX_PAYMENT_PROOF_BYTES};
pub use history::{
    HistoryEntry, HistoryError, HistorySchedule, HistoryStore, HistorySubject, JsonFileHistory,
    MemoryHistory, Profile, ProfileStore, LEGACY_ID_PREFIX,
};
pub use notice::{Notice, NoticeLevel};
pub use orchestrator::{
    RegisteredSummary, RehydrateReport, ResyncReport, SubmissionOutcome, Workflow, WorkflowError,
};
