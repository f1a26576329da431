//! # enroll-state — Registration Lifecycle
//!
//! The in-memory core of the enrollment flow: which subjects exist, which
//! registrations are in progress, and how each one moves through its
//! lifecycle.
//!
//! ## Modules
//!
//! - **State** (`state.rs`): `Draft → ScheduleSelected → Submitted → Pending
//!   → Accepted | Rejected`, with `Rejected → Draft` for resubmission and
//!   `ScheduleSelected → Draft` for picking another slot.
//!
//! - **Catalog** (`catalog.rs`): subject display data, replaced wholesale on
//!   every load.
//!
//! - **Registration** (`registration.rs`): the per-attempt record with its
//!   configuration, schedule and form data.
//!
//! - **Events** (`events.rs`): a synchronous, depth-first typed event bus.
//!
//! - **Machine** (`machine.rs`): the only mutator. Validates transitions,
//!   discards abandoned drafts, and publishes an event for every change.
//!
//! ## Design
//!
//! States are a closed enum checked at runtime rather than typestates:
//! registrations are stored side by side in one collection, and status
//! resynchronisation must move them by a value read from the network.

pub mod catalog;
pub mod events;
pub mod machine;
pub mod registration;
pub mod state;

// ─── Lifecycle re-exports ───────────────────────────────────────────

pub use machine::{ActiveSubject, RegistrationError, RegistrationMachine};
pub use state::{RegistrationState, SubjectStatus};

// ─── Record re-exports ──────────────────────────────────────────────

pub use catalog::{Subject, SubjectCatalog, DELETED_SUBJECT_COLOR, DELETED_SUBJECT_NAME};
pub use registration::{
    ConfigKey, FormData, FormDataError, PaymentProof, Registration, RegistrationConfig, Schedule,
    TransitionRecord, UnknownConfigKey,
};

// ─── Event re-exports ───────────────────────────────────────────────

pub use events::{EventBus, Listener, MachineEvent, Subscription, Topic};
