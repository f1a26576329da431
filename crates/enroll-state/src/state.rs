//! # Registration Lifecycle States
//!
//! ```text
//! Draft ──▶ ScheduleSelected ──▶ Submitted ──▶ Pending ──▶ Accepted (terminal)
//!   ▲              │                              │
//!   └──────────────┘                              └──▶ Rejected ──▶ Draft
//! ```
//!
//! `Submitted` is transient: a successful submission moves through it to
//! `Pending` in the same synchronous pass.
//!
//! The idle "Available" marker shown for subjects with no registration in
//! progress is not a registration state; see [`SubjectStatus`].

use serde::{Deserialize, Serialize};

/// The lifecycle state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    /// Created, configuration being edited, no timeslot chosen.
    Draft,
    /// A timeslot has been chosen; the form may be submitted.
    ScheduleSelected,
    /// Form submitted locally (transient).
    Submitted,
    /// Awaiting administrator review.
    Pending,
    /// Approved by an administrator (terminal).
    Accepted,
    /// Declined by an administrator; may be resubmitted.
    Rejected,
}

impl RegistrationState {
    /// Every state, in lifecycle order.
    pub const ALL: [RegistrationState; 6] = [
        Self::Draft,
        Self::ScheduleSelected,
        Self::Submitted,
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
    ];

    /// The canonical wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ScheduleSelected => "schedule_selected",
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable label for status badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::ScheduleSelected => "Schedule Selected",
            Self::Submitted => "Submitted",
            Self::Pending => "Pending Review",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    /// Parse a canonical wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Map a status string reported by the submission service or stored in
    /// local history onto a lifecycle state.
    ///
    /// `pending` → Pending, `accepted`/`approved` → Accepted,
    /// `rejected` → Rejected; anything else (including an empty string)
    /// defaults to Pending. Matching is case-insensitive.
    pub fn from_server_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "accepted" | "approved" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    /// Whether this state has no outbound transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether an administrative override may move a registration out of
    /// this state without consulting the transition table.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Draft | Self::ScheduleSelected | Self::Pending)
    }

    /// Whether the registration has been handed to the reviewers.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::Rejected)
    }

    /// The set of legal target states from this state.
    pub fn valid_transitions(&self) -> &'static [RegistrationState] {
        match self {
            Self::Draft => &[Self::ScheduleSelected],
            Self::ScheduleSelected => &[Self::Draft, Self::Submitted],
            Self::Submitted => &[Self::Pending],
            Self::Pending => &[Self::Accepted, Self::Rejected],
            Self::Accepted => &[],
            Self::Rejected => &[Self::Draft],
        }
    }

    /// Whether `to` is reachable from this state in one legal step.
    pub fn can_transition_to(&self, to: RegistrationState) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a subject shows in the catalog sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectStatus {
    /// No registration for this subject is being edited.
    Available,
    /// The active registration belongs to this subject.
    Active(RegistrationState),
}

impl SubjectStatus {
    /// Human-readable label for status badges.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Active(state) => state.label(),
        }
    }
}
