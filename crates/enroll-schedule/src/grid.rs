//! # Timeslot Grid
//!
//! The weekly grid shown to a student picking a class: one row per time
//! period, one cell per day.
//!
//! Wire format, as served by the timeslot service:
//!
//! ```json
//! {
//!   "days": ["Sat", "Sun"],
//!   "timeSlots": [
//!     { "start": "08:00", "end": "10:00", "label": "8-10 AM",
//!       "slots": [ { "_id": "…", "day": "Sat", "time": "8-10 AM",
//!                    "startTime": "08:00", "endTime": "10:00",
//!                    "teacher": "Dr. Ahmed", "groupName": "A1",
//!                    "capacity": 10, "enrolled": 9, "available": true,
//!                    "hasSlot": true } ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use enroll_core::TimeslotId;
use enroll_state::Schedule;

/// Teacher shown when a cell has none assigned.
pub const UNASSIGNED_TEACHER: &str = "TBA";

// ─── Cell status ─────────────────────────────────────────────────────

/// Selectability of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// No class in this slot.
    Empty,
    /// A class with free seats.
    Available,
    /// A class at or over capacity.
    Full,
}

impl CellStatus {
    /// Classify a cell from its raw fields.
    pub fn classify(has_slot: bool, capacity: u32, enrolled: u32) -> Self {
        if !has_slot {
            Self::Empty
        } else if enrolled < capacity {
            Self::Available
        } else {
            Self::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Available => "available",
            Self::Full => "full",
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Cells and rows ──────────────────────────────────────────────────

/// One day within one time period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TimeslotId>,
    pub day: String,
    /// Period label, e.g. `8-10 AM`.
    #[serde(default)]
    pub time: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub enrolled: u32,
    /// Server-side availability hint. Classification does not use it.
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub has_slot: bool,
    #[serde(rename = "isEmpty", default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl GridCell {
    pub fn status(&self) -> CellStatus {
        CellStatus::classify(self.has_slot, self.capacity, self.enrolled)
    }

    pub fn teacher_label(&self) -> &str {
        match self.teacher.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => UNASSIGNED_TEACHER,
        }
    }

    /// Seats left, zero when full or empty.
    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    /// The schedule a registration gets when this cell is chosen.
    pub fn to_schedule(&self) -> Schedule {
        Schedule {
            day: self.day.clone(),
            time: self.time.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            teacher: self.teacher_label().to_string(),
            group_name: self.group_name.clone().filter(|g| !g.is_empty()),
            timeslot_id: self.id.clone(),
        }
    }
}

/// One time period across all days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub start: String,
    pub end: String,
    pub label: String,
    #[serde(default)]
    pub slots: Vec<GridCell>,
}

/// Count of cells per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridSummary {
    pub available: usize,
    pub full: usize,
    pub empty: usize,
}

// ─── Grid ────────────────────────────────────────────────────────────

/// A full weekly grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeslotGrid {
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(rename = "timeSlots", default)]
    pub time_slots: Vec<GridRow>,
}

impl TimeslotGrid {
    /// A grid with no rows cannot be rendered.
    pub fn is_empty(&self) -> bool {
        self.time_slots.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.time_slots.iter().flat_map(|row| row.slots.iter())
    }

    /// The cell on `day` (case-insensitive) whose period starts at
    /// `start_time`.
    pub fn find_cell(&self, day: &str, start_time: &str) -> Option<&GridCell> {
        self.cells()
            .find(|c| c.day.eq_ignore_ascii_case(day.trim()) && c.start_time == start_time.trim())
    }

    pub fn summary(&self) -> GridSummary {
        self.cells().fold(GridSummary::default(), |mut acc, cell| {
            match cell.status() {
                CellStatus::Available => acc.available += 1,
                CellStatus::Full => acc.full += 1,
                CellStatus::Empty => acc.empty += 1,
            }
            acc
        })
    }
}
