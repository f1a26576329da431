//! # enroll-schedule — Timeslot Grid Builder
//!
//! Loads the weekly timeslot grid, classifies each cell as empty, available
//! or full, and forwards a chosen cell to the registration machine.
//!
//! ## Degraded mode
//!
//! When the timeslot service fails, [`load_time_slots`] may substitute a
//! randomly generated grid (`fallback.rs`, behind the default
//! `synthetic-fallback` feature). Such a grid is returned with
//! [`GridOrigin::Synthetic`] and never goes through the live parsing path.

pub mod grid;
pub mod loader;
pub mod selection;

#[cfg(feature = "synthetic-fallback")]
pub mod fallback;

pub use grid::{CellStatus, GridCell, GridRow, GridSummary, TimeslotGrid, UNASSIGNED_TEACHER};
pub use loader::{load_time_slots, GridLoadError, GridOrigin, GridQuery, LoadedGrid, TimeslotSource};
pub use selection::{select_slot, SelectionError};
