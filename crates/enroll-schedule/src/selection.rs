//! Slot selection: hand an available cell's schedule to the registration
//! machine.

use thiserror::Error;

use enroll_state::{RegistrationError, RegistrationMachine, Schedule};

use crate::grid::{CellStatus, GridCell};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("timeslot is not selectable ({status})")]
    NotSelectable { status: CellStatus },

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Assign `cell` to the active registration. Selecting again before
/// submission overwrites the previous choice.
pub fn select_slot(
    machine: &mut RegistrationMachine,
    cell: &GridCell,
) -> Result<Schedule, SelectionError> {
    let status = cell.status();
    if !status.is_selectable() {
        return Err(SelectionError::NotSelectable { status });
    }
    let schedule = cell.to_schedule();
    machine.set_schedule(schedule.clone())?;
    tracing::info!(day = %schedule.day, start = %schedule.start_time, teacher = %schedule.teacher, "timeslot selected");
    Ok(schedule)
}
