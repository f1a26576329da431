//! # Synthetic Grid
//!
//! Placeholder grid used when the timeslot service cannot provide one.
//! The day and period axes are fixed; teachers, capacity, enrollment and
//! which cells hold a class are random. Callers receive it tagged as
//! [`GridOrigin::Synthetic`](crate::GridOrigin::Synthetic) and must not
//! treat it as real availability.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::grid::{GridCell, GridRow, TimeslotGrid};

pub const SYNTHETIC_DAYS: [&str; 6] = ["Sat", "Sun", "Mon", "Tue", "Wed", "Thu"];

/// `(start, end, label)` for each two-hour period.
pub const SYNTHETIC_PERIODS: [(&str, &str, &str); 6] = [
    ("08:00", "10:00", "8-10 AM"),
    ("10:00", "12:00", "10-12 PM"),
    ("12:00", "14:00", "12-2 PM"),
    ("14:00", "16:00", "2-4 PM"),
    ("16:00", "18:00", "4-6 PM"),
    ("18:00", "20:00", "6-8 PM"),
];

pub const SYNTHETIC_TEACHERS: [&str; 5] = [
    "Dr. Ahmed",
    "Prof. Sarah",
    "Mr. Mohamed",
    "Ms. Fatima",
    "Dr. Hassan",
];

const CLASS_PROBABILITY: f64 = 0.8;

/// Build a synthetic grid from `rng`.
pub fn synthetic_grid<R: Rng + ?Sized>(rng: &mut R) -> TimeslotGrid {
    let time_slots = SYNTHETIC_PERIODS
        .iter()
        .map(|&(start, end, label)| GridRow {
            start: start.to_string(),
            end: end.to_string(),
            label: label.to_string(),
            slots: SYNTHETIC_DAYS
                .iter()
                .map(|day| synthetic_cell(rng, day, start, end, label))
                .collect(),
        })
        .collect();

    TimeslotGrid {
        days: SYNTHETIC_DAYS.iter().map(|d| d.to_string()).collect(),
        time_slots,
    }
}

fn synthetic_cell<R: Rng + ?Sized>(
    rng: &mut R,
    day: &str,
    start: &str,
    end: &str,
    label: &str,
) -> GridCell {
    let has_slot = rng.gen_bool(CLASS_PROBABILITY);
    let (teacher, capacity, enrolled) = if has_slot {
        (
            SYNTHETIC_TEACHERS.choose(rng).map(|t| t.to_string()),
            rng.gen_range(5..=24),
            rng.gen_range(0..=24),
        )
    } else {
        (None, 0, 0)
    };

    GridCell {
        id: None,
        day: day.to_string(),
        time: label.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        teacher,
        group_name: None,
        capacity,
        enrolled,
        available: has_slot && enrolled < capacity,
        has_slot,
        placeholder: !has_slot,
    }
}
