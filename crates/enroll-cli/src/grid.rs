//! # Grid Subcommand
//!
//! Prints the weekly timeslot grid, one row per period and one column per
//! day.

use anyhow::{bail, Result};
use clap::Args;

use enroll_core::SubjectId;
use enroll_schedule::{load_time_slots, CellStatus, GridCell, GridQuery, TimeslotGrid};

use crate::{flush_notices, Context};

const COLUMN_WIDTH: usize = 22;

/// Arguments for `enroll grid`.
#[derive(Args, Debug)]
pub struct GridArgs {
    /// Subject id or name to filter by.
    #[arg(long)]
    pub subject: Option<String>,

    /// Group type to filter by (e.g. `group`, `private`).
    #[arg(long)]
    pub group_type: Option<String>,
}

pub async fn run_grid(args: &GridArgs, ctx: &Context) -> Result<u8> {
    let subject_id = match &args.subject {
        Some(raw) => Some(resolve_subject(ctx, raw).await?),
        None => None,
    };
    let query = GridQuery::new(subject_id, args.group_type.clone());
    let loaded = load_time_slots(&ctx.client, &query, ctx.config.synthetic_fallback).await?;

    if loaded.is_degraded() {
        eprintln!("warning: live timeslots are unavailable; showing sample availability");
    }
    print!("{}", render_grid(&loaded.grid));

    let summary = loaded.grid.summary();
    println!(
        "\n{} available, {} full, {} without class",
        summary.available, summary.full, summary.empty
    );
    Ok(0)
}

async fn resolve_subject(ctx: &Context, raw: &str) -> Result<SubjectId> {
    let mut session = ctx.session();
    let found = session
        .load_catalog()
        .await
        .iter()
        .find(|s| s.id.as_str() == raw.trim() || s.name.eq_ignore_ascii_case(raw.trim()))
        .map(|s| s.id.clone());
    flush_notices(&mut session);
    match found {
        Some(id) => Ok(id),
        None => bail!("unknown subject {raw:?}"),
    }
}

/// Plain-text table of `grid`.
pub fn render_grid(grid: &TimeslotGrid) -> String {
    let mut out = format!("{:<12}", "");
    for day in &grid.days {
        out.push_str(&format!("{day:<width$}", width = COLUMN_WIDTH));
    }
    out.push('\n');

    for row in &grid.time_slots {
        out.push_str(&format!("{:<12}", row.label));
        for day in &grid.days {
            let cell = row.slots.iter().find(|c| c.day.eq_ignore_ascii_case(day));
            out.push_str(&format!("{:<width$}", cell_text(cell), width = COLUMN_WIDTH));
        }
        out.push('\n');
    }
    out
}

fn cell_text(cell: Option<&GridCell>) -> String {
    match cell {
        Some(cell) => match cell.status() {
            CellStatus::Available => format!(
                "{} {}/{}",
                cell.teacher_label(),
                cell.enrolled,
                cell.capacity
            ),
            CellStatus::Full => format!("{} FULL", cell.teacher_label()),
            CellStatus::Empty => "-".to_string(),
        },
        None => "-".to_string(),
    }
}
