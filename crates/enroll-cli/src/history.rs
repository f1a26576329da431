//! # History and Resync Subcommands
//!
//! Both restore submitted applications from the local history file.
//! `resync` additionally asks the service for reviewer decisions.

use anyhow::{Context as _, Result};
use clap::Args;

use enroll_workflow::RegisteredSummary;

use crate::{flush_notices, Context, Session};

/// Arguments for `enroll history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {}

/// Arguments for `enroll resync`.
#[derive(Args, Debug)]
pub struct ResyncArgs {}

async fn restored_session(ctx: &Context) -> Result<Session> {
    let mut session = ctx.session();
    session.load_catalog().await;
    let report = session.rehydrate().context("restoring local history")?;
    if report.pruned > 0 {
        eprintln!("removed {} outdated entries from local history", report.pruned);
    }
    Ok(session)
}

pub async fn run_history(_args: &HistoryArgs, ctx: &Context) -> Result<u8> {
    let mut session = restored_session(ctx).await?;
    flush_notices(&mut session);
    print_summaries(&session.registered_summaries());
    Ok(0)
}

pub async fn run_resync(_args: &ResyncArgs, ctx: &Context) -> Result<u8> {
    let mut session = restored_session(ctx).await?;
    let report = session.resync_statuses().await?;
    flush_notices(&mut session);

    println!(
        "checked {}, updated {}, removed {}, failed {}",
        report.checked, report.updated, report.removed, report.failed
    );
    print_summaries(&session.registered_summaries());
    Ok(if report.failed > 0 { 1 } else { 0 })
}

fn print_summaries(summaries: &[RegisteredSummary]) {
    if summaries.is_empty() {
        println!("no applications recorded");
    }
    for line in summaries.iter().map(summary_line) {
        println!("{line}");
    }
}

fn summary_line(summary: &RegisteredSummary) -> String {
    let slot = summary
        .schedule
        .as_ref()
        .map(|s| format!("{} {} with {}", s.day, s.time, s.teacher))
        .unwrap_or_else(|| "no timeslot".to_string());
    format!(
        "{:<24} {:<16} {slot}",
        summary.display_name,
        summary.state.label()
    )
}
