//! # Register Subcommand
//!
//! Runs the whole enrollment workflow non-interactively: choose the
//! subject, fill in the configuration, load the grid, pick the slot and
//! submit. Personal details fall back to the profile saved by the previous
//! submission.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;

use enroll_state::{ConfigKey, FormData, PaymentProof};
use enroll_workflow::Profile;

use crate::{flush_notices, Context};

/// Arguments for `enroll register`.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Subject id or name.
    #[arg(long)]
    pub subject: String,

    #[arg(long)]
    pub group_type: String,

    #[arg(long)]
    pub group_level: String,

    #[arg(long)]
    pub education_type: String,

    #[arg(long)]
    pub grade: String,

    /// Day of the timeslot, e.g. `Sat`.
    #[arg(long)]
    pub day: String,

    /// Start time of the timeslot, e.g. `08:00`.
    #[arg(long)]
    pub start: String,

    /// Full name; defaults to the saved profile.
    #[arg(long)]
    pub name: Option<String>,

    /// Email; defaults to the saved profile.
    #[arg(long)]
    pub email: Option<String>,

    /// Phone; defaults to the saved profile.
    #[arg(long)]
    pub phone: Option<String>,

    /// Payment proof image to upload.
    #[arg(long, value_name = "FILE")]
    pub proof: Option<PathBuf>,
}

pub async fn run_register(args: &RegisterArgs, ctx: &Context) -> Result<u8> {
    let mut session = ctx.session();
    session.rehydrate().context("restoring local history")?;
    session.load_catalog().await;

    session.choose_subject(Some(args.subject.as_str()))?;
    for (key, value) in [
        (ConfigKey::GroupType, &args.group_type),
        (ConfigKey::GroupLevel, &args.group_level),
        (ConfigKey::EducationType, &args.education_type),
        (ConfigKey::Grade, &args.grade),
    ] {
        session.set_config(key, value)?;
    }

    session.view_schedule().await?;
    let schedule = session.pick_slot(&args.day, &args.start)?;
    tracing::info!(day = %schedule.day, time = %schedule.time, "timeslot chosen");

    let profile = session
        .saved_profile()
        .context("reading saved profile")?
        .unwrap_or_default();
    let form = build_form(args, &profile)?;

    let outcome = session.submit(form).await?;
    flush_notices(&mut session);

    let reference = outcome
        .server_id
        .as_ref()
        .unwrap_or(&outcome.registration.id);
    println!(
        "{} submitted: {} {} with {} (reference {reference})",
        outcome.registration.display_name(),
        schedule.day,
        schedule.time,
        schedule.teacher,
    );
    Ok(0)
}

fn build_form(args: &RegisterArgs, profile: &Profile) -> Result<FormData> {
    let proof = args.proof.as_deref().map(payment_proof).transpose()?;
    let form = FormData::new(
        args.name.as_deref().unwrap_or(&profile.full_name),
        args.email.as_deref().unwrap_or(&profile.email),
        args.phone.as_deref().unwrap_or(&profile.phone),
        &args.grade,
        proof,
    )?;
    Ok(form)
}

fn payment_proof(path: &Path) -> Result<PaymentProof> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading payment proof {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(PaymentProof {
        path: path.to_path_buf(),
        file_name,
        size_bytes: metadata.len(),
    })
}
