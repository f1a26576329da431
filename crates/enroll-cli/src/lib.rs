//! # enroll-cli -- Enrollment Command-Line Interface
//!
//! Provides the `enroll` binary.
//!
//! ## Subcommands
//!
//! - `enroll subjects` -- list the subject catalog.
//! - `enroll options` -- list configuration choices.
//! - `enroll grid` -- show the weekly timeslot grid.
//! - `enroll register` -- configure, pick a slot and submit in one go.
//! - `enroll history` -- show locally recorded applications.
//! - `enroll resync` -- fetch reviewer decisions for pending applications.
//!
//! The service location comes from `ENROLL_API_URL` / `ENROLL_API_TOKEN` /
//! `ENROLL_TIMEOUT_SECS`; local paths and fallback behaviour from the
//! optional `--config` YAML file.

pub mod catalog;
pub mod grid;
pub mod history;
pub mod register;

use std::path::Path;

use anyhow::{Context as _, Result};

use enroll_client::{ClientConfig, EnrollClient};
use enroll_workflow::{JsonFileHistory, Workflow, WorkflowConfig};

/// Workflow over the HTTP client and the on-disk history.
pub type Session = Workflow<EnrollClient, JsonFileHistory>;

/// Resolved configuration shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub client: EnrollClient,
    pub config: WorkflowConfig,
}

impl Context {
    /// Build the context from the environment and an optional config file.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => WorkflowConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => WorkflowConfig::default(),
        };
        let client_config = ClientConfig::from_env().context("reading service configuration")?;
        tracing::debug!(?client_config, history = %config.history_path.display(), "configuration resolved");
        let client = EnrollClient::new(client_config).context("building HTTP client")?;
        Ok(Self { client, config })
    }

    /// A fresh workflow session.
    pub fn session(&self) -> Session {
        Workflow::new(
            self.client.clone(),
            JsonFileHistory::new(&self.config.history_path),
            self.config.clone(),
        )
    }
}

/// Print and clear pending notices on stderr.
pub fn flush_notices(session: &mut Session) {
    for notice in session.take_notices() {
        eprintln!("{notice}");
    }
}
