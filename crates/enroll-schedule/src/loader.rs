//! # Grid Loading
//!
//! Fetches the working grid from a [`TimeslotSource`]. A failed or empty
//! fetch falls back to the synthetic grid when the caller allows it and the
//! `synthetic-fallback` feature is compiled in. The returned [`LoadedGrid`]
//! always records which path produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use enroll_core::SubjectId;

use crate::grid::TimeslotGrid;

/// Optional filters for a grid fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridQuery {
    pub subject_id: Option<SubjectId>,
    pub group_type: Option<String>,
}

impl GridQuery {
    pub fn new(subject_id: Option<SubjectId>, group_type: Option<String>) -> Self {
        Self {
            subject_id,
            group_type: group_type.filter(|g| !g.trim().is_empty()),
        }
    }
}

/// Why a live grid could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridLoadError {
    /// The timeslot service failed.
    #[error("timeslot service failed: {0}")]
    Source(String),

    /// The timeslot service answered with no rows.
    #[error("timeslot service returned an empty grid")]
    EmptyGrid,
}

/// Grid-fetch collaborator.
#[allow(async_fn_in_trait)]
pub trait TimeslotSource {
    async fn fetch_grid(&self, query: &GridQuery) -> Result<TimeslotGrid, GridLoadError>;
}

/// Where a [`LoadedGrid`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridOrigin {
    Live,
    /// Randomly generated placeholder data.
    Synthetic,
}

/// A grid together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedGrid {
    pub grid: TimeslotGrid,
    pub origin: GridOrigin,
}

impl LoadedGrid {
    pub fn is_degraded(&self) -> bool {
        self.origin == GridOrigin::Synthetic
    }
}

/// Load the working grid for `query`.
///
/// With `allow_fallback` false (or the feature disabled), a failed fetch is
/// returned as an error.
pub async fn load_time_slots<S: TimeslotSource>(
    source: &S,
    query: &GridQuery,
    allow_fallback: bool,
) -> Result<LoadedGrid, GridLoadError> {
    tracing::debug!(subject_id = ?query.subject_id, group_type = ?query.group_type, "loading timeslot grid");

    let failure = match source.fetch_grid(query).await {
        Ok(grid) if !grid.is_empty() => {
            return Ok(LoadedGrid {
                grid,
                origin: GridOrigin::Live,
            });
        }
        Ok(_) => GridLoadError::EmptyGrid,
        Err(e) => e,
    };

    degrade(failure, allow_fallback)
}

#[cfg(feature = "synthetic-fallback")]
fn degrade(failure: GridLoadError, allow_fallback: bool) -> Result<LoadedGrid, GridLoadError> {
    if !allow_fallback {
        tracing::warn!(error = %failure, "timeslot grid unavailable");
        return Err(failure);
    }
    tracing::warn!(error = %failure, "timeslot service unavailable, using synthetic grid");
    Ok(LoadedGrid {
        grid: crate::fallback::synthetic_grid(&mut rand::thread_rng()),
        origin: GridOrigin::Synthetic,
    })
}

#[cfg(not(feature = "synthetic-fallback"))]
fn degrade(failure: GridLoadError, _allow_fallback: bool) -> Result<LoadedGrid, GridLoadError> {
    tracing::warn!(error = %failure, "timeslot grid unavailable");
    Err(failure)
}
