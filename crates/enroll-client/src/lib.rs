//! # enroll-client -- Typed HTTP client for the enrollment service
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/user/subjects` | Subject catalog |
//! | GET    | `/user/options` | Configuration choices |
//! | GET    | `/user/timeslots/grid?subjectId=&groupType=` | Weekly timeslot grid |
//! | POST   | `/user/applications/submit` | Submit an application (multipart) |
//! | GET    | `/user/applications/{id}` | Application status |
//!
//! Paths are relative to the configured base URL, which carries the API
//! prefix (default `http://localhost:5000/api`).
//!
//! Reads are retried with exponential backoff on transport failures and
//! gateway errors (see `ClientConfig::read_retries`). A submission is sent
//! exactly once: a timeout or transport failure is reported as
//! [`EnrollApiError::Http`] even though the service may have accepted it.
//! Non-2xx responses are returned as [`EnrollApiError::ApiError`], except on
//! status lookup where 404 and 400 mean the application is unknown.

pub mod backend;
pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use backend::EnrollmentBackend;
pub use config::{ClientConfig, ConfigError};
pub use error::EnrollApiError;
pub use types::{
    ApplicationStatus, ApplicationSubject, ConfigOptions, OptionEntry, StatusLookup,
    SubjectListing, SubmissionReceipt, SubmissionRequest,
};

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use enroll_core::RegistrationId;
use enroll_schedule::{GridLoadError, GridQuery, TimeslotGrid, TimeslotSource};

use crate::types::{Envelope, SubmissionResponse};

/// HTTP client for the enrollment service.
#[derive(Debug, Clone)]
pub struct EnrollClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl EnrollClient {
    /// Create a new client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, EnrollApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ConfigError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EnrollApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the timeslot grid.
    ///
    /// Calls `GET {base_url}/user/timeslots/grid`.
    pub async fn timeslot_grid(&self, query: &GridQuery) -> Result<TimeslotGrid, EnrollApiError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(subject_id) = &query.subject_id {
            params.push(("subjectId", subject_id.to_string()));
        }
        if let Some(group_type) = &query.group_type {
            params.push(("groupType", group_type.clone()));
        }
        self.get_json("GET /user/timeslots/grid", "/user/timeslots/grid", &params)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, EnrollApiError> {
        let url = self.config.endpoint(path);
        let resp = retry::get_with_retry(
            &self.http,
            endpoint,
            &url,
            params,
            self.config.read_retries,
        )
        .await?;

        let resp = ensure_success(endpoint, resp).await?;
        resp.json().await.map_err(|e| EnrollApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }
}

async fn ensure_success(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, EnrollApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(EnrollApiError::ApiError {
        endpoint: endpoint.into(),
        status,
        body,
    })
}

async fn read_proof(path: &Path) -> Result<(String, Vec<u8>), EnrollApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| EnrollApiError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "payment-proof".to_string());
    Ok((file_name, bytes))
}

impl EnrollmentBackend for EnrollClient {
    async fn fetch_subjects(&self) -> Result<Vec<SubjectListing>, EnrollApiError> {
        let listing: Envelope<Vec<SubjectListing>> =
            self.get_json("GET /user/subjects", "/user/subjects", &[]).await?;
        Ok(listing.into_inner())
    }

    async fn fetch_options(&self) -> Result<ConfigOptions, EnrollApiError> {
        self.get_json("GET /user/options", "/user/options", &[]).await
    }

    async fn submit_application(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, EnrollApiError> {
        let endpoint = "POST /user/applications/submit";
        let url = self.config.endpoint("/user/applications/submit");

        let proof = match &request.payment_proof {
            Some(path) => Some(read_proof(path).await?),
            None => None,
        };

        let mut form = Form::new();
        for (name, value) in request.text_fields() {
            form = form.text(name, value);
        }
        if let Some((file_name, bytes)) = proof {
            form = form.part("paymentProof", Part::bytes(bytes).file_name(file_name));
        }

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    subject_id = %request.subject_id,
                    timed_out = e.is_timeout(),
                    "application submission failed; not resent"
                );
                EnrollApiError::Http {
                    endpoint: endpoint.into(),
                    source: e,
                }
            })?;

        let resp = ensure_success(endpoint, resp).await?;
        let body: SubmissionResponse =
            resp.json().await.map_err(|e| EnrollApiError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let server_id = body
            .data
            .and_then(|d| d.id)
            .and_then(|id| RegistrationId::new(id).ok())
            .ok_or_else(|| EnrollApiError::MissingField {
                endpoint: endpoint.into(),
                field: "data._id",
            })?;

        tracing::info!(%server_id, subject_id = %request.subject_id, "application submitted");
        Ok(SubmissionReceipt { server_id })
    }

    async fn application_status(&self, id: &RegistrationId) -> Result<StatusLookup, EnrollApiError> {
        let endpoint = format!("GET /user/applications/{id}");
        let url = self.config.endpoint(&format!("/user/applications/{id}"));

        let resp =
            retry::get_with_retry(&self.http, &endpoint, &url, &[], self.config.read_retries)
                .await?;

        if matches!(
            resp.status(),
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::BAD_REQUEST
        ) {
            tracing::debug!(application_id = %id, status = resp.status().as_u16(), "application unknown to service");
            return Ok(StatusLookup::NotFound);
        }

        let resp = ensure_success(&endpoint, resp).await?;
        let record: Envelope<ApplicationStatus> =
            resp.json().await.map_err(|e| EnrollApiError::Deserialization {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        Ok(StatusLookup::Found(record.into_inner()))
    }
}

impl TimeslotSource for EnrollClient {
    async fn fetch_grid(&self, query: &GridQuery) -> Result<TimeslotGrid, GridLoadError> {
        self.timeslot_grid(query)
            .await
            .map_err(|e| GridLoadError::Source(e.to_string()))
    }
}
