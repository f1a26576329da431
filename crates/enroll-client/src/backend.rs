//! The enrollment service as seen by the workflow.
//!
//! [`EnrollClient`](crate::EnrollClient) is the HTTP implementation; tests
//! substitute scripted in-memory backends.

use enroll_core::RegistrationId;

use crate::error::EnrollApiError;
use crate::types::{ConfigOptions, StatusLookup, SubjectListing, SubmissionReceipt, SubmissionRequest};

/// Remote operations the enrollment workflow depends on. Grid fetching is
/// the separate [`TimeslotSource`](enroll_schedule::TimeslotSource) seam.
#[allow(async_fn_in_trait)]
pub trait EnrollmentBackend {
    /// `GET /user/subjects`
    async fn fetch_subjects(&self) -> Result<Vec<SubjectListing>, EnrollApiError>;

    /// `GET /user/options`
    async fn fetch_options(&self) -> Result<ConfigOptions, EnrollApiError>;

    /// `POST /user/applications/submit`
    async fn submit_application(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, EnrollApiError>;

    /// `GET /user/applications/{id}`
    async fn application_status(&self, id: &RegistrationId) -> Result<StatusLookup, EnrollApiError>;
}
