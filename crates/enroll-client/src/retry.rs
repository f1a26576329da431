//! Repeated reads against the enrollment service.
//!
//! Catalog, options, grid and status lookups are plain GETs, so a lost or
//! overloaded request can be sent again. Application submission never goes
//! through here; it is sent exactly once.
//!
//! A read is retried when the transport fails or the service answers
//! 502, 503 or 504. Any other response goes back to the caller untouched.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::EnrollApiError;

/// First backoff step; doubles on every further attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(200);

fn gateway_unavailable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

/// `GET url?params`, with up to `retries` extra attempts.
pub(crate) async fn get_with_retry(
    http: &reqwest::Client,
    endpoint: &str,
    url: &str,
    params: &[(&str, String)],
    retries: u32,
) -> Result<reqwest::Response, EnrollApiError> {
    let mut attempt = 0;
    loop {
        let last = attempt >= retries;
        match http.get(url).query(params).send().await {
            Ok(resp) if last || !gateway_unavailable(resp.status()) => return Ok(resp),
            Ok(resp) => {
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    status = resp.status().as_u16(),
                    "enrollment service unavailable, retrying in {:?}",
                    backoff(attempt)
                );
            }
            Err(source) if last => {
                return Err(EnrollApiError::Http {
                    endpoint: endpoint.into(),
                    source,
                })
            }
            Err(e) => {
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    "enrollment service unreachable, retrying in {:?}: {e}",
                    backoff(attempt)
                );
            }
        }
        tokio::time::sleep(backoff(attempt)).await;
        attempt += 1;
    }
}
