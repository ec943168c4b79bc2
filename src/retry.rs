//! Fixed-delay retry on rate-limit responses.
//!
//! Only upload is retried. The service throttles uploads with a plain
//! `400`, so the policy retries a configured set of client-error statuses
//! up to `max_attempts` times in total, sleeping a fixed delay between
//! attempts. Transport failures and every other classification end the loop
//! at once.
//!
//! The wait is a blocking `std::thread::sleep` on the calling thread; there
//! is no cancellation. Callers that need a deadline wrap the call.

use crate::classify::{classify, Classification};
use crate::config::ClientConfig;
use crate::error::{CrocodocError, HttpError};
use crocodoc_http::{Response, TransportError};
use std::time::Duration;
use tracing::{debug, warn};

/// When and how often to re-issue a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always ≥ 1.
    pub max_attempts: u32,
    pub delay: Duration,
    /// Client-error statuses that trigger a retry.
    pub statuses: Vec<u16>,
}

impl RetryPolicy {
    /// The upload policy described by `config`.
    pub fn rate_limit(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.rate_limit_max_attempts.max(1),
            delay: config.rate_limit_delay(),
            statuses: config.rate_limit_statuses.clone(),
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            statuses: Vec::new(),
        }
    }

    pub fn is_rate_limited(&self, error: &HttpError) -> bool {
        error.is_rate_limit(&self.statuses)
    }

    /// Run `send` until it yields a non-rate-limited response or the budget
    /// is spent, returning the response once it classifies as success-shaped.
    ///
    /// After the last attempt the last classified error is returned.
    pub fn run<F>(&self, operation: &str, mut send: F) -> Result<Response, CrocodocError>
    where
        F: FnMut() -> Result<Response, TransportError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let response = send()?;
            let classification = classify(&response);
            if let Classification::Unclassified { status } = classification {
                warn!("{}: unexpected HTTP {}; treating body as a result", operation, status);
            }

            match classification.into_result() {
                Ok(()) => {
                    debug!("{}: HTTP {} after {} attempt(s)", operation, response.status, attempt);
                    return Ok(response);
                }
                Err(error) if self.is_rate_limited(&error) && attempt < max_attempts => {
                    warn!(
                        "{}: rate limited (HTTP {}), retry {}/{} after {:?}",
                        operation,
                        error.status,
                        attempt,
                        max_attempts - 1,
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
