use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("timed out after {elapsed:?} waiting for {url} ({attempts} attempts)")]
    Timeout {
        url: String,
        attempts: u32,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Polls an HTTP endpoint until it answers with a success status.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    client: Client,
    timeout: Duration,
    interval: Duration,
}

impl ReadinessProbe {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder().build().map_err(ProbeError::Client)?;
        Ok(Self {
            client,
            timeout,
            interval,
        })
    }

    /// Issues GET requests against `url` every `interval` until one succeeds.
    ///
    /// Connection failures count the same as error statuses. The deadline is
    /// only checked between attempts: no attempt is started that could not
    /// begin before `timeout` has elapsed, and an in-flight request is never
    /// interrupted.
    ///
    /// # Errors
    /// Returns [`ProbeError::Timeout`] once the deadline has passed.
    pub async fn wait_until_ready(&self, url: &str) -> Result<ProbeReport, ProbeError> {
        info!(service = url, "Checking if the service is up...");
        let start = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(attempts, "Service is up and running!");
                    return Ok(ProbeReport {
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                Ok(response) => debug!(status = %response.status(), "Service answered"),
                Err(err) => debug!(error = %err, "Service unreachable"),
            }

            let elapsed = start.elapsed();
            if elapsed.saturating_add(self.interval) > self.timeout {
                return Err(ProbeError::Timeout {
                    url: url.to_string(),
                    attempts,
                    elapsed,
                });
            }
            info!("Service not ready yet. Retrying...");
            tokio::time::sleep(self.interval).await;
        }
    }
}
