//! The reachability check itself: DNS resolution followed by an HTTPS GET
//! (spec §4.3).

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// A connectivity check, abstracted so the supervisor is testable without
/// real network access.
///
/// Grounded in the teacher's capability-trait idiom (e.g.
/// `astrid_events::EventSubscriber`): the supervisor depends on this trait,
/// never on `reqwest`/DNS directly.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns whether the probe succeeded. Must never propagate an error —
    /// per spec §4.3, "any probe exception is treated as 'not connected'".
    async fn check(&self) -> bool;
}

/// The production probe: resolve `test_domain`, then GET `https://test_domain`
/// and require a 200 response.
pub struct HttpProbe {
    test_domain: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Build a probe against `test_domain` with the given per-step timeout.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` cannot be constructed,
    /// which only happens on an invalid TLS backend configuration.
    #[must_use]
    pub fn new(test_domain: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client backend is valid");
        Self {
            test_domain: test_domain.into(),
            timeout,
            client,
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> bool {
        match self.run().await {
            Ok(connected) => connected,
            Err(e) => {
                debug!(error = %e, domain = %self.test_domain, "connectivity probe failed");
                false
            }
        }
    }
}

impl HttpProbe {
    async fn run(&self) -> Result<bool, ProbeError> {
        let target = format!("{}:443", self.test_domain);
        tokio::time::timeout(self.timeout, tokio::net::lookup_host(&target))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Dns)?
            .next()
            .ok_or(ProbeError::NoAddresses)?;

        let url = format!("https://{}", self.test_domain);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProbeError::Http)?;
        Ok(response.status().as_u16() == 200)
    }
}

#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("DNS resolution timed out")]
    Timeout,
    #[error("DNS resolution failed: {0}")]
    Dns(std::io::Error),
    #[error("DNS resolution returned no addresses")]
    NoAddresses,
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
}
