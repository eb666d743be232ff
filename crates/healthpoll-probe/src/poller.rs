//! Polling rounds.
//!
//! A round checks every endpoint concurrently and completes when all of
//! them have answered or failed. Failures are logged per endpoint and do
//! not affect the other checks.

use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::client::LivenessCheck;
use crate::error::CheckError;

/// Service name asked for when none is configured.
pub const DEFAULT_SERVICE: &str = "live";

/// Summary of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundReport {
    /// Endpoints checked.
    pub checked: usize,
    /// Endpoints whose check failed.
    pub failed: usize,
}

/// Checks a fixed set of endpoints, one round at a time.
pub struct HealthPoller<C> {
    clients: Vec<C>,
    service: String,
}

impl<C: LivenessCheck> HealthPoller<C> {
    pub fn new(clients: Vec<C>, service: impl Into<String>) -> Self {
        Self {
            clients,
            service: service.into(),
        }
    }

    pub fn clients(&self) -> &[C] {
        &self.clients
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Check every endpoint once. Never fails; returns after all checks
    /// settle.
    pub async fn run_round(&self) -> RoundReport {
        let service = self.service.as_str();
        let outcomes = join_all(self.clients.iter().map(|client| async move {
            let result = client.check_liveness(service).await;
            log_outcome(client.endpoint(), service, &result);
            result.is_ok()
        }))
        .await;

        RoundReport {
            checked: outcomes.len(),
            failed: outcomes.iter().filter(|ok| !**ok).count(),
        }
    }
}

fn log_outcome(endpoint: &str, service: &str, result: &Result<(), CheckError>) {
    match result {
        Ok(()) => info!(%endpoint, %service, "endpoint is live"),
        Err(e) if e.is_transport() => warn!(%endpoint, %service, error = %e, "liveness check failed"),
        Err(e) => error!(%endpoint, %service, error = %e, "liveness check failed"),
    }
}
