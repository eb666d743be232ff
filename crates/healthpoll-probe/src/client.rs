//! gRPC liveness client.
//!
//! Talks `grpc.health.v1.Health/Check` to one endpoint over a lazily
//! connected channel, so an endpoint that is down at startup is simply
//! reported as unavailable on each round.

use std::future::Future;

use healthpoll_diag::{EventRegistry, RequestDiagnostics};
use tonic::transport::{Channel, ClientTlsConfig};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{CheckError, CheckResult, ProbeError};

/// A liveness check against one endpoint.
pub trait LivenessCheck: Send + Sync {
    /// The endpoint this client checks, for log output.
    fn endpoint(&self) -> &str;

    /// Ask the endpoint whether `service` is serving.
    fn check_liveness(&self, service: &str) -> impl Future<Output = CheckResult> + Send;
}

/// Health client over an instrumented tonic channel.
#[derive(Clone)]
pub struct GrpcLivenessClient {
    endpoint: String,
    client: HealthClient<RequestDiagnostics<Channel>>,
}

impl GrpcLivenessClient {
    /// Build a client for `endpoint`. No connection is made until the
    /// first check; request events go to `registry`.
    pub fn connect_lazy(endpoint: &Endpoint, registry: &EventRegistry) -> Result<Self, ProbeError> {
        let mut builder = Channel::builder(endpoint.uri().clone());
        if endpoint.is_tls() {
            builder = builder
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|source| ProbeError::Tls {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
        }

        let channel = RequestDiagnostics::new(builder.connect_lazy(), registry, endpoint.uri().clone());
        let client = HealthClient::with_origin(channel, endpoint.uri().clone());

        debug!(%endpoint, "health client created");
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

impl LivenessCheck for GrpcLivenessClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check_liveness(&self, service: &str) -> CheckResult {
        let mut client = self.client.clone();
        let response = client
            .check(HealthCheckRequest {
                service: service.to_string(),
            })
            .await?
            .into_inner();

        match response.status() {
            ServingStatus::Serving => Ok(()),
            status => Err(CheckError::NotServing(status.as_str_name().to_string())),
        }
    }
}
