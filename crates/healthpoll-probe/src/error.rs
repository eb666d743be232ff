use thiserror::Error;

/// Outcome of one liveness check.
pub type CheckResult = Result<(), CheckError>;

/// Why a liveness check failed.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("service reported {0}")]
    NotServing(String),

    #[error("rpc failed with {code:?}: {message}")]
    Rpc { code: tonic::Code, message: String },
}

impl CheckError {
    /// Transport-level failures, as opposed to the service answering badly.
    pub fn is_transport(&self) -> bool {
        matches!(self, CheckError::Unavailable(_) | CheckError::DeadlineExceeded(_))
    }
}

impl From<tonic::Status> for CheckError {
    fn from(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            tonic::Code::Unavailable => CheckError::Unavailable(message),
            tonic::Code::DeadlineExceeded => CheckError::DeadlineExceeded(message),
            code => CheckError::Rpc { code, message },
        }
    }
}

/// Errors setting up probes at startup.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("tls setup for {endpoint} failed: {source}")]
    Tls {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_check_errors() {
        let err = CheckError::from(tonic::Status::unavailable("connection refused"));
        assert!(matches!(err, CheckError::Unavailable(ref m) if m == "connection refused"));
        assert!(err.is_transport());

        let err = CheckError::from(tonic::Status::deadline_exceeded("slow"));
        assert!(matches!(err, CheckError::DeadlineExceeded(_)));

        let err = CheckError::from(tonic::Status::not_found("unknown service live"));
        assert!(matches!(err, CheckError::Rpc { code: tonic::Code::NotFound, .. }));
        assert!(!err.is_transport());
    }
}
