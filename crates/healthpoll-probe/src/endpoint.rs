//! Endpoint addresses.

use std::fmt;

use http::Uri;

use crate::error::ProbeError;

/// An endpoint to health-check. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: Uri,
}

impl Endpoint {
    /// Parse an endpoint address.
    ///
    /// `host:port` without a scheme is taken as `http://host:port`.
    pub fn parse(address: &str) -> Result<Self, ProbeError> {
        let address = address.trim();
        let invalid = |reason: String| ProbeError::InvalidEndpoint {
            endpoint: address.to_string(),
            reason,
        };

        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let uri: Uri = with_scheme.parse().map_err(|e| invalid(format!("{e}")))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        }
        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self { uri })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn is_tls(&self) -> bool {
        self.uri.scheme_str() == Some("https")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Uri's Display adds a trailing '/' for an empty path.
        let s = self.uri.to_string();
        f.write_str(s.strip_suffix('/').unwrap_or(&s))
    }
}
