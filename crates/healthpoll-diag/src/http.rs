//! HTTP request instrumentation for client channels.
//!
//! [`RequestDiagnostics`] wraps any `tower::Service` taking
//! `http::Request`s and writes `RequestStart`, `RequestStop` and
//! `RequestFailed` events to the `network-http-client` source.

use std::fmt;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::{Request, Response, Uri, Version};
use tower::{Layer, Service};

use crate::event::PayloadField;
use crate::registry::{EventRegistry, EventSource};
use crate::sources;

const REQUEST_START: i32 = 1;
const REQUEST_STOP: i32 = 2;
const REQUEST_FAILED: i32 = 3;

/// `tower::Layer` producing [`RequestDiagnostics`].
#[derive(Clone, Debug)]
pub struct RequestDiagnosticsLayer {
    source: EventSource,
    origin: Uri,
}

impl RequestDiagnosticsLayer {
    /// Requests without scheme or authority are reported against `origin`.
    pub fn new(registry: &EventRegistry, origin: Uri) -> Self {
        Self {
            source: registry.source(sources::HTTP_CLIENT),
            origin,
        }
    }
}

impl<S> Layer<S> for RequestDiagnosticsLayer {
    type Service = RequestDiagnostics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestDiagnostics {
            inner,
            source: self.source.clone(),
            origin: self.origin.clone(),
        }
    }
}

/// Service wrapper reporting request lifecycle events.
#[derive(Clone, Debug)]
pub struct RequestDiagnostics<S> {
    inner: S,
    source: EventSource,
    origin: Uri,
}

impl<S> RequestDiagnostics<S> {
    pub fn new(inner: S, registry: &EventRegistry, origin: Uri) -> Self {
        RequestDiagnosticsLayer::new(registry, origin).layer(inner)
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn request_start<B>(&self, req: &Request<B>) {
        let uri = req.uri();
        let scheme = uri
            .scheme_str()
            .or(self.origin.scheme_str())
            .unwrap_or("http");
        let host = uri.host().or(self.origin.host()).unwrap_or_default();
        let port = uri
            .port_u16()
            .or(self.origin.port_u16())
            .unwrap_or(if scheme == "https" { 443 } else { 80 });
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let (major, minor) = version_parts(req.version());

        self.source.write(
            "RequestStart",
            REQUEST_START,
            vec![
                PayloadField::new("scheme", scheme),
                PayloadField::new("host", host),
                PayloadField::new("port", u64::from(port)),
                PayloadField::new("pathAndQuery", path),
                PayloadField::new("versionMajor", major),
                PayloadField::new("versionMinor", minor),
            ],
        );
    }
}

fn version_parts(version: Version) -> (u64, u64) {
    if version == Version::HTTP_09 {
        (0, 9)
    } else if version == Version::HTTP_10 {
        (1, 0)
    } else if version == Version::HTTP_2 {
        (2, 0)
    } else if version == Version::HTTP_3 {
        (3, 0)
    } else {
        (1, 1)
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestDiagnostics<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let enabled = self.source.is_enabled();
        if enabled {
            self.request_start(&req);
        }

        let source = self.source.clone();
        let fut = self.inner.call(req);
        Box::pin(async move {
            let result = fut.await;
            if enabled {
                match &result {
                    Ok(resp) => source.write(
                        "RequestStop",
                        REQUEST_STOP,
                        vec![PayloadField::new("statusCode", i64::from(resp.status().as_u16()))],
                    ),
                    Err(e) => source.write(
                        "RequestFailed",
                        REQUEST_FAILED,
                        vec![PayloadField::new("exceptionMessage", e.to_string())],
                    ),
                }
            }
            result
        })
    }
}
