use std::time::Duration;

use reqwest::Url;

use crate::config::{ClientConfig, TlsVerification};
use crate::error::{Error, Result, TransportError, TransportErrorKind};

/// One XML-RPC POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Endpoint for this attempt; changes when a pool redirect is followed.
    pub url: Url,
    /// Wire method name, for diagnostics.
    pub method: String,
    /// `<methodCall>` document.
    pub body: Vec<u8>,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

/// The raw answer to an [`HttpRequest`]. Redirects are not followed here.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, when present.
    pub location: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// A synchronous transport for exchanging XML-RPC documents.
///
/// Implementations may be shared across threads; each call must complete its
/// own request/response pair without interleaving with others.
#[cfg(feature = "blocking")]
pub trait Transport: Send + Sync {
    /// POST a request and wait for the response.
    fn send_recv(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[cfg(feature = "async")]
mod async_support {
    use core::future::Future;
    use core::pin::Pin;

    use super::{HttpRequest, HttpResponse};
    use crate::error::Result;

    /// An asynchronous transport for exchanging XML-RPC documents.
    pub trait AsyncTransport: Send + Sync {
        /// POST a request and wait for the response.
        fn send_recv<'a>(
            &'a self,
            request: &'a HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;
    }
}

#[cfg(feature = "async")]
pub use async_support::AsyncTransport;

#[cfg(feature = "blocking")]
pub(crate) mod blocking;

#[cfg(feature = "async")]
pub(crate) mod tokio;

const USER_AGENT: &str = concat!("xenapi-rs/", env!("CARGO_PKG_VERSION"));
const CONTENT_TYPE: &str = "text/xml";

/// Certificate options shared by both reqwest builders.
enum TlsSetup {
    Default,
    Root(reqwest::Certificate),
    AcceptInvalid,
}

fn tls_setup(config: &ClientConfig) -> Result<TlsSetup> {
    match &config.tls_verification {
        TlsVerification::Verify => Ok(TlsSetup::Default),
        TlsVerification::CustomRoot(pem) => reqwest::Certificate::from_pem(pem)
            .map(TlsSetup::Root)
            .map_err(|e| {
                TransportError::new(TransportErrorKind::Config, "invalid PEM root certificate")
                    .with_source(e)
                    .into()
            }),
        TlsVerification::Insecure => Ok(TlsSetup::AcceptInvalid),
    }
}

fn build_error(err: reqwest::Error) -> Error {
    TransportError::new(TransportErrorKind::Config, "cannot build HTTP client")
        .with_source(err)
        .into()
}

/// Map a reqwest failure onto the crate taxonomy.
fn map_reqwest_error(err: reqwest::Error, method: &str) -> Error {
    if err.is_timeout() {
        return Error::Timeout {
            method: method.to_string(),
        };
    }

    let kind = if err.is_connect() {
        if mentions_tls(&err) {
            TransportErrorKind::Tls
        } else {
            TransportErrorKind::Connect
        }
    } else if err.is_builder() {
        TransportErrorKind::Config
    } else {
        TransportErrorKind::Io
    };
    TransportError::new(kind, err.to_string())
        .with_method(method)
        .with_source(err)
        .into()
}

fn mentions_tls(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        source = cause.source();
    }
    false
}

fn location_of(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
