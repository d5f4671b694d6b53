use core::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::fault::ApiError;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The call did not complete at the HTTP or XML level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server declined the call.
    #[error("api error: {0}")]
    Api(ApiError),

    /// The server rejected the session or the credentials.
    ///
    /// The session must be re-established before further calls.
    #[error("authentication error: {0}")]
    Auth(ApiError),

    /// The client-side deadline elapsed.
    #[error("timeout waiting for {method}")]
    Timeout {
        /// Wire method that was in flight.
        method: String,
    },

    /// A local waiter was cancelled by the caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The session was logged out or invalidated.
    #[error("session is closed")]
    SessionClosed,

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        if err.is_auth() {
            Self::Auth(err)
        } else {
            Self::Api(err)
        }
    }
}

impl Error {
    /// The server fault behind this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) | Self::Auth(err) => Some(err),
            _ => None,
        }
    }

    /// The symbolic server error code, if any.
    pub fn code(&self) -> Option<&str> {
        self.api_error().map(|err| err.code.as_str())
    }

    /// Short machine-readable kind, used for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Codec(_) => "codec",
            Self::Transport(_) => "transport",
            Self::Api(_) => "api",
            Self::Auth(_) => "auth",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::SessionClosed => "session_closed",
            Self::InvalidArgument(_) => "invalid_argument",
        }
    }

    /// Record the wire method on a transport failure that does not name one.
    pub(crate) fn in_method(self, method: &str) -> Self {
        match self {
            Self::Transport(err) if err.method.is_none() => Self::Transport(err.with_method(method)),
            other => other,
        }
    }

    /// Attach the calling stub (`message.get_record(self)`) to a server fault.
    pub(crate) fn annotate(self, call: impl FnOnce() -> String) -> Self {
        match self {
            Self::Api(err) => Self::Api(err.with_call(call())),
            Self::Auth(err) => Self::Auth(err.with_call(call())),
            other => other,
        }
    }
}

/// Category of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// DNS or TCP connection failure.
    Connect,
    /// TLS handshake or certificate failure.
    Tls,
    /// Read or write failure on an established connection.
    Io,
    /// The server answered with a non-2xx, non-redirect status.
    HttpStatus,
    /// The redirect hop limit was exceeded or a redirect had no usable `Location`.
    Redirect,
    /// The response was not a well-formed XML-RPC document or envelope.
    Protocol,
    /// The HTTP client could not be configured.
    Config,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Io => "io",
            Self::HttpStatus => "http status",
            Self::Redirect => "redirect",
            Self::Protocol => "protocol",
            Self::Config => "config",
        })
    }
}

/// An I/O, TLS, HTTP-status or framing failure.
#[derive(Debug, Error)]
#[error("{kind}{}{}: {message}", status_suffix(.status), method_suffix(.method))]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// HTTP status code, for [`TransportErrorKind::HttpStatus`].
    pub status: Option<u16>,
    /// Wire method of the failed call, once known.
    pub method: Option<String>,
    /// Human-readable detail.
    pub message: String,
    /// Underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" {code}")).unwrap_or_default()
}

fn method_suffix(method: &Option<String>) -> String {
    method
        .as_deref()
        .map(|method| format!(" in {method}"))
        .unwrap_or_default()
}

impl TransportError {
    /// A transport error without an underlying cause.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            method: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    pub(crate) fn http_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(TransportErrorKind::HttpStatus, "unexpected HTTP status")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_faults_are_auth_errors() {
        let err = Error::from(ApiError::new("SESSION_INVALID", vec!["OpaqueRef:s".into()]));
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(err.code(), Some("SESSION_INVALID"));
        assert_eq!(err.kind(), "auth");

        let err = Error::from(ApiError::new("HANDLE_INVALID", vec!["user".into()]));
        assert!(matches!(err, Error::Api(_)));
    }

    #[test]
    fn annotation_only_touches_server_faults() {
        let err = Error::from(ApiError::new("HANDLE_INVALID", Vec::new()))
            .annotate(|| "user.get_record(self)".to_string());
        assert_eq!(
            err.api_error().and_then(|e| e.call.as_deref()),
            Some("user.get_record(self)")
        );

        let err = Error::SessionClosed.annotate(|| unreachable!("not a fault"));
        assert!(matches!(err, Error::SessionClosed));
    }

    #[test]
    fn http_status_is_rendered() {
        let err = TransportError::http_status(503);
        assert_eq!(err.kind, TransportErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "http status 503: unexpected HTTP status");
    }

    #[test]
    fn method_is_recorded_once() {
        let err = Error::from(TransportError::protocol("truncated body"))
            .in_method("message.get_all")
            .in_method("task.get_status");
        match err {
            Error::Transport(err) => {
                assert_eq!(err.method.as_deref(), Some("message.get_all"));
                assert_eq!(err.to_string(), "protocol in message.get_all: truncated body");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
