use core::marker::PhantomData;
use std::time::Duration;

use crate::codec::{CodecError, CodecPath, WireType};
use crate::value::WireValue;

/// Label of the session argument every authenticated call carries first.
pub const SESSION_ARG: &str = "session_id";

/// A typed remote call, ready to run on a session.
///
/// Stub functions in [`crate::api`] build these; a session executes them and
/// decodes the result as `T`. Arguments are encoded eagerly so an encoding
/// failure surfaces when the call runs, before anything is sent.
#[must_use = "a call does nothing until a session executes it"]
pub struct Call<T> {
    method: String,
    args: Vec<(&'static str, WireValue)>,
    error: Option<CodecError>,
    timeout: Option<Duration>,
    authenticated: bool,
    _result: PhantomData<fn() -> T>,
}

impl<T> core::fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (labels, params): (Vec<_>, Vec<_>) = self.args.iter().cloned().unzip();
        let shown: Vec<_> = labels
            .iter()
            .copied()
            .zip(crate::debug::redact(&labels, &params))
            .collect();
        f.debug_struct("Call")
            .field("method", &self.method)
            .field("args", &shown)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

impl<T: WireType> Call<T> {
    pub(crate) fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Vec::new(),
            error: None,
            timeout: None,
            authenticated: true,
            _result: PhantomData,
        }
    }

    /// The `Async.` twin of a mutating call.
    pub(crate) fn new_async(method: &str) -> Self {
        Self::new(format!("Async.{method}"))
    }

    pub(crate) fn arg<A: WireType>(mut self, label: &'static str, value: &A) -> Self {
        if self.error.is_none() {
            match value.encode(&CodecPath::argument(&self.method, label)) {
                Ok(encoded) => self.args.push((label, encoded)),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub(crate) fn str_arg(mut self, label: &'static str, value: &str) -> Self {
        if self.error.is_none() {
            self.args.push((label, WireValue::String(value.to_string())));
        }
        self
    }

    /// Mark a historical signature that lacks a required argument; the call
    /// fails before dispatch.
    pub(crate) fn missing(mut self, label: &'static str) -> Self {
        if self.error.is_none() {
            self.error = Some(CodecError::new(
                &CodecPath::argument(&self.method, label),
                "argument",
                "missing",
                "this historical signature cannot be dispatched",
            ));
        }
        self
    }

    pub(crate) fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Override the session's request timeout for this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The wire method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Encoded arguments with their labels, excluding the session token.
    pub fn args(&self) -> &[(&'static str, WireValue)] {
        &self.args
    }

    /// Whether the session token is prepended.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Per-call deadline, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_request(self) -> Result<CallRequest, CodecError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let (labels, params) = self.args.into_iter().unzip();
        Ok(CallRequest {
            method: self.method,
            labels,
            params,
            timeout: self.timeout,
            authenticated: self.authenticated,
        })
    }
}

/// Decode a call result at `method -> result`.
pub(crate) fn decode_result<T: WireType>(method: &str, value: &WireValue) -> Result<T, CodecError> {
    T::decode(value, &CodecPath::result(method))
}

/// A call after argument encoding, as the client dispatches it.
#[derive(Clone)]
pub(crate) struct CallRequest {
    pub(crate) method: String,
    pub(crate) labels: Vec<&'static str>,
    pub(crate) params: Vec<WireValue>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) authenticated: bool,
}

impl core::fmt::Debug for CallRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallRequest")
            .field("method", &self.method)
            .field("labels", &self.labels)
            .field("params", &crate::debug::redact(&self.labels, &self.params))
            .field("timeout", &self.timeout)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

impl CallRequest {
    pub(crate) fn with_session(mut self, token: &str) -> Self {
        self.labels.insert(0, SESSION_ARG);
        self.params.insert(0, WireValue::String(token.to_string()));
        self
    }

    /// `method(label)` for the argument a fault names, else `method`.
    pub(crate) fn annotation(&self, fault_params: &[String]) -> String {
        let label = self
            .labels
            .iter()
            .zip(&self.params)
            .find(|(_, value)| {
                value
                    .as_str()
                    .is_some_and(|s| !s.is_empty() && fault_params.iter().any(|p| p == s))
            })
            .map(|(label, _)| *label);
        match label {
            Some(label) => format!("{}({label})", self.method),
            None => self.method.clone(),
        }
    }
}
