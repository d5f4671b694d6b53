//! Server fault mapping.
//!
//! Every XenAPI result is wrapped in a `{Status, Value, ErrorDescription}`
//! struct. A `Failure` carries the symbolic code first and string parameters
//! after it; both that and a bare XML-RPC `<fault>` become an [`ApiError`].

use thiserror::Error;

use crate::error::{Error, TransportError};
use crate::value::WireValue;

/// Known server error codes.
pub mod codes {
    /// A reference does not name a live object. Params: class, reference.
    pub const HANDLE_INVALID: &str = "HANDLE_INVALID";
    /// A UUID does not name a live object. Params: class, uuid.
    pub const UUID_INVALID: &str = "UUID_INVALID";
    /// The session reference is unknown or expired.
    pub const SESSION_INVALID: &str = "SESSION_INVALID";
    /// The credentials were rejected.
    pub const SESSION_AUTHENTICATION_FAILED: &str = "SESSION_AUTHENTICATION_FAILED";
    /// The subject is not authorized to log in.
    pub const SESSION_AUTHORIZATION_FAILED: &str = "SESSION_AUTHORIZATION_FAILED";
    /// The session is not registered for events.
    pub const SESSION_NOT_REGISTERED: &str = "SESSION_NOT_REGISTERED";
    /// The method is deprecated on this server.
    pub const MESSAGE_DEPRECATED: &str = "MESSAGE_DEPRECATED";
    /// The method was removed from this server.
    pub const MESSAGE_REMOVED: &str = "MESSAGE_REMOVED";
    /// The server does not know the method.
    pub const MESSAGE_METHOD_UNKNOWN: &str = "MESSAGE_METHOD_UNKNOWN";
    /// The argument count does not match the server's signature.
    pub const MESSAGE_PARAMETER_COUNT_MISMATCH: &str = "MESSAGE_PARAMETER_COUNT_MISMATCH";
    /// The object is in a state that forbids the operation.
    pub const OPERATION_NOT_ALLOWED: &str = "OPERATION_NOT_ALLOWED";
    /// The caller lacks the permission.
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    /// The caller's role lacks the permission.
    pub const RBAC_PERMISSION_DENIED: &str = "RBAC_PERMISSION_DENIED";
    /// The contacted host is a pool member. Params: coordinator address.
    pub const HOST_IS_SLAVE: &str = "HOST_IS_SLAVE";
    /// An argument has an invalid value.
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    /// A map key is already present.
    pub const MAP_DUPLICATE_KEY: &str = "MAP_DUPLICATE_KEY";
    /// A task was cancelled.
    pub const TASK_CANCELLED: &str = "TASK_CANCELLED";
    /// Unexpected server-side failure.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    /// An XML-RPC level `<fault>`. Params: faultCode, faultString.
    pub const XMLRPC_FAULT: &str = "XMLRPC_FAULT";
}

/// Pattern-matchable view of [`ApiError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FaultKind {
    /// `HANDLE_INVALID`
    HandleInvalid,
    /// `UUID_INVALID`
    UuidInvalid,
    /// `SESSION_INVALID`
    SessionInvalid,
    /// `SESSION_AUTHENTICATION_FAILED`
    SessionAuthenticationFailed,
    /// `SESSION_AUTHORIZATION_FAILED`
    SessionAuthorizationFailed,
    /// `SESSION_NOT_REGISTERED`
    SessionNotRegistered,
    /// `MESSAGE_DEPRECATED`
    MessageDeprecated,
    /// `MESSAGE_REMOVED`
    MessageRemoved,
    /// `MESSAGE_METHOD_UNKNOWN`
    MessageMethodUnknown,
    /// `MESSAGE_PARAMETER_COUNT_MISMATCH`
    MessageParameterCountMismatch,
    /// `OPERATION_NOT_ALLOWED`
    OperationNotAllowed,
    /// `PERMISSION_DENIED`
    PermissionDenied,
    /// `RBAC_PERMISSION_DENIED`
    RbacPermissionDenied,
    /// `HOST_IS_SLAVE`
    HostIsSlave,
    /// `INVALID_VALUE`
    InvalidValue,
    /// `MAP_DUPLICATE_KEY`
    MapDuplicateKey,
    /// `TASK_CANCELLED`
    TaskCancelled,
    /// `INTERNAL_ERROR`
    InternalError,
    /// `XMLRPC_FAULT`
    XmlRpcFault,
    /// Any other code; see [`ApiError::code`].
    Other,
}

impl FaultKind {
    /// Classify a raw error code.
    pub fn from_code(code: &str) -> Self {
        match code {
            codes::HANDLE_INVALID => Self::HandleInvalid,
            codes::UUID_INVALID => Self::UuidInvalid,
            codes::SESSION_INVALID => Self::SessionInvalid,
            codes::SESSION_AUTHENTICATION_FAILED => Self::SessionAuthenticationFailed,
            codes::SESSION_AUTHORIZATION_FAILED => Self::SessionAuthorizationFailed,
            codes::SESSION_NOT_REGISTERED => Self::SessionNotRegistered,
            codes::MESSAGE_DEPRECATED => Self::MessageDeprecated,
            codes::MESSAGE_REMOVED => Self::MessageRemoved,
            codes::MESSAGE_METHOD_UNKNOWN => Self::MessageMethodUnknown,
            codes::MESSAGE_PARAMETER_COUNT_MISMATCH => Self::MessageParameterCountMismatch,
            codes::OPERATION_NOT_ALLOWED => Self::OperationNotAllowed,
            codes::PERMISSION_DENIED => Self::PermissionDenied,
            codes::RBAC_PERMISSION_DENIED => Self::RbacPermissionDenied,
            codes::HOST_IS_SLAVE => Self::HostIsSlave,
            codes::INVALID_VALUE => Self::InvalidValue,
            codes::MAP_DUPLICATE_KEY => Self::MapDuplicateKey,
            codes::TASK_CANCELLED => Self::TaskCancelled,
            codes::INTERNAL_ERROR => Self::InternalError,
            codes::XMLRPC_FAULT => Self::XmlRpcFault,
            _ => Self::Other,
        }
    }
}

/// A call the server received and declined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", call_suffix(.call))]
pub struct ApiError {
    /// Symbolic error code, never empty.
    pub code: String,
    /// Trailing string parameters.
    pub params: Vec<String>,
    /// `CODE: param, param` rendering.
    pub message: String,
    /// The stub and argument label the fault was traced to, e.g.
    /// `message.get_record(self)`.
    pub call: Option<String>,
}

fn call_suffix(call: &Option<String>) -> String {
    call.as_ref()
        .map(|call| format!(" (in {call})"))
        .unwrap_or_default()
}

impl ApiError {
    /// Build an error from a code and its parameters.
    pub fn new(code: impl Into<String>, params: Vec<String>) -> Self {
        let mut code = code.into();
        if code.is_empty() {
            code = codes::INTERNAL_ERROR.to_string();
        }
        let message = if params.is_empty() {
            code.clone()
        } else {
            format!("{code}: {}", params.join(", "))
        };
        Self {
            code,
            params,
            message,
            call: None,
        }
    }

    /// Map an `ErrorDescription` array: code first, parameters after.
    pub fn from_description(mut description: Vec<String>) -> Self {
        if description.is_empty() {
            return Self::new(
                codes::INTERNAL_ERROR,
                vec!["failure response with an empty ErrorDescription".to_string()],
            );
        }
        let code = description.remove(0);
        Self::new(code, description)
    }

    /// Map an XML-RPC `<fault>`.
    pub fn from_xmlrpc_fault(code: i64, message: &str) -> Self {
        Self::new(codes::XMLRPC_FAULT, vec![code.to_string(), message.to_string()])
    }

    /// The `TASK_CANCELLED` error for a task reference.
    pub fn task_cancelled(task: &str) -> Self {
        Self::new(codes::TASK_CANCELLED, vec![task.to_string()])
    }

    /// Pattern-matchable code.
    pub fn kind(&self) -> FaultKind {
        FaultKind::from_code(&self.code)
    }

    /// Whether this fault forces the session to be re-established.
    pub fn is_auth(&self) -> bool {
        self.code.starts_with("SESSION_")
    }

    /// For `HOST_IS_SLAVE`, the pool coordinator's address to log in to.
    pub fn master_address(&self) -> Option<&str> {
        if self.code == codes::HOST_IS_SLAVE {
            self.params.first().map(String::as_str)
        } else {
            None
        }
    }

    /// Encode as a `Status: Failure` envelope, for test doubles.
    pub fn to_envelope(&self) -> WireValue {
        let description = core::iter::once(&self.code)
            .chain(&self.params)
            .map(|s| WireValue::String(s.clone()))
            .collect();
        WireValue::Struct(vec![
            ("Status".to_string(), WireValue::from("Failure")),
            ("ErrorDescription".to_string(), WireValue::Array(description)),
        ])
    }

    pub(crate) fn with_call(mut self, call: String) -> Self {
        if self.call.is_none() {
            self.call = Some(call);
        }
        self
    }
}

/// Wrap a value in a `Status: Success` envelope, for test doubles.
pub fn success_envelope(value: WireValue) -> WireValue {
    WireValue::Struct(vec![
        ("Status".to_string(), WireValue::from("Success")),
        ("Value".to_string(), value),
    ])
}

/// Unwrap the `{Status, Value, ErrorDescription}` envelope.
pub(crate) fn open_envelope(envelope: WireValue) -> Result<WireValue, Error> {
    let WireValue::Struct(mut members) = envelope else {
        return Err(TransportError::protocol(format!(
            "expected a result struct, found {}",
            envelope.shape()
        ))
        .into());
    };

    let mut take = |key: &str| {
        members
            .iter()
            .rposition(|(name, _)| name == key)
            .map(|i| members.swap_remove(i).1)
    };

    let status = take("Status");
    match status.as_ref().and_then(WireValue::as_str) {
        Some("Success") => Ok(take("Value").unwrap_or_else(WireValue::void)),
        Some("Failure") => {
            let description = match take("ErrorDescription") {
                Some(WireValue::Array(items)) => items.iter().map(describe).collect(),
                _ => vec![
                    codes::INTERNAL_ERROR.to_string(),
                    "failure response without an ErrorDescription".to_string(),
                ],
            };
            Err(ApiError::from_description(description).into())
        }
        Some(other) => Err(TransportError::protocol(format!("unknown Status {other:?}")).into()),
        None => Err(TransportError::protocol("result struct has no Status").into()),
    }
}

fn describe(item: &WireValue) -> String {
    match item {
        WireValue::String(s) | WireValue::DateTime(s) => s.clone(),
        WireValue::Int(v) => v.to_string(),
        WireValue::Bool(v) => v.to_string(),
        WireValue::Double(v) => v.to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(items: &[&str]) -> WireValue {
        WireValue::Struct(vec![
            ("Status".into(), WireValue::from("Failure")),
            (
                "ErrorDescription".into(),
                WireValue::Array(items.iter().map(|s| WireValue::from(*s)).collect()),
            ),
        ])
    }

    #[test]
    fn success_yields_the_value() {
        let value = open_envelope(success_envelope(WireValue::from("OpaqueRef:u"))).expect("ok");
        assert_eq!(value, WireValue::from("OpaqueRef:u"));

        let bare = WireValue::Struct(vec![("Status".into(), WireValue::from("Success"))]);
        assert_eq!(open_envelope(bare).expect("ok"), WireValue::void());
    }

    #[test]
    fn failure_splits_code_and_params() {
        let err = open_envelope(failure(&["HANDLE_INVALID", "message", "OpaqueRef:x"]))
            .expect_err("failure");
        let api = err.api_error().expect("api error");
        assert_eq!(api.code, "HANDLE_INVALID");
        assert_eq!(api.params, vec!["message", "OpaqueRef:x"]);
        assert_eq!(api.kind(), FaultKind::HandleInvalid);
        assert_eq!(api.message, "HANDLE_INVALID: message, OpaqueRef:x");
    }

    #[test]
    fn failure_is_never_swallowed() {
        for envelope in [
            failure(&[]),
            WireValue::Struct(vec![("Status".into(), WireValue::from("Failure"))]),
        ] {
            let err = open_envelope(envelope).expect_err("failure");
            assert_eq!(err.code(), Some("INTERNAL_ERROR"));
        }
    }

    #[test]
    fn malformed_envelopes_are_protocol_errors() {
        for envelope in [
            WireValue::from("Success"),
            WireValue::Struct(vec![("Value".into(), WireValue::Int(1))]),
            WireValue::Struct(vec![("Status".into(), WireValue::from("Maybe"))]),
        ] {
            assert!(matches!(open_envelope(envelope), Err(Error::Transport(_))));
        }
    }

    #[test]
    fn coordinator_address_is_exposed() {
        let err = ApiError::new(codes::HOST_IS_SLAVE, vec!["10.0.0.2".into()]);
        assert_eq!(err.master_address(), Some("10.0.0.2"));
        assert_eq!(ApiError::new("OTHER", Vec::new()).master_address(), None);
        assert_eq!(ApiError::new("OTHER", Vec::new()).kind(), FaultKind::Other);
    }

    #[test]
    fn envelope_round_trips_through_the_mapper() {
        let original = ApiError::new(codes::OPERATION_NOT_ALLOWED, vec!["busy".into()]);
        let err = open_envelope(original.to_envelope()).expect_err("failure");
        assert_eq!(err.api_error(), Some(&original));
    }

    #[test]
    fn xmlrpc_faults_keep_code_and_string() {
        let err = ApiError::from_xmlrpc_fault(-32601, "method not found");
        assert_eq!(err.code, codes::XMLRPC_FAULT);
        assert_eq!(err.params, vec!["-32601", "method not found"]);
    }
}
