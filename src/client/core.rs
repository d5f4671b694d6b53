use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use reqwest::Url;

use crate::api::pool::PoolRef;
use crate::api::session::{self, SessionRef};
use crate::api::task::TaskRef;
use crate::call::{Call, CallRequest};
use crate::codec::{CodecError, CodecPath};
use crate::config::{
    ClientConfig, Credentials, LoginOptions, TlsVerification, bounded, parse_endpoint,
};
use crate::error::{Error, Result, TransportError, TransportErrorKind};
use crate::fault::{ApiError, codes, open_envelope};
use crate::transport::{HttpRequest, HttpResponse};
use crate::value::WireValue;
use crate::version::{ApiVersion, ServerVersion};
use crate::xmlrpc::{self, MethodResponse};

/// Lifecycle of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No token yet; only login calls may run.
    Unauthenticated,
    /// Holding a token; every call carries it.
    Authenticated,
    /// Logged out or invalidated. Terminal.
    Closed,
}

#[derive(Debug)]
pub(crate) struct ClientCore {
    state: SessionState,
    token: Option<SessionRef>,
    endpoint: Url,
    version: Option<ServerVersion>,
}

impl ClientCore {
    fn new(endpoint: Url) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            token: None,
            endpoint,
            version: None,
        }
    }

    fn prepare(&self, request: CallRequest, default_timeout: Duration) -> Result<Prepared> {
        let request = match (self.state, request.authenticated) {
            (SessionState::Closed, _) => return Err(Error::SessionClosed),
            (_, false) => request,
            (SessionState::Authenticated, true) => match &self.token {
                Some(token) => request.with_session(token.as_str()),
                None => return Err(Error::SessionClosed),
            },
            (SessionState::Unauthenticated, true) => {
                return Err(Error::InvalidArgument("session is not logged in"));
            }
        };

        let body = xmlrpc::write_method_call(&request.method, &request.params);
        if crate::debug::enabled() {
            let shown = crate::debug::redact(&request.labels, &request.params);
            crate::debug::dump_xml(
                "xenapi request",
                &request.method,
                &xmlrpc::write_method_call(&request.method, &shown),
            );
        }

        let timeout = bounded(request.timeout.unwrap_or(default_timeout));
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or(Error::InvalidArgument("timeout is too large"))?;
        Ok(Prepared {
            request,
            body,
            url: self.endpoint.clone(),
            deadline,
        })
    }
}

/// An encoded call bound to an endpoint and a deadline.
pub(crate) struct Prepared {
    pub(crate) request: CallRequest,
    body: Vec<u8>,
    pub(crate) url: Url,
    deadline: Instant,
}

// The body carries login passwords in clear.
impl std::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepared")
            .field("request", &self.request)
            .field("body_len", &self.body.len())
            .field("url", &self.url.as_str())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Prepared {
    pub(crate) fn method(&self) -> &str {
        &self.request.method
    }

    /// The POST for one hop, or `Timeout` once the deadline has passed.
    pub(crate) fn http_request(&self, url: &Url) -> Result<HttpRequest> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout {
                method: self.request.method.clone(),
            });
        }
        Ok(HttpRequest {
            url: url.clone(),
            method: self.request.method.clone(),
            body: self.body.clone(),
            timeout: remaining,
        })
    }
}

/// Outcome of one HTTP exchange.
#[derive(Debug)]
pub(crate) enum Step {
    Done(WireValue),
    Redirect(Url),
}

/// Builder settings common to both client flavors.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    endpoint: String,
    pub(crate) tls_verification: TlsVerification,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) max_redirects: u32,
    pub(crate) connection_pool_size: usize,
    pub(crate) login: LoginOptions,
}

impl Settings {
    pub(crate) fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tls_verification: TlsVerification::default(),
            connect_timeout: crate::config::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: crate::config::DEFAULT_REQUEST_TIMEOUT,
            max_redirects: crate::config::DEFAULT_MAX_REDIRECTS,
            connection_pool_size: crate::config::DEFAULT_POOL_SIZE,
            login: LoginOptions::default(),
        }
    }

    pub(crate) fn into_shared(self) -> Result<(Shared, Credentials)> {
        let credentials = self.login.require_credentials()?.clone();
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidArgument("request timeout must be non-zero"));
        }
        let config = ClientConfig {
            endpoint: parse_endpoint(&self.endpoint)?,
            tls_verification: self.tls_verification,
            connect_timeout: bounded(self.connect_timeout),
            request_timeout: bounded(self.request_timeout),
            max_redirects: self.max_redirects,
            connection_pool_size: self.connection_pool_size,
        };
        Ok((Shared::new(config, self.login), credentials))
    }
}

/// Session state shared by clones of one client.
///
/// The lock is only held to read or update state, never across I/O.
#[derive(Debug)]
pub(crate) struct Shared {
    core: RwLock<ClientCore>,
    pub(crate) config: ClientConfig,
    pub(crate) login: LoginOptions,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig, login: LoginOptions) -> Self {
        Self {
            core: RwLock::new(ClientCore::new(config.endpoint.clone())),
            config,
            login,
        }
    }

    // The state is plain data with no multi-step invariants, so a poisoned
    // lock still holds a usable value.
    fn read(&self) -> RwLockReadGuard<'_, ClientCore> {
        self.core.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientCore> {
        self.core.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> SessionState {
        self.read().state
    }

    pub(crate) fn token(&self) -> Option<SessionRef> {
        self.read().token.clone()
    }

    pub(crate) fn endpoint(&self) -> Url {
        self.read().endpoint.clone()
    }

    pub(crate) fn version(&self) -> Option<ServerVersion> {
        self.read().version.clone()
    }

    pub(crate) fn set_version(&self, version: ServerVersion) {
        self.write().version = Some(version);
    }

    pub(crate) fn prepare(&self, request: CallRequest) -> Result<Prepared> {
        self.read().prepare(request, self.config.request_timeout)
    }

    /// Install the token returned by a login.
    pub(crate) fn authenticate(&self, token: SessionRef) -> Result<()> {
        let mut core = self.write();
        if core.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        core.token = Some(token);
        core.state = SessionState::Authenticated;
        Ok(())
    }

    pub(crate) fn close(&self) {
        let mut core = self.write();
        core.state = SessionState::Closed;
        core.token = None;
    }

    /// Interpret one HTTP response; `hops` counts redirects already followed.
    pub(crate) fn step(
        &self,
        prepared: &Prepared,
        current: &Url,
        response: HttpResponse,
        hops: u32,
    ) -> Result<Step> {
        match response.status {
            200..=299 => {
                crate::debug::dump_xml("xenapi response", prepared.method(), &response.body);
                decode_response(&response.body).map(Step::Done)
            }
            300..=399 => {
                let location = response.location.ok_or_else(|| {
                    TransportError::new(
                        TransportErrorKind::Redirect,
                        format!("HTTP {} without a Location header", response.status),
                    )
                })?;
                if hops >= self.config.max_redirects {
                    return Err(TransportError::new(
                        TransportErrorKind::Redirect,
                        format!("more than {} redirects", self.config.max_redirects),
                    )
                    .into());
                }
                let next = resolve_redirect(current, &location)?;
                crate::observe::record_redirect(prepared.method(), next.as_str());
                Ok(Step::Redirect(next))
            }
            status => Err(TransportError::http_status(status).into()),
        }
    }

    /// Keep using the pool member a redirect led to.
    pub(crate) fn follow_endpoint(&self, url: Url) {
        self.write().endpoint = url;
    }

    /// Bookkeeping after a call: metrics, session invalidation, annotation.
    pub(crate) fn finish(
        &self,
        mode: &'static str,
        prepared: &Prepared,
        elapsed: Duration,
        result: Result<WireValue>,
    ) -> Result<WireValue> {
        match &result {
            Ok(_) => crate::observe::record_ok(mode, prepared.method(), elapsed),
            Err(err) => crate::observe::record_err(mode, prepared.method(), elapsed, err),
        }

        if result.is_ok() && ends_session(prepared.method()) {
            self.close();
        }

        result.map_err(|err| {
            if prepared.request.authenticated
                && matches!(
                    err.code(),
                    Some(codes::SESSION_INVALID | codes::SESSION_AUTHENTICATION_FAILED)
                )
            {
                self.close();
            }
            let params = err.api_error().map(|e| e.params.clone()).unwrap_or_default();
            err.annotate(|| prepared.request.annotation(&params))
                .in_method(prepared.method())
        })
    }
}

/// Calls after which the server no longer accepts this session's token.
fn ends_session(method: &str) -> bool {
    matches!(method, "session.logout" | "session.local_logout")
}

/// Parse a `methodResponse` and open its result envelope.
pub(crate) fn decode_response(body: &[u8]) -> Result<WireValue> {
    match xmlrpc::parse_method_response(body)? {
        MethodResponse::Success(envelope) => open_envelope(envelope),
        MethodResponse::Fault { code, message } => {
            Err(ApiError::from_xmlrpc_fault(code, &message).into())
        }
    }
}

/// An untyped call; arguments are labelled `arg` in fault annotations.
pub(crate) fn raw_request(method: &str, args: Vec<WireValue>) -> CallRequest {
    CallRequest {
        method: method.to_string(),
        labels: vec!["arg"; args.len()],
        params: args,
        timeout: None,
        authenticated: true,
    }
}

/// The login call the builder settings ask for.
pub(crate) fn login_call(login: &LoginOptions, credentials: &Credentials) -> Call<SessionRef> {
    if login.slave_local {
        session::slave_local_login_with_password(
            credentials.username(),
            credentials.password.expose(),
        )
    } else {
        session::login_with_password(
            credentials.username(),
            credentials.password.expose(),
            &login.version,
            &login.originator,
        )
    }
}

/// A host-local session is ended with `session.local_logout`.
pub(crate) fn logout_call(login: &LoginOptions) -> Call<()> {
    if login.slave_local {
        session::local_logout()
    } else {
        session::logout()
    }
}

/// Logout is best effort: a dead session or a silent server still counts.
pub(crate) fn logout_outcome(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) | Err(Error::Timeout { .. }) | Err(Error::SessionClosed) => Ok(()),
        Err(err) if err.code() == Some(codes::SESSION_INVALID) => Ok(()),
        Err(err) => Err(err),
    }
}

pub(crate) fn first_pool(pools: Vec<PoolRef>) -> Result<PoolRef> {
    pools.into_iter().next().ok_or_else(|| {
        CodecError::new(
            &CodecPath::result("pool.get_all"),
            "array",
            "empty array",
            "server reported no pool",
        )
        .into()
    })
}

pub(crate) fn server_version(
    major: i64,
    minor: i64,
    software: &HashMap<String, String>,
) -> ServerVersion {
    ServerVersion {
        api: ApiVersion::new(major, minor),
        xapi: software.get("xapi").cloned(),
    }
}

pub(crate) fn deadline_exceeded(task: &TaskRef) -> Error {
    Error::Timeout {
        method: format!("task.get_status({task})"),
    }
}

pub(crate) fn wait_cancelled(task: &TaskRef) -> Error {
    Error::Cancelled(format!("stopped waiting for task {task}"))
}

fn resolve_redirect(current: &Url, location: &str) -> Result<Url> {
    let next = current.join(location).map_err(|e| {
        TransportError::new(
            TransportErrorKind::Redirect,
            format!("invalid Location {location:?}"),
        )
        .with_source(e)
    })?;
    match next.scheme() {
        "http" | "https" => Ok(next),
        other => Err(TransportError::new(
            TransportErrorKind::Redirect,
            format!("refusing redirect to {other} URL"),
        )
        .into()),
    }
}
