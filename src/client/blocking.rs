use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;

use crate::api::session::SessionRef;
use crate::api::task::TaskRef;
use crate::api::{host, pool, task};
use crate::call::{Call, CallRequest, decode_result};
use crate::client::core::{self, SessionState, Settings, Shared, Step};
use crate::codec::WireType;
use crate::config::{Credentials, TlsVerification};
use crate::error::Result;
use crate::fault::ApiError;
use crate::task::{CancelFlag, NextStep, PollPolicy, Poller, decode_task_result, next_step};
use crate::transport::Transport;
use crate::transport::blocking::HttpTransport;
use crate::value::WireValue;
use crate::version::ServerVersion;

/// A blocking XenAPI session.
///
/// Clones share one server session: logging out through any clone closes
/// all of them.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    settings: Settings,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("settings", &self.settings)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl SessionBuilder {
    /// Create a new builder.
    ///
    /// `endpoint` is a URL such as `https://pool.example/`; a bare host is
    /// taken to mean HTTPS on the default port.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            settings: Settings::new(endpoint),
            transport: None,
        }
    }

    /// Set the login user name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.settings.login.set_username(username.into());
        self
    }

    /// Set the login password. It is zeroed when the builder is dropped.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.settings.login.set_password(password.into());
        self
    }

    /// Set both user name and password.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.settings.login.credentials = Some(credentials);
        self
    }

    /// Client identification sent with the login (`originator`).
    pub fn originator(mut self, originator: impl Into<String>) -> Self {
        self.settings.login.originator = originator.into();
        self
    }

    /// Log in with `session.slave_local_login_with_password`.
    ///
    /// For a pool member that cannot reach its coordinator. The session is
    /// only valid on the host at the endpoint and is ended with
    /// `session.local_logout`.
    pub fn slave_local(mut self, enabled: bool) -> Self {
        self.settings.login.slave_local = enabled;
        self
    }

    /// Protocol version string sent with the login. Defaults to `1.0`.
    pub fn api_version_string(mut self, version: impl Into<String>) -> Self {
        self.settings.login.version = version.into();
        self
    }

    /// Set how the server certificate is checked.
    pub fn tls_verification(mut self, verification: TlsVerification) -> Self {
        self.settings.tls_verification = verification;
        self
    }

    /// Set the TCP/TLS connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.settings.connect_timeout = timeout;
        self
    }

    /// Set the default per-call deadline. [`Call::with_timeout`] overrides it.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout = timeout;
        self
    }

    /// Set how many pool redirects one call may follow.
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.settings.max_redirects = max;
        self
    }

    /// Set the number of idle connections kept per host.
    pub fn connection_pool_size(mut self, size: usize) -> Self {
        self.settings.connection_pool_size = size;
        self
    }

    /// Use a custom transport instead of the built-in HTTP client.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Log in and build the [`Session`].
    pub fn login(self) -> Result<Session> {
        let (shared, credentials) = self.settings.into_shared()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&shared.config)?),
        };

        let session = Session {
            shared: Arc::new(shared),
            transport,
        };
        session.authenticate(&credentials)?;
        Ok(session)
    }
}

impl Session {
    /// Create a [`SessionBuilder`].
    pub fn builder(endpoint: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(endpoint)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let token = self.execute(core::login_call(&self.shared.login, credentials))?;
        self.shared.authenticate(token)
    }

    /// Run a typed call and decode its result.
    pub fn execute<T: WireType>(&self, call: Call<T>) -> Result<T> {
        let request = call.into_request()?;
        let method = request.method.clone();
        let value = self.send(request)?;
        Ok(decode_result(&method, &value)?)
    }

    /// Run an untyped call. The session token is prepended to `args`.
    pub fn dispatch(&self, method: &str, args: Vec<WireValue>) -> Result<WireValue> {
        self.send(core::raw_request(method, args))
    }

    fn send(&self, request: CallRequest) -> Result<WireValue> {
        let prepared = self.shared.prepare(request)?;
        let start = Instant::now();
        let result = self.exchange(&prepared);
        self.shared
            .finish("blocking", &prepared, start.elapsed(), result)
    }

    fn exchange(&self, prepared: &core::Prepared) -> Result<WireValue> {
        let mut url = prepared.url.clone();
        let mut hops = 0;
        loop {
            let response = self.transport.send_recv(&prepared.http_request(&url)?)?;
            match self.shared.step(prepared, &url, response, hops)? {
                Step::Done(value) => {
                    if hops > 0 {
                        self.shared.follow_endpoint(url);
                    }
                    return Ok(value);
                }
                Step::Redirect(next) => {
                    hops += 1;
                    url = next;
                }
            }
        }
    }

    /// Log out. Safe to call more than once.
    ///
    /// The session is closed locally whatever the server answers; a timeout
    /// or an already invalid session is not an error.
    pub fn logout(&self) -> Result<()> {
        if self.shared.state() != SessionState::Authenticated {
            self.shared.close();
            return Ok(());
        }
        let result = self.execute(core::logout_call(&self.shared.login));
        self.shared.close();
        core::logout_outcome(result)
    }

    /// Wait for a server task and decode its result as `T`.
    pub fn await_task<T: WireType>(&self, task: &TaskRef, policy: PollPolicy) -> Result<T> {
        self.await_task_with_cancel(task, policy, &CancelFlag::new())
    }

    /// Like [`Self::await_task`], stopping early once `cancel` is raised.
    ///
    /// Raising the flag does not cancel the server task.
    pub fn await_task_with_cancel<T: WireType>(
        &self,
        task: &TaskRef,
        policy: PollPolicy,
        cancel: &CancelFlag,
    ) -> Result<T> {
        let mut poller = Poller::new(policy);
        loop {
            if cancel.is_cancelled() {
                return Err(core::wait_cancelled(task));
            }
            let status = self.execute(task::get_status(task))?;
            match next_step(status) {
                NextStep::Wait => {
                    let delay = poller
                        .next_delay()
                        .ok_or_else(|| core::deadline_exceeded(task))?;
                    std::thread::sleep(delay);
                }
                NextStep::FetchResult => return self.task_result(task),
                NextStep::FetchErrorInfo => {
                    let info = self.execute(task::get_error_info(task))?;
                    return Err(ApiError::from_description(info).into());
                }
                NextStep::Cancelled => {
                    return Err(ApiError::task_cancelled(task.as_str()).into());
                }
            }
        }
    }

    fn task_result<T: WireType>(&self, task: &TaskRef) -> Result<T> {
        let result_type = match T::reference_class() {
            Some(_) => Some(self.execute(task::get_type(task))?),
            None => None,
        };
        let raw = self.execute(task::get_result(task))?;
        Ok(decode_task_result::<T>(task, result_type.as_deref(), &raw)?)
    }

    /// Read the coordinator's API version and xapi build, and remember them.
    pub fn detect_versions(&self) -> Result<ServerVersion> {
        let pool = core::first_pool(self.execute(pool::get_all())?)?;
        let master = self.execute(pool::get_master(&pool))?;
        let major = self.execute(host::get_api_version_major(&master))?;
        let minor = self.execute(host::get_api_version_minor(&master))?;
        let software = self.execute(host::get_software_version(&master))?;

        let version = core::server_version(major, minor, &software);
        self.shared.set_version(version.clone());
        Ok(version)
    }

    /// Versions found by the last [`Self::detect_versions`].
    pub fn server_version(&self) -> Option<ServerVersion> {
        self.shared.version()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// The server's reference for this session, while logged in.
    pub fn session_ref(&self) -> Option<SessionRef> {
        self.shared.token()
    }

    /// Endpoint calls go to; follows pool redirects.
    pub fn endpoint(&self) -> Url {
        self.shared.endpoint()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.shared.endpoint().as_str())
            .field("state", &self.shared.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{ClientConfig, LoginOptions};
    use crate::error::Error;
    use crate::fault::success_envelope;
    use crate::transport::{HttpRequest, HttpResponse};
    use crate::xmlrpc;

    #[derive(Debug, Clone, Copy)]
    struct TimeoutTransport;

    impl Transport for TimeoutTransport {
        fn send_recv(&self, request: &HttpRequest) -> Result<HttpResponse> {
            Err(Error::Timeout {
                method: request.method.clone(),
            })
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct EchoTransport;

    impl Transport for EchoTransport {
        fn send_recv(&self, request: &HttpRequest) -> Result<HttpResponse> {
            let call = xmlrpc::parse_method_call(&request.body)?;
            Ok(HttpResponse {
                status: 200,
                location: None,
                body: xmlrpc::write_method_response(&success_envelope(WireValue::Array(
                    call.params,
                ))),
            })
        }
    }

    fn logged_in(transport: impl Transport + 'static) -> Session {
        let config = ClientConfig::new("https://pool.example/").expect("config");
        let shared = Shared::new(config, LoginOptions::default());
        shared
            .authenticate(SessionRef::new("OpaqueRef:session"))
            .expect("authenticate");
        Session {
            shared: Arc::new(shared),
            transport: Arc::new(transport),
        }
    }

    #[test]
    fn logout_timeout_marks_session_closed() {
        let session = logged_in(TimeoutTransport);

        session.logout().expect("logout");
        assert_eq!(session.state(), SessionState::Closed);
        session.logout().expect("second logout");

        let err = session
            .execute(pool::get_all())
            .expect_err("expected session-closed error");
        assert!(matches!(err, Error::SessionClosed));
    }

    #[test]
    fn dispatch_prepends_the_session_token() {
        let session = logged_in(EchoTransport);
        let echoed = session
            .dispatch("user.get_fullname", vec![WireValue::from("OpaqueRef:u")])
            .expect("dispatch");
        assert_eq!(
            echoed,
            WireValue::Array(vec![
                WireValue::from("OpaqueRef:session"),
                WireValue::from("OpaqueRef:u"),
            ])
        );
    }

    #[test]
    fn builder_requires_a_username() {
        let err = Session::builder("https://pool.example/")
            .password("secret")
            .transport(EchoTransport)
            .login()
            .expect_err("no username");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
