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
use crate::transport::AsyncTransport;
use crate::transport::tokio::HttpTransport;
use crate::value::WireValue;
use crate::version::ServerVersion;

/// An async XenAPI session for the Tokio runtime.
///
/// Clones share one server session: logging out through any clone closes
/// all of them.
#[derive(Clone)]
pub struct AsyncSession {
    shared: Arc<Shared>,
    transport: Arc<dyn AsyncTransport>,
}

/// Builder for [`AsyncSession`].
pub struct AsyncSessionBuilder {
    settings: Settings,
    transport: Option<Arc<dyn AsyncTransport>>,
}

impl fmt::Debug for AsyncSessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSessionBuilder")
            .field("settings", &self.settings)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl AsyncSessionBuilder {
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
    pub fn transport(mut self, transport: impl AsyncTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Log in and build the [`AsyncSession`].
    pub async fn login(self) -> Result<AsyncSession> {
        let (shared, credentials) = self.settings.into_shared()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&shared.config)?),
        };

        let session = AsyncSession {
            shared: Arc::new(shared),
            transport,
        };
        session.authenticate(&credentials).await?;
        Ok(session)
    }
}

impl AsyncSession {
    /// Create an [`AsyncSessionBuilder`].
    pub fn builder(endpoint: impl Into<String>) -> AsyncSessionBuilder {
        AsyncSessionBuilder::new(endpoint)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let token = self
            .execute(core::login_call(&self.shared.login, credentials))
            .await?;
        self.shared.authenticate(token)
    }

    /// Run a typed call and decode its result.
    pub async fn execute<T: WireType>(&self, call: Call<T>) -> Result<T> {
        let request = call.into_request()?;
        let method = request.method.clone();
        let value = self.send(request).await?;
        Ok(decode_result(&method, &value)?)
    }

    /// Run an untyped call. The session token is prepended to `args`.
    pub async fn dispatch(&self, method: &str, args: Vec<WireValue>) -> Result<WireValue> {
        self.send(core::raw_request(method, args)).await
    }

    async fn send(&self, request: CallRequest) -> Result<WireValue> {
        let prepared = self.shared.prepare(request)?;
        let start = Instant::now();
        let result = self.exchange(&prepared).await;
        self.shared
            .finish("async", &prepared, start.elapsed(), result)
    }

    async fn exchange(&self, prepared: &core::Prepared) -> Result<WireValue> {
        let mut url = prepared.url.clone();
        let mut hops = 0;
        loop {
            let request = prepared.http_request(&url)?;
            let response = self.transport.send_recv(&request).await?;
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
    pub async fn logout(&self) -> Result<()> {
        if self.shared.state() != SessionState::Authenticated {
            self.shared.close();
            return Ok(());
        }
        let result = self.execute(core::logout_call(&self.shared.login)).await;
        self.shared.close();
        core::logout_outcome(result)
    }

    /// Wait for a server task and decode its result as `T`.
    pub async fn await_task<T: WireType>(&self, task: &TaskRef, policy: PollPolicy) -> Result<T> {
        self.await_task_with_cancel(task, policy, &CancelFlag::new())
            .await
    }

    /// Like [`Self::await_task`], stopping early once `cancel` is raised.
    ///
    /// Raising the flag does not cancel the server task.
    pub async fn await_task_with_cancel<T: WireType>(
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
            let status = self.execute(task::get_status(task)).await?;
            match next_step(status) {
                NextStep::Wait => {
                    let delay = poller
                        .next_delay()
                        .ok_or_else(|| core::deadline_exceeded(task))?;
                    tokio::time::sleep(delay).await;
                }
                NextStep::FetchResult => return self.task_result(task).await,
                NextStep::FetchErrorInfo => {
                    let info = self.execute(task::get_error_info(task)).await?;
                    return Err(ApiError::from_description(info).into());
                }
                NextStep::Cancelled => {
                    return Err(ApiError::task_cancelled(task.as_str()).into());
                }
            }
        }
    }

    async fn task_result<T: WireType>(&self, task: &TaskRef) -> Result<T> {
        let result_type = match T::reference_class() {
            Some(_) => Some(self.execute(task::get_type(task)).await?),
            None => None,
        };
        let raw = self.execute(task::get_result(task)).await?;
        Ok(decode_task_result::<T>(task, result_type.as_deref(), &raw)?)
    }

    /// Read the coordinator's API version and xapi build, and remember them.
    pub async fn detect_versions(&self) -> Result<ServerVersion> {
        let pool = core::first_pool(self.execute(pool::get_all()).await?)?;
        let master = self.execute(pool::get_master(&pool)).await?;
        let major = self.execute(host::get_api_version_major(&master)).await?;
        let minor = self.execute(host::get_api_version_minor(&master)).await?;
        let software = self.execute(host::get_software_version(&master)).await?;

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

impl fmt::Debug for AsyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSession")
            .field("endpoint", &self.shared.endpoint().as_str())
            .field("state", &self.shared.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future::Future;
    use std::pin::Pin;

    use crate::config::{ClientConfig, LoginOptions};
    use crate::error::Error;
    use crate::transport::{HttpRequest, HttpResponse};

    #[derive(Debug, Clone, Copy)]
    struct TimeoutTransport;

    impl AsyncTransport for TimeoutTransport {
        fn send_recv<'a>(
            &'a self,
            request: &'a HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>> {
            Box::pin(async move {
                Err(Error::Timeout {
                    method: request.method.clone(),
                })
            })
        }
    }

    #[tokio::test]
    async fn logout_timeout_marks_session_closed() {
        let config = ClientConfig::new("https://pool.example/").expect("config");
        let shared = Shared::new(config, LoginOptions::default());
        shared
            .authenticate(SessionRef::new("OpaqueRef:session"))
            .expect("authenticate");
        let session = AsyncSession {
            shared: Arc::new(shared),
            transport: Arc::new(TimeoutTransport),
        };

        session.logout().await.expect("logout");
        assert_eq!(session.state(), SessionState::Closed);

        let err = session
            .execute(pool::get_all())
            .await
            .expect_err("expected session-closed error");
        assert!(matches!(err, Error::SessionClosed));
    }
}
