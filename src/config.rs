use core::fmt;
use std::time::Duration;

use reqwest::Url;
use zeroize::Zeroize;

use crate::error::{Error, Result};

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_MAX_REDIRECTS: u32 = 5;
pub(crate) const DEFAULT_POOL_SIZE: usize = 4;
pub(crate) const DEFAULT_LOGIN_VERSION: &str = "1.0";
pub(crate) const DEFAULT_ORIGINATOR: &str = "xenapi-rs";

/// Longest deadline honored; anything beyond it waits this long.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Clamp a caller-supplied timeout so deadline arithmetic cannot overflow.
pub(crate) fn bounded(timeout: Duration) -> Duration {
    timeout.min(MAX_TIMEOUT)
}

/// How the server certificate is checked on `https` endpoints.
#[derive(Clone, Default)]
pub enum TlsVerification {
    /// Verify against the platform and bundled web roots.
    #[default]
    Verify,
    /// Verify against an additional PEM-encoded root, e.g. a pool's self-signed
    /// certificate.
    CustomRoot(Vec<u8>),
    /// Accept any certificate. Only for lab hosts.
    Insecure,
}

impl fmt::Debug for TlsVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => f.write_str("Verify"),
            Self::CustomRoot(pem) => write!(f, "CustomRoot({} bytes)", pem.len()),
            Self::Insecure => f.write_str("Insecure"),
        }
    }
}

/// A password, wiped from memory on drop.
#[derive(Clone)]
pub(crate) struct SecretString(String);

impl SecretString {
    pub(crate) fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Login credentials for `session.login_with_password`.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) username: String,
    pub(crate) password: SecretString,
}

impl Credentials {
    /// Username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password),
        }
    }

    /// The login name.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password)
            .finish()
    }
}

/// Connection settings shared by the blocking and async clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server endpoint, `https://host/` or `http://host/`.
    pub endpoint: Url,
    /// Certificate checking on `https`.
    pub tls_verification: TlsVerification,
    /// TCP + TLS connect deadline.
    pub connect_timeout: Duration,
    /// Default per-call deadline; a call may carry its own. Values above
    /// [`MAX_TIMEOUT`] are clamped.
    pub request_timeout: Duration,
    /// Pool redirects followed per call before giving up.
    pub max_redirects: u32,
    /// Idle keep-alive connections kept per host.
    pub connection_pool_size: usize,
}

impl ClientConfig {
    /// Defaults for an endpoint URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            tls_verification: TlsVerification::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connection_pool_size: DEFAULT_POOL_SIZE,
        })
    }
}

/// Parse an endpoint, accepting a bare `host[:port]` as `https://host[:port]/`.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(Error::InvalidArgument("endpoint is empty"));
    }
    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}/")
    };
    let url =
        Url::parse(&candidate).map_err(|_| Error::InvalidArgument("endpoint is not a valid URL"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(Error::InvalidArgument(
            "endpoint must be an http or https URL with a host",
        )),
    }
}

/// Login parameters carried by the session builders.
#[derive(Debug, Clone)]
pub(crate) struct LoginOptions {
    pub(crate) credentials: Option<Credentials>,
    pub(crate) version: String,
    pub(crate) originator: String,
    /// Log in to this host only, bypassing the pool coordinator.
    pub(crate) slave_local: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            version: DEFAULT_LOGIN_VERSION.to_string(),
            originator: DEFAULT_ORIGINATOR.to_string(),
            slave_local: false,
        }
    }
}

impl LoginOptions {
    pub(crate) fn set_username(&mut self, username: String) {
        match &mut self.credentials {
            Some(credentials) => credentials.username = username,
            None => self.credentials = Some(Credentials::new(username, String::new())),
        }
    }

    pub(crate) fn set_password(&mut self, password: String) {
        match &mut self.credentials {
            Some(credentials) => credentials.password = SecretString::new(password),
            None => self.credentials = Some(Credentials::new(String::new(), password)),
        }
    }

    pub(crate) fn require_credentials(&self) -> Result<&Credentials> {
        match &self.credentials {
            Some(credentials) if !credentials.username.is_empty() => Ok(credentials),
            _ => Err(Error::InvalidArgument("username is required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_becomes_https() {
        let url = parse_endpoint("pool.example:8443").expect("endpoint");
        assert_eq!(url.as_str(), "https://pool.example:8443/");

        let url = parse_endpoint("http://10.0.0.1").expect("endpoint");
        assert_eq!(url.as_str(), "http://10.0.0.1/");
    }

    #[test]
    fn unsupported_endpoints_are_rejected() {
        for bad in ["", "ftp://host/", "https://", "http://[::1"] {
            assert!(parse_endpoint(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn password_never_shows_in_debug() {
        let credentials = Credentials::new("root", "hunter2");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::new("https://pool.example/").expect("config");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.connection_pool_size, 4);
        assert!(matches!(config.tls_verification, TlsVerification::Verify));
    }

    #[test]
    fn huge_timeouts_are_clamped() {
        assert_eq!(bounded(Duration::MAX), MAX_TIMEOUT);
        assert_eq!(bounded(Duration::from_secs(3)), Duration::from_secs(3));
    }
}
