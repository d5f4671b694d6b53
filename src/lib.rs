#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A typed client for the XenAPI management interface of Xen pools.
//!
//! The crate implements:
//! - XML-RPC request encoding and `Status`/`Value` envelope decoding
//! - session login, logout and pool-member redirects
//! - typed stubs for each API class under [`api`]
//! - waiting on `Async.` server tasks with typed results
//!
//! Calls are built by stub functions and run on a [`Session`] (blocking) or
//! an [`AsyncSession`] (Tokio):
//!
//! ```no_run
//! use xenapi::Session;
//! use xenapi::api::user;
//!
//! # fn main() -> xenapi::Result<()> {
//! let session = Session::builder("https://pool.example/")
//!     .username("root")
//!     .password("secret")
//!     .login()?;
//! let fullname = session.execute(user::get_fullname(&user::UserRef::new("OpaqueRef:1")))?;
//! println!("{fullname}");
//! session.logout()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod call;
mod client;
pub mod codec;
mod config;
mod debug;
mod error;
pub mod fault;
mod observe;
pub mod task;
mod transport;
mod value;
mod version;
pub mod xmlrpc;

pub use crate::call::{Call, SESSION_ARG};
#[cfg(feature = "blocking")]
pub use crate::client::blocking::{Session, SessionBuilder};
pub use crate::client::core::SessionState;
#[cfg(feature = "async")]
pub use crate::client::tokio::{AsyncSession, AsyncSessionBuilder};
pub use crate::config::{ClientConfig, Credentials, MAX_TIMEOUT, TlsVerification};
pub use crate::error::{Error, Result, TransportError, TransportErrorKind};
pub use crate::fault::{ApiError, FaultKind};
pub use crate::task::{CancelFlag, PollPolicy};
pub use crate::transport::{HttpRequest, HttpResponse};
#[cfg(feature = "async")]
pub use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
pub use crate::transport::Transport;
#[cfg(feature = "blocking")]
pub use crate::transport::blocking::HttpTransport;
#[cfg(feature = "async")]
pub use crate::transport::tokio::HttpTransport as AsyncHttpTransport;
pub use crate::value::WireValue;
pub use crate::version::{ApiVersion, ServerVersion};
