//! Per-class stubs.
//!
//! Each module is a collection of functions that build a typed [`Call`];
//! nothing here holds state. Run a call with `Session::execute` (or `.await`
//! it on an `AsyncSession`):
//!
//! ```no_run
//! # fn demo(session: &xenapi::Session) -> xenapi::Result<()> {
//! use xenapi::api::message;
//!
//! for (r, record) in session.execute(message::get_all_records())? {
//!     println!("{r} {} {}", record.name, record.body);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Mutating calls have an `async_` twin that dispatches `Async.<method>` and
//! returns a [`task::TaskRef`]. Schema revisions that changed a signature keep
//! their numbered spelling (`introduce4`, `forget2`); the unsuffixed name is an
//! alias of the current one.

use crate::call::Call;
use crate::codec::{Class, Ref, WireType};

pub mod enums;
pub mod host;
pub mod message;
pub mod pool;
pub mod sdn_controller;
pub mod session;
pub mod task;
pub mod user;

/// Marker for the `subject` class.
#[derive(Debug)]
pub enum Subject {}

impl Class for Subject {
    const NAME: &'static str = "subject";
}

/// Reference to an external-authentication subject.
pub type SubjectRef = Ref<Subject>;

/// `<class>.<verb>(self)`.
pub(crate) fn on_self<C: Class, T: WireType>(method: &str, this: &Ref<C>) -> Call<T> {
    Call::new(method).arg("self", this)
}

/// `Async.<class>.<verb>(self)`.
pub(crate) fn async_on_self<C: Class>(method: &str, this: &Ref<C>) -> Call<task::TaskRef> {
    Call::new_async(method).arg("self", this)
}

/// `<class>.<verb>(self, value)`, the shape of every field setter.
pub(crate) fn set_field<C: Class, V: WireType>(method: &str, this: &Ref<C>, value: &V) -> Call<()> {
    Call::new(method).arg("self", this).arg("value", value)
}
