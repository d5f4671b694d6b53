//! `user`: a user of the system.

use std::collections::HashMap;

use crate::api::task::TaskRef;
use crate::api::{async_on_self, on_self, set_field};
use crate::call::Call;
use crate::codec::{Class, CodecError, CodecPath, RecordReader, RecordWriter, Ref, WireType};
use crate::value::WireValue;

/// Marker for the `user` class.
#[derive(Debug)]
pub enum User {}

impl Class for User {
    const NAME: &'static str = "user";
}

/// Reference to a user.
pub type UserRef = Ref<User>;

/// Current state of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserRecord {
    /// Unique identifier/object reference.
    pub uuid: String,
    /// Short name (e.g. userid).
    pub short_name: String,
    /// Full name.
    pub fullname: String,
    /// Additional configuration.
    pub other_config: HashMap<String, String>,
}

impl WireType for UserRecord {
    const TYPE_NAME: &'static str = "user record";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(RecordWriter::new(path)
            .field("uuid", &self.uuid)?
            .field("short_name", &self.short_name)?
            .field("fullname", &self.fullname)?
            .field("other_config", &self.other_config)?
            .finish())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let record = RecordReader::new(value, path, Self::TYPE_NAME)?;
        Ok(Self {
            uuid: record.required("uuid")?,
            short_name: record.required("short_name")?,
            fullname: record.required("fullname")?,
            other_config: record.or_default("other_config")?,
        })
    }
}

/// `user.get_record`
pub fn get_record(this: &UserRef) -> Call<UserRecord> {
    on_self("user.get_record", this)
}

/// `user.get_by_uuid`
pub fn get_by_uuid(uuid: &str) -> Call<UserRef> {
    Call::new("user.get_by_uuid").str_arg("uuid", uuid)
}

/// `user.create`: the `uuid` of `args` is ignored by the server.
pub fn create(args: &UserRecord) -> Call<UserRef> {
    Call::new("user.create").arg("args", args)
}

/// `Async.user.create`
pub fn async_create(args: &UserRecord) -> Call<TaskRef> {
    Call::new_async("user.create").arg("args", args)
}

/// `user.destroy`
pub fn destroy(this: &UserRef) -> Call<()> {
    on_self("user.destroy", this)
}

/// `Async.user.destroy`
pub fn async_destroy(this: &UserRef) -> Call<TaskRef> {
    async_on_self("user.destroy", this)
}

/// `user.get_uuid`
pub fn get_uuid(this: &UserRef) -> Call<String> {
    on_self("user.get_uuid", this)
}

/// `user.get_short_name`
pub fn get_short_name(this: &UserRef) -> Call<String> {
    on_self("user.get_short_name", this)
}

/// `user.get_fullname`
pub fn get_fullname(this: &UserRef) -> Call<String> {
    on_self("user.get_fullname", this)
}

/// `user.get_other_config`
pub fn get_other_config(this: &UserRef) -> Call<HashMap<String, String>> {
    on_self("user.get_other_config", this)
}

/// `user.set_fullname`
pub fn set_fullname(this: &UserRef, value: &str) -> Call<()> {
    set_field("user.set_fullname", this, &value.to_string())
}

/// `user.set_other_config`
pub fn set_other_config(this: &UserRef, value: &HashMap<String, String>) -> Call<()> {
    set_field("user.set_other_config", this, value)
}

/// `user.add_to_other_config`: fails with `MAP_DUPLICATE_KEY` if `key` is present.
pub fn add_to_other_config(this: &UserRef, key: &str, value: &str) -> Call<()> {
    Call::new("user.add_to_other_config")
        .arg("self", this)
        .str_arg("key", key)
        .str_arg("value", value)
}

/// `user.remove_from_other_config`: a missing key is not an error.
pub fn remove_from_other_config(this: &UserRef, key: &str) -> Call<()> {
    Call::new("user.remove_from_other_config")
        .arg("self", this)
        .str_arg("key", key)
}
