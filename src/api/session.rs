//! `session`: an authenticated conversation with the server.
//!
//! The client sessions in this crate call `login_with_password` and `logout`
//! for you; the stubs are here for introspection and for callers that manage
//! extra sessions themselves.

use std::collections::HashMap;

use crate::api::SubjectRef;
use crate::api::host::HostRef;
use crate::api::on_self;
use crate::api::task::TaskRef;
use crate::api::user::UserRef;
use crate::call::Call;
use crate::codec::{
    Class, CodecError, CodecPath, RecordReader, RecordWriter, Ref, Timestamp, WireType,
};
use crate::value::WireValue;

/// Marker for the `session` class.
#[derive(Debug)]
pub enum Session {}

impl Class for Session {
    const NAME: &'static str = "session";
}

/// Reference to a server-side session; doubles as the session token.
pub type SessionRef = Ref<Session>;

/// Current state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Unique identifier/object reference.
    pub uuid: String,
    /// Currently connected host.
    pub this_host: Option<HostRef>,
    /// Currently connected user.
    pub this_user: Option<UserRef>,
    /// Last time the session was active.
    pub last_active: Timestamp,
    /// True for an intra-pool login.
    pub pool: bool,
    /// Additional configuration.
    pub other_config: HashMap<String, String>,
    /// True iff created with local superuser credentials.
    pub is_local_superuser: bool,
    /// The subject that created the session.
    pub subject: Option<SubjectRef>,
    /// Last time the session was validated.
    pub validation_time: Timestamp,
    /// Subject identifier of an externally authenticated user.
    pub auth_user_sid: String,
    /// Subject name of an externally authenticated user.
    pub auth_user_name: String,
    /// RBAC permissions of this session.
    pub rbac_permissions: Vec<String>,
    /// Tasks created through this session.
    pub tasks: Vec<TaskRef>,
    /// The session that created this one.
    pub parent: Option<SessionRef>,
    /// Key a client supplied to tell itself apart from others sharing a login.
    pub originator: String,
    /// Whether a client certificate authenticated this session.
    pub client_certificate: bool,
}

impl WireType for SessionRecord {
    const TYPE_NAME: &'static str = "session record";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(RecordWriter::new(path)
            .field("uuid", &self.uuid)?
            .field("this_host", &self.this_host)?
            .field("this_user", &self.this_user)?
            .field("last_active", &self.last_active)?
            .field("pool", &self.pool)?
            .field("other_config", &self.other_config)?
            .field("is_local_superuser", &self.is_local_superuser)?
            .field("subject", &self.subject)?
            .field("validation_time", &self.validation_time)?
            .field("auth_user_sid", &self.auth_user_sid)?
            .field("auth_user_name", &self.auth_user_name)?
            .field("rbac_permissions", &self.rbac_permissions)?
            .field("tasks", &self.tasks)?
            .field("parent", &self.parent)?
            .field("originator", &self.originator)?
            .field("client_certificate", &self.client_certificate)?
            .finish())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let record = RecordReader::new(value, path, Self::TYPE_NAME)?;
        Ok(Self {
            uuid: record.required("uuid")?,
            this_host: record.or_default("this_host")?,
            this_user: record.or_default("this_user")?,
            last_active: record.required("last_active")?,
            pool: record.required("pool")?,
            other_config: record.or_default("other_config")?,
            is_local_superuser: record.or_default("is_local_superuser")?,
            subject: record.or_default("subject")?,
            validation_time: record.required("validation_time")?,
            auth_user_sid: record.or_default("auth_user_sid")?,
            auth_user_name: record.or_default("auth_user_name")?,
            rbac_permissions: record.or_default("rbac_permissions")?,
            tasks: record.or_default("tasks")?,
            parent: record.or_default("parent")?,
            originator: record.or_default("originator")?,
            client_certificate: record.or_default("client_certificate")?,
        })
    }
}

/// `session.login_with_password`: sent without a session token.
pub fn login_with_password(
    uname: &str,
    pwd: &str,
    version: &str,
    originator: &str,
) -> Call<SessionRef> {
    Call::new("session.login_with_password")
        .unauthenticated()
        .str_arg("uname", uname)
        .str_arg("pwd", pwd)
        .str_arg("version", version)
        .str_arg("originator", originator)
}

/// `session.slave_local_login_with_password`: emergency login on a pool
/// member; the session is only good on that host.
pub fn slave_local_login_with_password(uname: &str, pwd: &str) -> Call<SessionRef> {
    Call::new("session.slave_local_login_with_password")
        .unauthenticated()
        .str_arg("uname", uname)
        .str_arg("pwd", pwd)
}

/// `session.logout`
pub fn logout() -> Call<()> {
    Call::new("session.logout")
}

/// `session.local_logout`: end a session made by
/// `slave_local_login_with_password`.
pub fn local_logout() -> Call<()> {
    Call::new("session.local_logout")
}

/// `session.change_password`
pub fn change_password(old_pwd: &str, new_pwd: &str) -> Call<()> {
    Call::new("session.change_password")
        .str_arg("old_pwd", old_pwd)
        .str_arg("new_pwd", new_pwd)
}

/// `session.create_from_db_file`
pub fn create_from_db_file(filename: &str) -> Call<SessionRef> {
    Call::new("session.create_from_db_file").str_arg("filename", filename)
}

/// `Async.session.create_from_db_file`
pub fn async_create_from_db_file(filename: &str) -> Call<TaskRef> {
    Call::new_async("session.create_from_db_file").str_arg("filename", filename)
}

/// `session.get_all_subject_identifiers`: subjects with a live session.
pub fn get_all_subject_identifiers() -> Call<Vec<String>> {
    Call::new("session.get_all_subject_identifiers")
}

/// `Async.session.get_all_subject_identifiers`
pub fn async_get_all_subject_identifiers() -> Call<TaskRef> {
    Call::new_async("session.get_all_subject_identifiers")
}

/// `session.logout_subject_identifier`: end every session of one subject.
pub fn logout_subject_identifier(subject_identifier: &str) -> Call<()> {
    Call::new("session.logout_subject_identifier").str_arg("subject_identifier", subject_identifier)
}

/// `Async.session.logout_subject_identifier`
pub fn async_logout_subject_identifier(subject_identifier: &str) -> Call<TaskRef> {
    Call::new_async("session.logout_subject_identifier")
        .str_arg("subject_identifier", subject_identifier)
}

/// `session.get_record`
pub fn get_record(this: &SessionRef) -> Call<SessionRecord> {
    on_self("session.get_record", this)
}

/// `session.get_by_uuid`
pub fn get_by_uuid(uuid: &str) -> Call<SessionRef> {
    Call::new("session.get_by_uuid").str_arg("uuid", uuid)
}

/// `session.get_uuid`
pub fn get_uuid(this: &SessionRef) -> Call<String> {
    on_self("session.get_uuid", this)
}

/// `session.get_this_host`
pub fn get_this_host(this: &SessionRef) -> Call<Option<HostRef>> {
    on_self("session.get_this_host", this)
}

/// `session.get_this_user`
pub fn get_this_user(this: &SessionRef) -> Call<Option<UserRef>> {
    on_self("session.get_this_user", this)
}

/// `session.get_last_active`
pub fn get_last_active(this: &SessionRef) -> Call<Timestamp> {
    on_self("session.get_last_active", this)
}

/// `session.get_pool`
pub fn get_pool(this: &SessionRef) -> Call<bool> {
    on_self("session.get_pool", this)
}

/// `session.get_other_config`
pub fn get_other_config(this: &SessionRef) -> Call<HashMap<String, String>> {
    on_self("session.get_other_config", this)
}

/// `session.get_is_local_superuser`
pub fn get_is_local_superuser(this: &SessionRef) -> Call<bool> {
    on_self("session.get_is_local_superuser", this)
}

/// `session.get_subject`
pub fn get_subject(this: &SessionRef) -> Call<Option<SubjectRef>> {
    on_self("session.get_subject", this)
}

/// `session.get_validation_time`
pub fn get_validation_time(this: &SessionRef) -> Call<Timestamp> {
    on_self("session.get_validation_time", this)
}

/// `session.get_auth_user_sid`
pub fn get_auth_user_sid(this: &SessionRef) -> Call<String> {
    on_self("session.get_auth_user_sid", this)
}

/// `session.get_auth_user_name`
pub fn get_auth_user_name(this: &SessionRef) -> Call<String> {
    on_self("session.get_auth_user_name", this)
}

/// `session.get_rbac_permissions`
pub fn get_rbac_permissions(this: &SessionRef) -> Call<Vec<String>> {
    on_self("session.get_rbac_permissions", this)
}

/// `session.get_tasks`
pub fn get_tasks(this: &SessionRef) -> Call<Vec<TaskRef>> {
    on_self("session.get_tasks", this)
}

/// `session.get_parent`
pub fn get_parent(this: &SessionRef) -> Call<Option<SessionRef>> {
    on_self("session.get_parent", this)
}

/// `session.get_originator`
pub fn get_originator(this: &SessionRef) -> Call<String> {
    on_self("session.get_originator", this)
}

/// `session.get_client_certificate`
pub fn get_client_certificate(this: &SessionRef) -> Call<bool> {
    on_self("session.get_client_certificate", this)
}

/// `session.set_other_config`
pub fn set_other_config(this: &SessionRef, value: &HashMap<String, String>) -> Call<()> {
    Call::new("session.set_other_config")
        .arg("self", this)
        .arg("value", value)
}

/// `session.add_to_other_config`
pub fn add_to_other_config(this: &SessionRef, key: &str, value: &str) -> Call<()> {
    Call::new("session.add_to_other_config")
        .arg("self", this)
        .str_arg("key", key)
        .str_arg("value", value)
}

/// `session.remove_from_other_config`
pub fn remove_from_other_config(this: &SessionRef, key: &str) -> Call<()> {
    Call::new("session.remove_from_other_config")
        .arg("self", this)
        .str_arg("key", key)
}
