//! `message`: a message for the attention of the administrator.

use std::collections::HashMap;

use crate::api::enums::Cls;
use crate::api::on_self;
use crate::api::task::TaskRef;
use crate::call::Call;
use crate::codec::{
    Class, CodecError, CodecPath, RecordReader, RecordWriter, Ref, Timestamp, WireType,
};
use crate::value::WireValue;

/// Marker for the `message` class.
#[derive(Debug)]
pub enum Message {}

impl Class for Message {
    const NAME: &'static str = "message";
}

/// Reference to a message.
pub type MessageRef = Ref<Message>;

/// Current state of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Unique identifier/object reference.
    pub uuid: String,
    /// The name of the message.
    pub name: String,
    /// The message priority, 0 being low priority.
    pub priority: i64,
    /// The class of the object this message is associated with.
    pub cls: Cls,
    /// The uuid of the object this message is associated with.
    pub obj_uuid: String,
    /// The time at which the message was created.
    pub timestamp: Timestamp,
    /// The body of the message.
    pub body: String,
}

impl WireType for MessageRecord {
    const TYPE_NAME: &'static str = "message record";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(RecordWriter::new(path)
            .field("uuid", &self.uuid)?
            .field("name", &self.name)?
            .field("priority", &self.priority)?
            .field("cls", &self.cls)?
            .field("obj_uuid", &self.obj_uuid)?
            .field("timestamp", &self.timestamp)?
            .field("body", &self.body)?
            .finish())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let record = RecordReader::new(value, path, Self::TYPE_NAME)?;
        Ok(Self {
            uuid: record.required("uuid")?,
            name: record.required("name")?,
            priority: record.required("priority")?,
            cls: record.required("cls")?,
            obj_uuid: record.required("obj_uuid")?,
            timestamp: record.required("timestamp")?,
            body: record.required("body")?,
        })
    }
}

/// `message.create`
pub fn create(name: &str, priority: i64, cls: Cls, obj_uuid: &str, body: &str) -> Call<MessageRef> {
    Call::new("message.create")
        .str_arg("name", name)
        .arg("priority", &priority)
        .arg("cls", &cls)
        .str_arg("obj_uuid", obj_uuid)
        .str_arg("body", body)
}

/// `message.destroy`
pub fn destroy(this: &MessageRef) -> Call<()> {
    on_self("message.destroy", this)
}

/// `message.destroy_many`
pub fn destroy_many(messages: &[MessageRef]) -> Call<()> {
    Call::new("message.destroy_many").arg("messages", &messages.to_vec())
}

/// `Async.message.destroy_many`
pub fn async_destroy_many(messages: &[MessageRef]) -> Call<TaskRef> {
    Call::new_async("message.destroy_many").arg("messages", &messages.to_vec())
}

/// `message.get`: messages about one object created after `since`.
pub fn get(cls: Cls, obj_uuid: &str, since: &Timestamp) -> Call<HashMap<MessageRef, MessageRecord>> {
    Call::new("message.get")
        .arg("cls", &cls)
        .str_arg("obj_uuid", obj_uuid)
        .arg("since", since)
}

/// `message.get_all`
pub fn get_all() -> Call<Vec<MessageRef>> {
    Call::new("message.get_all")
}

/// `message.get_since`: every message created after `since`.
pub fn get_since(since: &Timestamp) -> Call<HashMap<MessageRef, MessageRecord>> {
    Call::new("message.get_since").arg("since", since)
}

/// `message.get_record`
pub fn get_record(this: &MessageRef) -> Call<MessageRecord> {
    on_self("message.get_record", this)
}

/// `message.get_by_uuid`
pub fn get_by_uuid(uuid: &str) -> Call<MessageRef> {
    Call::new("message.get_by_uuid").str_arg("uuid", uuid)
}

/// `message.get_all_records`
pub fn get_all_records() -> Call<HashMap<MessageRef, MessageRecord>> {
    Call::new("message.get_all_records")
}

/// `message.get_all_records_where`: `expr` is a server-side query expression.
pub fn get_all_records_where(expr: &str) -> Call<HashMap<MessageRef, MessageRecord>> {
    Call::new("message.get_all_records_where").str_arg("expr", expr)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    #[test]
    fn get_since_sends_the_compact_timestamp() {
        let since = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).single().expect("valid");
        let call = get_since(&since);
        assert_eq!(
            call.args(),
            &[("since", WireValue::DateTime("20240115T09:30:00Z".into()))]
        );
    }

    #[test]
    fn record_rejects_unknown_class() {
        let wire = WireValue::Struct(vec![
            ("uuid".into(), WireValue::from("u")),
            ("name".into(), WireValue::from("HA_POOL_OVERCOMMITTED")),
            ("priority".into(), WireValue::Int(3)),
            ("cls".into(), WireValue::from("Toaster")),
            ("obj_uuid".into(), WireValue::from("o")),
            ("timestamp".into(), WireValue::DateTime("20240115T09:30:00Z".into())),
            ("body".into(), WireValue::from("")),
        ]);
        let err = MessageRecord::decode(&wire, &CodecPath::result("message.get_record"))
            .expect_err("unknown cls");
        assert_eq!(err.path, "message.get_record -> result.cls");
        assert_eq!(err.expected, "Cls");
    }
}
