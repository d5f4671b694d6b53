//! `task`: a long-running asynchronous operation.
//!
//! Tasks are how `Async.` calls report back. Numbered functions carry the
//! session argument in their arity (`get_status2`); the unsuffixed name
//! re-exports the current signature. The one-argument `other_config`
//! mutators from the first API release are kept for source compatibility
//! but refuse to dispatch, since the server needs the key and value.

use std::collections::HashMap;

use crate::api::enums::{TaskAllowedOperations, TaskStatusType};
use crate::api::host::HostRef;
use crate::api::{on_self, set_field};
use crate::call::Call;
use crate::codec::{
    Class, CodecError, CodecPath, RecordReader, RecordWriter, Ref, Timestamp, WireType,
};
use crate::value::WireValue;

/// Marker for the `task` class.
#[derive(Debug)]
pub enum Task {}

impl Class for Task {
    const NAME: &'static str = "task";
}

/// Reference to a task.
pub type TaskRef = Ref<Task>;

/// Current state of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    /// Unique identifier/object reference.
    pub uuid: String,
    /// A human-readable name.
    pub name_label: String,
    /// A notes field containing human-readable description.
    pub name_description: String,
    /// Operations allowed in this state. Advisory only.
    pub allowed_operations: Vec<TaskAllowedOperations>,
    /// Running tasks using this object, by reference.
    pub current_operations: HashMap<String, TaskAllowedOperations>,
    /// Time the task was created.
    pub created: Timestamp,
    /// Time the task finished. Meaningless while pending.
    pub finished: Timestamp,
    /// Current status.
    pub status: TaskStatusType,
    /// The host the task runs on.
    pub resident_on: Option<HostRef>,
    /// Estimated fraction complete. Use `status` to detect completion.
    pub progress: f64,
    /// On success, the class name of the reference in `result`.
    pub r#type: String,
    /// On success, the XML-RPC value of the result (void or a reference).
    pub result: String,
    /// On failure, the error code followed by its parameters.
    pub error_info: Vec<String>,
    /// Additional configuration.
    pub other_config: HashMap<String, String>,
    /// The task this is a subtask of.
    pub subtask_of: Option<TaskRef>,
    /// Subtasks of this task.
    pub subtasks: Vec<TaskRef>,
    /// Function call trace for debugging.
    pub backtrace: String,
}

impl WireType for TaskRecord {
    const TYPE_NAME: &'static str = "task record";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(RecordWriter::new(path)
            .field("uuid", &self.uuid)?
            .field("name_label", &self.name_label)?
            .field("name_description", &self.name_description)?
            .field("allowed_operations", &self.allowed_operations)?
            .field("current_operations", &self.current_operations)?
            .field("created", &self.created)?
            .field("finished", &self.finished)?
            .field("status", &self.status)?
            .field("resident_on", &self.resident_on)?
            .field("progress", &self.progress)?
            .field("type", &self.r#type)?
            .field("result", &self.result)?
            .field("error_info", &self.error_info)?
            .field("other_config", &self.other_config)?
            .field("subtask_of", &self.subtask_of)?
            .field("subtasks", &self.subtasks)?
            .field("backtrace", &self.backtrace)?
            .finish())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let record = RecordReader::new(value, path, Self::TYPE_NAME)?;
        Ok(Self {
            uuid: record.required("uuid")?,
            name_label: record.required("name_label")?,
            name_description: record.required("name_description")?,
            allowed_operations: record.or_default("allowed_operations")?,
            current_operations: record.or_default("current_operations")?,
            created: record.required("created")?,
            finished: record.required("finished")?,
            status: record.required("status")?,
            resident_on: record.or_default("resident_on")?,
            progress: record.required("progress")?,
            r#type: record.or_default("type")?,
            result: record.or_default("result")?,
            error_info: record.or_default("error_info")?,
            other_config: record.or_default("other_config")?,
            subtask_of: record.or_default("subtask_of")?,
            subtasks: record.or_default("subtasks")?,
            backtrace: record.or_default("backtrace")?,
        })
    }
}

pub use self::add_to_other_config4 as add_to_other_config;
pub use self::async_cancel2 as async_cancel;
pub use self::cancel2 as cancel;
pub use self::create3 as create;
pub use self::destroy2 as destroy;
pub use self::get_all1 as get_all;
pub use self::get_all_records1 as get_all_records;
pub use self::get_allowed_operations2 as get_allowed_operations;
pub use self::get_backtrace2 as get_backtrace;
pub use self::get_by_name_label2 as get_by_name_label;
pub use self::get_by_uuid2 as get_by_uuid;
pub use self::get_created2 as get_created;
pub use self::get_current_operations2 as get_current_operations;
pub use self::get_error_info2 as get_error_info;
pub use self::get_finished2 as get_finished;
pub use self::get_name_description2 as get_name_description;
pub use self::get_name_label2 as get_name_label;
pub use self::get_other_config2 as get_other_config;
pub use self::get_progress2 as get_progress;
pub use self::get_record2 as get_record;
pub use self::get_resident_on2 as get_resident_on;
pub use self::get_result2 as get_result;
pub use self::get_status2 as get_status;
pub use self::get_subtask_of2 as get_subtask_of;
pub use self::get_subtasks2 as get_subtasks;
pub use self::get_type2 as get_type;
pub use self::get_uuid2 as get_uuid;
pub use self::remove_from_other_config3 as remove_from_other_config;
pub use self::set_error_info3 as set_error_info;
pub use self::set_other_config3 as set_other_config;
pub use self::set_progress3 as set_progress;
pub use self::set_result3 as set_result;
pub use self::set_status3 as set_status;

/// `task.get_all_records`
pub fn get_all_records1() -> Call<HashMap<TaskRef, TaskRecord>> {
    Call::new("task.get_all_records")
}

/// `task.get_all`
pub fn get_all1() -> Call<Vec<TaskRef>> {
    Call::new("task.get_all")
}

/// `task.set_error_info`
pub fn set_error_info3(this: &TaskRef, value: &[String]) -> Call<()> {
    set_field("task.set_error_info", this, &value.to_vec())
}

/// `task.set_result`: `value` is an XML-RPC `<value>` element as text.
pub fn set_result3(this: &TaskRef, value: &str) -> Call<()> {
    set_field("task.set_result", this, &value.to_string())
}

/// `task.set_progress`
pub fn set_progress3(this: &TaskRef, value: f64) -> Call<()> {
    set_field("task.set_progress", this, &value)
}

/// `task.set_status`
pub fn set_status3(this: &TaskRef, value: TaskStatusType) -> Call<()> {
    set_field("task.set_status", this, &value)
}

/// `task.cancel`: request cancellation; the task moves to `cancelling`, then
/// `cancelled` if the operation honours it.
pub fn cancel2(task: &TaskRef) -> Call<()> {
    Call::new("task.cancel").arg("task", task)
}

/// `Async.task.cancel`
pub fn async_cancel2(task: &TaskRef) -> Call<TaskRef> {
    Call::new_async("task.cancel").arg("task", task)
}

/// `task.destroy`: free the server-side record.
pub fn destroy2(this: &TaskRef) -> Call<()> {
    on_self("task.destroy", this)
}

/// `task.create`: a task for client-side bookkeeping.
pub fn create3(label: &str, description: &str) -> Call<TaskRef> {
    Call::new("task.create")
        .str_arg("label", label)
        .str_arg("description", description)
}

/// `task.remove_from_other_config`: a missing key is not an error.
pub fn remove_from_other_config3(this: &TaskRef, key: &str) -> Call<()> {
    Call::new("task.remove_from_other_config")
        .arg("self", this)
        .str_arg("key", key)
}

/// `task.remove_from_other_config` as first released, without a key.
#[deprecated(note = "the server needs a key; use `remove_from_other_config`")]
pub fn remove_from_other_config2(this: &TaskRef) -> Call<()> {
    Call::new("task.remove_from_other_config")
        .arg("self", this)
        .missing("key")
}

/// `task.add_to_other_config`
pub fn add_to_other_config4(this: &TaskRef, key: &str, value: &str) -> Call<()> {
    Call::new("task.add_to_other_config")
        .arg("self", this)
        .str_arg("key", key)
        .str_arg("value", value)
}

/// `task.add_to_other_config` as first released, without key and value.
#[deprecated(note = "the server needs a key and value; use `add_to_other_config`")]
pub fn add_to_other_config2(this: &TaskRef) -> Call<()> {
    Call::new("task.add_to_other_config")
        .arg("self", this)
        .missing("key")
}

/// `task.set_other_config`
pub fn set_other_config3(this: &TaskRef, value: &HashMap<String, String>) -> Call<()> {
    set_field("task.set_other_config", this, value)
}

/// `task.set_other_config` as first released, without a value.
#[deprecated(note = "the server needs a value; use `set_other_config`")]
pub fn set_other_config2(this: &TaskRef) -> Call<()> {
    Call::new("task.set_other_config")
        .arg("self", this)
        .missing("value")
}

/// `task.get_backtrace`
pub fn get_backtrace2(this: &TaskRef) -> Call<String> {
    on_self("task.get_backtrace", this)
}

/// `task.get_subtasks`
pub fn get_subtasks2(this: &TaskRef) -> Call<Vec<TaskRef>> {
    on_self("task.get_subtasks", this)
}

/// `task.get_subtask_of`: `None` for a top-level task.
pub fn get_subtask_of2(this: &TaskRef) -> Call<Option<TaskRef>> {
    on_self("task.get_subtask_of", this)
}

/// `task.get_other_config`
pub fn get_other_config2(this: &TaskRef) -> Call<HashMap<String, String>> {
    on_self("task.get_other_config", this)
}

/// `task.get_error_info`
pub fn get_error_info2(this: &TaskRef) -> Call<Vec<String>> {
    on_self("task.get_error_info", this)
}

/// `task.get_result`: the raw `<value>` text; see [`crate::task::parse_task_result`].
pub fn get_result2(this: &TaskRef) -> Call<String> {
    on_self("task.get_result", this)
}

/// `task.get_type`
pub fn get_type2(this: &TaskRef) -> Call<String> {
    on_self("task.get_type", this)
}

/// `task.get_progress`
pub fn get_progress2(this: &TaskRef) -> Call<f64> {
    on_self("task.get_progress", this)
}

/// `task.get_resident_on`
pub fn get_resident_on2(this: &TaskRef) -> Call<Option<HostRef>> {
    on_self("task.get_resident_on", this)
}

/// `task.get_status`
pub fn get_status2(this: &TaskRef) -> Call<TaskStatusType> {
    on_self("task.get_status", this)
}

/// `task.get_finished`
pub fn get_finished2(this: &TaskRef) -> Call<Timestamp> {
    on_self("task.get_finished", this)
}

/// `task.get_created`
pub fn get_created2(this: &TaskRef) -> Call<Timestamp> {
    on_self("task.get_created", this)
}

/// `task.get_current_operations`
pub fn get_current_operations2(this: &TaskRef) -> Call<HashMap<String, TaskAllowedOperations>> {
    on_self("task.get_current_operations", this)
}

/// `task.get_allowed_operations`
pub fn get_allowed_operations2(this: &TaskRef) -> Call<Vec<TaskAllowedOperations>> {
    on_self("task.get_allowed_operations", this)
}

/// `task.get_name_description`
pub fn get_name_description2(this: &TaskRef) -> Call<String> {
    on_self("task.get_name_description", this)
}

/// `task.get_name_label`
pub fn get_name_label2(this: &TaskRef) -> Call<String> {
    on_self("task.get_name_label", this)
}

/// `task.get_uuid`
pub fn get_uuid2(this: &TaskRef) -> Call<String> {
    on_self("task.get_uuid", this)
}

/// `task.get_by_name_label`
pub fn get_by_name_label2(label: &str) -> Call<Vec<TaskRef>> {
    Call::new("task.get_by_name_label").str_arg("label", label)
}

/// `task.get_by_uuid`
pub fn get_by_uuid2(uuid: &str) -> Call<TaskRef> {
    Call::new("task.get_by_uuid").str_arg("uuid", uuid)
}

/// `task.get_record`
pub fn get_record2(this: &TaskRef) -> Call<TaskRecord> {
    on_self("task.get_record", this)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(deprecated)]
    fn first_release_mutators_never_dispatch() {
        let t = TaskRef::new("OpaqueRef:t");
        for call in [
            add_to_other_config2(&t),
            remove_from_other_config2(&t),
            set_other_config2(&t),
        ] {
            let method = call.method().to_string();
            let err = call.into_request().expect_err("incomplete signature");
            assert!(err.path.starts_with(&method));
            assert_eq!(err.actual, "missing");
        }
    }

    #[test]
    fn cancel_labels_its_argument_task() {
        let t = TaskRef::new("OpaqueRef:t");
        assert_eq!(cancel(&t).args()[0].0, "task");
        assert_eq!(async_cancel(&t).method(), "Async.task.cancel");
    }

    #[test]
    fn null_links_decode_as_none() {
        let wire = WireValue::from(crate::codec::NULL_REF);
        let path = CodecPath::result("task.get_subtask_of");
        assert_eq!(Option::<TaskRef>::decode(&wire, &path), Ok(None));
    }
}
