//! Enumerations used by the classes in this crate.

use crate::codec::wire_enum;

wire_enum! {
    /// Class of the object a message is attached to.
    pub enum Cls {
        /// VM
        Vm => "VM",
        /// Host
        Host => "Host",
        /// SR
        Sr => "SR",
        /// Pool
        Pool => "Pool",
        /// VMPP
        Vmpp => "VMPP",
        /// VMSS
        Vmss => "VMSS",
        /// PVS_proxy
        PvsProxy => "PVS_proxy",
        /// VDI
        Vdi => "VDI",
        /// Certificate
        Certificate => "Certificate",
    }
}

wire_enum! {
    /// How the pool connects to an SDN controller.
    pub enum SdnControllerProtocol {
        /// Active ssl connection
        Ssl => "ssl",
        /// Passive ssl connection
        Pssl => "pssl",
    }
}

wire_enum! {
    /// Lifecycle of a server-side task.
    pub enum TaskStatusType {
        /// task is in progress
        Pending => "pending",
        /// task was completed successfully
        Success => "success",
        /// task has failed
        Failure => "failure",
        /// task is being cancelled
        Cancelling => "cancelling",
        /// task has been cancelled
        Cancelled => "cancelled",
    }
}

wire_enum! {
    /// Operations a task may allow.
    pub enum TaskAllowedOperations {
        /// refers to the operation "cancel"
        Cancel => "cancel",
        /// refers to the operation "destroy"
        Destroy => "destroy",
    }
}

impl TaskStatusType {
    /// Whether the task has stopped changing.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecPath, WireType};
    use crate::value::WireValue;

    #[test]
    fn literals_match_the_server_spelling() {
        assert_eq!(Cls::PvsProxy.as_str(), "PVS_proxy");
        assert_eq!(Cls::from_wire("VMSS"), Some(Cls::Vmss));
        assert_eq!(SdnControllerProtocol::Pssl.to_string(), "pssl");
        assert_eq!(TaskStatusType::ALL.len(), 5);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let path = CodecPath::result("task.get_status");
        assert_eq!(
            TaskStatusType::decode(&WireValue::from("cancelled"), &path),
            Ok(TaskStatusType::Cancelled)
        );
        let err = TaskStatusType::decode(&WireValue::from("paused"), &path).expect_err("unknown");
        assert_eq!(err.path, "task.get_status -> result");
        assert!(!TaskStatusType::Pending.is_finished());
        assert!(TaskStatusType::Cancelled.is_finished());
    }
}
