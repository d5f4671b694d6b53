//! `SDN_controller`: the SDN controller the pool connects to.
//!
//! Every operation here was re-released with the session argument counted
//! in its name (`introduce4`, `forget2`, `get_all1`). The numbered function is
//! the canonical body; the unsuffixed name re-exports it.

use std::collections::HashMap;

use crate::api::enums::SdnControllerProtocol;
use crate::api::task::TaskRef;
use crate::api::{async_on_self, on_self};
use crate::call::Call;
use crate::codec::{Class, CodecError, CodecPath, RecordReader, RecordWriter, Ref, WireType};
use crate::value::WireValue;

/// Marker for the `SDN_controller` class.
#[derive(Debug)]
pub enum SdnController {}

impl Class for SdnController {
    const NAME: &'static str = "SDN_controller";
}

/// Reference to an SDN controller.
pub type SdnControllerRef = Ref<SdnController>;

/// Current state of an SDN controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdnControllerRecord {
    /// Unique identifier/object reference.
    pub uuid: String,
    /// Protocol to connect with the controller.
    pub protocol: SdnControllerProtocol,
    /// IP address of the controller.
    pub address: String,
    /// TCP port of the controller.
    pub port: i64,
}

impl WireType for SdnControllerRecord {
    const TYPE_NAME: &'static str = "SDN_controller record";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(RecordWriter::new(path)
            .field("uuid", &self.uuid)?
            .field("protocol", &self.protocol)?
            .field("address", &self.address)?
            .field("port", &self.port)?
            .finish())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let record = RecordReader::new(value, path, Self::TYPE_NAME)?;
        Ok(Self {
            uuid: record.required("uuid")?,
            protocol: record.required("protocol")?,
            address: record.required("address")?,
            port: record.required("port")?,
        })
    }
}

pub use self::forget2 as forget;
pub use self::async_forget2 as async_forget;
pub use self::get_address2 as get_address;
pub use self::get_all1 as get_all;
pub use self::get_all_records1 as get_all_records;
pub use self::get_by_uuid2 as get_by_uuid;
pub use self::get_port2 as get_port;
pub use self::get_protocol2 as get_protocol;
pub use self::get_record2 as get_record;
pub use self::get_uuid2 as get_uuid;
pub use self::introduce4 as introduce;
pub use self::async_introduce4 as async_introduce;

/// `SDN_controller.get_all_records`
pub fn get_all_records1() -> Call<HashMap<SdnControllerRef, SdnControllerRecord>> {
    Call::new("SDN_controller.get_all_records")
}

/// `SDN_controller.get_all`
pub fn get_all1() -> Call<Vec<SdnControllerRef>> {
    Call::new("SDN_controller.get_all")
}

/// `SDN_controller.forget`: remove the controller from the pool.
pub fn forget2(this: &SdnControllerRef) -> Call<()> {
    on_self("SDN_controller.forget", this)
}

/// `Async.SDN_controller.forget`
pub fn async_forget2(this: &SdnControllerRef) -> Call<TaskRef> {
    async_on_self("SDN_controller.forget", this)
}

/// `SDN_controller.introduce`: register a controller with the pool.
pub fn introduce4(
    protocol: SdnControllerProtocol,
    address: &str,
    port: i64,
) -> Call<SdnControllerRef> {
    Call::new("SDN_controller.introduce")
        .arg("protocol", &protocol)
        .str_arg("address", address)
        .arg("port", &port)
}

/// `Async.SDN_controller.introduce`
pub fn async_introduce4(protocol: SdnControllerProtocol, address: &str, port: i64) -> Call<TaskRef> {
    Call::new_async("SDN_controller.introduce")
        .arg("protocol", &protocol)
        .str_arg("address", address)
        .arg("port", &port)
}

/// `SDN_controller.get_port`
pub fn get_port2(this: &SdnControllerRef) -> Call<i64> {
    on_self("SDN_controller.get_port", this)
}

/// `SDN_controller.get_address`
pub fn get_address2(this: &SdnControllerRef) -> Call<String> {
    on_self("SDN_controller.get_address", this)
}

/// `SDN_controller.get_protocol`
pub fn get_protocol2(this: &SdnControllerRef) -> Call<SdnControllerProtocol> {
    on_self("SDN_controller.get_protocol", this)
}

/// `SDN_controller.get_uuid`
pub fn get_uuid2(this: &SdnControllerRef) -> Call<String> {
    on_self("SDN_controller.get_uuid", this)
}

/// `SDN_controller.get_by_uuid`
pub fn get_by_uuid2(uuid: &str) -> Call<SdnControllerRef> {
    Call::new("SDN_controller.get_by_uuid").str_arg("uuid", uuid)
}

/// `SDN_controller.get_record`
pub fn get_record2(this: &SdnControllerRef) -> Call<SdnControllerRecord> {
    on_self("SDN_controller.get_record", this)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_and_unsuffixed_names_build_the_same_call() {
        let a = introduce(SdnControllerProtocol::Ssl, "10.0.0.1", 6640);
        let b = introduce4(SdnControllerProtocol::Ssl, "10.0.0.1", 6640);
        assert_eq!(a.method(), b.method());
        assert_eq!(a.args(), b.args());
        assert_eq!(
            b.args(),
            &[
                ("protocol", WireValue::from("ssl")),
                ("address", WireValue::from("10.0.0.1")),
                ("port", WireValue::Int(6640)),
            ]
        );
    }

    #[test]
    fn class_name_keeps_the_wire_spelling() {
        assert_eq!(SdnControllerRef::reference_class(), Some("SDN_controller"));
        assert_eq!(async_forget(&SdnControllerRef::new("OpaqueRef:c")).method(), "Async.SDN_controller.forget");
    }
}
