//! `host`: the subset used to read a host's protocol level.

use std::collections::HashMap;

use crate::api::on_self;
use crate::call::Call;
use crate::codec::{Class, Ref};

/// Marker for the `host` class.
#[derive(Debug)]
pub enum Host {}

impl Class for Host {
    const NAME: &'static str = "host";
}

/// Reference to a host.
pub type HostRef = Ref<Host>;

/// `host.get_API_version_major`
pub fn get_api_version_major(this: &HostRef) -> Call<i64> {
    on_self("host.get_API_version_major", this)
}

/// `host.get_API_version_minor`
pub fn get_api_version_minor(this: &HostRef) -> Call<i64> {
    on_self("host.get_API_version_minor", this)
}

/// `host.get_software_version`: component name to version, e.g. `xapi`.
pub fn get_software_version(this: &HostRef) -> Call<HashMap<String, String>> {
    on_self("host.get_software_version", this)
}

/// `host.get_name_label`
pub fn get_name_label(this: &HostRef) -> Call<String> {
    on_self("host.get_name_label", this)
}

/// `host.get_address`: the address pool members use to reach this host.
pub fn get_address(this: &HostRef) -> Call<String> {
    on_self("host.get_address", this)
}
