//! `pool`: the subset used to find the pool coordinator.

use crate::api::host::HostRef;
use crate::api::on_self;
use crate::call::Call;
use crate::codec::{Class, Ref};

/// Marker for the `pool` class.
#[derive(Debug)]
pub enum Pool {}

impl Class for Pool {
    const NAME: &'static str = "pool";
}

/// Reference to a pool.
pub type PoolRef = Ref<Pool>;

/// `pool.get_all`: a server belongs to exactly one pool.
pub fn get_all() -> Call<Vec<PoolRef>> {
    Call::new("pool.get_all")
}

/// `pool.get_master`: the coordinator host.
pub fn get_master(this: &PoolRef) -> Call<HostRef> {
    on_self("pool.get_master", this)
}
