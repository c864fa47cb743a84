//! Custom Resource Definitions read by the pool selector
//!
//! This module contains the cStor CRD types:
//! - CStorPool: a zpool that hosts replicas
//! - CStorVolumeReplica: one replica of a volume, placed on a pool

pub mod cstor_pool;
pub mod cstor_volume_replica;

pub use cstor_pool::*;
pub use cstor_volume_replica::*;
