//! Selection Module
//!
//! Provides the pool selection policies, the label-driven policy factory
//! and the selection engine that chains them.

pub mod engine;
pub mod factory;
pub mod policy;

pub use engine::*;
pub use factory::*;
pub use policy::*;
