//! API Module
//!
//! REST access to the template functions for evaluators running outside
//! this process.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
