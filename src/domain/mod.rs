//! Domain layer - Core identifiers and port definitions
//!
//! This module defines the core traits (ports) that cluster adapters
//! implement, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
