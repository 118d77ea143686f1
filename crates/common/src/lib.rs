//! Common utilities for rust-vpad-bus
//!
//! This crate provides functionality shared between the bus core and its
//! hosting layers: error handling, logging setup, and the async channel
//! bridge connecting the management/producer side to the bus worker thread.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{BusBridge, BusCommand, BusEvent, BusWorker, create_bus_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
