//! Application core: controller orchestration and the port boundary.
//!
//! All interaction with hardware, storage and transports happens through
//! the **port traits** in [`ports`], keeping this layer testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
