//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the full controller (run
//! loop, transports, dispatcher, alarm engine) against mock adapters.
//! Everything runs on the host with no hardware attached.

mod alarm_tests;
mod mock_hw;
mod protocol_tests;
