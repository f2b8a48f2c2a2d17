//! Output drivers over `embedded-hal` pins.

pub mod opto;
pub mod relay;

pub use opto::OptoBank;
pub use relay::RelayBank;
