//! Adapters: host implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements            | Connects to                 |
//! |----------------|-----------------------|-----------------------------|
//! | `config_store` | ConfigPort            | postcard / JSON file        |
//! | `eeprom`       | NonVolatileStore      | memory / image file         |
//! | `log_sink`     | EventSink             | `log` facade                |
//! | `serial`       | Transport             | stdin / stdout              |
//! | `sim`          | OutputPin, sensor and | in-memory simulated I/O     |
//! |                | network ports         |                             |
//! | `time`         | RealTimeClock         | host system clock           |
//! | `udp`          | DatagramTransport     | `std::net::UdpSocket`       |

pub mod config_store;
pub mod eeprom;
pub mod log_sink;
pub mod serial;
pub mod sim;
pub mod time;
pub mod udp;
