//! namur-hardware
//!
//! Hardware crate containing the low-level NAMUR serial client and the
//! heater-stirrer facade built on top of it.
//!
//! Public API:
//! - `heater_stirrer::HeaterStirrer`: device facade with timed stir actions
//! - `serial_driver::NamurClient`: blocking command/response client
//! - `serial_driver::NamurTransport`: transport trait with the NAMUR command set
//! - `serial_driver::list_ports`: enumerate candidate serial ports

pub mod heater_stirrer;
pub mod serial_driver;

pub use heater_stirrer::HeaterStirrer;
pub use serial_driver::{
    list_ports, with_client, NamurClient, NamurTransport, NativePortOpener, PortInfo, PortOpener,
    SerialLink,
};

