//! Simulated radios and time for running the link without hardware.
//!
//! - [`UdpTransceiver`]: one endpoint per process, frames carried in UDP datagrams
//! - [`Loopback`]: both ends in one process on a manual clock
//! - [`FaultInjector`]: seeded loss and delay for either of the above

mod clock;
mod fault;
mod loopback;
mod udp;

pub use clock::ManualClock;
pub use fault::{FaultConfig, FaultConfigError, FaultInjector};
pub use loopback::Loopback;
pub use udp::{UdpTransceiver, SIMULATED_RSSI_DBM, UDP_RADIO_MTU};
