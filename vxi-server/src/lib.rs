//! # VXI-11 AWG Server Library
//!
//! This crate emulates a Siglent-style VXI-11 arbitrary waveform generator
//! so that an oscilloscope can control a differently-commanded AWG over the
//! network. It abstracts the protocol handling and provides a server that
//! works with different backend device drivers.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`AwgDevice`] Trait**: the interface a backend driver implements to
//!   apply waveform settings to real hardware (typically over a serial line)
//! - **[`server::Server`]**: the network front end — an RPC bind (portmap)
//!   responder, a pool of VXI-11 session handlers drawing ports from a
//!   cyclic range, and the SCPI translation between the two
//!
//! ## How It Works
//!
//! 1. The oscilloscope sends a portmap GETPORT request to the bind port
//!    (UDP or TCP). The responder allocates a session port from the pool
//!    and returns it — or, if every session is busy, leaves the request
//!    unread until one frees up (the protocol has no "try again" reply).
//! 2. The client connects to the returned port and opens a link with
//!    CREATE_LINK.
//! 3. Each DEVICE_WRITE payload is parsed as SCPI and translated into
//!    [`AwgDevice::set`] calls; DEVICE_READ answers with the instrument
//!    identification.
//! 4. DESTROY_LINK (or an inactivity timeout) closes the session and the
//!    port returns to the pool.
//!
//! Everything runs on a single thread: [`server::Server::run`] ticks the
//! bind responder and every session in turn, and no component blocks beyond
//! its configured deadline.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use vxi_server::server::{Builder, Server};
//!
//! let device = MyDriver::open("/dev/ttyUSB0")?;
//! let server = Builder::new()
//!     .port_range(9010, 9019)
//!     .build(device)?;
//! server.run();
//! ```
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see
//! connections, SCPI traffic and protocol rejections; configure it with an
//! implementation like `env_logger`.

pub mod bind;
pub mod pool;
pub mod server;
mod session;

use thiserror::Error;
use vxi_protocol::scpi::Param;

/// Identification string reported to the client; simulates a Siglent AWG.
pub const DEFAULT_ID: &str = "IDN-SGLT-PRI SDG1062X";

/// Errors reported by backend device drivers.
#[derive(Debug, Error)]
pub enum AwgError {
    #[error("channel {channel} out of range (device has {channels} channels)")]
    Channel { channel: u32, channels: u32 },
    #[error("device i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response from device: {0:?}")]
    Response(String),
    #[error("unable to verify {param} after {attempts} attempts")]
    Verify { param: Param, attempts: u32 },
}

/// Trait that backend drivers implement to provide AWG functionality.
///
/// This is the seam between the network protocol stack and the actual
/// hardware. Implementors translate the generic (channel, parameter, value)
/// vocabulary into their instrument's own command syntax. Channels are
/// 1-based; values arrive in natural units (volts, hertz, degrees).
pub trait AwgDevice {
    /// The identification string returned to DEVICE_READ requests.
    fn id(&self) -> &str {
        DEFAULT_ID
    }

    /// Number of output channels on the instrument.
    fn channels(&self) -> u32 {
        2
    }

    /// Apply one parameter value to a channel.
    ///
    /// A failed set is logged by the caller but never surfaces on the wire;
    /// the VXI-11 write reply only reports bytes accepted.
    fn set(&mut self, channel: u32, param: Param, value: f64) -> Result<(), AwgError>;

    /// Read one parameter value back from a channel, in natural units.
    fn get(&mut self, channel: u32, param: Param) -> Result<f64, AwgError>;
}
