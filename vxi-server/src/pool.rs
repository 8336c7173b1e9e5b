//! Session-port allocation.
//!
//! VXI-11 sessions listen on ports drawn from a dedicated range. The range
//! rotates: each allocation takes the cursor's current value and advances
//! it, wrapping past the end. "Available" means at least one session handler
//! currently has no port bound; the bind responder asks, the pool decides.

use std::net::IpAddr;

use crate::AwgDevice;
use crate::server::Config;
use crate::session::VxiSession;

/// A bounded counter that wraps around its inclusive range.
#[derive(Debug, Clone)]
pub struct PortCycle {
    start: u16,
    end: u16,
    current: u16,
}

impl PortCycle {
    /// Create a cycle over `[start, end]`; the bounds may be given in either
    /// order. The first value produced is the low bound.
    pub fn new(start: u16, end: u16) -> PortCycle {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        PortCycle { start, end, current: start }
    }

    /// Return the current value and advance, wrapping after the end.
    pub fn next(&mut self) -> u16 {
        let value = self.current;
        self.current = if self.current < self.end {
            self.current + 1
        } else {
            self.start
        };
        value
    }
}

/// The fixed set of session handlers and their port cursor.
pub struct SessionPool {
    sessions: Vec<VxiSession>,
    ports: PortCycle,
    ip: IpAddr,
}

impl SessionPool {
    pub(crate) fn new(config: &Config) -> SessionPool {
        SessionPool {
            sessions: (0..config.sessions).map(|_| VxiSession::new(config)).collect(),
            ports: PortCycle::new(config.first_port, config.last_port),
            ip: config.ip,
        }
    }

    /// Whether any session handler is free to take a client.
    pub fn available(&self) -> bool {
        self.sessions.iter().any(|session| session.port() == 0)
    }

    /// Bind a free session handler to the next port in the cycle and return
    /// the port, or `None` if no handler is free or the bind failed.
    pub fn allocate(&mut self) -> Option<u16> {
        let session = self.sessions.iter_mut().find(|session| session.port() == 0)?;
        let port = self.ports.next();
        match session.begin(self.ip, port) {
            Ok(()) => Some(port),
            Err(e) => {
                log::error!("failed to bind VXI-11 session port {port}: {e}");
                None
            }
        }
    }

    pub(crate) fn poll<D: AwgDevice>(&mut self, device: &mut D) {
        for session in &mut self.sessions {
            session.poll(device);
        }
    }
}
