//! The top-level server: configuration and the cooperative driver loop.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::AwgDevice;
use crate::bind::BindResponder;
use crate::pool::SessionPool;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the bind responder and session listeners bind to.
    pub ip: IpAddr,
    /// Port of the RPC bind service; 0 picks an ephemeral port (tests).
    pub bind_port: u16,
    /// Inclusive range of ports handed out to VXI-11 sessions.
    pub first_port: u16,
    pub last_port: u16,
    /// Number of session handler slots.
    pub sessions: usize,
    /// Capacity of the per-session packet buffer; also reported to the
    /// client as the maximum receive size on CREATE_LINK.
    pub buffer_size: usize,
    /// A connected client silent for this long is disconnected.
    pub inactivity_timeout: Duration,
    /// Deadline for writing one response to a client socket.
    pub io_timeout: Duration,
    /// Answer a pending BSWV? read with live parameter readings instead of
    /// the identification string.
    pub parameter_echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_port: vxi_protocol::rpc::BIND_PORT,
            first_port: 9010,
            last_port: 9019,
            sessions: 1,
            buffer_size: 256,
            inactivity_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(5),
            parameter_echo: false,
        }
    }
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use vxi_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .port_range(9010, 9019)
///     .inactivity_timeout(Duration::from_secs(60))
///     .build(my_device)?;
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the address to bind all listening sockets to.
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.config.ip = ip;
        self
    }

    /// Set the port of the RPC bind service.
    pub fn bind_port(mut self, port: u16) -> Self {
        self.config.bind_port = port;
        self
    }

    /// Set the inclusive range of VXI-11 session ports.
    pub fn port_range(mut self, first: u16, last: u16) -> Self {
        self.config.first_port = first;
        self.config.last_port = last;
        self
    }

    /// Set the number of session handler slots.
    pub fn sessions(mut self, sessions: usize) -> Self {
        self.config.sessions = sessions;
        self
    }

    /// Set the inactivity timeout for connected clients.
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.config.inactivity_timeout = timeout;
        self
    }

    /// Answer BSWV? reads with live parameter readings.
    pub fn parameter_echo(mut self, enabled: bool) -> Self {
        self.config.parameter_echo = enabled;
        self
    }

    /// Build and return the server.
    pub fn build<D: AwgDevice>(self, device: D) -> io::Result<Server<D>> {
        Server::new(device, self.config)
    }
}

/// The assembled emulator: bind responder, session pool, and the backend
/// device they drive.
pub struct Server<D: AwgDevice> {
    device: D,
    pool: SessionPool,
    bind: BindResponder,
}

impl<D: AwgDevice> Server<D> {
    pub fn new(device: D, config: Config) -> io::Result<Server<D>> {
        let bind = BindResponder::begin(config.ip, config.bind_port)?;
        let pool = SessionPool::new(&config);
        Ok(Server { device, pool, bind })
    }

    /// The actually bound (UDP, TCP) ports of the bind responder.
    pub fn bind_ports(&self) -> (u16, u16) {
        (self.bind.udp_port(), self.bind.tcp_port())
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// One scheduler tick over every component.
    pub fn poll(&mut self) {
        self.bind.poll(&mut self.pool);
        self.pool.poll(&mut self.device);
    }

    /// Drive the server forever.
    pub fn run(mut self) {
        log::info!("server ready; emulating {:?}", self.device.id());
        loop {
            self.poll();
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_matches_protocol_conventions() {
        let config = Config::default();
        assert_eq!(config.bind_port, 111);
        assert_eq!(config.first_port, 9010);
        assert_eq!(config.last_port, 9019);
        assert_eq!(config.sessions, 1);
        assert_eq!(config.buffer_size, 256);
    }
}
