//! The RPC bind (portmap) responder.
//!
//! Listens for GETPORT requests on UDP and TCP and answers each with a
//! freshly allocated VXI-11 session port. There is no "out of resources"
//! code in the bind protocol — PROC_UNAVAIL might suggest the service
//! cannot do GETPORT at all, and the rejection reasons (RPC_MISMATCH,
//! AUTH_ERROR) do not fit either — so while no session handler is free the
//! responder simply does not read incoming requests, leaving the client to
//! retry until a slot opens up.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

use vxi_protocol::framing::{LAST_FRAGMENT, encode_frame};
use vxi_protocol::rpc::{self, CallHeader, GetPort, ReplyHeader};
use vxi_protocol::wire::{WireReader, WireWriter, from_wire};

use crate::pool::SessionPool;

/// A bind request is 56 bytes; allow a little extra.
const BIND_BUFFER_SIZE: usize = 64;

/// How long a TCP bind client may take to deliver its one request.
const TCP_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

pub struct BindResponder {
    udp: UdpSocket,
    tcp: TcpListener,
    udp_port: u16,
    tcp_port: u16,
}

impl BindResponder {
    /// Bind the UDP and TCP listening sockets.
    pub(crate) fn begin(ip: IpAddr, port: u16) -> io::Result<BindResponder> {
        let udp = UdpSocket::bind(SocketAddr::new(ip, port))?;
        udp.set_nonblocking(true)?;
        let tcp = TcpListener::bind(SocketAddr::new(ip, port))?;
        tcp.set_nonblocking(true)?;
        let udp_port = udp.local_addr()?.port();
        let tcp_port = tcp.local_addr()?.port();
        log::info!("listening for RPC bind requests on UDP port {udp_port} and TCP port {tcp_port}");
        Ok(BindResponder { udp, tcp, udp_port, tcp_port })
    }

    pub fn udp_port(&self) -> u16 {
        self.udp_port
    }

    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    /// One scheduler tick: serve at most one bind request, and only while a
    /// session handler is free to take the resulting connection.
    pub(crate) fn poll(&mut self, pool: &mut SessionPool) {
        if !pool.available() {
            return;
        }

        let mut buffer = [0u8; BIND_BUFFER_SIZE];
        match self.udp.recv_from(&mut buffer) {
            Ok((len, peer)) => {
                log::debug!("bind request: {len} bytes over UDP from {peer}");
                if let Some(reply) = process_request(&buffer[..len], pool) {
                    if let Err(e) = self.udp.send_to(&reply, peer) {
                        log::error!("bind reply to {peer} failed: {e}");
                    }
                }
                return;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                log::error!("bind UDP receive failed: {e}");
                return;
            }
        }

        match self.tcp.accept() {
            Ok((mut stream, peer)) => {
                log::debug!("bind connection over TCP from {peer}");
                if let Err(e) = serve_tcp(&mut stream, pool) {
                    log::error!("bind reply to {peer} failed: {e}");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => log::error!("bind TCP accept failed: {e}"),
        }
    }
}

/// Read one framed request from a TCP bind client, answer it, and let the
/// connection drop.
fn serve_tcp(stream: &mut TcpStream, pool: &mut SessionPool) -> io::Result<()> {
    stream.set_read_timeout(Some(TCP_REQUEST_TIMEOUT))?;
    stream.set_write_timeout(Some(TCP_REQUEST_TIMEOUT))?;

    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix)?;
    let len = ((from_wire(prefix) & !LAST_FRAGMENT) as usize).min(BIND_BUFFER_SIZE);
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;

    if let Some(reply) = process_request(&payload, pool) {
        stream.write_all(&encode_frame(&reply))?;
    }
    Ok(())
}

/// Validate one bind request and build the reply payload. Malformed
/// requests produce no reply at all.
fn process_request(payload: &[u8], pool: &mut SessionPool) -> Option<Vec<u8>> {
    let mut reader = WireReader::new(payload);
    let call = match CallHeader::parse(&mut reader) {
        Ok(call) => call,
        Err(e) => {
            log::debug!("ignoring malformed bind request: {e}");
            return None;
        }
    };

    let (status, port) = if call.program != rpc::program::PORTMAP {
        log::error!(
            "invalid program (expected PORTMAP {:#x}, received {:#x})",
            rpc::program::PORTMAP,
            call.program
        );
        (rpc::status::PROG_UNAVAIL, 0)
    } else if call.procedure != rpc::procedure::GET_PORT {
        log::error!(
            "invalid procedure (expected GET_PORT {}, received {})",
            rpc::procedure::GET_PORT,
            call.procedure
        );
        (rpc::status::PROC_UNAVAIL, 0)
    } else {
        if let Ok(mapping) = GetPort::parse(&mut reader) {
            log::debug!(
                "GETPORT for program {:#x} version {} protocol {}",
                mapping.program,
                mapping.version,
                mapping.protocol
            );
        }
        match pool.allocate() {
            Some(port) => {
                log::info!("PORTMAP: allocated VXI-11 session port {port}");
                (rpc::status::SUCCESS, port)
            }
            None => {
                // the availability check above should make this unreachable
                log::error!("PORTMAP failed: no session handler available");
                (rpc::status::GARBAGE_ARGS, 0)
            }
        }
    };

    let mut writer = WireWriter::new();
    ReplyHeader { xid: call.xid, status }.emit(&mut writer);
    writer.put_u32(port as u32);
    Some(writer.into_vec())
}
