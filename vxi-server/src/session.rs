//! The per-client VXI-11 session handler.
//!
//! A session moves through three states: unbound (no port), listening (port
//! bound, waiting for a TCP connect) and connected (framed RPC calls being
//! dispatched). DESTROY_LINK, client EOF or the inactivity timeout tear the
//! session down and release its port for re-allocation by the bind
//! responder. All sockets are non-blocking; `poll()` does a bounded amount
//! of work per tick.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use vxi_protocol::framing::{FrameBuffer, encode_frame};
use vxi_protocol::rpc::{self, CallHeader, ReplyHeader};
use vxi_protocol::scpi::{self, Param, ScpiEffect};
use vxi_protocol::vxi::{
    CreateLink, CreateLinkReply, DestroyLinkReply, DeviceReadReply, DeviceWrite, DeviceWriteReply,
    device_error, reason,
};
use vxi_protocol::wire::{WireReader, WireWriter};

use crate::AwgDevice;
use crate::server::Config;

/// What the next DEVICE_READ has been asked to answer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ReadType {
    None,
    Identification,
    Parameters,
}

/// Outcome of dispatching one frame.
struct Dispatch {
    response: Option<Vec<u8>>,
    close: bool,
}

impl Dispatch {
    fn ignore() -> Dispatch {
        Dispatch { response: None, close: false }
    }

    fn respond(payload: Vec<u8>) -> Dispatch {
        Dispatch { response: Some(payload), close: false }
    }
}

pub(crate) struct VxiSession {
    listener: Option<TcpListener>,
    client: Option<TcpStream>,
    port: u16,
    frames: FrameBuffer,
    last_activity: Instant,
    read_type: ReadType,
    channel: u32,
    buffer_size: usize,
    inactivity_timeout: Duration,
    io_timeout: Duration,
    parameter_echo: bool,
}

impl VxiSession {
    pub(crate) fn new(config: &Config) -> VxiSession {
        VxiSession {
            listener: None,
            client: None,
            port: 0,
            frames: FrameBuffer::new(config.buffer_size),
            last_activity: Instant::now(),
            read_type: ReadType::None,
            channel: 1,
            buffer_size: config.buffer_size,
            inactivity_timeout: config.inactivity_timeout,
            io_timeout: config.io_timeout,
            parameter_echo: config.parameter_echo,
        }
    }

    /// The bound session port, or 0 while unbound.
    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Bind the listening socket and enter the listening state.
    pub(crate) fn begin(&mut self, ip: IpAddr, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port))?;
        listener.set_nonblocking(true)?;
        self.listener = Some(listener);
        self.client = None;
        self.frames.clear();
        self.port = port;
        self.read_type = ReadType::None;
        self.channel = 1;
        self.last_activity = Instant::now();
        log::info!("listening for VXI-11 commands on TCP port {port}");
        Ok(())
    }

    /// One scheduler tick: accept, read, dispatch, time out.
    pub(crate) fn poll<D: AwgDevice>(&mut self, device: &mut D) {
        if self.port == 0 {
            return;
        }

        let mut close = false;

        if self.client.is_some() {
            close = self.pump_client();
            while !close {
                let Some(frame) = self.frames.next_frame() else { break };
                self.last_activity = Instant::now();
                let dispatch = self.handle_frame(&frame, device);
                if let Some(payload) = dispatch.response {
                    if let Err(e) = self.send_response(&payload) {
                        log::error!("failed to send response on port {}: {e}", self.port);
                        close = true;
                    }
                }
                close = close || dispatch.close;
            }
            if self.last_activity.elapsed() > self.inactivity_timeout {
                log::info!("inactivity timeout on port {}", self.port);
                close = true;
            }
        } else if let Some(listener) = self.listener.as_ref() {
            match listener.accept() {
                Ok((stream, peer)) => match stream.set_nonblocking(true) {
                    Ok(()) => {
                        log::info!("VXI-11 connection from {peer} on port {}", self.port);
                        self.client = Some(stream);
                    }
                    Err(e) => log::error!("failed to configure client socket: {e}"),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => log::error!("accept failed on port {}: {e}", self.port),
            }
            // a bare listener never times out
            self.last_activity = Instant::now();
        }

        if close {
            self.teardown();
        }
    }

    /// Drain whatever the client socket has buffered. Returns true when the
    /// connection is gone.
    fn pump_client(&mut self) -> bool {
        let Some(client) = self.client.as_mut() else { return false };
        let mut chunk = [0u8; 256];
        loop {
            match client.read(&mut chunk) {
                Ok(0) => {
                    log::info!("VXI-11 client on port {} disconnected", self.port);
                    return true;
                }
                Ok(n) => {
                    self.frames.extend(&chunk[..n]);
                    self.last_activity = Instant::now();
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    log::error!("read failed on port {}: {e}", self.port);
                    return true;
                }
            }
        }
    }

    fn handle_frame<D: AwgDevice>(&mut self, frame: &[u8], device: &mut D) -> Dispatch {
        let mut reader = WireReader::new(frame);
        let call = match CallHeader::parse(&mut reader) {
            Ok(call) => call,
            Err(e) => {
                log::debug!("ignoring malformed packet on port {}: {e}", self.port);
                return Dispatch::ignore();
            }
        };

        if call.program != rpc::program::VXI11_CORE {
            log::error!(
                "invalid program (expected VXI-11 CORE {:#x}, received {:#x})",
                rpc::program::VXI11_CORE,
                call.program
            );
            return Dispatch::respond(status_reply(call.xid, rpc::status::PROG_UNAVAIL));
        }

        match call.procedure {
            rpc::procedure::CREATE_LINK => self.create_link(call.xid, &mut reader),
            rpc::procedure::DEVICE_READ => self.read(call.xid, device),
            rpc::procedure::DEVICE_WRITE => self.write(call.xid, &mut reader, device),
            rpc::procedure::DESTROY_LINK => {
                log::info!("DESTROY LINK on port {}", self.port);
                let mut writer = WireWriter::new();
                ReplyHeader { xid: call.xid, status: rpc::status::SUCCESS }.emit(&mut writer);
                DestroyLinkReply { error: device_error::NO_ERROR }.emit(&mut writer);
                Dispatch { response: Some(writer.into_vec()), close: true }
            }
            procedure => {
                log::error!("invalid VXI-11 procedure (received {procedure})");
                Dispatch::respond(status_reply(call.xid, rpc::status::PROC_UNAVAIL))
            }
        }
    }

    fn create_link(&mut self, xid: u32, reader: &mut WireReader) -> Dispatch {
        let request = match CreateLink::parse(reader) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("ignoring malformed CREATE_LINK: {e}");
                return Dispatch::ignore();
            }
        };
        log::info!(
            "CREATE LINK request from {:?} on port {}",
            request.device,
            self.port
        );

        let mut writer = WireWriter::new();
        ReplyHeader { xid, status: rpc::status::SUCCESS }.emit(&mut writer);
        CreateLinkReply {
            error: device_error::NO_ERROR,
            link_id: 0,
            abort_port: 0,
            max_receive_size: self.buffer_size as u32,
        }
        .emit(&mut writer);
        Dispatch::respond(writer.into_vec())
    }

    fn read<D: AwgDevice>(&mut self, xid: u32, device: &mut D) -> Dispatch {
        let data = match (self.parameter_echo, self.read_type) {
            (true, ReadType::Parameters) => self
                .parameter_reply(device)
                .unwrap_or_else(|| device.id().to_owned()),
            _ => device.id().to_owned(),
        };
        self.read_type = ReadType::None;
        log::info!("READ DATA on port {}; data sent = {data}", self.port);

        let mut writer = WireWriter::new();
        ReplyHeader { xid, status: rpc::status::SUCCESS }.emit(&mut writer);
        DeviceReadReply {
            error: device_error::NO_ERROR,
            reason: reason::END,
            data: data.as_bytes(),
        }
        .emit(&mut writer);
        Dispatch::respond(writer.into_vec())
    }

    /// Answer a pending BSWV? with live readings, if every read succeeds.
    fn parameter_reply<D: AwgDevice>(&self, device: &mut D) -> Option<String> {
        let channel = self.channel;
        let frequency = device.get(channel, Param::Frequency).ok()?;
        let amplitude = device.get(channel, Param::Amplitude).ok()?;
        let offset = device.get(channel, Param::Offset).ok()?;
        let phase = device.get(channel, Param::Phase).ok()?;
        Some(format!(
            "C{channel}:BSWV WVTP,SINE,FRQ,{frequency}HZ,AMP,{amplitude}V,OFST,{offset}V,PHSE,{phase}"
        ))
    }

    fn write<'a, D: AwgDevice>(
        &mut self,
        xid: u32,
        reader: &mut WireReader<'a>,
        device: &mut D,
    ) -> Dispatch {
        let request = match DeviceWrite::parse(reader) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("ignoring malformed DEVICE_WRITE: {e}");
                return Dispatch::ignore();
            }
        };

        let mut data = request.data;
        while data.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
            data = &data[..data.len() - 1];
        }
        let text = String::from_utf8_lossy(data);
        log::info!("WRITE DATA on port {} = {text}", self.port);

        for effect in scpi::parse_line(&text) {
            match effect {
                ScpiEffect::Set { channel, param, value } => {
                    self.channel = channel;
                    if let Err(e) = device.set(channel, param, value) {
                        log::error!("failed to set {param}: {e}");
                    }
                }
                ScpiEffect::QueryParameters { channel } => {
                    self.channel = channel;
                    self.read_type = ReadType::Parameters;
                }
                ScpiEffect::QueryIdentification => {
                    self.read_type = ReadType::Identification;
                }
            }
        }

        let mut writer = WireWriter::new();
        ReplyHeader { xid, status: rpc::status::SUCCESS }.emit(&mut writer);
        DeviceWriteReply {
            error: device_error::NO_ERROR,
            size: data.len() as u32,
        }
        .emit(&mut writer);
        Dispatch::respond(writer.into_vec())
    }

    fn send_response(&mut self, payload: &[u8]) -> io::Result<()> {
        let Some(client) = self.client.as_mut() else { return Ok(()) };
        let frame = encode_frame(payload);
        write_all_deadline(client, &frame, self.io_timeout)
    }

    fn teardown(&mut self) {
        log::info!("closing VXI-11 session on port {}", self.port);
        self.client = None;
        self.listener = None;
        self.frames.clear();
        self.port = 0;
    }
}

/// A reply carrying only an RPC status, for program/procedure rejections.
fn status_reply(xid: u32, status: u32) -> Vec<u8> {
    let mut writer = WireWriter::new();
    ReplyHeader { xid, status }.emit(&mut writer);
    writer.into_vec()
}

/// Write the whole buffer to a non-blocking socket, giving up at the
/// deadline so a saturated peer cannot wedge the process.
fn write_all_deadline(stream: &mut TcpStream, mut data: &[u8], timeout: Duration) -> io::Result<()> {
    let deadline = Instant::now() + timeout;
    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "connection closed mid-response",
                ));
            }
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(io::Error::new(
                        ErrorKind::TimedOut,
                        "timed out writing response",
                    ));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
