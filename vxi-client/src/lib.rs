//! # VXI-11 Client
//!
//! A small synchronous client for VXI-11 instruments: ask the RPC bind
//! (portmap) service where the core channel lives, connect there, and
//! exchange SCPI messages through CREATE_LINK / DEVICE_WRITE / DEVICE_READ /
//! DESTROY_LINK.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use vxi_client::{get_port_udp, CoreClient};
//!
//! let timeout = Duration::from_secs(2);
//! let port = get_port_udp(("192.168.0.155", 111), timeout)?;
//! let mut client = CoreClient::connect(("192.168.0.155", port), timeout)?;
//! client.create_link("inst0")?;
//! client.write(b"IDN-SGLT-PRI?")?;
//! let (_reason, id) = client.read()?;
//! println!("{}", String::from_utf8_lossy(&id));
//! client.destroy_link()?;
//! ```

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use vxi_protocol::error::ProtocolError;
use vxi_protocol::framing::{LAST_FRAGMENT, encode_frame};
use vxi_protocol::rpc::{self, CallHeader, GetPort, ReplyHeader};
use vxi_protocol::vxi::{
    CreateLink, CreateLinkReply, DestroyLink, DestroyLinkReply, DeviceRead, DeviceReadReply,
    DeviceWrite, DeviceWriteReply,
};
use vxi_protocol::wire::{WireReader, WireWriter, from_wire};

const REPLY_BUFFER_SIZE: usize = 256;
const CLIENT_ID: u32 = 3333;
const DEFAULT_LOCK_TIMEOUT: u32 = 10_000;
const OPERATION_FLAG_END: u32 = 8;

fn getport_call(xid: u32) -> Vec<u8> {
    let mut writer = WireWriter::new();
    CallHeader {
        xid,
        program: rpc::program::PORTMAP,
        version: 2,
        procedure: rpc::procedure::GET_PORT,
    }
    .emit(&mut writer);
    GetPort {
        program: rpc::program::VXI11_CORE,
        version: 1,
        protocol: rpc::protocol::TCP,
        port: 0,
    }
    .emit(&mut writer);
    writer.into_vec()
}

fn parse_getport_reply(payload: &[u8], xid: u32) -> Result<u16, ProtocolError> {
    let mut reader = WireReader::new(payload);
    let reply = ReplyHeader::parse(&mut reader)?;
    if reply.xid != xid {
        return Err(ProtocolError::BadReply("transaction id mismatch".into()));
    }
    if reply.status != rpc::status::SUCCESS {
        return Err(ProtocolError::Status(reply.status));
    }
    Ok(reader.read_u32()? as u16)
}

/// Ask the bind service over UDP for the instrument's core-channel port.
pub fn get_port_udp(addr: impl ToSocketAddrs, timeout: Duration) -> Result<u16, ProtocolError> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(addr)?;
    socket.set_read_timeout(Some(timeout))?;

    let xid = 1;
    socket.send(&getport_call(xid))?;

    let mut buffer = [0u8; REPLY_BUFFER_SIZE];
    let len = socket.recv(&mut buffer)?;
    parse_getport_reply(&buffer[..len], xid)
}

/// Ask the bind service over TCP for the instrument's core-channel port.
pub fn get_port_tcp(addr: impl ToSocketAddrs, timeout: Duration) -> Result<u16, ProtocolError> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let xid = 1;
    stream.write_all(&encode_frame(&getport_call(xid)))?;
    let payload = read_frame(&mut stream)?;
    parse_getport_reply(&payload, xid)
}

/// Read one record-marked reply off a TCP stream.
fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, ProtocolError> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix)?;
    let len = ((from_wire(prefix) & !LAST_FRAGMENT) as usize).min(REPLY_BUFFER_SIZE);
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

/// A connection to the instrument's core channel.
pub struct CoreClient {
    stream: TcpStream,
    xid: u32,
    link_id: u32,
}

impl CoreClient {
    pub fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<CoreClient, ProtocolError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(CoreClient { stream, xid: 0, link_id: 0 })
    }

    fn call_header(&mut self, procedure: u32) -> (u32, WireWriter) {
        self.xid += 1;
        let mut writer = WireWriter::new();
        CallHeader {
            xid: self.xid,
            program: rpc::program::VXI11_CORE,
            version: 1,
            procedure,
        }
        .emit(&mut writer);
        (self.xid, writer)
    }

    /// Send one framed call and return the reply body positioned after the
    /// reply header.
    fn transact(&mut self, xid: u32, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.stream.write_all(&encode_frame(request))?;
        let payload = read_frame(&mut self.stream)?;
        let mut reader = WireReader::new(&payload);
        let reply = ReplyHeader::parse(&mut reader)?;
        if reply.xid != xid {
            return Err(ProtocolError::BadReply("transaction id mismatch".into()));
        }
        if reply.status != rpc::status::SUCCESS {
            return Err(ProtocolError::Status(reply.status));
        }
        let body_offset = payload.len() - reader.remaining();
        Ok(payload[body_offset..].to_vec())
    }

    /// Open the link the remaining calls operate on.
    pub fn create_link(&mut self, device: &str) -> Result<CreateLinkReply, ProtocolError> {
        let (xid, mut writer) = self.call_header(rpc::procedure::CREATE_LINK);
        CreateLink {
            client_id: CLIENT_ID,
            lock_device: false,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            device: device.to_owned(),
        }
        .emit(&mut writer);

        let body = self.transact(xid, writer.as_slice())?;
        let reply = CreateLinkReply::parse(&mut WireReader::new(&body))?;
        if reply.error != 0 {
            return Err(ProtocolError::Device(reply.error));
        }
        self.link_id = reply.link_id;
        Ok(reply)
    }

    /// Send one SCPI line; returns the byte count the instrument accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<u32, ProtocolError> {
        let (xid, mut writer) = self.call_header(rpc::procedure::DEVICE_WRITE);
        DeviceWrite {
            link_id: self.link_id,
            io_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            flags: OPERATION_FLAG_END,
            data,
        }
        .emit(&mut writer);

        let body = self.transact(xid, writer.as_slice())?;
        let reply = DeviceWriteReply::parse(&mut WireReader::new(&body))?;
        if reply.error != 0 {
            return Err(ProtocolError::Device(reply.error));
        }
        Ok(reply.size)
    }

    /// Read the instrument's answer; returns the termination reason and the
    /// data bytes.
    pub fn read(&mut self) -> Result<(u32, Vec<u8>), ProtocolError> {
        let (xid, mut writer) = self.call_header(rpc::procedure::DEVICE_READ);
        DeviceRead {
            link_id: self.link_id,
            request_size: u32::MAX,
            io_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            flags: 0,
            term_char: 0,
        }
        .emit(&mut writer);

        let body = self.transact(xid, writer.as_slice())?;
        let mut reader = WireReader::new(&body);
        let reply = DeviceReadReply::parse(&mut reader)?;
        if reply.error != 0 {
            return Err(ProtocolError::Device(reply.error));
        }
        Ok((reply.reason, reply.data.to_vec()))
    }

    /// Release the link.
    pub fn destroy_link(&mut self) -> Result<(), ProtocolError> {
        let (xid, mut writer) = self.call_header(rpc::procedure::DESTROY_LINK);
        DestroyLink { link_id: self.link_id }.emit(&mut writer);

        let body = self.transact(xid, writer.as_slice())?;
        let reply = DestroyLinkReply::parse(&mut WireReader::new(&body))?;
        if reply.error != 0 {
            return Err(ProtocolError::Device(reply.error));
        }
        Ok(())
    }
}
