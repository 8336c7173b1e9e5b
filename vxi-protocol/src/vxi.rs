//! VXI-11 core-channel packet bodies.
//!
//! Each structure models the body of one core-channel call or reply,
//! positioned immediately after the RPC [`CallHeader`](crate::rpc::CallHeader)
//! or [`ReplyHeader`](crate::rpc::ReplyHeader). Only the four procedures an
//! oscilloscope uses against an AWG are covered: CREATE_LINK, DEVICE_WRITE,
//! DEVICE_READ and DESTROY_LINK.

use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

/// Reason bits of a read reply.
pub mod reason {
    /// read reached the maximum count requested
    pub const REQCNT: u32 = 1;
    /// read reached the terminating character supplied in the request
    pub const CHR: u32 = 2;
    /// read reached end of data
    pub const END: u32 = 4;
}

/// Device error codes carried in reply bodies.
pub mod device_error {
    pub const NO_ERROR: u32 = 0;
    pub const SYNTAX_ERROR: u32 = 1;
    pub const NOT_ACCESSIBLE: u32 = 3;
    pub const INVALID_LINK: u32 = 4;
    pub const PARAMETER_ERROR: u32 = 5;
    pub const OUT_OF_RESOURCES: u32 = 9;
    pub const DEVICE_LOCKED: u32 = 11;
    pub const IO_TIMEOUT: u32 = 15;
    pub const IO_ERROR: u32 = 17;
    pub const ABORT: u32 = 23;
}

/// CREATE_LINK call body: the name of the instrument the client wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLink {
    pub client_id: u32,
    pub lock_device: bool,
    pub lock_timeout: u32,
    pub device: String,
}

impl CreateLink {
    pub fn parse(reader: &mut WireReader) -> Result<CreateLink, ProtocolError> {
        let client_id = reader.read_u32()?;
        let lock_device = reader.read_u32()? != 0;
        let lock_timeout = reader.read_u32()?;
        let device = String::from_utf8_lossy(reader.read_opaque()?).into_owned();
        Ok(CreateLink {
            client_id,
            lock_device,
            lock_timeout,
            device,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.client_id);
        writer.put_u32(self.lock_device as u32);
        writer.put_u32(self.lock_timeout);
        writer.put_opaque(self.device.as_bytes());
    }
}

/// CREATE_LINK reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLinkReply {
    pub error: u32,
    pub link_id: u32,
    pub abort_port: u32,
    pub max_receive_size: u32,
}

impl CreateLinkReply {
    pub fn parse(reader: &mut WireReader) -> Result<CreateLinkReply, ProtocolError> {
        Ok(CreateLinkReply {
            error: reader.read_u32()?,
            link_id: reader.read_u32()?,
            abort_port: reader.read_u32()?,
            max_receive_size: reader.read_u32()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.error);
        writer.put_u32(self.link_id);
        writer.put_u32(self.abort_port);
        writer.put_u32(self.max_receive_size);
    }
}

/// DEVICE_WRITE call body: one line of SCPI text for the instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceWrite<'a> {
    pub link_id: u32,
    pub io_timeout: u32,
    pub lock_timeout: u32,
    pub flags: u32,
    pub data: &'a [u8],
}

impl<'a> DeviceWrite<'a> {
    pub fn parse(reader: &mut WireReader<'a>) -> Result<DeviceWrite<'a>, ProtocolError> {
        Ok(DeviceWrite {
            link_id: reader.read_u32()?,
            io_timeout: reader.read_u32()?,
            lock_timeout: reader.read_u32()?,
            flags: reader.read_u32()?,
            data: reader.read_opaque()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.link_id);
        writer.put_u32(self.io_timeout);
        writer.put_u32(self.lock_timeout);
        writer.put_u32(self.flags);
        writer.put_opaque(self.data);
    }
}

/// DEVICE_WRITE reply body: how many bytes the instrument accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceWriteReply {
    pub error: u32,
    pub size: u32,
}

impl DeviceWriteReply {
    pub fn parse(reader: &mut WireReader) -> Result<DeviceWriteReply, ProtocolError> {
        Ok(DeviceWriteReply {
            error: reader.read_u32()?,
            size: reader.read_u32()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.error);
        writer.put_u32(self.size);
    }
}

/// DEVICE_READ call body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRead {
    pub link_id: u32,
    pub request_size: u32,
    pub io_timeout: u32,
    pub lock_timeout: u32,
    pub flags: u32,
    pub term_char: u8,
}

impl DeviceRead {
    pub fn parse(reader: &mut WireReader) -> Result<DeviceRead, ProtocolError> {
        Ok(DeviceRead {
            link_id: reader.read_u32()?,
            request_size: reader.read_u32()?,
            io_timeout: reader.read_u32()?,
            lock_timeout: reader.read_u32()?,
            flags: reader.read_u32()?,
            term_char: reader.read_u32()? as u8,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.link_id);
        writer.put_u32(self.request_size);
        writer.put_u32(self.io_timeout);
        writer.put_u32(self.lock_timeout);
        writer.put_u32(self.flags);
        writer.put_u32(self.term_char as u32);
    }
}

/// DEVICE_READ reply body: instrument data plus the reason the read ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReadReply<'a> {
    pub error: u32,
    pub reason: u32,
    pub data: &'a [u8],
}

impl<'a> DeviceReadReply<'a> {
    pub fn parse(reader: &mut WireReader<'a>) -> Result<DeviceReadReply<'a>, ProtocolError> {
        Ok(DeviceReadReply {
            error: reader.read_u32()?,
            reason: reader.read_u32()?,
            data: reader.read_opaque()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.error);
        writer.put_u32(self.reason);
        writer.put_opaque(self.data);
    }
}

/// DESTROY_LINK call body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyLink {
    pub link_id: u32,
}

impl DestroyLink {
    pub fn parse(reader: &mut WireReader) -> Result<DestroyLink, ProtocolError> {
        Ok(DestroyLink {
            link_id: reader.read_u32()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.link_id);
    }
}

/// DESTROY_LINK reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyLinkReply {
    pub error: u32,
}

impl DestroyLinkReply {
    pub fn parse(reader: &mut WireReader) -> Result<DestroyLinkReply, ProtocolError> {
        Ok(DestroyLinkReply {
            error: reader.read_u32()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.error);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_link_round_trip() {
        let request = CreateLink {
            client_id: 3333,
            lock_device: false,
            lock_timeout: 10_000,
            device: "inst0".to_owned(),
        };
        let mut writer = WireWriter::new();
        request.emit(&mut writer);
        let bytes = writer.into_vec();
        let parsed = CreateLink::parse(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn device_write_carries_payload() {
        let request = DeviceWrite {
            link_id: 0,
            io_timeout: 10_000,
            lock_timeout: 10_000,
            flags: 8,
            data: b"C1:BSWV FRQ,1000\n",
        };
        let mut writer = WireWriter::new();
        request.emit(&mut writer);
        let bytes = writer.into_vec();
        let parsed = DeviceWrite::parse(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(parsed.data, b"C1:BSWV FRQ,1000\n");
        assert_eq!(parsed.flags, 8);
    }

    #[test]
    fn read_reply_round_trip() {
        let reply = DeviceReadReply {
            error: device_error::NO_ERROR,
            reason: reason::END,
            data: b"IDN-SGLT-PRI SDG1062X",
        };
        let mut writer = WireWriter::new();
        reply.emit(&mut writer);
        let bytes = writer.into_vec();
        let parsed = DeviceReadReply::parse(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(parsed, reply);
    }
}
