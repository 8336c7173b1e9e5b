//! The ONC RPC message subset used by the port mapper and the VXI-11 core
//! channel.
//!
//! Only what an oscilloscope actually sends is modeled: CALL messages with
//! AUTH_NONE credentials, accepted REPLY messages, and the portmap GETPORT
//! body. Helpful background on the basic RPC packet layout is available in
//! RFC 1057; the VXI-specific packets follow the VXIbus TCP/IP Instrument
//! Protocol specification.

use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

/// RPC protocol version spoken by all peers of interest.
pub const RPC_VERSION: u32 = 2;

/// Well-known port of the RPC bind (portmap) service.
pub const BIND_PORT: u16 = 111;

pub mod msg_type {
    pub const CALL: u32 = 0;
    pub const REPLY: u32 = 1;
}

pub mod reply_state {
    pub const MSG_ACCEPTED: u32 = 0;
    pub const MSG_DENIED: u32 = 1;
}

/// Status codes for accepted messages.
pub mod status {
    pub const SUCCESS: u32 = 0;
    pub const PROG_UNAVAIL: u32 = 1;
    pub const PROG_MISMATCH: u32 = 2;
    pub const PROC_UNAVAIL: u32 = 3;
    pub const GARBAGE_ARGS: u32 = 4;
}

/// Program codes.
pub mod program {
    pub const PORTMAP: u32 = 0x0001_86A0;
    pub const VXI11_CORE: u32 = 0x0006_07AF;
}

/// Procedure codes, per program.
pub mod procedure {
    /// portmap: map (program, version, protocol) to a port number
    pub const GET_PORT: u32 = 3;
    pub const CREATE_LINK: u32 = 10;
    pub const DEVICE_WRITE: u32 = 11;
    pub const DEVICE_READ: u32 = 12;
    pub const DESTROY_LINK: u32 = 23;
}

/// Transport protocol numbers used in GETPORT requests.
pub mod protocol {
    pub const TCP: u32 = 6;
    pub const UDP: u32 = 17;
}

/// The common header of every RPC call.
///
/// The rpc version, credential and verifier words carry no information in
/// this protocol subset (everything uses AUTH_NONE with empty bodies); they
/// are consumed and discarded on parse and zero-filled on emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    pub xid: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
}

impl CallHeader {
    pub fn parse(reader: &mut WireReader) -> Result<CallHeader, ProtocolError> {
        let xid = reader.read_u32()?;
        let msg_type = reader.read_u32()?;
        if msg_type != msg_type::CALL {
            return Err(ProtocolError::NotACall(msg_type));
        }
        let _rpc_version = reader.read_u32()?;
        let program = reader.read_u32()?;
        let version = reader.read_u32()?;
        let procedure = reader.read_u32()?;
        for _ in 0..4 {
            let _auth = reader.read_u32()?;
        }
        Ok(CallHeader {
            xid,
            program,
            version,
            procedure,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.xid);
        writer.put_u32(msg_type::CALL);
        writer.put_u32(RPC_VERSION);
        writer.put_u32(self.program);
        writer.put_u32(self.version);
        writer.put_u32(self.procedure);
        for _ in 0..4 {
            writer.put_u32(0);
        }
    }
}

/// The common header of every accepted RPC reply.
///
/// The transaction id is always echoed from the request unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeader {
    pub xid: u32,
    pub status: u32,
}

impl ReplyHeader {
    pub fn parse(reader: &mut WireReader) -> Result<ReplyHeader, ProtocolError> {
        let xid = reader.read_u32()?;
        let msg_type = reader.read_u32()?;
        if msg_type != msg_type::REPLY {
            return Err(ProtocolError::BadReply(format!(
                "expected a REPLY message, got msg_type {msg_type}"
            )));
        }
        let reply_state = reader.read_u32()?;
        if reply_state != reply_state::MSG_ACCEPTED {
            return Err(ProtocolError::BadReply(format!(
                "message denied (reply_state {reply_state})"
            )));
        }
        let _verifier = (reader.read_u32()?, reader.read_u32()?);
        let status = reader.read_u32()?;
        Ok(ReplyHeader { xid, status })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.xid);
        writer.put_u32(msg_type::REPLY);
        writer.put_u32(reply_state::MSG_ACCEPTED);
        writer.put_u32(0);
        writer.put_u32(0);
        writer.put_u32(self.status);
    }
}

/// Body of a portmap GETPORT call, following the call header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPort {
    pub program: u32,
    pub version: u32,
    pub protocol: u32,
    pub port: u32,
}

impl GetPort {
    pub fn parse(reader: &mut WireReader) -> Result<GetPort, ProtocolError> {
        Ok(GetPort {
            program: reader.read_u32()?,
            version: reader.read_u32()?,
            protocol: reader.read_u32()?,
            port: reader.read_u32()?,
        })
    }

    pub fn emit(&self, writer: &mut WireWriter) {
        writer.put_u32(self.program);
        writer.put_u32(self.version);
        writer.put_u32(self.protocol);
        writer.put_u32(self.port);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip_call(header: &CallHeader) -> CallHeader {
        let mut writer = WireWriter::new();
        header.emit(&mut writer);
        let bytes = writer.into_vec();
        assert_eq!(bytes.len(), 40);
        CallHeader::parse(&mut WireReader::new(&bytes)).unwrap()
    }

    #[test]
    fn call_header_round_trip() {
        let header = CallHeader {
            xid: 0x1234_5678,
            program: program::PORTMAP,
            version: 2,
            procedure: procedure::GET_PORT,
        };
        assert_eq!(round_trip_call(&header), header);
    }

    #[test]
    fn call_header_layout() {
        let mut writer = WireWriter::new();
        CallHeader {
            xid: 1,
            program: program::VXI11_CORE,
            version: 1,
            procedure: procedure::CREATE_LINK,
        }
        .emit(&mut writer);
        let bytes = writer.into_vec();
        // program field sits at word 3, procedure at word 5
        assert_eq!(&bytes[12..16], &[0x00, 0x06, 0x07, 0xAF]);
        assert_eq!(&bytes[20..24], &[0x00, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn reply_rejects_non_reply() {
        let mut writer = WireWriter::new();
        CallHeader {
            xid: 7,
            program: program::PORTMAP,
            version: 2,
            procedure: procedure::GET_PORT,
        }
        .emit(&mut writer);
        let bytes = writer.into_vec();
        assert!(matches!(
            ReplyHeader::parse(&mut WireReader::new(&bytes)),
            Err(ProtocolError::BadReply(_))
        ));
    }

    #[test]
    fn reply_echoes_xid() {
        let mut writer = WireWriter::new();
        ReplyHeader { xid: 99, status: status::SUCCESS }.emit(&mut writer);
        let bytes = writer.into_vec();
        assert_eq!(bytes.len(), 24);
        let parsed = ReplyHeader::parse(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(parsed.xid, 99);
        assert_eq!(parsed.status, status::SUCCESS);
    }
}
