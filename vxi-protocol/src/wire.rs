//! Big-endian field access for RPC packet buffers.
//!
//! ONC RPC transmits everything as 32-bit words in network byte order.
//! [`WireReader`] and [`WireWriter`] provide cursor-style access over plain
//! byte buffers, including the XDR "opaque" encoding (length word, data,
//! zero padding to the next 4-byte boundary) used for strings and payloads.

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;

/// Encode a value as a 4-byte network-order field.
pub fn to_wire(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Decode a 4-byte network-order field.
pub fn from_wire(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Reads 32-bit words and opaque fields from a received packet.
///
/// Reads past the end of the buffer return [`ProtocolError::Truncated`]
/// rather than panicking; a truncated packet is treated by callers as
/// absent input.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> WireReader<'a> {
        WireReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::Truncated {
                needed: 4,
                available: self.remaining(),
            });
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(from_wire(word))
    }

    /// Read an XDR opaque field: a length word followed by that many bytes,
    /// padded to a 4-byte boundary.
    pub fn read_opaque(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_u32()? as usize;
        if self.remaining() < len {
            return Err(ProtocolError::Truncated {
                needed: len,
                available: self.remaining(),
            });
        }
        let data = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        let pad = len.next_multiple_of(4) - len;
        self.pos += pad.min(self.remaining());
        Ok(data)
    }
}

/// Builds an outbound packet out of 32-bit words and opaque fields.
#[derive(Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> WireWriter {
        WireWriter::default()
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Write an XDR opaque field: length word, data, zero padding.
    pub fn put_opaque(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        let pad = data.len().next_multiple_of(4) - data.len();
        self.buf.put_bytes(0, pad);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn u32_byte_order() {
        assert_eq!(to_wire(0x0001_86A0), [0x00, 0x01, 0x86, 0xA0]);
        assert_eq!(from_wire([0x00, 0x01, 0x86, 0xA0]), 0x0001_86A0);
        assert_eq!(from_wire(to_wire(0xDEAD_BEEF)), 0xDEAD_BEEF);
    }

    #[test]
    fn read_past_end_is_truncated() {
        let mut reader = WireReader::new(&[0x00, 0x01]);
        match reader.read_u32() {
            Err(ProtocolError::Truncated { needed: 4, available: 2 }) => {}
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn opaque_round_trip_with_padding() {
        let mut writer = WireWriter::new();
        writer.put_opaque(b"inst0");
        // 4-byte length + 5 data bytes + 3 pad bytes
        assert_eq!(
            writer.as_slice(),
            b"\x00\x00\x00\x05inst0\x00\x00\x00"
        );

        let bytes = writer.into_vec();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_opaque().unwrap(), b"inst0");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn opaque_with_short_payload_is_truncated() {
        let mut writer = WireWriter::new();
        writer.put_u32(16);
        writer.put_u32(0);
        let bytes = writer.into_vec();
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_opaque(),
            Err(ProtocolError::Truncated { needed: 16, available: 4 })
        ));
    }
}
