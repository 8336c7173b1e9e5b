//! TCP record marking for RPC messages.
//!
//! Every RPC message sent over TCP is preceded by a 4-byte prefix whose top
//! bit marks the last fragment of a message and whose low 31 bits carry the
//! payload length. Outbound payloads are zero-padded to a 4-byte boundary
//! and the length field is always recomputed, never copied from a request.
//! UDP datagrams carry the bare payload and need none of this.

use bytes::{Buf, Bytes, BytesMut};

use crate::wire::{from_wire, to_wire};

/// Fragment bit of the record-mark word. All messages in this protocol
/// subset are single-fragment, so the bit is always set on emit and masked
/// off on decode.
pub const LAST_FRAGMENT: u32 = 0x8000_0000;

/// Encode one response payload as a single TCP record.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let padded = payload.len().next_multiple_of(4);
    let mut frame = Vec::with_capacity(4 + padded);
    frame.extend_from_slice(&to_wire(LAST_FRAGMENT | padded as u32));
    frame.extend_from_slice(payload);
    frame.resize(4 + padded, 0);
    frame
}

/// Accumulates stream bytes and yields complete record payloads.
///
/// A record whose claimed length exceeds the configured capacity is clamped
/// to the capacity; the surplus bytes are left in the stream, which at worst
/// desynchronizes an already-corrupt connection. Incomplete records yield
/// nothing until more bytes arrive.
pub struct FrameBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> FrameBuffer {
        FrameBuffer {
            buf: BytesMut::new(),
            capacity,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Pop the next complete record payload, if one has accumulated.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if self.buf.len() < 4 {
            return None;
        }
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.buf[..4]);
        let claimed = (from_wire(prefix) & !LAST_FRAGMENT) as usize;
        let wanted = claimed.min(self.capacity);
        if self.buf.len() < 4 + wanted {
            return None;
        }
        self.buf.advance(4);
        Some(self.buf.split_to(wanted).freeze())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_length_is_padded_and_flagged() {
        for len in 0..9usize {
            let payload = vec![0xABu8; len];
            let frame = encode_frame(&payload);
            let mut prefix = [0u8; 4];
            prefix.copy_from_slice(&frame[..4]);
            let word = from_wire(prefix);
            assert_ne!(word & LAST_FRAGMENT, 0, "fragment bit missing for len {len}");
            assert_eq!(
                (word & !LAST_FRAGMENT) as usize,
                len.next_multiple_of(4),
                "bad length field for len {len}"
            );
            assert_eq!(frame.len() % 4, 0);
            // padding bytes are zero
            assert!(frame[4 + len..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn decoder_waits_for_complete_record() {
        let frame = encode_frame(b"abcdef");
        let mut frames = FrameBuffer::new(64);
        frames.extend(&frame[..5]);
        assert!(frames.next_frame().is_none());
        frames.extend(&frame[5..]);
        let payload = frames.next_frame().unwrap();
        // payload comes back padded to the length on the wire
        assert_eq!(&payload[..6], b"abcdef");
        assert_eq!(payload.len(), 8);
    }

    #[test]
    fn decoder_yields_back_to_back_records() {
        let mut frames = FrameBuffer::new(64);
        frames.extend(&encode_frame(b"one!"));
        frames.extend(&encode_frame(b"two!"));
        assert_eq!(frames.next_frame().unwrap().as_ref(), b"one!");
        assert_eq!(frames.next_frame().unwrap().as_ref(), b"two!");
        assert!(frames.next_frame().is_none());
    }

    #[test]
    fn oversize_claim_is_clamped() {
        let mut frames = FrameBuffer::new(8);
        let mut data = to_wire(LAST_FRAGMENT | 1024).to_vec();
        data.extend_from_slice(&[0x55u8; 16]);
        frames.extend(&data);
        let payload = frames.next_frame().unwrap();
        assert_eq!(payload.len(), 8);
    }
}
