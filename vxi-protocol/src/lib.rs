//! # VXI-11 Protocol Library
//!
//! This crate implements the wire formats a Siglent-style arbitrary waveform
//! generator speaks on the network: the ONC RPC subset used by the port
//! mapper (GETPORT) and the VXI-11 core channel, the TCP record framing that
//! carries them, and the SCPI command dialect found inside DEVICE_WRITE
//! payloads.
//!
//! ## Overview
//!
//! An oscilloscope locates its AWG by asking the RPC bind service on port
//! 111 for the VXI-11 core port, connects there, and then drives the
//! instrument through four procedures: CREATE_LINK, DEVICE_WRITE,
//! DEVICE_READ and DESTROY_LINK. This library provides:
//!
//! - Big-endian packet field access and XDR opaque handling ([`wire`])
//! - RPC call/reply headers and the portmap GETPORT bodies ([`rpc`])
//! - VXI-11 core-channel packet bodies ([`vxi`])
//! - TCP record marking: fragment bit + length prefix, pad-to-4 ([`framing`])
//! - The SCPI command-line parser and parameter vocabulary ([`scpi`])
//!
//! ## Message Format
//!
//! All RPC fields are 32-bit words in network byte order. Over TCP, each
//! message is preceded by a 4-byte record mark (high bit = last fragment,
//! low 31 bits = payload length) and padded to a 4-byte boundary; over UDP
//! the payload travels bare.
//!
//! ## Basic Usage
//!
//! ### Building a framed reply
//!
//! ```
//! use vxi_protocol::framing::encode_frame;
//! use vxi_protocol::rpc::{status, ReplyHeader};
//! use vxi_protocol::wire::WireWriter;
//!
//! let mut writer = WireWriter::new();
//! ReplyHeader { xid: 0x2A, status: status::SUCCESS }.emit(&mut writer);
//! writer.put_u32(9010); // assigned VXI-11 port
//! let frame = encode_frame(writer.as_slice());
//! assert_eq!(frame.len() % 4, 0);
//! ```
//!
//! ### Parsing SCPI text
//!
//! ```
//! use vxi_protocol::scpi::{parse_line, Param, ScpiEffect};
//!
//! let effects = parse_line("C1:BSWV FRQ,1000.5");
//! assert_eq!(
//!     effects,
//!     vec![ScpiEffect::Set { channel: 1, param: Param::Frequency, value: 1000.5 }]
//! );
//! ```
//!
//! ## Error Handling
//!
//! Parsing failures surface as [`error::ProtocolError`]; servers treat a
//! truncated or malformed packet as absent input rather than a fatal
//! condition. The SCPI parser never fails: unrecognized commands and
//! keywords are skipped by design.

pub mod error;
pub mod framing;
pub mod rpc;
pub mod scpi;
pub mod vxi;
pub mod wire;
