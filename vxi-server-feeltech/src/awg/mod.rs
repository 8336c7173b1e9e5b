//! FeelTech FY-series backend.
//!
//! The FY-family AWGs all use a similar, but not entirely identical, ASCII
//! command structure over their USB/serial port: a three-letter token
//! (operation, channel, parameter) followed by a value and a newline. The
//! variations between models are captured in a per-model table of value
//! translations ([`models`]); the engine itself ([`engine`]) is shared.

pub mod engine;
pub mod models;
pub mod serial;
pub mod waves;
