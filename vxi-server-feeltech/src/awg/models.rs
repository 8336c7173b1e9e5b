//! Per-model value translation tables.
//!
//! One [`ParamEntry`] per SCPI parameter describes how a model wants the
//! value on the wire (kind, power-of-ten scaling, decimal precision,
//! zero-fill width) and how to interpret what it reports back. Model
//! identity is a value selecting a table, not a subtype; supporting another
//! FY-family model means adding one table constant and one enum variant.

use clap::ValueEnum;
use vxi_protocol::scpi::Param;

/// How a value is rendered on (or parsed off) the serial line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
}

/// Translation of one parameter for one model.
#[derive(Copy, Clone, Debug)]
pub struct ParamEntry {
    /// Render the outbound value as this kind.
    pub set_kind: ValueKind,
    /// Multiply the value by 10^exponent before sending.
    pub set_exponent: i32,
    /// Decimal places the value is rounded and rendered to.
    pub set_precision: u32,
    /// Zero-fill to this width when non-zero.
    pub set_width: u32,
    /// Kind of the value the device reports back.
    pub get_kind: ValueKind,
    /// Multiply the reported value by 10^exponent.
    pub get_exponent: i32,
}

/// One entry per [`Param`], in parameter order.
pub type ParamTable = [ParamEntry; Param::COUNT];

/// FY6900 (recent firmware): frequency and amplitude are written as floats
/// in natural units, but amplitude, offset and phase are reported back as
/// scaled integers.
pub const FY6900: ParamTable = [
    // OFF
    ParamEntry {
        set_kind: ValueKind::Bool,
        set_exponent: 0,
        set_precision: 0,
        set_width: 0,
        get_kind: ValueKind::Bool,
        get_exponent: 0,
    },
    // ON
    ParamEntry {
        set_kind: ValueKind::Bool,
        set_exponent: 0,
        set_precision: 0,
        set_width: 0,
        get_kind: ValueKind::Bool,
        get_exponent: 0,
    },
    // WVTP
    ParamEntry {
        set_kind: ValueKind::Int,
        set_exponent: 0,
        set_precision: 0,
        set_width: 0,
        get_kind: ValueKind::Int,
        get_exponent: 0,
    },
    // FRQ
    ParamEntry {
        set_kind: ValueKind::Float,
        set_exponent: 0,
        set_precision: 6,
        set_width: 0,
        get_kind: ValueKind::Float,
        get_exponent: 0,
    },
    // AMP
    ParamEntry {
        set_kind: ValueKind::Float,
        set_exponent: 0,
        set_precision: 4,
        set_width: 0,
        get_kind: ValueKind::Int,
        get_exponent: -4,
    },
    // OFST
    ParamEntry {
        set_kind: ValueKind::Float,
        set_exponent: 0,
        set_precision: 3,
        set_width: 0,
        get_kind: ValueKind::Int,
        get_exponent: -3,
    },
    // PHSE
    ParamEntry {
        set_kind: ValueKind::Float,
        set_exponent: 0,
        set_precision: 3,
        set_width: 0,
        get_kind: ValueKind::Int,
        get_exponent: -3,
    },
];

/// The FY-family models this backend knows tables for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FyModel {
    Fy6900,
}

impl FyModel {
    pub fn table(self) -> &'static ParamTable {
        match self {
            FyModel::Fy6900 => &FY6900,
        }
    }
}
