//! Parser for the SCPI command lines carried inside DEVICE_WRITE payloads.
//!
//! A Siglent oscilloscope running a Bode-plot sweep drives its AWG with a
//! small command dialect: an identification query, or a channel prefix
//! (`C1:` / `C2:`) followed by `;`-separated commands (`OUTP <ON|OFF>`,
//! `BSWV <PARAM>,<value>,...`, `BSWV?`). The parser turns one line into a
//! list of structured [`ScpiEffect`]s and leaves applying them to the
//! caller.
//!
//! Keyword matching is prefix-based: a token matches the first candidate (in
//! declaration order) that it begins with. The candidate sets have no
//! ambiguous prefixes, and `BSWV?` is declared before `BSWV` so queries are
//! not mistaken for writes. Commands and parameter keywords outside the
//! candidate sets are skipped silently; the oscilloscope is known to send
//! commands this device deliberately does not support.
//!
//! ```
//! use vxi_protocol::scpi::{parse_line, Param, ScpiEffect};
//!
//! let effects = parse_line("C1:OUTP ON;BSWV FRQ,1000");
//! assert_eq!(
//!     effects,
//!     vec![
//!         ScpiEffect::Set { channel: 1, param: Param::OutputOn, value: 1.0 },
//!         ScpiEffect::Set { channel: 1, param: Param::Frequency, value: 1000.0 },
//!     ]
//! );
//! ```

use std::fmt::Display;

/// The identification query an oscilloscope opens a session with.
pub const IDENTIFICATION_QUERY: &str = "IDN-SGLT-PRI?";

/// One logical AWG parameter, in keyword-match declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    OutputOff,
    OutputOn,
    Wave,
    Frequency,
    Amplitude,
    Offset,
    Phase,
}

impl Param {
    pub const COUNT: usize = 7;

    /// All parameters in declaration order; the match order for keywords.
    pub const ALL: [Param; Param::COUNT] = [
        Param::OutputOff,
        Param::OutputOn,
        Param::Wave,
        Param::Frequency,
        Param::Amplitude,
        Param::Offset,
        Param::Phase,
    ];

    /// The SCPI keyword that selects this parameter.
    pub fn keyword(self) -> &'static str {
        match self {
            Param::OutputOff => "OFF",
            Param::OutputOn => "ON",
            Param::Wave => "WVTP",
            Param::Frequency => "FRQ",
            Param::Amplitude => "AMP",
            Param::Offset => "OFST",
            Param::Phase => "PHSE",
        }
    }

    /// Position in per-model parameter tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One structured effect extracted from a command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ScpiEffect {
    /// Apply a parameter value to a channel.
    Set { channel: u32, param: Param, value: f64 },
    /// The client asked for the current waveform settings (`BSWV?`).
    QueryParameters { channel: u32 },
    /// The client asked for the instrument identification.
    QueryIdentification,
}

/// Decompose one write payload into its effects.
///
/// An identification query occupies the whole line by protocol convention,
/// so nothing after it is examined. A line with an unparsable channel number
/// yields no effects.
pub fn parse_line(line: &str) -> Vec<ScpiEffect> {
    let line = line.trim();
    let (initiator, rest) = match line.split_once(':') {
        Some((initiator, rest)) => (initiator.trim(), rest),
        None => (line, ""),
    };

    if initiator.starts_with(IDENTIFICATION_QUERY) {
        return vec![ScpiEffect::QueryIdentification];
    }
    let Some(digits) = initiator.strip_prefix('C') else {
        return Vec::new();
    };
    let Ok(channel) = digits.trim().parse::<u32>() else {
        return Vec::new();
    };

    let mut effects = Vec::new();
    for segment in rest.split(';') {
        let segment = segment.trim();
        let (command, parameters) = match segment.split_once(' ') {
            Some((command, parameters)) => (command.trim(), parameters),
            None => (segment, ""),
        };
        if command.starts_with("OUTP") {
            parse_parameters(channel, parameters, &mut effects);
        } else if command.starts_with("BSWV?") {
            effects.push(ScpiEffect::QueryParameters { channel });
        } else if command.starts_with("BSWV") {
            parse_parameters(channel, parameters, &mut effects);
        }
        // other commands are deliberately ignored
    }
    effects
}

/// Scan a comma-separated parameter list, alternating keywords and values.
///
/// `ON` and `OFF` stand alone; every other keyword consumes the following
/// token as its value. A token that matches no keyword is skipped, and its
/// would-be value then fails the keyword match on the next iteration and is
/// skipped the same way.
fn parse_parameters(channel: u32, parameters: &str, effects: &mut Vec<ScpiEffect>) {
    let mut tokens = parameters.split(',').map(str::trim);
    while let Some(token) = tokens.next() {
        let Some(param) = Param::ALL.into_iter().find(|p| token.starts_with(p.keyword()))
        else {
            continue;
        };
        match param {
            Param::OutputOff => effects.push(ScpiEffect::Set {
                channel,
                param,
                value: 0.0,
            }),
            Param::OutputOn => effects.push(ScpiEffect::Set {
                channel,
                param,
                value: 1.0,
            }),
            Param::Wave => {
                if let Some(name) = tokens.next() {
                    effects.push(ScpiEffect::Set {
                        channel,
                        param,
                        value: wave_code(name).unwrap_or(0) as f64,
                    });
                }
            }
            _ => {
                if let Some(value) = tokens.next() {
                    if let Ok(value) = value.parse::<f64>() {
                        effects.push(ScpiEffect::Set { channel, param, value });
                    }
                }
            }
        }
    }
}

/// The Siglent BSWV waveform names, indexed by their numeric code.
///
/// Taken from the WGEN section of the SDS-series programming guide; only the
/// basic waveforms are listed, arbitrary waveforms are not.
const WAVE_NAMES: [&str; 48] = [
    "SINE", "NOISE", "STAIRUP", "STAIRDN", "STAIRUD", "PPULSE", "NPULSE", "TRAPEZIA", "UPRAMP",
    "DNRAMP", "EXP_FALL", "EXP_RISE", "LOGFALL", "LOGRISE", "SQRT", "ROOT3", "X^2", "X^3", "SINC",
    "GAUSSIAN", "DLORENTZ", "HAVERSINE", "LORENTZ", "GAUSPULS", "GMONOPULS", "TRIPULS", "CARDIAC",
    "QUAKE", "CHIRP", "TWOTONE", "SNR", "HAMMING", "HANNING", "KAISER", "BLACKMAN", "GAUSSWIN",
    "TRIANG", "HARRIS", "BARTLETT", "TAN", "COT", "SEC", "CSC", "ASIN", "ACOS", "ATAN", "ACOT",
    "SQUARE",
];

/// Map a Siglent waveform name to its numeric code.
pub fn wave_code(name: &str) -> Option<u32> {
    let name = name.trim();
    WAVE_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|index| index as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identification_query_stops_the_line() {
        assert_eq!(
            parse_line("IDN-SGLT-PRI?"),
            vec![ScpiEffect::QueryIdentification]
        );
    }

    #[test]
    fn channel_commands_in_sequence() {
        let effects = parse_line("C1:OUTP ON;BSWV FRQ,1000.5,AMP,2.0");
        assert_eq!(
            effects,
            vec![
                ScpiEffect::Set { channel: 1, param: Param::OutputOn, value: 1.0 },
                ScpiEffect::Set { channel: 1, param: Param::Frequency, value: 1000.5 },
                ScpiEffect::Set { channel: 1, param: Param::Amplitude, value: 2.0 },
            ]
        );
    }

    #[test]
    fn whitespace_between_tokens_is_ignored() {
        assert_eq!(
            parse_line("C1:OUTP ON;BSWV FRQ,1000"),
            parse_line("  C1 : OUTP ON ; BSWV FRQ , 1000  ")
        );
    }

    #[test]
    fn output_off_has_no_value_token() {
        assert_eq!(
            parse_line("C2:OUTP OFF"),
            vec![ScpiEffect::Set { channel: 2, param: Param::OutputOff, value: 0.0 }]
        );
    }

    #[test]
    fn bswv_query_sets_pending_read() {
        assert_eq!(
            parse_line("C1:BSWV?"),
            vec![ScpiEffect::QueryParameters { channel: 1 }]
        );
    }

    #[test]
    fn unknown_command_is_skipped() {
        assert_eq!(parse_line("C1:MDWV GM"), Vec::new());
        assert_eq!(
            parse_line("C1:MDWV GM;OUTP ON"),
            vec![ScpiEffect::Set { channel: 1, param: Param::OutputOn, value: 1.0 }]
        );
    }

    #[test]
    fn unknown_parameter_and_its_value_are_skipped() {
        let effects = parse_line("C1:BSWV DUTY,50,FRQ,1000");
        assert_eq!(
            effects,
            vec![ScpiEffect::Set { channel: 1, param: Param::Frequency, value: 1000.0 }]
        );
    }

    #[test]
    fn wave_names_translate_to_codes() {
        assert_eq!(
            parse_line("C1:BSWV WVTP,SINE"),
            vec![ScpiEffect::Set { channel: 1, param: Param::Wave, value: 0.0 }]
        );
        assert_eq!(
            parse_line("C1:BSWV WVTP,SQUARE"),
            vec![ScpiEffect::Set { channel: 1, param: Param::Wave, value: 47.0 }]
        );
        // unknown names fall back to sine
        assert_eq!(
            parse_line("C1:BSWV WVTP,BOGUS"),
            vec![ScpiEffect::Set { channel: 1, param: Param::Wave, value: 0.0 }]
        );
    }

    #[test]
    fn unparsable_values_drop_the_effect() {
        assert_eq!(parse_line("C1:BSWV FRQ,fast"), Vec::new());
    }

    #[test]
    fn garbage_initiator_yields_nothing() {
        assert_eq!(parse_line("*RST"), Vec::new());
        assert_eq!(parse_line("Cx:OUTP ON"), Vec::new());
        assert_eq!(parse_line(""), Vec::new());
    }

    #[test]
    fn offset_keyword_is_not_mistaken_for_off() {
        let effects = parse_line("C1:BSWV OFST,0.5");
        assert_eq!(
            effects,
            vec![ScpiEffect::Set { channel: 1, param: Param::Offset, value: 0.5 }]
        );
    }
}
