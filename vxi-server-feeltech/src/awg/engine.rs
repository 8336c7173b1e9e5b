//! The FY-series parameter translation engine.
//!
//! Translates generic (channel, parameter, value) requests into FY serial
//! commands and back. A command token is three letters: the operation
//! prefix (`W` to set, `R` to read), the channel code and the parameter
//! code; the value rendering is table-driven per model. With a positive
//! retry count every set is read back and compared, and the whole
//! send-and-verify cycle repeats until it matches or the retries are
//! exhausted.

use std::io::ErrorKind;

use vxi_protocol::scpi::Param;
use vxi_server::{AwgDevice, AwgError};

use crate::awg::models::{FyModel, ParamEntry, ParamTable, ValueKind};
use crate::awg::serial::LineIo;
use crate::awg::waves;

const SET_PREFIX: char = 'W';
const GET_PREFIX: char = 'R';

/// FY channel code letters, indexed by the 1-based channel number.
/// Channel 0 should not occur, but maps to the main channel just in case.
const CHANNEL_CODES: [char; 3] = ['M', 'M', 'F'];

/// FY parameter code letters, indexed by [`Param`].
const PARAM_CODES: [char; Param::COUNT] = ['N', 'N', 'W', 'F', 'A', 'O', 'P'];

const CHANNELS: u32 = 2;

/// An FY-family AWG behind a [`LineIo`] transport.
pub struct FeelTech<L> {
    link: L,
    table: &'static ParamTable,
    retries: u32,
    full_wave_translation: bool,
}

impl<L: LineIo> FeelTech<L> {
    pub fn new(link: L, model: FyModel, retries: u32) -> FeelTech<L> {
        FeelTech::with_table(link, model.table(), retries)
    }

    /// Build an engine around an explicit translation table; the extension
    /// point for FY-family variants without a named model.
    pub fn with_table(link: L, table: &'static ParamTable, retries: u32) -> FeelTech<L> {
        FeelTech {
            link,
            table,
            retries,
            full_wave_translation: false,
        }
    }

    /// Translate all Siglent waveforms instead of pinning sine.
    pub fn full_wave_translation(mut self, enabled: bool) -> Self {
        self.full_wave_translation = enabled;
        self
    }

    fn check_channel(&self, channel: u32) -> Result<(), AwgError> {
        if channel == 0 || channel > CHANNELS {
            return Err(AwgError::Channel { channel, channels: CHANNELS });
        }
        Ok(())
    }

    fn command(&self, prefix: char, channel: u32, param: Param) -> String {
        let mut command = String::with_capacity(3);
        command.push(prefix);
        command.push(CHANNEL_CODES[channel as usize]);
        command.push(PARAM_CODES[param.index()]);
        command
    }
}

impl<L: LineIo> AwgDevice for FeelTech<L> {
    fn set(&mut self, channel: u32, param: Param, value: f64) -> Result<(), AwgError> {
        self.check_channel(channel)?;
        let entry = &self.table[param.index()];

        // The wire value is what goes on the line; the expectation is what a
        // read-back must report for the set to count as verified.
        let (wire, expected) = if param == Param::Wave {
            let code = if self.full_wave_translation {
                waves::fy_wave(value as u32)
            } else {
                waves::FY_SINE
            };
            (code as f64, value)
        } else {
            let rounded = round_to(value, entry.set_precision);
            let wire = rounded * 10f64.powi(entry.set_exponent);
            let expected = match entry.set_kind {
                ValueKind::Bool => {
                    if value == 0.0 {
                        0.0
                    } else {
                        1.0
                    }
                }
                _ => rounded,
            };
            (wire, expected)
        };

        let line = format!(
            "{}{}",
            self.command(SET_PREFIX, channel, param),
            format_value(entry, wire)
        );

        let verify = self.retries > 0;
        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            self.link.send_line(&line)?;

            // the AWG acknowledges every set with a bare terminator line;
            // reading it unconditionally keeps the link in sync
            match self.link.read_line() {
                Ok(_ack) => {}
                Err(AwgError::Io(e)) if e.kind() == ErrorKind::TimedOut && attempt < attempts => {
                    continue;
                }
                Err(e) => return Err(e),
            }

            if !verify {
                return Ok(());
            }
            match self.get(channel, param) {
                Ok(readback) if readback == expected => return Ok(()),
                Ok(readback) => {
                    log::debug!("verify mismatch for {param}: wanted {expected}, read {readback}");
                }
                Err(e) => log::debug!("verify read failed for {param}: {e}"),
            }
        }

        log::error!("unable to verify {param}");
        Err(AwgError::Verify { param, attempts })
    }

    fn get(&mut self, channel: u32, param: Param) -> Result<f64, AwgError> {
        self.check_channel(channel)?;
        let entry = &self.table[param.index()];

        let command = self.command(GET_PREFIX, channel, param);
        self.link.send_line(&command)?;
        let line = self.link.read_line()?;
        let Some(raw) = parse_leading_f64(&line) else {
            return Err(AwgError::Response(line));
        };

        let mut value = raw * 10f64.powi(entry.get_exponent);
        if entry.get_kind == ValueKind::Bool {
            value = if value == 0.0 { 0.0 } else { 1.0 };
        }
        Ok(value)
    }
}

/// Round half-up at `precision` decimal places.
fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale + 0.5).floor() / scale
}

/// Render a wire value per the table entry's kind, precision and width.
fn format_value(entry: &ParamEntry, wire: f64) -> String {
    match entry.set_kind {
        ValueKind::Bool => String::from(if wire == 0.0 { "0" } else { "1" }),
        ValueKind::Int => {
            let value = wire as i64;
            if entry.set_width > 0 {
                format!("{value:0width$}", width = entry.set_width as usize)
            } else {
                value.to_string()
            }
        }
        ValueKind::Float => {
            let precision = entry.set_precision as usize;
            if entry.set_width > 0 {
                format!(
                    "{wire:0width$.precision$}",
                    width = entry.set_width as usize
                )
            } else if precision > 0 {
                format!("{wire:.precision$}")
            } else {
                format!("{wire}")
            }
        }
    }
}

/// Parse the leading decimal number of a response line, tolerating trailing
/// junk the way `sscanf("%lf")` does.
fn parse_leading_f64(text: &str) -> Option<f64> {
    let text = text.trim();
    for end in (1..=text.len()).rev() {
        if !text.is_char_boundary(end) {
            continue;
        }
        if let Ok(value) = text[..end].parse::<f64>() {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::awg::models::FY6900;

    /// A scripted serial link: records sent lines, pops queued responses,
    /// and times out once the script runs dry.
    #[derive(Default)]
    struct ScriptedLink {
        sent: Vec<String>,
        responses: VecDeque<&'static str>,
    }

    impl ScriptedLink {
        fn with_responses(responses: &[&'static str]) -> ScriptedLink {
            ScriptedLink {
                sent: Vec::new(),
                responses: responses.iter().copied().collect(),
            }
        }
    }

    impl LineIo for ScriptedLink {
        fn send_line(&mut self, line: &str) -> Result<(), AwgError> {
            self.sent.push(line.to_owned());
            Ok(())
        }

        fn read_line(&mut self) -> Result<String, AwgError> {
            match self.responses.pop_front() {
                Some(line) => Ok(line.to_owned()),
                None => Err(AwgError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no response scripted",
                ))),
            }
        }
    }

    fn fy6900(responses: &[&'static str], retries: u32) -> FeelTech<ScriptedLink> {
        FeelTech::new(ScriptedLink::with_responses(responses), FyModel::Fy6900, retries)
    }

    /// FY6900 with amplitude written as a scaled integer, the shape some
    /// models report it in natural-unit-times-10^4 form.
    static SCALED_AMP: ParamTable = {
        let mut table = FY6900;
        table[4] = ParamEntry {
            set_kind: ValueKind::Int,
            set_exponent: 4,
            set_precision: 4,
            set_width: 0,
            get_kind: ValueKind::Int,
            get_exponent: -4,
        };
        table
    };

    #[test]
    fn frequency_is_formatted_with_six_decimals() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::Frequency, 1000.5).unwrap();
        assert_eq!(awg.link.sent, vec!["WMF1000.500000"]);
    }

    #[test]
    fn amplitude_is_formatted_with_four_decimals() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::Amplitude, 2.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WMA2.0000"]);
    }

    #[test]
    fn integer_kind_scales_by_the_exponent() {
        let link = ScriptedLink::with_responses(&[""]);
        let mut awg = FeelTech::with_table(link, &SCALED_AMP, 0);
        awg.set(1, Param::Amplitude, 2.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WMA20000"]);
    }

    #[test]
    fn channel_two_uses_its_own_code_letter() {
        let mut awg = fy6900(&[""], 0);
        awg.set(2, Param::Frequency, 100.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WFF100.000000"]);
    }

    #[test]
    fn output_on_sends_a_boolean_one() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::OutputOn, 1.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WMN1"]);
    }

    #[test]
    fn offset_rounds_at_three_decimals() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::Offset, 0.1237).unwrap();
        assert_eq!(awg.link.sent, vec!["WMO0.124"]);
    }

    #[test]
    fn wave_is_pinned_to_sine_by_default() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::Wave, 47.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WMW0"]);
    }

    #[test]
    fn full_wave_translation_maps_square() {
        let mut awg = fy6900(&[""], 0).full_wave_translation(true);
        awg.set(1, Param::Wave, 47.0).unwrap();
        assert_eq!(awg.link.sent, vec!["WMW2"]);
    }

    #[test]
    fn invalid_channel_emits_no_serial_traffic() {
        let mut awg = fy6900(&[], 0);
        assert!(matches!(
            awg.set(3, Param::Frequency, 1000.0),
            Err(AwgError::Channel { channel: 3, channels: 2 })
        ));
        assert!(matches!(
            awg.get(0, Param::Frequency),
            Err(AwgError::Channel { channel: 0, .. })
        ));
        assert!(awg.link.sent.is_empty());
    }

    #[test]
    fn set_without_retries_sends_exactly_once() {
        let mut awg = fy6900(&[""], 0);
        awg.set(1, Param::Frequency, 1000.0).unwrap();
        // one set command, no read-back
        assert_eq!(awg.link.sent.len(), 1);
    }

    #[test]
    fn get_applies_the_readback_exponent() {
        let mut awg = fy6900(&["20000"], 0);
        assert_eq!(awg.get(1, Param::Amplitude).unwrap(), 2.0);
        assert_eq!(awg.link.sent, vec!["RMA"]);
    }

    #[test]
    fn get_coerces_boolean_readings() {
        let mut awg = fy6900(&["255"], 0);
        assert_eq!(awg.get(1, Param::OutputOn).unwrap(), 1.0);
    }

    #[test]
    fn get_rejects_a_non_numeric_line() {
        let mut awg = fy6900(&["?"], 0);
        assert!(matches!(
            awg.get(1, Param::Frequency),
            Err(AwgError::Response(line)) if line == "?"
        ));
    }

    #[test]
    fn get_tolerates_trailing_junk() {
        assert_eq!(parse_leading_f64("1000.5Hz"), Some(1000.5));
        assert_eq!(parse_leading_f64(" -12 "), Some(-12.0));
        assert_eq!(parse_leading_f64("ok"), None);
        assert_eq!(parse_leading_f64(""), None);
    }

    #[test]
    fn verify_retries_until_the_readback_matches() {
        // ack + wrong readback, twice, then ack + matching readback
        let mut awg = fy6900(
            &["", "999.000000", "", "999.000000", "", "1000.000000"],
            2,
        );
        awg.set(1, Param::Frequency, 1000.0).unwrap();
        assert_eq!(awg.link.sent.len(), 6);
        assert_eq!(awg.link.sent[0], "WMF1000.000000");
        assert_eq!(awg.link.sent[1], "RMF");
    }

    #[test]
    fn verify_exhaustion_counts_every_attempt() {
        let mut awg = fy6900(&["", "0.000000", "", "0.000000"], 1);
        let result = awg.set(1, Param::Frequency, 1000.0);
        assert!(matches!(
            result,
            Err(AwgError::Verify { param: Param::Frequency, attempts: 2 })
        ));
        let sets = awg.link.sent.iter().filter(|line| line.starts_with("WMF")).count();
        assert_eq!(sets, 2);
    }

    #[test]
    fn round_trip_reproduces_the_rounded_value() {
        // encode through a positive exponent, decode through the matching
        // negative one
        let link = ScriptedLink::with_responses(&["", "25467"]);
        let mut awg = FeelTech::with_table(link, &SCALED_AMP, 0);
        awg.set(1, Param::Amplitude, 2.5467).unwrap();
        assert_eq!(awg.link.sent[0], "WMA25467");
        assert_eq!(awg.get(1, Param::Amplitude).unwrap(), 2.5467);
    }

    #[test]
    fn rounding_is_half_up() {
        // exact binary halves distinguish half-up from banker's rounding
        assert_eq!(round_to(1.5, 0), 2.0);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(0.1234, 3), 0.123);
        assert_eq!(round_to(0.1237, 3), 0.124);
        assert_eq!(round_to(2.0, 4), 2.0);
    }
}
