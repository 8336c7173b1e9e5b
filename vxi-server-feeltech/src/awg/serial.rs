//! Line-oriented serial transport to the AWG.
//!
//! The FY protocol is strictly line-based: every command ends in `\n`, and
//! the instrument answers each one with a single `\n`-terminated line. The
//! [`LineIo`] trait is the seam the engine talks through, so tests can
//! substitute a scripted link for real hardware.

use std::io::{Read, Write};
use std::time::Duration;

use vxi_server::AwgError;

/// Longest response line the AWG is expected to produce.
pub const MAX_RESPONSE_LEN: usize = 20;

/// One `\n`-terminated exchange with the instrument.
pub trait LineIo {
    /// Send one command line; the terminating newline is appended here.
    fn send_line(&mut self, line: &str) -> Result<(), AwgError>;

    /// Read one response line, without its terminator. Bounded by the
    /// transport's timeout; a silent instrument surfaces as a timed-out
    /// [`AwgError::Io`], never an unbounded wait.
    fn read_line(&mut self) -> Result<String, AwgError>;
}

/// [`LineIo`] over a real serial port.
pub struct SerialLine {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLine {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<SerialLine, serialport::Error> {
        let port = serialport::new(path, baud).timeout(timeout).open()?;
        Ok(SerialLine { port })
    }
}

impl LineIo for SerialLine {
    fn send_line(&mut self, line: &str) -> Result<(), AwgError> {
        log::debug!("serial >> {line}");
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, AwgError> {
        let mut line = Vec::with_capacity(MAX_RESPONSE_LEN);
        let mut byte = [0u8; 1];
        while line.len() < MAX_RESPONSE_LEN {
            self.port.read_exact(&mut byte)?;
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        let line = String::from_utf8_lossy(&line).into_owned();
        log::debug!("serial << {line}");
        Ok(line)
    }
}
