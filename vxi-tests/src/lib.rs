//! Test support: a scripted in-memory AWG backend.

use std::sync::{Arc, Mutex};

use vxi_protocol::scpi::Param;
use vxi_server::{AwgDevice, AwgError};

/// Shared recording handle; clones observe the same call list.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(u32, Param, f64)>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<(u32, Param, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

/// An [`AwgDevice`] that records every set and answers gets with fixed
/// plausible readings.
pub struct MockAwg {
    recorder: Recorder,
}

impl MockAwg {
    pub fn new(recorder: Recorder) -> MockAwg {
        MockAwg { recorder }
    }
}

impl AwgDevice for MockAwg {
    fn set(&mut self, channel: u32, param: Param, value: f64) -> Result<(), AwgError> {
        if channel == 0 || channel > self.channels() {
            return Err(AwgError::Channel { channel, channels: self.channels() });
        }
        self.recorder.calls.lock().unwrap().push((channel, param, value));
        Ok(())
    }

    fn get(&mut self, channel: u32, param: Param) -> Result<f64, AwgError> {
        if channel == 0 || channel > self.channels() {
            return Err(AwgError::Channel { channel, channels: self.channels() });
        }
        Ok(match param {
            Param::Frequency => 1000.0,
            Param::Amplitude => 2.0,
            _ => 0.0,
        })
    }
}
