//! Simulated [`PwmDriver`] which records every write instead of driving hardware

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{PwmDriver, PwmError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of channels the simulated board exposes, matching a PCA9685.
const NUM_CHANNELS: u8 = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single write made to the simulated board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmWrite {
    pub channel: u8,
    pub on_tick: u16,
    pub off_tick: u16,
}

/// Simulated PWM board.
#[derive(Debug, Default)]
pub struct SimDriver {
    frequency_hz: Option<f64>,
    writes: Vec<PwmWrite>,
    unavailable: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with [`PwmError::Unavailable`] (or succeed again).
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// The frequency set by the last call to `set_frequency`.
    pub fn frequency_hz(&self) -> Option<f64> {
        self.frequency_hz
    }

    /// Every write made so far, oldest first.
    pub fn writes(&self) -> &[PwmWrite] {
        &self.writes
    }

    /// Writes made to a single channel, oldest first.
    pub fn writes_to(&self, channel: u8) -> Vec<PwmWrite> {
        self.writes
            .iter()
            .filter(|w| w.channel == channel)
            .copied()
            .collect()
    }

    /// The off tick last written to the channel.
    pub fn last_pulse(&self, channel: u8) -> Option<u16> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.channel == channel)
            .map(|w| w.off_tick)
    }
}

impl PwmDriver for SimDriver {
    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), PwmError> {
        if self.unavailable {
            return Err(PwmError::Unavailable)
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(PwmError::InvalidFrequency(frequency_hz))
        }

        debug!("sim: frequency set to {} Hz", frequency_hz);
        self.frequency_hz = Some(frequency_hz);
        Ok(())
    }

    fn set_pulse(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), PwmError> {
        if self.unavailable {
            return Err(PwmError::Unavailable)
        }
        if channel >= NUM_CHANNELS {
            return Err(PwmError::InvalidChannel(channel))
        }

        debug!("sim: channel={} on={} off={}", channel, on_tick, off_tick);
        self.writes.push(PwmWrite { channel, on_tick, off_tick });
        Ok(())
    }
}
