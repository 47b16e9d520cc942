//! # PWM Driver Module
//!
//! This module provides a unified interface over the boards that generate the servo PWM signals.
//! The rest of the arm only ever sees [`PwmDriver`], so the hardware board can be swapped for the
//! [`SimDriver`] when running off-target or under test.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`PwmDriver`] implementation for the Adafruit PCA9685 16 channel servo driver board.
pub mod pca9685;

/// Software-only [`PwmDriver`] implementation.
mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use sim::{PwmWrite, SimDriver};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A driver shared between all servos of the arm.
///
/// The lock serialises bus access across channels.
pub type SharedDriver = Arc<Mutex<dyn PwmDriver + Send>>;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing PWM driver boards.
pub trait PwmDriver {

    /// Set the PWM frequency of the whole board.
    ///
    /// Called once at start up before any pulse is written.
    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), PwmError>;

    /// Set the pulse on a channel.
    ///
    /// ## Arguments
    /// - `channel` - The channel to set the pulse for
    /// - `on_tick` - Tick within the period at which the signal goes high
    /// - `off_tick` - Tick within the period at which the signal goes low. An `off_tick` of 0
    ///   turns the channel off entirely.
    fn set_pulse(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), PwmError>;

}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PwmError {
    #[error("An I2C error occured")]
    I2c,

    #[error("Channel {0} does not exist on this board")]
    InvalidChannel(u8),

    #[error("A PWM frequency of {0} Hz cannot be generated by this board")]
    InvalidFrequency(f64),

    #[error("Pulse ticks (on: {0}, off: {1}) are out of the board's range")]
    InvalidPulse(u16, u16),

    #[error("The PWM driver is not available")]
    Unavailable
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Wrap a driver so it can be shared between servos.
pub fn share<D>(driver: D) -> SharedDriver
where
    D: PwmDriver + Send + 'static
{
    Arc::new(Mutex::new(driver))
}

/// Acquire the driver lock.
///
/// A panic in another thread while it held the lock doesn't invalidate the driver, so a poisoned
/// lock is recovered rather than propagated.
pub fn lock(driver: &SharedDriver) -> MutexGuard<'_, dyn PwmDriver + Send + 'static> {
    driver.lock().unwrap_or_else(PoisonError::into_inner)
}
