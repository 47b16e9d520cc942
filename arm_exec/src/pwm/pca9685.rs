//! [`PwmDriver`] implementation for the PCA9685 driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{debug, info};
use pwm_pca9685::{Address, Channel, Pca9685};

use super::{PwmDriver, PwmError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of ticks in one PWM period.
pub const MAX_PWM: u16 = 4096;

/// Frequency of the board's internal oscillator.
const OSCILLATOR_HZ: f64 = 25_000_000.0;

/// Prescale limits accepted by the chip.
const MIN_PRESCALE: f64 = 3.0;
const MAX_PRESCALE: f64 = 255.0;

/// Default I2C address of the Adafruit board.
pub const DEFAULT_ADDRESS: u8 = 0x40;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PCA9685 board on an I2C bus.
pub struct Pca9685Driver<I2C> {
    pwm: Pca9685<I2C>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, E> Pca9685Driver<I2C>
where 
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    /// Connect to the board at `address` and enable its outputs.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, PwmError> {
        let mut pwm = Pca9685::new(i2c, Address::from(address))
            .map_err(map_err)?;

        pwm.enable().map_err(map_err)?;

        info!("PCA9685 enabled at address {:#04x}", address);

        Ok(Self { pwm })
    }
}

impl<I2C, E> PwmDriver for Pca9685Driver<I2C>
where 
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), PwmError> {
        let prescale = prescale_for(frequency_hz)?;

        debug!("PCA9685 frequency {} Hz -> prescale {}", frequency_hz, prescale);

        self.pwm.set_prescale(prescale).map_err(map_err)
    }

    fn set_pulse(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), PwmError> {
        let ch = to_channel(channel)?;

        if off_tick == 0 {
            return self.pwm.set_channel_full_off(ch).map_err(map_err)
        }

        if on_tick >= MAX_PWM || off_tick >= MAX_PWM {
            return Err(PwmError::InvalidPulse(on_tick, off_tick))
        }

        self.pwm.set_channel_on_off(ch, on_tick, off_tick).map_err(map_err)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the chip's prescale register value for the given output frequency.
pub fn prescale_for(frequency_hz: f64) -> Result<u8, PwmError> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(PwmError::InvalidFrequency(frequency_hz))
    }

    let prescale = (OSCILLATOR_HZ / (MAX_PWM as f64 * frequency_hz)).round() - 1.0;

    if prescale < MIN_PRESCALE || prescale > MAX_PRESCALE {
        return Err(PwmError::InvalidFrequency(frequency_hz))
    }

    Ok(prescale as u8)
}

fn map_err<E>(e: pwm_pca9685::Error<E>) -> PwmError {
    match e {
        pwm_pca9685::Error::I2C(_) => PwmError::I2c,
        pwm_pca9685::Error::InvalidInputData => PwmError::InvalidPulse(0, 0)
    }
}

fn to_channel(channel: u8) -> Result<Channel, PwmError> {
    Ok(match channel {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        c => return Err(PwmError::InvalidChannel(c))
    })
}
