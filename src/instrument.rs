//! Instrument capability traits and stream-backed adapters
//!
//! # Purpose
//! The sequencer does not talk wire protocol. It talks to three narrow capabilities:
//!   - [`Load`] — an electronic load that draws a commanded current and reports
//!     current, voltage, and power
//!   - [`Chamber`] — a thermal enclosure that can be commanded to a temperature and
//!     polled for its reading
//!   - [`Supply`] — a power supply that sources a commanded voltage and reports
//!     current and voltage
//!
//! The structs in this module implement those capabilities over any
//! `AsyncRead + AsyncWrite` stream speaking the bench's ASCII vocabulary. Creating
//! the I/O handles is left to the caller so you are not tied to a particular hardware
//! interface; a local RS232 line and a TCP serial bridge work equally well.
//!
//! Simulated implementations for tests live in [`crate::mock`].

use std::{
    error::Error,
    fmt,
    io,
    num::ParseFloatError,
    str::FromStr,
    string::FromUtf8Error,
};
use async_trait::async_trait;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use crate::{
    cmd::{ ChamberCmd, LoadCmd, SupplyCmd },
    exec::LineExec,
    units::{ Amp, Celsius, Volt, Watt },
};

/// An error raised while commanding or reading an instrument
#[derive(Debug)]
pub enum InstrumentError
{
    /// An I/O error on the underlying stream
    Io(io::Error),
    /// The instrument replied with bytes that are not valid UTF8
    ///
    /// In practice this only comes up on a baud rate mismatch or a hotplugged line.
    InvalidUtf8(FromUtf8Error),
    /// The instrument replied, but the reply did not parse as a number
    InvalidReading
    {
        /// The reply as received, for debugging by a human
        raw: String,
        cause: ParseFloatError,
    },
}

impl fmt::Display for InstrumentError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Io(io_err) => write!(f, "Failed to exchange with instrument. {}", io_err),
            Self::InvalidUtf8(decode_err) => write!(f, "Unable to decode reply. {}", decode_err),
            Self::InvalidReading { raw, cause } => {
                write!(f, "Reply {:?} is not a valid reading. {}", raw, cause)
            },
        }
    }
}

impl Error for InstrumentError {}

impl From<io::Error> for InstrumentError
{
    fn from(this: io::Error) -> Self
    {
        Self::Io(this)
    }
}

impl From<FromUtf8Error> for InstrumentError
{
    fn from(this: FromUtf8Error) -> Self
    {
        Self::InvalidUtf8(this)
    }
}

fn parse_reading<Q>(raw: String) -> Result<Q, InstrumentError>
    where Q: FromStr<Err = ParseFloatError>
{
    match raw.parse::<Q>() {
        Ok(value) => Ok(value),
        Err(cause) => Err(InstrumentError::InvalidReading { raw, cause }),
    }
}

/// An electronic load
#[async_trait]
pub trait Load: Send
{
    async fn set_current(&mut self, amps: Amp) -> Result<(), InstrumentError>;
    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>;
    async fn measure_current(&mut self) -> Result<Amp, InstrumentError>;
    async fn measure_voltage(&mut self) -> Result<Volt, InstrumentError>;
    async fn measure_power(&mut self) -> Result<Watt, InstrumentError>;
}

/// A thermal chamber
#[async_trait]
pub trait Chamber: Send
{
    async fn set_temperature(&mut self, degrees: Celsius) -> Result<(), InstrumentError>;
    async fn get_temperature(&mut self) -> Result<Celsius, InstrumentError>;
}

/// A power supply
#[async_trait]
pub trait Supply: Send
{
    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>;
    async fn get_current(&mut self) -> Result<Amp, InstrumentError>;
    async fn get_voltage(&mut self) -> Result<Volt, InstrumentError>;
}

/// An electronic load on a SCPI-flavored ASCII stream
pub struct ScpiLoad<T>
{
    exec: LineExec<T>,
}

impl <T> ScpiLoad<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub fn with(io_handle: T) -> Self
    {
        Self {
            exec: LineExec::with(io_handle),
        }
    }
}

#[async_trait]
impl <T> Load for ScpiLoad<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    async fn set_current(&mut self, amps: Amp) -> Result<(), InstrumentError>
    {
        Ok(self.exec.send(LoadCmd::SetCurrent(amps)).await?)
    }

    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>
    {
        Ok(self.exec.send(LoadCmd::SetVoltage(volts)).await?)
    }

    async fn measure_current(&mut self) -> Result<Amp, InstrumentError>
    {
        parse_reading(self.exec.query(LoadCmd::MeasureCurrent).await?)
    }

    async fn measure_voltage(&mut self) -> Result<Volt, InstrumentError>
    {
        parse_reading(self.exec.query(LoadCmd::MeasureVoltage).await?)
    }

    async fn measure_power(&mut self) -> Result<Watt, InstrumentError>
    {
        parse_reading(self.exec.query(LoadCmd::MeasurePower).await?)
    }
}

/// A thermal chamber speaking the Equity-style `TEMP` vocabulary
pub struct EquityChamber<T>
{
    exec: LineExec<T>,
}

impl <T> EquityChamber<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub fn with(io_handle: T) -> Self
    {
        Self {
            exec: LineExec::with(io_handle),
        }
    }
}

#[async_trait]
impl <T> Chamber for EquityChamber<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    async fn set_temperature(&mut self, degrees: Celsius) -> Result<(), InstrumentError>
    {
        Ok(self.exec.send(ChamberCmd::SetTemperature(degrees)).await?)
    }

    async fn get_temperature(&mut self) -> Result<Celsius, InstrumentError>
    {
        parse_reading(self.exec.query(ChamberCmd::GetTemperature).await?)
    }
}

/// A power supply on a SCPI-flavored ASCII stream
pub struct ScpiSupply<T>
{
    exec: LineExec<T>,
}

impl <T> ScpiSupply<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub fn with(io_handle: T) -> Self
    {
        Self {
            exec: LineExec::with(io_handle),
        }
    }
}

#[async_trait]
impl <T> Supply for ScpiSupply<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>
    {
        Ok(self.exec.send(SupplyCmd::SetVoltage(volts)).await?)
    }

    async fn get_current(&mut self) -> Result<Amp, InstrumentError>
    {
        parse_reading(self.exec.query(SupplyCmd::MeasureCurrent).await?)
    }

    async fn get_voltage(&mut self) -> Result<Volt, InstrumentError>
    {
        parse_reading(self.exec.query(SupplyCmd::MeasureVoltage).await?)
    }
}
