//! Instrument command definition and wire serialization
//!
//! Each bench instrument understands a small line-oriented ASCII vocabulary. Commands
//! are modeled as enums and serialized through `fmt::Display` so that the executor can
//! write any of them without knowing which instrument it is talking to.

use std::fmt;
use crate::units::{ Amp, Celsius, Volt };

/// Commands understood by the electronic load
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadCmd
{
    /// Program the constant-current draw
    ///
    /// Command: `CURR <amps>`
    SetCurrent(Amp),
    /// Program the voltage limit
    ///
    /// Command: `VOLT <volts>`
    SetVoltage(Volt),
    /// Query the measured input current
    ///
    /// Command: `MEAS:CURR?`
    MeasureCurrent,
    /// Query the measured input voltage
    ///
    /// Command: `MEAS:VOLT?`
    MeasureVoltage,
    /// Query the measured input power
    ///
    /// Command: `MEAS:POW?`
    MeasurePower,
}

impl fmt::Display for LoadCmd
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::SetCurrent(amps) => write!(f, "CURR {}", amps.value()),
            Self::SetVoltage(volts) => write!(f, "VOLT {}", volts.value()),
            Self::MeasureCurrent => f.write_str("MEAS:CURR?"),
            Self::MeasureVoltage => f.write_str("MEAS:VOLT?"),
            Self::MeasurePower => f.write_str("MEAS:POW?"),
        }
    }
}

/// Commands understood by the power supply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupplyCmd
{
    /// Program the output voltage
    ///
    /// Command: `VOLT <volts>`
    SetVoltage(Volt),
    /// Query the sourced current
    ///
    /// Command: `MEAS:CURR?`
    MeasureCurrent,
    /// Query the output voltage
    ///
    /// Command: `MEAS:VOLT?`
    MeasureVoltage,
}

impl fmt::Display for SupplyCmd
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::SetVoltage(volts) => write!(f, "VOLT {}", volts.value()),
            Self::MeasureCurrent => f.write_str("MEAS:CURR?"),
            Self::MeasureVoltage => f.write_str("MEAS:VOLT?"),
        }
    }
}

/// Commands understood by the thermal chamber
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChamberCmd
{
    /// Command the chamber to a target temperature
    ///
    /// Command: `TEMP <degrees>`
    SetTemperature(Celsius),
    /// Query the reported chamber temperature
    ///
    /// Command: `TEMP?`
    GetTemperature,
}

impl fmt::Display for ChamberCmd
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::SetTemperature(degrees) => write!(f, "TEMP {}", degrees.value()),
            Self::GetTemperature => f.write_str("TEMP?"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn load_cmds_serialize()
    {
        assert_eq!(format!("{}", LoadCmd::SetCurrent(Amp::new(4.25))), "CURR 4.25");
        assert_eq!(format!("{}", LoadCmd::SetVoltage(Volt::new(12.0))), "VOLT 12");
        assert_eq!(format!("{}", LoadCmd::MeasurePower), "MEAS:POW?");
        assert_eq!(format!("{}", LoadCmd::MeasureCurrent), "MEAS:CURR?");
        assert_eq!(format!("{}", LoadCmd::MeasureVoltage), "MEAS:VOLT?");
    }

    #[test]
    fn supply_cmds_serialize()
    {
        assert_eq!(format!("{}", SupplyCmd::SetVoltage(Volt::new(0.0))), "VOLT 0");
        assert_eq!(format!("{}", SupplyCmd::MeasureCurrent), "MEAS:CURR?");
        assert_eq!(format!("{}", SupplyCmd::MeasureVoltage), "MEAS:VOLT?");
    }

    #[test]
    fn chamber_cmds_serialize()
    {
        assert_eq!(format!("{}", ChamberCmd::SetTemperature(Celsius::new(-10.0))), "TEMP -10");
        assert_eq!(format!("{}", ChamberCmd::GetTemperature), "TEMP?");
    }
}
