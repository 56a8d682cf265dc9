//! Test plan definition and validation
//!
//! A [`TestPlan`] describes one full sweep: the temperatures to visit, the current
//! ramp, the supply voltages, and the power target. Plans are immutable once built.
//! The only way to get one is through [`PlanBuilder::build`], which checks every
//! numeric parameter against its legal range, so an invalid plan can never reach an
//! instrument.

use std::{ error::Error, fmt, time::Duration };
use serde::Deserialize;
use crate::units::{ Amp, Volt, Watt };

/// Timing knobs for the run loop and instrument settling
///
/// These exist as data rather than constants so that tests can run a sweep against
/// tokio's paused clock without editing the sequencer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing
{
    /// Delay between state-machine steps
    #[serde(with = "humantime_serde")]
    pub step_interval: Duration,
    /// Settle delay after commanding the supply or load, and after each measurement
    #[serde(with = "humantime_serde")]
    pub settle: Duration,
    /// Interval between chamber temperature polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How close the chamber reading must be to the setpoint, in degrees Celsius
    pub temperature_tolerance: f64,
}

impl Default for Pacing
{
    fn default() -> Self
    {
        Self {
            step_interval: Duration::from_millis(100),
            settle: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            temperature_tolerance: 0.5,
        }
    }
}

/// A validated sweep description
#[derive(Debug, Clone)]
pub struct TestPlan
{
    pub(crate) temperatures: Vec<i32>,
    pub(crate) stabilization_grace_secs: u64,
    pub(crate) stabilization_timeout_secs: u64,
    pub(crate) current_step: Amp,
    pub(crate) initial_current: Amp,
    pub(crate) final_current: Amp,
    pub(crate) initial_voltage: Volt,
    pub(crate) target_voltage: Volt,
    pub(crate) setpoint_power: Watt,
    pub(crate) pacing: Pacing,
}

impl TestPlan
{
    /// The ambient temperatures this sweep visits, in order
    pub fn temperatures(&self) -> &[i32]
    {
        &self.temperatures
    }

    /// The power threshold each temperature step must reach
    pub fn setpoint_power(&self) -> Watt
    {
        self.setpoint_power
    }

    /// Builds a plan from a TOML document, validating it
    pub fn from_toml(text: &str) -> Result<Self, PlanError>
    {
        let builder: PlanBuilder = toml::from_str(text)?;
        Ok(builder.build()?)
    }
}

/// Builder for a [`TestPlan`]
///
/// Field defaults match the bench's reference plan, so a builder only needs the
/// values that differ. Deserializable, so a TOML plan file is just a serialized
/// builder; [`build`](Self::build) runs validation either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanBuilder
{
    temperatures: Vec<i32>,
    stabilization_grace_secs: u64,
    stabilization_timeout_secs: u64,
    current_step: Amp,
    initial_current: Amp,
    final_current: Amp,
    initial_voltage: Volt,
    target_voltage: Volt,
    setpoint_power: Watt,
    pacing: Pacing,
}

impl Default for PlanBuilder
{
    fn default() -> Self
    {
        Self {
            temperatures: vec![-10, 25, 85],
            stabilization_grace_secs: 40,
            stabilization_timeout_secs: 2400,
            current_step: Amp::new(1.25),
            initial_current: Amp::new(3.0),
            final_current: Amp::new(9.0),
            initial_voltage: Volt::new(12.0),
            target_voltage: Volt::new(120.0),
            setpoint_power: Watt::new(24.0),
            pacing: Pacing::default(),
        }
    }
}

impl PlanBuilder
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn temperatures(mut self, degrees: Vec<i32>) -> Self
    {
        self.temperatures = degrees;
        self
    }

    pub fn stabilization_grace_secs(mut self, seconds: u64) -> Self
    {
        self.stabilization_grace_secs = seconds;
        self
    }

    pub fn stabilization_timeout_secs(mut self, seconds: u64) -> Self
    {
        self.stabilization_timeout_secs = seconds;
        self
    }

    pub fn current_step(mut self, amps: Amp) -> Self
    {
        self.current_step = amps;
        self
    }

    pub fn initial_current(mut self, amps: Amp) -> Self
    {
        self.initial_current = amps;
        self
    }

    pub fn final_current(mut self, amps: Amp) -> Self
    {
        self.final_current = amps;
        self
    }

    pub fn initial_voltage(mut self, volts: Volt) -> Self
    {
        self.initial_voltage = volts;
        self
    }

    pub fn target_voltage(mut self, volts: Volt) -> Self
    {
        self.target_voltage = volts;
        self
    }

    pub fn setpoint_power(mut self, watts: Watt) -> Self
    {
        self.setpoint_power = watts;
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self
    {
        self.pacing = pacing;
        self
    }

    /// Checks every parameter against its legal range and produces the plan
    pub fn build(self) -> Result<TestPlan, ConfigError>
    {
        if self.temperatures.is_empty() {
            return Err(ConfigError::NoTemperatures);
        }

        for &degrees in &self.temperatures {
            if !(-20..=100).contains(&degrees) {
                return Err(ConfigError::TemperatureRange(degrees));
            }
        }

        if self.stabilization_grace_secs > 60 {
            return Err(ConfigError::StabilizationGrace(self.stabilization_grace_secs));
        }

        if self.stabilization_timeout_secs > 3600 {
            return Err(ConfigError::StabilizationTimeout(self.stabilization_timeout_secs));
        }

        if !(0.0..=10.0).contains(&self.current_step.value()) {
            return Err(ConfigError::CurrentStep(self.current_step));
        }

        if !(0.0..=5.0).contains(&self.initial_current.value()) {
            return Err(ConfigError::InitialCurrent(self.initial_current));
        }

        if !(1.0..=10.0).contains(&self.final_current.value()) {
            return Err(ConfigError::FinalCurrent(self.final_current));
        }

        Ok(TestPlan {
            temperatures: self.temperatures,
            stabilization_grace_secs: self.stabilization_grace_secs,
            stabilization_timeout_secs: self.stabilization_timeout_secs,
            current_step: self.current_step,
            initial_current: self.initial_current,
            final_current: self.final_current,
            initial_voltage: self.initial_voltage,
            target_voltage: self.target_voltage,
            setpoint_power: self.setpoint_power,
            pacing: self.pacing,
        })
    }
}

/// A plan parameter outside its legal range
#[derive(Debug)]
pub enum ConfigError
{
    /// The temperature list is empty; a sweep needs at least one setpoint
    NoTemperatures,
    /// A target temperature outside [-20, 100] °C
    TemperatureRange(i32),
    /// A stabilization grace time outside [0, 60] s
    StabilizationGrace(u64),
    /// A stabilization timeout outside [0, 3600] s
    StabilizationTimeout(u64),
    /// A ramp increment outside [0, 10] A
    CurrentStep(Amp),
    /// An initial ramp current outside [0, 5] A
    InitialCurrent(Amp),
    /// A ramp ceiling outside [1, 10] A
    FinalCurrent(Amp),
}

impl fmt::Display for ConfigError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::NoTemperatures => f.write_str("Temperature list is empty"),
            Self::TemperatureRange(degrees) => {
                write!(f, "Temperature {} °C outside allowed range [-20, 100]", degrees)
            },
            Self::StabilizationGrace(seconds) => {
                write!(f, "Stabilization grace {} s outside allowed range [0, 60]", seconds)
            },
            Self::StabilizationTimeout(seconds) => {
                write!(f, "Stabilization timeout {} s outside allowed range [0, 3600]", seconds)
            },
            Self::CurrentStep(amps) => {
                write!(f, "Current step {} outside allowed range [0, 10] A", amps)
            },
            Self::InitialCurrent(amps) => {
                write!(f, "Initial current {} outside allowed range [0, 5] A", amps)
            },
            Self::FinalCurrent(amps) => {
                write!(f, "Final current {} outside allowed range [1, 10] A", amps)
            },
        }
    }
}

impl Error for ConfigError {}

/// A plan file that failed to parse or validate
#[derive(Debug)]
pub enum PlanError
{
    Parse(toml::de::Error),
    Config(ConfigError),
}

impl fmt::Display for PlanError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Parse(toml_err) => write!(f, "Malformed plan file. {}", toml_err),
            Self::Config(config_err) => write!(f, "Invalid plan. {}", config_err),
        }
    }
}

impl Error for PlanError {}

impl From<toml::de::Error> for PlanError
{
    fn from(this: toml::de::Error) -> Self
    {
        Self::Parse(this)
    }
}

impl From<ConfigError> for PlanError
{
    fn from(this: ConfigError) -> Self
    {
        Self::Config(this)
    }
}
