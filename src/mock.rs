//! Simulated bench instruments
//!
//! [`MockBench`] models the whole power-delivery path in one place: the supply's bus
//! voltage, the load's programmed current, and a chamber that converges on its
//! setpoint after a configurable number of polls. The load's measured power is simply
//! bus voltage times programmed current.
//!
//! Every state-changing command is appended to a journal in its wire form, prefixed
//! with the instrument it was sent to, so tests can assert on the exact command
//! sequence a run produced. Queries are not journaled.

use std::sync::{ Arc, Mutex, MutexGuard };
use async_trait::async_trait;
use crate::{
    cmd::{ ChamberCmd, LoadCmd, SupplyCmd },
    instrument::{ Chamber, InstrumentError, Load, Supply },
    units::{ Amp, Celsius, Volt, Watt },
};

struct BenchModel
{
    chamber_setpoint: Celsius,
    chamber_reading: Celsius,
    /// Polls remaining until the chamber reading snaps to the setpoint
    polls_until_stable: u32,
    /// Poll count restored by every new temperature command
    settle_polls: u32,
    /// When false the chamber never reaches its setpoint
    converges: bool,
    supply_voltage: Volt,
    load_current: Amp,
    journal: Vec<String>,
}

/// A simulated load, chamber, and supply sharing one bench model
#[derive(Clone)]
pub struct MockBench
{
    model: Arc<Mutex<BenchModel>>,
}

impl MockBench
{
    /// A bench whose chamber stabilizes after two polls
    pub fn new() -> Self
    {
        Self::with_settle_polls(2)
    }

    /// A bench whose chamber stabilizes after the given number of polls
    pub fn with_settle_polls(settle_polls: u32) -> Self
    {
        Self {
            model: Arc::new(Mutex::new(BenchModel {
                chamber_setpoint: Celsius::new(21.0),
                chamber_reading: Celsius::new(21.0),
                polls_until_stable: 0,
                settle_polls,
                converges: true,
                supply_voltage: Volt::zero(),
                load_current: Amp::zero(),
                journal: Vec::new(),
            })),
        }
    }

    /// A bench whose chamber never reaches its setpoint, e.g. a failed compressor
    pub fn never_settling() -> Self
    {
        let bench = Self::new();
        bench.model().converges = false;
        bench
    }

    /// Handles for the three instruments, all backed by this bench
    pub fn handles(&self) -> (MockLoad, MockChamber, MockSupply)
    {
        (
            MockLoad { model: self.model.clone() },
            MockChamber { model: self.model.clone() },
            MockSupply { model: self.model.clone() },
        )
    }

    /// Every state-changing command received so far, in wire form
    pub fn journal(&self) -> Vec<String>
    {
        self.model().journal.clone()
    }

    fn model(&self) -> MutexGuard<'_, BenchModel>
    {
        lock(&self.model)
    }
}

impl Default for MockBench
{
    fn default() -> Self
    {
        Self::new()
    }
}

fn lock(model: &Arc<Mutex<BenchModel>>) -> MutexGuard<'_, BenchModel>
{
    // a poisoned model is still a usable model; tests want the journal regardless
    model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MockLoad
{
    model: Arc<Mutex<BenchModel>>,
}

#[async_trait]
impl Load for MockLoad
{
    async fn set_current(&mut self, amps: Amp) -> Result<(), InstrumentError>
    {
        let mut model = lock(&self.model);
        model.load_current = amps;
        let entry = format!("load: {}", LoadCmd::SetCurrent(amps));
        model.journal.push(entry);
        Ok(())
    }

    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>
    {
        let mut model = lock(&self.model);
        let entry = format!("load: {}", LoadCmd::SetVoltage(volts));
        model.journal.push(entry);
        Ok(())
    }

    async fn measure_current(&mut self) -> Result<Amp, InstrumentError>
    {
        Ok(lock(&self.model).load_current)
    }

    async fn measure_voltage(&mut self) -> Result<Volt, InstrumentError>
    {
        Ok(lock(&self.model).supply_voltage)
    }

    async fn measure_power(&mut self) -> Result<Watt, InstrumentError>
    {
        let model = lock(&self.model);
        Ok(model.supply_voltage * model.load_current)
    }
}

pub struct MockChamber
{
    model: Arc<Mutex<BenchModel>>,
}

#[async_trait]
impl Chamber for MockChamber
{
    async fn set_temperature(&mut self, degrees: Celsius) -> Result<(), InstrumentError>
    {
        let mut model = lock(&self.model);
        model.chamber_setpoint = degrees;
        model.polls_until_stable = model.settle_polls;
        let entry = format!("chamber: {}", ChamberCmd::SetTemperature(degrees));
        model.journal.push(entry);
        Ok(())
    }

    async fn get_temperature(&mut self) -> Result<Celsius, InstrumentError>
    {
        let mut model = lock(&self.model);

        if model.converges {
            if model.polls_until_stable > 0 {
                model.polls_until_stable -= 1;
            }
            else {
                model.chamber_reading = model.chamber_setpoint;
            }
        }

        Ok(model.chamber_reading)
    }
}

pub struct MockSupply
{
    model: Arc<Mutex<BenchModel>>,
}

#[async_trait]
impl Supply for MockSupply
{
    async fn set_voltage(&mut self, volts: Volt) -> Result<(), InstrumentError>
    {
        let mut model = lock(&self.model);
        model.supply_voltage = volts;
        let entry = format!("supply: {}", SupplyCmd::SetVoltage(volts));
        model.journal.push(entry);
        Ok(())
    }

    async fn get_current(&mut self) -> Result<Amp, InstrumentError>
    {
        Ok(lock(&self.model).load_current)
    }

    async fn get_voltage(&mut self) -> Result<Volt, InstrumentError>
    {
        Ok(lock(&self.model).supply_voltage)
    }
}
