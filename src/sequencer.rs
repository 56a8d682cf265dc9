//! The sweep state machine and run loop
//!
//! # Purpose
//! One [`Sequencer`] owns a validated [`TestPlan`] and exclusive handles to the three
//! bench instruments for the lifetime of a run. The machine is strictly sequential:
//! every instrument exchange completes before the next state is looked up, and the
//! states form a closed enum so an invalid state is unrepresentable.
//!
//! ```text
//! Start ─▶ ConfigureChamber ─▶ ConfigurePower ─▶ ConfigureLoad ─▶ Measure
//!               ▲                                      ▲             │
//!               │                                      └── ramp ─────┤
//!               └────────── AdvanceTemperature ◀─── target met ──────┘
//!                                    │
//!                                    ▼
//!                                   End
//! ```
//!
//! At each temperature the load current ramps linearly from the plan's initial
//! current in fixed increments until the measured power reaches the setpoint. The
//! ramp is capped at the plan's final current; an unreachable setpoint aborts the run
//! instead of looping forever. The chamber wait is likewise bounded by the plan's
//! stabilization timeout.
//!
//! Run state lives in an explicit [`RunState`] value mutated only by
//! [`Sequencer::step`], so a single transition can be unit tested without driving a
//! whole run.

use std::{ error::Error, fmt, time::Duration };
use log::{ debug, info, warn };
use tokio::time::{ sleep, Instant };
use crate::{
    instrument::{ Chamber, InstrumentError, Load, Supply },
    plan::TestPlan,
    units::{ Amp, Celsius, Volt, Watt },
};

/// Chamber baseline commanded before a sweep begins
const BASELINE_TEMPERATURE: Celsius = Celsius::new(25.0);

/// The machine's states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State
{
    /// Reset the bench to a safe baseline and arm the first temperature
    Start,
    /// Command the chamber and wait for thermal stabilization
    ConfigureChamber,
    /// Bring the supply to the target voltage
    ConfigurePower,
    /// Program the load with the current ramp value
    ConfigureLoad,
    /// Read the bench and decide between ramping and advancing
    Measure,
    /// Move to the next temperature, or finish
    AdvanceTemperature,
    /// Zero all outputs; terminal and idempotent
    End,
}

impl fmt::Display for State
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            Self::Start => "START",
            Self::ConfigureChamber => "CONFIG_CHAMBER",
            Self::ConfigurePower => "CONFIG_POWER",
            Self::ConfigureLoad => "CONFIG_LOAD",
            Self::Measure => "MEASURE",
            Self::AdvanceTemperature => "ADVANCE_TEMPERATURE",
            Self::End => "END",
        })
    }
}

/// Mutable state of one run, owned by the caller and mutated only by `step`
#[derive(Debug, Clone)]
pub struct RunState
{
    pub state: State,
    /// Index into the plan's temperature list, monotonically non-decreasing
    pub temperature_step: usize,
    /// The temperature currently commanded to the chamber
    pub actual_temperature: Celsius,
    /// The load current currently commanded; resets at each new temperature
    pub actual_current: Amp,
    /// Last power measurement taken from the load
    pub output_power: Watt,
    /// True once the machine has reached `End`
    pub stopped: bool,
}

impl RunState
{
    pub fn new() -> Self
    {
        Self {
            state: State::Start,
            temperature_step: 0,
            actual_temperature: Celsius::zero(),
            actual_current: Amp::zero(),
            output_power: Watt::zero(),
            stopped: false,
        }
    }
}

impl Default for RunState
{
    fn default() -> Self
    {
        Self::new()
    }
}

/// A fatal condition that aborts a run
#[derive(Debug)]
pub enum SequenceError
{
    /// An instrument exchange failed
    Instrument(InstrumentError),
    /// The chamber did not reach the commanded temperature within the plan's timeout
    StabilizationTimeout
    {
        target: Celsius,
        waited: Duration,
    },
    /// The power setpoint cannot be met without ramping past the plan's final current
    PowerTargetUnreachable
    {
        setpoint: Watt,
        ceiling: Amp,
    },
}

impl fmt::Display for SequenceError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Instrument(instr_err) => write!(f, "Instrument failure. {}", instr_err),
            Self::StabilizationTimeout { target, waited } => write!(
                f,
                "Chamber did not stabilize at {} within {:?}",
                target, waited,
            ),
            Self::PowerTargetUnreachable { setpoint, ceiling } => write!(
                f,
                "Output power cannot reach {} without exceeding the {} ramp ceiling",
                setpoint, ceiling,
            ),
        }
    }
}

impl Error for SequenceError {}

impl From<InstrumentError> for SequenceError
{
    fn from(this: InstrumentError) -> Self
    {
        Self::Instrument(this)
    }
}

/// Drives one sweep over a load, a chamber, and a supply
pub struct Sequencer<L, C, S>
{
    plan: TestPlan,
    load: L,
    chamber: C,
    supply: S,
}

impl <L, C, S> Sequencer<L, C, S>
    where L: Load, C: Chamber, S: Supply
{
    pub fn with(plan: TestPlan, load: L, chamber: C, supply: S) -> Self
    {
        Self {
            plan,
            load,
            chamber,
            supply,
        }
    }

    pub fn plan(&self) -> &TestPlan
    {
        &self.plan
    }

    /// Runs the machine to completion, pacing steps with the plan's step interval
    ///
    /// On a fatal error the bench outputs are zeroed best-effort before the error is
    /// returned; a failure during that cleanup is logged but does not mask the
    /// original error.
    pub async fn run(&mut self) -> Result<RunState, SequenceError>
    {
        let mut run = RunState::new();

        loop {
            if let Err(err) = self.step(&mut run).await {
                warn!("aborting sweep in {}: {}", run.state, err);
                if let Err(cleanup_err) = self.zero_outputs().await {
                    warn!("could not zero outputs after abort: {}", cleanup_err);
                }
                return Err(err);
            }

            if run.stopped {
                return Ok(run);
            }
            sleep(self.plan.pacing.step_interval).await;
        }
    }

    /// Executes exactly one state transition
    pub async fn step(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        info!("-------- {} --------", run.state);

        match run.state {
            State::Start => self.enter_start(run).await,
            State::ConfigureChamber => self.enter_configure_chamber(run).await,
            State::ConfigurePower => self.enter_configure_power(run).await,
            State::ConfigureLoad => self.enter_configure_load(run).await,
            State::Measure => self.enter_measure(run).await,
            State::AdvanceTemperature => self.enter_advance_temperature(run),
            State::End => self.enter_end(run).await,
        }
    }

    /// Commands all three outputs to zero
    pub async fn zero_outputs(&mut self) -> Result<(), InstrumentError>
    {
        self.supply.set_voltage(Volt::zero()).await?;
        self.load.set_current(Amp::zero()).await?;
        self.load.set_voltage(Volt::zero()).await?;
        Ok(())
    }

    async fn enter_start(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        // safe baseline before any sweep traffic
        self.load.set_current(Amp::zero()).await?;
        self.chamber.set_temperature(BASELINE_TEMPERATURE).await?;
        self.supply.set_voltage(Volt::zero()).await?;

        // validation guarantees a first temperature
        run.actual_temperature = Celsius::from(self.plan.temperatures[0]);
        self.load.set_voltage(self.plan.initial_voltage).await?;

        run.state = State::ConfigureChamber;
        Ok(())
    }

    async fn enter_configure_chamber(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        run.actual_current = self.plan.initial_current;
        self.chamber.set_temperature(run.actual_temperature).await?;
        self.wait_for_stabilization(run.actual_temperature).await?;

        run.state = State::ConfigurePower;
        Ok(())
    }

    /// Polls the chamber until its reading is within tolerance of `target`
    ///
    /// The wait is bounded by the plan's stabilization timeout. Once the reading is in
    /// tolerance, the plan's grace time is spent soaking before the step completes.
    async fn wait_for_stabilization(&mut self, target: Celsius) -> Result<(), SequenceError>
    {
        let tolerance = self.plan.pacing.temperature_tolerance;
        let poll_interval = self.plan.pacing.poll_interval;
        let timeout = Duration::from_secs(self.plan.stabilization_timeout_secs);
        let started = Instant::now();

        loop {
            let reading = self.chamber.get_temperature().await?;

            if reading.within(target, tolerance) {
                info!("chamber stable at {}", reading);
                break;
            }
            debug!("chamber at {}, waiting for {}", reading, target);

            if started.elapsed() >= timeout {
                return Err(SequenceError::StabilizationTimeout {
                    target,
                    waited: started.elapsed(),
                });
            }
            sleep(poll_interval).await;
        }

        let grace = Duration::from_secs(self.plan.stabilization_grace_secs);
        if !grace.is_zero() {
            debug!("soaking for {:?}", grace);
            sleep(grace).await;
        }

        Ok(())
    }

    async fn enter_configure_power(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        self.supply.set_voltage(self.plan.target_voltage).await?;
        sleep(self.plan.pacing.settle).await;

        run.state = State::ConfigureLoad;
        Ok(())
    }

    async fn enter_configure_load(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        self.load.set_current(run.actual_current).await?;
        sleep(self.plan.pacing.settle).await;

        run.state = State::Measure;
        Ok(())
    }

    async fn enter_measure(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        run.output_power = self.load.measure_power().await?;

        // only power drives the decision; the rest is bench observability
        let load_current = self.load.measure_current().await?;
        let load_voltage = self.load.measure_voltage().await?;
        info!("load: {}, {}, {}", load_current, load_voltage, run.output_power);

        let supply_current = self.supply.get_current().await?;
        let supply_voltage = self.supply.get_voltage().await?;
        info!("supply: {}, {}", supply_current, supply_voltage);

        sleep(self.plan.pacing.settle).await;

        if run.output_power >= self.plan.setpoint_power {
            run.state = State::AdvanceTemperature;
            return Ok(());
        }

        let next = run.actual_current + self.plan.current_step;
        if self.plan.current_step.is_zero() || next > self.plan.final_current {
            return Err(SequenceError::PowerTargetUnreachable {
                setpoint: self.plan.setpoint_power,
                ceiling: self.plan.final_current,
            });
        }

        run.actual_current = next;
        run.state = State::ConfigureLoad;
        Ok(())
    }

    fn enter_advance_temperature(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        run.temperature_step += 1;

        match self.plan.temperatures.get(run.temperature_step) {
            Some(&degrees) => {
                run.actual_temperature = Celsius::from(degrees);
                run.state = State::ConfigureChamber;
            },
            None => {
                run.state = State::End;
            },
        }

        Ok(())
    }

    async fn enter_end(&mut self, run: &mut RunState) -> Result<(), SequenceError>
    {
        self.zero_outputs().await?;
        run.stopped = true;
        info!("sweep complete");
        Ok(())
    }
}
