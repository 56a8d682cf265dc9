//! Asynchronous bench-test sequencing for thermal-sweep validation of power-delivery
//! paths
//!
//! A sweep drives three bench instruments: an electronic load, a thermal chamber, and
//! a power supply. For each ambient temperature in the plan the sequencer waits for
//! the chamber to stabilize, then ramps the load current in fixed increments until
//! the measured output power reaches the plan's setpoint, and moves on. When every
//! temperature has been visited, all outputs are forced to zero.
//!
//! The crate is transport agnostic: the stream-backed adapters in [`instrument`] work
//! over anything implementing tokio's `AsyncRead + AsyncWrite`, whether that is a
//! local serial line or a TCP serial bridge. [`mock`] provides a fully simulated
//! bench, so a sweep can be exercised end to end with no hardware and, under tokio's
//! paused clock, no real-time delay.
//!
//! ```no_run
//! use bench_sweep::{ PlanBuilder, Sequencer, Amp, Volt, Watt };
//! use bench_sweep::mock::MockBench;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = PlanBuilder::new()
//!     .temperatures(vec![-10, 25, 85])
//!     .setpoint_power(Watt::new(24.0))
//!     .initial_current(Amp::new(3.0))
//!     .current_step(Amp::new(1.25))
//!     .final_current(Amp::new(10.0))
//!     .target_voltage(Volt::new(4.0))
//!     .build()?;
//!
//! let (load, chamber, supply) = MockBench::new().handles();
//! let mut sequencer = Sequencer::with(plan, load, chamber, supply);
//! let run = sequencer.run().await?;
//! assert!(run.stopped);
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod exec;
pub mod instrument;
pub mod mock;
pub mod plan;
pub mod sequencer;
pub mod units;

pub use instrument::{ Chamber, EquityChamber, InstrumentError, Load, ScpiLoad, ScpiSupply, Supply };
pub use plan::{ ConfigError, Pacing, PlanBuilder, PlanError, TestPlan };
pub use sequencer::{ RunState, SequenceError, Sequencer, State };
pub use units::{ Amp, Celsius, Volt, Watt };
