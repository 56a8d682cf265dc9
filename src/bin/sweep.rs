//! Bench sweep runner
//!
//! Reads a TOML bench description naming the serial ports and the test plan, then
//! runs one sweep to completion. Log verbosity is controlled through `RUST_LOG`.
//!
//! ```toml
//! [ports]
//! load = "/dev/ttyS0"
//! chamber = "/dev/ttyS1"
//! supply = "/dev/ttyS2"
//! baud = 9600
//!
//! [plan]
//! temperatures = [-10, 25, 85]
//! setpoint_power = 24.0
//! ```

use std::error::Error;
use serde::Deserialize;
use tokio_serial::SerialPortBuilderExt;
use bench_sweep::{ EquityChamber, PlanBuilder, ScpiLoad, ScpiSupply, Sequencer };

#[derive(Deserialize)]
struct BenchFile
{
    ports: Ports,
    plan: PlanBuilder,
}

#[derive(Deserialize)]
struct Ports
{
    load: String,
    chamber: String,
    supply: String,
    #[serde(default = "default_baud")]
    baud: u32,
}

fn default_baud() -> u32
{
    9600
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>>
{
    env_logger::init();

    let path = std::env::args().nth(1).ok_or("usage: sweep <bench.toml>")?;
    let text = tokio::fs::read_to_string(&path).await?;
    let bench: BenchFile = toml::from_str(&text)?;

    // the plan is validated before any port is opened
    let plan = bench.plan.build()?;

    let load = ScpiLoad::with(
        tokio_serial::new(&bench.ports.load, bench.ports.baud).open_native_async()?,
    );
    let chamber = EquityChamber::with(
        tokio_serial::new(&bench.ports.chamber, bench.ports.baud).open_native_async()?,
    );
    let supply = ScpiSupply::with(
        tokio_serial::new(&bench.ports.supply, bench.ports.baud).open_native_async()?,
    );

    let mut sequencer = Sequencer::with(plan, load, chamber, supply);
    let run = sequencer.run().await?;

    log::info!(
        "sweep finished: {} temperature steps, last power reading {}",
        run.temperature_step,
        run.output_power,
    );
    Ok(())
}
