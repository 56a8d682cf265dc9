//! End-to-end sweep scenarios against the simulated bench
//!
//! All tests run under tokio's paused clock, so settle delays, chamber soak times,
//! and poll intervals elapse in virtual time.

use bench_sweep::{ Amp, PlanBuilder, RunState, SequenceError, Sequencer, State, TestPlan, Volt, Watt };
use bench_sweep::mock::{ MockBench, MockChamber, MockLoad, MockSupply };

/// The reference sweep: 24 W target on a 4 V bus, so the ramp must reach 6.75 A
/// (3.0, 4.25, 5.5, 6.75) at every temperature
fn reference_plan() -> TestPlan
{
    PlanBuilder::new()
        .temperatures(vec![-10, 25, 85])
        .setpoint_power(Watt::new(24.0))
        .initial_current(Amp::new(3.0))
        .current_step(Amp::new(1.25))
        .final_current(Amp::new(10.0))
        .initial_voltage(Volt::new(12.0))
        .target_voltage(Volt::new(4.0))
        .stabilization_grace_secs(5)
        .stabilization_timeout_secs(60)
        .build()
        .unwrap()
}

fn sequencer(bench: &MockBench, plan: TestPlan) -> Sequencer<MockLoad, MockChamber, MockSupply>
{
    let (load, chamber, supply) = bench.handles();
    Sequencer::with(plan, load, chamber, supply)
}

fn entries_for<'j>(journal: &'j [String], instrument: &str) -> Vec<&'j str>
{
    journal
        .iter()
        .filter_map(|entry| entry.strip_prefix(instrument))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn sweep_visits_every_temperature_in_order()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());

    let run = seq.run().await.unwrap();

    assert!(run.stopped);
    assert_eq!(run.state, State::End);
    assert_eq!(run.temperature_step, 3);

    let journal = bench.journal();
    assert_eq!(
        entries_for(&journal, "chamber: "),
        // baseline reset first, then one setpoint per temperature step
        vec!["TEMP 25", "TEMP -10", "TEMP 25", "TEMP 85"]
    );
}

#[tokio::test(start_paused = true)]
async fn ramp_climbs_in_fixed_increments_and_resets_per_temperature()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());

    seq.run().await.unwrap();

    let journal = bench.journal();
    let ramp = ["CURR 3", "CURR 4.25", "CURR 5.5", "CURR 6.75"];
    let mut expected = vec!["CURR 0", "VOLT 12"];
    for _ in 0..3 {
        expected.extend_from_slice(&ramp);
    }
    expected.extend_from_slice(&["CURR 0", "VOLT 0"]);

    assert_eq!(entries_for(&journal, "load: "), expected);
}

#[tokio::test(start_paused = true)]
async fn end_zeroes_every_output()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());

    seq.run().await.unwrap();

    let journal = bench.journal();
    let tail: Vec<&str> = journal[journal.len() - 3..].iter().map(String::as_str).collect();
    assert_eq!(tail, vec!["supply: VOLT 0", "load: CURR 0", "load: VOLT 0"]);
}

#[tokio::test(start_paused = true)]
async fn end_state_is_idempotent()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());

    let mut run = seq.run().await.unwrap();
    let after_first_end = bench.journal();

    seq.step(&mut run).await.unwrap();
    seq.step(&mut run).await.unwrap();

    assert!(run.stopped);
    let journal = bench.journal();
    let repeated = &journal[after_first_end.len()..];
    let zeros = &after_first_end[after_first_end.len() - 3..];
    assert_eq!(repeated, [zeros, zeros].concat());
}

#[tokio::test(start_paused = true)]
async fn stuck_chamber_times_out_and_bench_is_made_safe()
{
    let bench = MockBench::never_settling();
    let plan = PlanBuilder::new()
        .temperatures(vec![85])
        .stabilization_timeout_secs(5)
        .build()
        .unwrap();
    let mut seq = sequencer(&bench, plan);

    let err = seq.run().await.unwrap_err();
    assert!(matches!(err, SequenceError::StabilizationTimeout { .. }));

    let journal = bench.journal();
    let tail: Vec<&str> = journal[journal.len() - 3..].iter().map(String::as_str).collect();
    assert_eq!(tail, vec!["supply: VOLT 0", "load: CURR 0", "load: VOLT 0"]);
}

#[tokio::test(start_paused = true)]
async fn unreachable_power_target_aborts_instead_of_ramping_forever()
{
    let bench = MockBench::new();
    let plan = PlanBuilder::new()
        .temperatures(vec![25])
        .setpoint_power(Watt::new(100.0))
        .target_voltage(Volt::new(4.0))
        .final_current(Amp::new(10.0))
        .stabilization_grace_secs(0)
        .build()
        .unwrap();
    let mut seq = sequencer(&bench, plan);

    let err = seq.run().await.unwrap_err();
    match err {
        SequenceError::PowerTargetUnreachable { setpoint, ceiling } => {
            assert_eq!(setpoint, Watt::new(100.0));
            assert_eq!(ceiling, Amp::new(10.0));
        },
        other => panic!("expected PowerTargetUnreachable, got {:?}", other),
    }

    // the ramp stopped at the ceiling; 3.0 + 5 * 1.25 = 9.25 is the last legal rung
    let journal = bench.journal();
    let load_cmds = journal
        .iter()
        .filter(|entry| entry.starts_with("load: CURR"))
        .collect::<Vec<_>>();
    assert_eq!(load_cmds[load_cmds.len() - 2], "load: CURR 9.25");
    assert_eq!(load_cmds[load_cmds.len() - 1], "load: CURR 0");
}

#[tokio::test(start_paused = true)]
async fn ended_run_reports_final_power_reading()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());

    let run = seq.run().await.unwrap();

    // last measurement before the final advance: 4 V * 6.75 A
    assert_eq!(run.output_power, Watt::new(27.0));
    assert_eq!(run.actual_current, Amp::new(6.75));
}

#[tokio::test(start_paused = true)]
async fn single_step_from_fresh_state_touches_only_baselines()
{
    let bench = MockBench::new();
    let mut seq = sequencer(&bench, reference_plan());
    let mut run = RunState::new();

    seq.step(&mut run).await.unwrap();

    assert_eq!(run.state, State::ConfigureChamber);
    assert!(!run.stopped);
    assert_eq!(bench.journal().len(), 4);
}
