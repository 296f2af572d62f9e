/// Basic usage example: feed a turning-then-resting phone into a sensing
/// session and print headings and motion transitions.
///
/// Run with `RUST_LOG=attitude_sensing=debug` to see the core's logs.
use std::time::Duration;

use attitude_sensing::{
    HeadingReadout, ReadingWindow, ScalarKind, SensingConfig, SensingError, SensingSession,
    SensorAvailability, SensorSample, SimulatedSensor, SIMULATED_INTERVAL_MS,
};

#[tokio::main]
async fn main() -> Result<(), SensingError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attitude_sensing=info".into()),
        )
        .init();

    println!("=== Attitude Sensing: Basic Example ===\n");

    let config = SensingConfig::default();
    let mut session = SensingSession::start(SensorAvailability::fused(), &config)?;

    // Phone lying flat, turning from north to east over one second, then resting.
    session.push(SensorSample::accelerometer(0.0, 0.0, 9.81))?;
    for step in 0..=10 {
        let heading = (step as f32 * 9.0).to_radians();
        session.push(SensorSample::magnetometer(
            -22.0 * heading.sin(),
            22.0 * heading.cos(),
            -42.0,
        ))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Some(attitude) = session.attitude() {
            println!("{}", HeadingReadout::from_attitude(&attitude, config.display.round));
        }
    }

    println!("\nWaiting for the device to settle...");
    // Drain the queue; `motion_state` alone would do for a poll-only UI.
    for _ in 0..2 {
        match tokio::time::timeout(Duration::from_secs(3), session.next_transition()).await {
            Ok(Some(transition)) => println!(
                "[{:>5} ms] {}",
                transition.timestamp_ms,
                transition.state.description()
            ),
            _ => break,
        }
    }

    let session_state = session.motion_state().description();
    session.shutdown().await?;

    println!("Final state: {}", session_state);

    // Scalar screens without hardware fall back to simulated readings.
    let kind = ScalarKind::Temperature;
    let (lo, hi) = kind.display_range();
    println!("\nSimulated {:?}, chart {lo}..{hi}{}", kind, kind.unit());

    let mut sim = SimulatedSensor::new(config.simulation_seed);
    let mut window = ReadingWindow::new(kind);
    let mut ticks = tokio::time::interval(Duration::from_millis(SIMULATED_INTERVAL_MS));
    for _ in 0..5 {
        ticks.tick().await;
        window.push(sim.reading(kind))?;
        if let Some(summary) = window.summary() {
            println!("{summary}");
        }
    }

    Ok(())
}
