//! Demonstration of the Telemetry Viewport refresh loop.
//!
//! This example shows how to:
//! 1. Build a dashboard and a simulated gyroscope source
//! 2. Start the refresh scheduler
//! 3. Receive data-arrived events and render frames
//! 4. Page the viewport while data keeps arriving
//!
//! Run with: cargo run --example watch_demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_viewport::{
    activity::ActivityLog,
    collector::SimulatedSource,
    scheduler::{RefreshEvent, RefreshScheduler, SchedulerConfig},
    summary_table, Config, Dashboard, ViewportPolicy,
};

fn main() {
    println!("Telemetry Viewport - Watch Demo");
    println!("===============================");
    println!();

    let config = Config {
        window_size: 20,
        capacity: Some(200),
        viewport_policy: ViewportPolicy::FollowUnlessPaging,
        ..Config::default()
    };

    let dashboard = match Dashboard::new(&config) {
        Ok(dashboard) => Arc::new(dashboard),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };
    let source = match SimulatedSource::seeded(50, 5, 42) {
        Ok(source) => Box::new(source),
        Err(e) => {
            eprintln!("Error creating source: {e}");
            return;
        }
    };
    let activity = Arc::new(ActivityLog::in_memory());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            return;
        }
    };
    let _guard = runtime.enter();

    let schedule = SchedulerConfig {
        interval: Duration::from_millis(500),
        fetch_timeout: Duration::from_secs(1),
    };
    let mut scheduler = RefreshScheduler::new(schedule, dashboard.clone(), source, activity.clone());
    let events = scheduler.subscribe();

    println!("Refreshing every 0.5s for 10 ticks...");
    println!("After tick 4 the viewport pages back and stays put.");
    println!();

    if let Err(e) = scheduler.start() {
        eprintln!("Error starting scheduler: {e}");
        return;
    }

    // Set up stop flag
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let mut tick = 0;
    while running.load(Ordering::SeqCst) && tick < 10 {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(RefreshEvent::DataArrived { count, .. }) => {
                tick += 1;
                if tick == 4 {
                    let _ = dashboard.retreat(10);
                }

                let payload = dashboard.render_payload();
                println!(
                    "Tick {tick}: +{count} samples, viewing {}..{} of {}",
                    payload.viewport.offset,
                    payload.viewport.offset + payload.slice.len(),
                    payload.total_samples
                );
                for line in summary_table(&payload.summary).lines() {
                    println!("    {line}");
                }
                println!();
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    runtime.block_on(scheduler.join());

    println!("{}", activity.summary());
}
