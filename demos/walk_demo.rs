//! Demonstration of the step counter.
//!
//! This example shows how to:
//! 1. Create a counter backed by a preference file
//! 2. Feed it cumulative step counts
//! 3. Watch the displayed count change
//! 4. Reset under both reset policies
//! 5. Handle a device without a step counter
//!
//! Run with: cargo run --example walk_demo

use stepper::{
    Config, FeedSensor, NoopSensor, PreferenceStore, ResetPolicy, StepCounter, PREFS_NAME,
    RESET_HINT,
};

fn walk(policy: ResetPolicy) {
    println!("Reset policy: {policy:?}");

    let data_dir = std::env::temp_dir().join(format!("stepper-demo-{}", std::process::id()));
    let config = Config {
        data_path: data_dir.clone(),
        reset_policy: policy,
        ..Config::default()
    };

    let sensor = FeedSensor::new("demo");
    let feed = sensor.feed();
    let store = PreferenceStore::open(&config.data_path, PREFS_NAME);
    let mut counter = StepCounter::new(&config, Box::new(store), Box::new(sensor));

    let updates = counter.subscribe();
    counter.start();

    // The device booted a while ago and has already counted some steps
    for cumulative in [1200.0, 1204.0, 1230.0] {
        feed.push_steps(cumulative);
    }
    counter.pump();
    for value in updates.try_iter() {
        println!("  displayed: {}", stepper::format_steps(value));
    }

    println!("  ({RESET_HINT})");
    let baseline = counter.reset();
    println!("  reset -> displayed {}, baseline saved as {baseline}", counter.text());

    // The sensor repeats its last value before the next step is taken
    feed.push_steps(1230.0);
    counter.pump();
    println!("  after next reading: {}", counter.text());

    counter.stop();
    let _ = std::fs::remove_dir_all(&data_dir);
    println!();
}

fn main() {
    println!("Stepper - Walk Demo");
    println!("===================");
    println!();

    walk(ResetPolicy::RetainBaseline);
    walk(ResetPolicy::PinToCumulative);

    println!("Device without a step counter:");
    let config = Config::default();
    let mut counter = StepCounter::new(
        &config,
        Box::new(stepper::MemoryStore::new()),
        Box::new(NoopSensor::new()),
    );
    counter.start();
    for notice in counter.notices().try_iter() {
        println!("  [notice] {}", notice.message());
    }
    println!("  displayed stays at {}", counter.text());
}
