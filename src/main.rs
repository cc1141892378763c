//! Stepper CLI
//!
//! Steps taken since a resettable baseline.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use stepper::{
    Config, FeedSensor, KeyValueStore, NoopSensor, PreferenceStore, ResetPolicy, SensorAccuracy,
    SensorFeed, SensorReading, StepCounter, StepSensor, BASELINE_KEY, PREFS_NAME, RESET_HINT,
    VERSION,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepper")]
#[command(version = VERSION)]
#[command(about = "Counts steps taken since a resettable baseline", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track steps from readings on stdin
    ///
    /// Each line is a cumulative step count, `accuracy N`, `reset` or `quit`.
    Run {
        /// Behave as a device without a step counter
        #[arg(long)]
        no_sensor: bool,

        /// Reset policy (retain or pin), overrides the config file
        #[arg(long)]
        policy: Option<String>,
    },

    /// Reset the step count
    Reset {
        /// Current cumulative step count, used by the pin policy
        #[arg(long)]
        at: Option<f32>,

        /// Reset policy (retain or pin), overrides the config file
        #[arg(long)]
        policy: Option<String>,
    },

    /// Show the saved baseline
    Status,

    /// Show configuration
    Config {
        /// Save a new default reset policy (retain or pin)
        #[arg(long)]
        set_policy: Option<String>,
    },

    /// Serve the step count over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8377")]
        port: u16,

        /// Behave as a device without a step counter
        #[arg(long)]
        no_sensor: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Run { no_sensor, policy } => cmd_run(no_sensor, policy.as_deref()),
        Commands::Reset { at, policy } => cmd_reset(at, policy.as_deref()),
        Commands::Status => cmd_status(),
        Commands::Config { set_policy } => cmd_config(set_policy.as_deref()),
        #[cfg(feature = "server")]
        Commands::Serve { port, no_sensor } => cmd_serve(port, no_sensor),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("stepper=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Load configuration and apply a policy override.
fn load_config(policy: Option<&str>) -> Result<Config> {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {e}");
        Config::default()
    });

    if let Some(name) = policy {
        match ResetPolicy::from_name(name) {
            Some(policy) => config.reset_policy = policy,
            None => bail!("unknown reset policy `{name}` (expected retain or pin)"),
        }
    }
    Ok(config)
}

/// Commands read from stdin that are not sensor readings.
enum ConsoleCommand {
    Reset,
    Quit,
}

/// One parsed line of console input.
#[derive(Debug, PartialEq)]
enum ConsoleInput {
    Reading(SensorReading),
    Reset,
    Quit,
}

fn parse_console_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "reset" => Some(ConsoleInput::Reset),
        "quit" | "exit" => Some(ConsoleInput::Quit),
        "accuracy" => {
            let raw = parts.next()?.parse::<i32>().ok()?;
            Some(ConsoleInput::Reading(SensorReading::Accuracy(
                SensorAccuracy::from_raw(raw),
            )))
        }
        value => value
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| ConsoleInput::Reading(SensorReading::steps(v))),
    }
}

/// Read stdin on a background thread, feeding readings to the sensor.
fn spawn_console_reader(feed: Option<SensorFeed>, commands: Sender<ConsoleCommand>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_console_line(&line) {
                Some(ConsoleInput::Reading(reading)) => match feed {
                    Some(ref feed) => {
                        if !feed.push(reading) {
                            tracing::debug!("reading dropped, sensor not listening");
                        }
                    }
                    None => tracing::debug!("reading ignored, no sensor"),
                },
                Some(ConsoleInput::Reset) => {
                    let _ = commands.send(ConsoleCommand::Reset);
                }
                Some(ConsoleInput::Quit) => break,
                None if line.trim().is_empty() => {}
                None => eprintln!("Unrecognised input: {line}"),
            }
        }
        let _ = commands.send(ConsoleCommand::Quit);
    });
}

fn cmd_run(no_sensor: bool, policy: Option<&str>) -> Result<()> {
    let config = load_config(policy)?;
    let store = PreferenceStore::open(&config.data_path, PREFS_NAME);

    let (sensor, feed): (Box<dyn StepSensor>, Option<SensorFeed>) = if no_sensor {
        (Box::new(NoopSensor::new()), None)
    } else {
        let sensor = FeedSensor::new("console");
        let feed = sensor.feed();
        (Box::new(sensor), Some(feed))
    };

    println!("Stepper v{VERSION}");
    println!("  Reset policy: {:?}", config.reset_policy);
    println!("  Preferences: {:?}", store.path());
    println!();
    println!("Enter cumulative step counts, `accuracy N`, `reset` or `quit`.");
    println!("Press Ctrl+C to stop");
    println!();

    let mut counter = StepCounter::new(&config, Box::new(store), sensor);
    let displayed = counter.subscribe();
    counter.start();
    println!("{}  ({RESET_HINT})", counter.text());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let (command_tx, command_rx) = unbounded();
    spawn_console_reader(feed, command_tx);

    while running.load(Ordering::SeqCst) {
        counter.pump_timeout(Duration::from_millis(100));

        for command in command_rx.try_iter() {
            match command {
                ConsoleCommand::Reset => {
                    // Readings typed before `reset` must land first
                    counter.pump();
                    counter.reset();
                }
                ConsoleCommand::Quit => running.store(false, Ordering::SeqCst),
            }
        }

        for notice in counter.notices().try_iter() {
            println!("[notice] {}", notice.message());
        }

        if let Some(value) = displayed.try_iter().last() {
            println!("{}", stepper::format_steps(value));
        }
    }

    // Readings that arrived alongside `quit` still count
    counter.pump();
    counter.stop();

    println!();
    println!("Stopped at {} steps (baseline {}).", counter.text(), counter.baseline());
    Ok(())
}

fn cmd_reset(at: Option<f32>, policy: Option<&str>) -> Result<()> {
    let config = load_config(policy)?;
    if config.reset_policy == ResetPolicy::PinToCumulative && at.is_none() {
        bail!("the pin policy needs the current cumulative count (--at)");
    }

    let store = PreferenceStore::open(&config.data_path, PREFS_NAME);
    let mut counter = StepCounter::new(&config, Box::new(store), Box::new(FeedSensor::new("cli")));
    counter.start();
    if let Some(cumulative) = at {
        counter.handle_reading(SensorReading::steps(cumulative));
    }
    let baseline = counter.reset();
    counter.stop();

    println!("Steps reset. Baseline saved as {baseline}.");
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = load_config(None)?;
    let store = PreferenceStore::open(&config.data_path, PREFS_NAME);

    println!("Stepper Status");
    println!("==============");
    println!();
    println!("Preferences: {:?}", store.path());
    match store.get_f32(BASELINE_KEY, 0.0) {
        Ok(baseline) => println!("Saved baseline: {baseline}"),
        Err(e) => println!("Saved baseline: unreadable ({e})"),
    }
    println!("Reset policy: {:?}", config.reset_policy);
    println!("Sensor delay: {:?}", config.sensor_delay);
    Ok(())
}

fn cmd_config(set_policy: Option<&str>) -> Result<()> {
    let config = load_config(set_policy)?;
    if set_policy.is_some() {
        config.save().context("Error saving config")?;
        println!("Reset policy set to {:?}.", config.reset_policy);
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Error serializing config")?
    );
    Ok(())
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16, no_sensor: bool) -> Result<()> {
    use stepper::server::{run, ServerConfig};

    let config = load_config(None)?;
    let mut server_config = ServerConfig::new(port, config);
    server_config.sensor_present = !no_sensor;

    let runtime = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;
    runtime.block_on(async move {
        let (addr, shutdown_tx) = run(server_config).await?;
        println!("Serving step count on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        let _ = shutdown_tx.send(());
        Ok::<(), anyhow::Error>(())
    })
}
