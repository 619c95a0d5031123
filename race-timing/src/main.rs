//! Race Timing Daemon
//!
//! Command-line daemon tying the system together: it builds readers from a
//! TOML configuration, starts the configured event, feeds every detection
//! into the timing engine and prints the live leaderboard until stopped.
//! On Ctrl-C the event is stopped, results are finalized and the final
//! classification is printed.

use anyhow::{Context, Result};
use clap::Parser;
use race_timing::{
    format_duration, LeaderboardEntry, LogBroadcast, MemoryStore, RaceEngine, Rider,
};
use rfid_reader::ReaderRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod settings;

/// RFID race timing - lap tracking and live leaderboards
#[derive(Parser, Debug)]
#[command(name = "race-timing")]
#[command(about = "Track laps and standings from RFID readers", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Seconds between live leaderboard prints
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    status_interval: u64,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("Race timing daemon v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using reader library v{}", rfid_reader::VERSION);

    let config = settings::load_config(&args.config)?;
    let event = config.event.to_event();
    let event_id = event.id;

    // Seed the in-process store; durable storage is an external collaborator
    let store = Arc::new(MemoryStore::new());
    store.add_event(event.clone());
    for rider in &config.riders {
        store.add_rider(rider.clone());
    }

    let registry = ReaderRegistry::from_configs(&config.readers)
        .context("Failed to build readers from configuration")?;

    println!("═══════════════════════════════════════════════");
    println!("  Race Timing - {}", event.name);
    println!("═══════════════════════════════════════════════");
    println!("  Riders:  {}", config.riders.len());
    println!("  Readers: {}", registry.len());

    let engine = Arc::new(RaceEngine::new(
        Arc::clone(&store),
        Arc::new(LogBroadcast),
    ));

    // All readers funnel into this single ingestion entry point
    let handler = {
        let engine = Arc::clone(&engine);
        Arc::new(move |detection: rfid_reader::TagDetection| {
            if let Err(e) = engine.process_detection(&detection) {
                log::error!("Failed to process detection: {}", e);
            }
        })
    };

    engine.start_event(event_id, chrono::Utc::now())?;
    registry
        .start_all(handler)
        .context("Failed to start readers")?;
    println!("\n🏁 Event started - press Ctrl-C to stop\n");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let interval = Duration::from_secs(args.status_interval.max(1));
    let mut next_status = Instant::now() + interval;
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
        if Instant::now() >= next_status {
            print_leaderboard("LIVE STANDINGS", &engine.live_leaderboard(event_id), &config.riders);
            next_status = Instant::now() + interval;
        }
    }

    println!("\nStopping event...");
    registry.stop_all();
    let standings = engine.stop_event(event_id, chrono::Utc::now())?;
    print_leaderboard("FINAL CLASSIFICATION", &standings, &config.riders);

    for (reader_id, state) in registry.states() {
        log::info!("Reader {} final state: {}", reader_id, state);
    }

    Ok(())
}

/// Print a leaderboard as an ASCII table
fn print_leaderboard(title: &str, standings: &[LeaderboardEntry], riders: &[Rider]) {
    println!("───────────────────────────────────────────────");
    println!("  {}", title);
    println!("───────────────────────────────────────────────");
    if standings.is_empty() {
        println!("  (no laps recorded)");
        return;
    }

    println!("  Pos  No.  Rider                Laps  Total      Best");
    for entry in standings {
        let (number, name) = riders
            .iter()
            .find(|r| r.id == entry.rider_id)
            .map(|r| (r.number, r.name.as_str()))
            .unwrap_or((0, "?"));
        println!(
            "  {:<4} {:<4} {:<20} {:<5} {:<10} {:<10}",
            entry.position,
            number,
            name,
            entry.total_laps,
            entry
                .total_time
                .map(format_duration)
                .unwrap_or_else(|| "-".into()),
            entry
                .best_lap_time
                .map(format_duration)
                .unwrap_or_else(|| "-".into()),
        );
    }
    println!();
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
