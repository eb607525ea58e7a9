use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use butterfly_cli::{load_settings, run, RunOptions, ScriptEvent};
use butterfly_core::Viewport;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless butterfly flock simulator", long_about = None)]
struct Args {
    /// JSON flock settings (camelCase keys, all optional)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: usize,

    /// Milliseconds between frames
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    frame_ms: f64,

    /// Seed for the butterflies' random look and offsets
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Pointer move as <ms>:<x>,<y> (repeatable)
    #[arg(short = 'm', long = "move", value_parser = ScriptEvent::parse_move)]
    moves: Vec<ScriptEvent>,

    /// Viewport resize as <ms>:<width>x<height> (repeatable)
    #[arg(short = 'r', long = "resize", value_parser = ScriptEvent::parse_resize)]
    resizes: Vec<ScriptEvent>,

    /// Emit a snapshot every N frames
    #[arg(short, long, default_value_t = 1)]
    every: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let settings = load_settings(args.settings.as_deref())?;
    let options = RunOptions {
        viewport: Viewport::new(args.width, args.height),
        ticks: args.ticks,
        frame_ms: args.frame_ms,
        seed: args.seed,
        every: args.every,
        events: args.moves.into_iter().chain(args.resizes).collect(),
    };

    log::info!(
        "Simulating {} frames of {} butterflies in {}x{}",
        options.ticks,
        settings.count,
        args.width,
        args.height
    );

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let written = run(&options, &settings, &mut out).context("Simulation failed")?;
    out.flush()?;

    log::info!("Wrote {} snapshots", written);
    Ok(())
}
