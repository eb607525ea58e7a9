//! Headless driver for the butterfly flock.
//!
//! Replays a scripted timeline of pointer moves and resizes against a fake
//! clock and writes one JSON snapshot per emitted frame.

use std::convert::Infallible;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use butterfly_core::{Flock, RenderSink, Timestamp, Transform, Vector2D, Viewport};
use butterfly_shared::{FlockSettings, FlockSnapshot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A host event scheduled at a point on the fake clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptEvent {
    Move { at: f64, position: Vector2D },
    Resize { at: f64, viewport: Viewport },
}

impl ScriptEvent {
    pub fn at(&self) -> f64 {
        match self {
            ScriptEvent::Move { at, .. } | ScriptEvent::Resize { at, .. } => *at,
        }
    }

    /// Parses `<ms>:<x>,<y>`
    pub fn parse_move(spec: &str) -> Result<Self> {
        let (at, rest) = split_time(spec)?;
        let (x, y) = rest
            .split_once(',')
            .with_context(|| format!("expected <ms>:<x>,<y>, got '{}'", spec))?;
        Ok(ScriptEvent::Move {
            at,
            position: Vector2D::new(parse_number(x)?, parse_number(y)?),
        })
    }

    /// Parses `<ms>:<width>x<height>`
    pub fn parse_resize(spec: &str) -> Result<Self> {
        let (at, rest) = split_time(spec)?;
        let (width, height) = rest
            .split_once('x')
            .with_context(|| format!("expected <ms>:<width>x<height>, got '{}'", spec))?;
        Ok(ScriptEvent::Resize {
            at,
            viewport: Viewport::new(parse_number(width)?, parse_number(height)?),
        })
    }
}

fn split_time(spec: &str) -> Result<(f64, &str)> {
    let (at, rest) = spec
        .split_once(':')
        .with_context(|| format!("missing '<ms>:' prefix in '{}'", spec))?;
    let at = f64::from_str(at.trim()).with_context(|| format!("invalid time '{}'", at))?;
    Ok((at, rest))
}

fn parse_number(value: &str) -> Result<f32> {
    f32::from_str(value.trim()).with_context(|| format!("invalid number '{}'", value))
}

/// Render sink that records what a page would have been told.
///
/// Rendered size is each butterfly's own size, as for an image whose
/// width and height are set from it.
pub struct HeadlessSink {
    sizes: Vec<f32>,
    pub top_left: Vec<Vector2D>,
    pub transforms: Vec<Option<Transform>>,
}

impl HeadlessSink {
    pub fn for_flock(flock: &Flock) -> Self {
        let sizes: Vec<f32> = flock.butterflies().iter().map(|b| b.size()).collect();
        let count = sizes.len();
        Self {
            sizes,
            top_left: vec![Vector2D::zero(); count],
            transforms: vec![None; count],
        }
    }
}

impl RenderSink for HeadlessSink {
    type Error = Infallible;

    fn rendered_size(&self, index: usize) -> Vector2D {
        let size = self.sizes.get(index).copied().unwrap_or_default();
        Vector2D::new(size, size)
    }

    fn set_position(&mut self, index: usize, top_left: Vector2D) -> Result<(), Infallible> {
        if let Some(slot) = self.top_left.get_mut(index) {
            *slot = top_left;
        }
        Ok(())
    }

    fn set_transform(&mut self, index: usize, transform: Transform) -> Result<(), Infallible> {
        if let Some(slot) = self.transforms.get_mut(index) {
            *slot = Some(transform);
        }
        Ok(())
    }
}

/// Parameters of one headless run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub viewport: Viewport,
    pub ticks: usize,
    pub frame_ms: f64,
    pub seed: u64,
    /// Emit a snapshot every `every` ticks
    pub every: usize,
    pub events: Vec<ScriptEvent>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1280.0, 720.0),
            ticks: 600,
            frame_ms: 1000.0 / 60.0,
            seed: 42,
            every: 1,
            events: Vec::new(),
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<FlockSettings> {
    let Some(path) = path else {
        return Ok(FlockSettings::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let settings = FlockSettings::from_json(&json)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
    Ok(settings)
}

/// Runs the flock for `options.ticks` frames, writing JSON lines to `out`.
/// Returns the number of snapshots written.
pub fn run<W: Write>(options: &RunOptions, settings: &FlockSettings, out: &mut W) -> Result<usize> {
    if options.every == 0 {
        bail!("--every must be at least 1");
    }
    if !(options.frame_ms.is_finite() && options.frame_ms > 0.0) {
        bail!("--frame-ms must be positive, got {}", options.frame_ms);
    }

    let config = settings.to_config().context("Invalid flock settings")?;
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut flock = Flock::new(config, options.viewport, &mut rng);
    let mut sink = HeadlessSink::for_flock(&flock);

    let mut events = options.events.clone();
    events.sort_by(|a, b| a.at().total_cmp(&b.at()));
    let mut pending = events.into_iter().peekable();

    let mut written = 0;
    for tick in 0..options.ticks {
        let now = Timestamp::from_millis(tick as f64 * options.frame_ms);

        while let Some(event) = pending.next_if(|e| e.at() <= now.as_millis()) {
            match event {
                ScriptEvent::Move { at, position } => {
                    flock.pointer_moved(position, Timestamp::from_millis(at))
                }
                ScriptEvent::Resize { at, viewport } => {
                    log::debug!("Resize to {}x{} at {}ms", viewport.width, viewport.height, at);
                    flock.resized(viewport);
                }
            }
        }

        flock
            .frame(now, &mut sink)
            .unwrap_or_else(|never| match never {});

        if tick % options.every == 0 {
            serde_json::to_writer(&mut *out, &FlockSnapshot::capture(&flock, now))
                .context("Failed to write snapshot")?;
            writeln!(out)?;
            written += 1;
        }
    }

    Ok(written)
}
