use std::fmt;

use butterfly_core::{Flock, FlockConfig, MotionMode, Timestamp};
use serde::{Deserialize, Serialize};

/// A butterfly image the flock can pick from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub name: String,
    pub src: String,
}

impl Variant {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
        }
    }
}

pub fn default_variants() -> Vec<Variant> {
    vec![
        Variant::new("butterfly-pink", "images/butterfly-pink.png"),
        Variant::new("butterfly-orange", "images/butterfly-orange.png"),
    ]
}

/// User-facing flock configuration.
///
/// Every key is optional in JSON; missing keys fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FlockSettings {
    pub count: usize,
    pub variant_set: Vec<Variant>,
    pub size_range: [f32; 2],
    pub scale_range: [f32; 2],
    pub chase_offset_range: f32,
    pub rest_spread: f32,
    pub chase_smoothing: f32,
    pub rest_smoothing: f32,
    pub chase_drag: f32,
    pub rest_drag: f32,
    pub idle_threshold_ms: f64,
    pub flip_deadzone: f32,
}

impl Default for FlockSettings {
    fn default() -> Self {
        let config = FlockConfig::default();
        Self {
            count: config.count,
            variant_set: default_variants(),
            size_range: [config.size_range.0, config.size_range.1],
            scale_range: [config.scale_range.0, config.scale_range.1],
            chase_offset_range: config.chase_offset_range,
            rest_spread: config.rest_spread,
            chase_smoothing: config.chase_smoothing,
            rest_smoothing: config.rest_smoothing,
            chase_drag: config.chase_drag,
            rest_drag: config.rest_drag,
            idle_threshold_ms: config.idle_threshold_ms,
            flip_deadzone: config.flip_deadzone,
        }
    }
}

impl FlockSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn variant(&self, index: usize) -> Option<&Variant> {
        self.variant_set.get(index)
    }

    /// Validates the settings and converts them into the simulation config
    pub fn to_config(&self) -> Result<FlockConfig, SettingsError> {
        if self.count == 0 {
            return Err(SettingsError::EmptyFlock);
        }
        if self.variant_set.is_empty() {
            return Err(SettingsError::NoVariants);
        }

        check_range("sizeRange", self.size_range)?;
        check_range("scaleRange", self.scale_range)?;
        check_bounds(
            "chaseOffsetRange",
            self.chase_offset_range as f64,
            |v| v >= 0.0,
        )?;
        check_bounds("restSpread", self.rest_spread as f64, |v| v >= 0.0)?;
        check_bounds("chaseSmoothing", self.chase_smoothing as f64, |v| {
            v > 0.0 && v <= 1.0
        })?;
        check_bounds("restSmoothing", self.rest_smoothing as f64, |v| {
            v > 0.0 && v <= 1.0
        })?;
        check_bounds("chaseDrag", self.chase_drag as f64, |v| (0.0..1.0).contains(&v))?;
        check_bounds("restDrag", self.rest_drag as f64, |v| (0.0..1.0).contains(&v))?;
        check_bounds("idleThresholdMs", self.idle_threshold_ms, |v| v > 0.0)?;
        check_bounds("flipDeadzone", self.flip_deadzone as f64, |v| v >= 0.0)?;

        Ok(FlockConfig {
            count: self.count,
            variant_count: self.variant_set.len(),
            size_range: (self.size_range[0], self.size_range[1]),
            scale_range: (self.scale_range[0], self.scale_range[1]),
            chase_offset_range: self.chase_offset_range,
            rest_spread: self.rest_spread,
            chase_smoothing: self.chase_smoothing,
            rest_smoothing: self.rest_smoothing,
            chase_drag: self.chase_drag,
            rest_drag: self.rest_drag,
            idle_threshold_ms: self.idle_threshold_ms,
            flip_deadzone: self.flip_deadzone,
            ..FlockConfig::default()
        })
    }
}

fn check_range(field: &'static str, [min, max]: [f32; 2]) -> Result<(), SettingsError> {
    if min.is_finite() && max.is_finite() && min > 0.0 && min <= max {
        Ok(())
    } else {
        Err(SettingsError::InvalidRange { field, min, max })
    }
}

fn check_bounds(
    field: &'static str,
    value: f64,
    accept: impl Fn(f64) -> bool,
) -> Result<(), SettingsError> {
    if value.is_finite() && accept(value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfBounds { field, value })
    }
}

/// Reasons a settings document is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    Parse(String),
    EmptyFlock,
    NoVariants,
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    OutOfBounds {
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Parse(msg) => write!(f, "invalid settings JSON: {}", msg),
            SettingsError::EmptyFlock => write!(f, "count must be at least 1"),
            SettingsError::NoVariants => write!(f, "variantSet must not be empty"),
            SettingsError::InvalidRange { field, min, max } => {
                write!(f, "{} must be a positive [min, max] pair, got [{}, {}]", field, min, max)
            }
            SettingsError::OutOfBounds { field, value } => {
                write!(f, "{} is out of bounds: {}", field, value)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Motion mode as it appears in snapshots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    Chase,
    Rest,
}

impl From<MotionMode> for SnapshotMode {
    fn from(mode: MotionMode) -> Self {
        match mode {
            MotionMode::Chase => SnapshotMode::Chase,
            MotionMode::Rest => SnapshotMode::Rest,
        }
    }
}

/// Rendered state of one butterfly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ButterflySnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// -1 when facing left, 1 when facing right
    pub facing: i8,
    pub scale: f32,
    pub variant: usize,
    pub size: f32,
}

/// State of the whole flock at one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlockSnapshot {
    pub time_ms: f64,
    pub mode: SnapshotMode,
    pub pointer: Option<[f32; 2]>,
    pub butterflies: Vec<ButterflySnapshot>,
}

impl FlockSnapshot {
    pub fn capture(flock: &Flock, now: Timestamp) -> Self {
        let pointer = flock.pointer();
        let butterflies = flock
            .butterflies()
            .iter()
            .map(|b| ButterflySnapshot {
                x: b.position.x,
                y: b.position.y,
                vx: b.velocity.x,
                vy: b.velocity.y,
                facing: b.facing.sign() as i8,
                scale: b.scale(),
                variant: b.variant(),
                size: b.size(),
            })
            .collect();

        Self {
            time_ms: now.as_millis(),
            mode: flock.mode(now).into(),
            pointer: pointer
                .has_pointer
                .then(|| [pointer.position.x, pointer.position.y]),
            butterflies,
        }
    }
}
