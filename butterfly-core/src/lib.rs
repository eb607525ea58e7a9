#![cfg_attr(not(feature = "std"), no_std)]

//! Cursor-following butterfly flock.
//!
//! A [`Flock`] owns a fixed set of [`Butterfly`] entities that chase the
//! pointer while it moves and settle into a loose stack once it stops. The
//! host feeds pointer and resize events, calls [`Flock::tick`] once per
//! display frame with the current time, and hands a [`RenderSink`] to
//! [`Flock::render`].

use core::f32::consts::TAU;

use rand::Rng;

pub use drift::{DriftProfile, Wave};

/// Upper bound on the number of butterflies a flock can hold
pub const MAX_FLOCK_SIZE: usize = 32;

mod math {
    pub fn sin(x: f64) -> f64 {
        #[cfg(feature = "std")]
        {
            x.sin()
        }
        #[cfg(not(feature = "std"))]
        {
            libm::sin(x)
        }
    }

    pub fn cos(x: f64) -> f64 {
        #[cfg(feature = "std")]
        {
            x.cos()
        }
        #[cfg(not(feature = "std"))]
        {
            libm::cos(x)
        }
    }

    pub fn fabsf(x: f32) -> f32 {
        #[cfg(feature = "std")]
        {
            x.abs()
        }
        #[cfg(not(feature = "std"))]
        {
            libm::fabsf(x)
        }
    }

    pub fn sqrtf(x: f32) -> f32 {
        #[cfg(feature = "std")]
        {
            x.sqrt()
        }
        #[cfg(not(feature = "std"))]
        {
            libm::sqrtf(x)
        }
    }
}

/// A 2D vector used for positions, velocities and offsets in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn magnitude(&self) -> f32 {
        math::sqrtf(self.x * self.x + self.y * self.y)
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        (*self - *other).magnitude()
    }
}

impl core::ops::Add for Vector2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl core::ops::Sub for Vector2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl core::ops::Mul<f32> for Vector2D {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl core::ops::Div<f32> for Vector2D {
    type Output = Self;

    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl core::ops::AddAssign for Vector2D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl core::ops::MulAssign<f32> for Vector2D {
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

/// Milliseconds on the host's monotonic clock.
///
/// Kept in `f64`: epoch-based clocks exceed what `f32` can hold with
/// millisecond precision, and the drift phase is derived from absolute time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Timestamp(f64);

impl Timestamp {
    pub fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    pub fn as_millis(self) -> f64 {
        self.0
    }

    pub fn as_secs(self) -> f64 {
        self.0 / 1000.0
    }

    pub fn millis_since(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    pub fn add_millis(self, millis: f64) -> Self {
        Self(self.0 + millis)
    }
}

/// Current viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Center of the viewport. Zero, negative or non-finite dimensions
    /// collapse to zero so the anchor stays finite.
    pub fn center(&self) -> Vector2D {
        Vector2D::new(non_negative(self.width) / 2.0, non_negative(self.height) / 2.0)
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Global motion state of the flock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    /// The pointer moved within the idle window; butterflies pursue it.
    Chase,
    /// The pointer has been still; butterflies flutter around a stacked anchor.
    Rest,
}

/// Horizontal orientation of a rendered butterfly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Commits to the direction of `vx` only once it clears `deadzone`;
    /// otherwise the current facing is kept.
    pub fn update(self, vx: f32, deadzone: f32) -> Self {
        if !vx.is_finite() || math::fabsf(vx) < deadzone {
            self
        } else if vx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// Last known pointer location and how recently it moved
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub position: Vector2D,
    pub last_move: Timestamp,
    pub has_pointer: bool,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_move(&mut self, position: Vector2D, now: Timestamp) {
        self.position = position;
        self.last_move = now;
        self.has_pointer = true;
    }

    /// Chase while the last move is younger than `idle_threshold_ms`.
    ///
    /// Before any pointer has been seen the flock gathers at its idle
    /// anchor with chase dynamics.
    pub fn mode(&self, now: Timestamp, idle_threshold_ms: f64) -> MotionMode {
        if !self.has_pointer || now.millis_since(self.last_move) < idle_threshold_ms {
            MotionMode::Chase
        } else {
            MotionMode::Rest
        }
    }
}

/// Sum-of-sinusoids wander layered on top of a target point
pub mod drift {
    use crate::math;
    use crate::Vector2D;

    /// One sinusoidal term: `amplitude * sin(frequency * t)` (or cos)
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Wave {
        pub amplitude: f32,
        pub frequency: f64,
    }

    impl Wave {
        pub const fn new(amplitude: f32, frequency: f64) -> Self {
            Self {
                amplitude,
                frequency,
            }
        }
    }

    /// Two sine terms on x and two cosine terms on y, at incommensurate
    /// frequencies so the path does not visibly repeat.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct DriftProfile {
        pub x: [Wave; 2],
        pub y: [Wave; 2],
    }

    impl DriftProfile {
        /// Wide wander while chasing the pointer
        pub const CHASE: DriftProfile = DriftProfile {
            x: [Wave::new(35.0, 1.0), Wave::new(25.0, 0.6)],
            y: [Wave::new(30.0, 1.2), Wave::new(20.0, 0.8)],
        };

        /// Gentle flutter around the resting stack
        pub const REST: DriftProfile = DriftProfile {
            x: [Wave::new(6.0, 1.2), Wave::new(4.0, 0.5)],
            y: [Wave::new(5.0, 0.9), Wave::new(3.0, 0.6)],
        };

        pub const NONE: DriftProfile = DriftProfile {
            x: [Wave::new(0.0, 0.0), Wave::new(0.0, 0.0)],
            y: [Wave::new(0.0, 0.0), Wave::new(0.0, 0.0)],
        };

        /// Displacement at phase-time `t` (seconds plus per-entity phase)
        pub fn offset(&self, t: f64) -> Vector2D {
            let x: f64 = self
                .x
                .iter()
                .map(|wave| wave.amplitude as f64 * math::sin(t * wave.frequency))
                .sum();
            let y: f64 = self
                .y
                .iter()
                .map(|wave| wave.amplitude as f64 * math::cos(t * wave.frequency))
                .sum();
            Vector2D::new(x as f32, y as f32)
        }

        /// Largest displacement the profile can produce on each axis
        pub fn extent(&self) -> Vector2D {
            let sum = |waves: &[Wave; 2]| -> f32 {
                waves.iter().map(|w| math::fabsf(w.amplitude)).sum()
            };
            Vector2D::new(sum(&self.x), sum(&self.y))
        }
    }
}

/// Tuning for the flock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockConfig {
    pub count: usize,
    /// Number of visual variants to pick from
    pub variant_count: usize,
    /// Rendered element size in pixels, `(min, max)`
    pub size_range: (f32, f32),
    pub scale_range: (f32, f32),
    /// Half-width of the square the chase offset is sampled from
    pub chase_offset_range: f32,
    /// Half-width of the square the rest offset is sampled from
    pub rest_spread: f32,
    pub chase_smoothing: f32,
    pub rest_smoothing: f32,
    pub chase_drag: f32,
    pub rest_drag: f32,
    pub idle_threshold_ms: f64,
    /// Minimum |vx| in px/tick before the facing flips
    pub flip_deadzone: f32,
    pub chase_drift: DriftProfile,
    pub rest_drift: DriftProfile,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            count: 6,
            variant_count: 2,
            size_range: (24.0, 40.0),
            scale_range: (0.8, 1.2),
            chase_offset_range: 100.0,
            rest_spread: 12.0,
            chase_smoothing: 0.04,
            rest_smoothing: 0.10,
            chase_drag: 0.75,
            rest_drag: 0.70,
            idle_threshold_ms: 120.0,
            flip_deadzone: 0.1,
            chase_drift: DriftProfile::CHASE,
            rest_drift: DriftProfile::REST,
        }
    }
}

impl FlockConfig {
    pub fn smoothing(&self, mode: MotionMode) -> f32 {
        match mode {
            MotionMode::Chase => self.chase_smoothing,
            MotionMode::Rest => self.rest_smoothing,
        }
    }

    pub fn drag(&self, mode: MotionMode) -> f32 {
        match mode {
            MotionMode::Chase => self.chase_drag,
            MotionMode::Rest => self.rest_drag,
        }
    }

    pub fn drift(&self, mode: MotionMode) -> &DriftProfile {
        match mode {
            MotionMode::Chase => &self.chase_drift,
            MotionMode::Rest => &self.rest_drift,
        }
    }
}

/// Horizontal flip composed with a uniform scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub flip: f32,
    pub scale: f32,
}

/// A single flock member.
///
/// Offsets, scale, phase, variant and size are fixed at creation; only
/// position, velocity and facing evolve.
#[derive(Debug, Clone, PartialEq)]
pub struct Butterfly {
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub facing: Facing,
    variant: usize,
    size: f32,
    chase_offset: Vector2D,
    rest_offset: Vector2D,
    scale: f32,
    phase: f32,
}

impl Butterfly {
    pub fn new(position: Vector2D, chase_offset: Vector2D, rest_offset: Vector2D) -> Self {
        Self {
            position,
            velocity: Vector2D::zero(),
            facing: Facing::Right,
            variant: 0,
            size: 32.0,
            chase_offset,
            rest_offset,
            scale: 1.0,
            phase: 0.0,
        }
    }

    /// Samples a butterfly at `origin` with random look and offsets
    pub fn spawn<R: Rng + ?Sized>(config: &FlockConfig, origin: Vector2D, rng: &mut R) -> Self {
        let variant = if config.variant_count == 0 {
            0
        } else {
            rng.gen_range(0..config.variant_count)
        };
        let size = uniform(rng, config.size_range);
        let chase_offset = Vector2D::new(
            symmetric(rng, config.chase_offset_range),
            symmetric(rng, config.chase_offset_range),
        );
        let rest_offset = Vector2D::new(
            symmetric(rng, config.rest_spread),
            symmetric(rng, config.rest_spread),
        );
        let scale = uniform(rng, config.scale_range);
        let phase = rng.gen::<f32>() * TAU;

        Self {
            position: origin,
            velocity: Vector2D::zero(),
            facing: Facing::Right,
            variant,
            size,
            chase_offset,
            rest_offset,
            scale,
            phase,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn variant(&self) -> usize {
        self.variant
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn chase_offset(&self) -> Vector2D {
        self.chase_offset
    }

    pub fn rest_offset(&self) -> Vector2D {
        self.rest_offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// One spring-and-drag step toward `target`
    pub fn integrate(&mut self, target: Vector2D, smoothing: f32, drag: f32, deadzone: f32) {
        self.velocity += (target - self.position) * smoothing;
        self.velocity *= drag;
        self.position += self.velocity;
        self.facing = self.facing.update(self.velocity.x, deadzone);
    }

    /// Top-left corner that centers an element of `rendered` size on `position`
    pub fn top_left(&self, rendered: Vector2D) -> Vector2D {
        self.position - rendered / 2.0
    }

    pub fn transform(&self) -> Transform {
        Transform {
            flip: self.facing.sign(),
            scale: self.scale,
        }
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * 2.0 * radius
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (min, max): (f32, f32)) -> f32 {
    min + rng.gen::<f32>() * (max - min)
}

/// Surface the flock draws onto, one element per butterfly index
pub trait RenderSink {
    type Error;

    /// Current rendered width and height of the element
    fn rendered_size(&self, index: usize) -> Vector2D;
    fn set_position(&mut self, index: usize, top_left: Vector2D) -> Result<(), Self::Error>;
    fn set_transform(&mut self, index: usize, transform: Transform) -> Result<(), Self::Error>;
}

/// The animated flock and the pointer it follows
#[derive(Debug, Clone)]
pub struct Flock {
    butterflies: heapless::Vec<Butterfly, MAX_FLOCK_SIZE>,
    config: FlockConfig,
    pointer: PointerState,
    viewport: Viewport,
}

impl Flock {
    /// Spawns `config.count` butterflies at the viewport center
    pub fn new<R: Rng + ?Sized>(config: FlockConfig, viewport: Viewport, rng: &mut R) -> Self {
        let count = if config.count > MAX_FLOCK_SIZE {
            log::warn!(
                "Requested {} butterflies, capping at {}",
                config.count,
                MAX_FLOCK_SIZE
            );
            MAX_FLOCK_SIZE
        } else {
            config.count
        };

        let origin = viewport.center();
        let mut butterflies = heapless::Vec::new();
        for _ in 0..count {
            if butterflies.push(Butterfly::spawn(&config, origin, rng)).is_err() {
                break;
            }
        }

        log::info!(
            "Created flock of {} butterflies in {}x{} viewport",
            count,
            viewport.width,
            viewport.height
        );

        Self {
            butterflies,
            config,
            pointer: PointerState::new(),
            viewport,
        }
    }

    /// Builds a flock from prepared butterflies; anything past capacity is dropped.
    pub fn from_butterflies<I>(config: FlockConfig, viewport: Viewport, butterflies: I) -> Self
    where
        I: IntoIterator<Item = Butterfly>,
    {
        let mut stored = heapless::Vec::new();
        for butterfly in butterflies {
            if stored.push(butterfly).is_err() {
                log::warn!("Flock is full, dropping extra butterflies");
                break;
            }
        }

        Self {
            butterflies: stored,
            config,
            pointer: PointerState::new(),
            viewport,
        }
    }

    pub fn butterflies(&self) -> &[Butterfly] {
        &self.butterflies
    }

    pub fn len(&self) -> usize {
        self.butterflies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.butterflies.is_empty()
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pointer_moved(&mut self, position: Vector2D, now: Timestamp) {
        self.pointer.record_move(position, now);
    }

    /// Records the new viewport. Until a pointer has been seen, every
    /// butterfly is re-anchored on the new center plus its chase offset.
    pub fn resized(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if self.pointer.has_pointer {
            return;
        }

        let center = viewport.center();
        for butterfly in self.butterflies.iter_mut() {
            butterfly.position = center + butterfly.chase_offset;
        }
    }

    pub fn mode(&self, now: Timestamp) -> MotionMode {
        self.pointer.mode(now, self.config.idle_threshold_ms)
    }

    /// Point `butterfly` is pulled toward in `mode` at time `now`
    pub fn target(&self, butterfly: &Butterfly, mode: MotionMode, now: Timestamp) -> Vector2D {
        target_point(&self.config, &self.pointer, self.viewport, butterfly, mode, now)
    }

    /// Advances every butterfly by one frame
    pub fn tick(&mut self, now: Timestamp) {
        let mode = self.mode(now);
        let smoothing = self.config.smoothing(mode);
        let drag = self.config.drag(mode);
        let deadzone = self.config.flip_deadzone;

        for butterfly in self.butterflies.iter_mut() {
            let target = target_point(
                &self.config,
                &self.pointer,
                self.viewport,
                butterfly,
                mode,
                now,
            );
            butterfly.integrate(target, smoothing, drag, deadzone);
        }
    }

    /// Writes position and transform of every butterfly to `sink`
    pub fn render<S: RenderSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        for (index, butterfly) in self.butterflies.iter().enumerate() {
            let rendered = sink.rendered_size(index);
            sink.set_position(index, butterfly.top_left(rendered))?;
            sink.set_transform(index, butterfly.transform())?;
        }
        Ok(())
    }

    pub fn frame<S: RenderSink>(&mut self, now: Timestamp, sink: &mut S) -> Result<(), S::Error> {
        self.tick(now);
        self.render(sink)
    }
}

fn target_point(
    config: &FlockConfig,
    pointer: &PointerState,
    viewport: Viewport,
    butterfly: &Butterfly,
    mode: MotionMode,
    now: Timestamp,
) -> Vector2D {
    if !pointer.has_pointer {
        return viewport.center() + butterfly.chase_offset;
    }

    let t = now.as_secs() + butterfly.phase as f64;
    let anchor = match mode {
        MotionMode::Chase => butterfly.chase_offset,
        MotionMode::Rest => butterfly.rest_offset,
    };
    pointer.position + anchor + config.drift(mode).offset(t)
}
