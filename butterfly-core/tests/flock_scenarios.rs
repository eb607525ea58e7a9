use butterfly_core::{
    Butterfly, DriftProfile, Facing, Flock, FlockConfig, MotionMode, Timestamp, Vector2D,
    Viewport,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn seeded_flock(config: FlockConfig, viewport: Viewport, seed: u64) -> Flock {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Flock::new(config, viewport, &mut rng)
}

/// Snapshot of the fields that must never change after creation
fn fixed_fields(flock: &Flock) -> Vec<(usize, f32, Vector2D, Vector2D, f32, f32)> {
    flock
        .butterflies()
        .iter()
        .map(|b| {
            (
                b.variant(),
                b.size(),
                b.chase_offset(),
                b.rest_offset(),
                b.scale(),
                b.phase(),
            )
        })
        .collect()
}

#[test]
fn fixed_fields_survive_ticks_moves_and_resizes() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(1280.0, 720.0), 11);
    let before = fixed_fields(&flock);

    let mut now = Timestamp::from_millis(0.0);
    for frame in 0..600 {
        if frame % 45 == 0 {
            let x = (frame as f32 * 3.7) % 1280.0;
            flock.pointer_moved(Vector2D::new(x, 360.0), now);
        }
        if frame == 300 {
            flock.resized(Viewport::new(640.0, 480.0));
        }
        flock.tick(now);
        now = now.add_millis(FRAME_MS);
    }

    assert_eq!(fixed_fields(&flock), before);
    assert_eq!(flock.len(), 6);
}

#[test]
fn target_without_pointer_is_viewport_anchor_in_both_modes() {
    let viewport = Viewport::new(1024.0, 768.0);
    let flock = seeded_flock(FlockConfig::default(), viewport, 5);
    let now = Timestamp::from_millis(987_654.0);

    for butterfly in flock.butterflies() {
        let expected = viewport.center() + butterfly.chase_offset();
        assert_eq!(flock.target(butterfly, MotionMode::Chase, now), expected);
        assert_eq!(flock.target(butterfly, MotionMode::Rest, now), expected);
    }
}

#[test]
fn resize_while_idle_is_idempotent() {
    let mut once = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 21);
    let mut twice = once.clone();

    let resized = Viewport::new(1920.0, 1080.0);
    once.resized(resized);
    twice.resized(resized);
    twice.resized(resized);

    assert_eq!(once.butterflies(), twice.butterflies());
    for butterfly in once.butterflies() {
        assert_eq!(butterfly.position, resized.center() + butterfly.chase_offset());
    }
}

#[test]
fn resize_after_pointer_seen_leaves_positions_alone() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 8);
    flock.pointer_moved(Vector2D::new(20.0, 20.0), Timestamp::from_millis(10.0));
    let positions: Vec<_> = flock.butterflies().iter().map(|b| b.position).collect();

    flock.resized(Viewport::new(300.0, 200.0));

    let after: Vec<_> = flock.butterflies().iter().map(|b| b.position).collect();
    assert_eq!(after, positions);
    assert_eq!(flock.viewport(), Viewport::new(300.0, 200.0));
}

#[test]
fn resize_to_zero_viewport_stays_finite() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 2);
    flock.resized(Viewport::new(0.0, 0.0));
    flock.tick(Timestamp::from_millis(16.0));

    for butterfly in flock.butterflies() {
        assert!(butterfly.position.x.is_finite() && butterfly.position.y.is_finite());
    }
}

#[test]
fn idle_single_butterfly_settles_on_anchor() {
    let viewport = Viewport::new(800.0, 600.0);
    let config = FlockConfig {
        count: 1,
        ..FlockConfig::default()
    };
    let mut flock = seeded_flock(config, viewport, 99);
    let butterfly = flock.butterflies()[0].clone();
    let target = Vector2D::new(400.0, 300.0) + butterfly.chase_offset();
    let start_distance = butterfly.position.distance(&target);

    let mut now = Timestamp::from_millis(0.0);
    let mut worst_late_distance: f32 = 0.0;
    for tick in 0..200 {
        assert_eq!(flock.mode(now), MotionMode::Chase);
        assert_eq!(flock.target(&flock.butterflies()[0], MotionMode::Chase, now), target);

        flock.tick(now);
        now = now.add_millis(FRAME_MS);

        if tick >= 30 {
            let distance = flock.butterflies()[0].position.distance(&target);
            worst_late_distance = worst_late_distance.max(distance);
        }
    }

    let settled = &flock.butterflies()[0];
    assert!(settled.position.distance(&target) < 1.0);
    // Once the first approach is over, any swing past the anchor stays small
    assert!(worst_late_distance <= 0.1 * start_distance + 1e-3);
    assert!(worst_late_distance <= DriftProfile::CHASE.extent().magnitude());
}

#[test]
fn pointer_jump_switches_from_chase_to_rest_at_idle_threshold() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 17);
    let pointer = Vector2D::new(500.0, 500.0);
    flock.pointer_moved(Vector2D::new(0.0, 0.0), Timestamp::from_millis(-1.0));
    flock.pointer_moved(pointer, Timestamp::from_millis(0.0));

    for millis in [0.0, 16.0, 60.0, 119.0, 119.999] {
        assert_eq!(flock.mode(Timestamp::from_millis(millis)), MotionMode::Chase);
    }
    for millis in [120.0, 120.001, 500.0, 60_000.0] {
        assert_eq!(flock.mode(Timestamp::from_millis(millis)), MotionMode::Rest);
    }

    let butterfly = flock.butterflies()[0].clone();
    let chase_time = Timestamp::from_millis(100.0);
    let rest_time = Timestamp::from_millis(120.0);

    let chase_target = flock.target(&butterfly, flock.mode(chase_time), chase_time);
    let expected_chase = pointer
        + butterfly.chase_offset()
        + DriftProfile::CHASE.offset(chase_time.as_secs() + butterfly.phase() as f64);
    assert_eq!(chase_target, expected_chase);

    let rest_target = flock.target(&butterfly, flock.mode(rest_time), rest_time);
    let expected_rest = pointer
        + butterfly.rest_offset()
        + DriftProfile::REST.offset(rest_time.as_secs() + butterfly.phase() as f64);
    assert_eq!(rest_target, expected_rest);

    let rest_extent = DriftProfile::REST.extent();
    let anchor = pointer + butterfly.rest_offset();
    assert!((rest_target.x - anchor.x).abs() <= rest_extent.x + 1e-3);
    assert!((rest_target.y - anchor.y).abs() <= rest_extent.y + 1e-3);
}

#[test]
fn resting_flock_gathers_near_pointer() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 4);
    let pointer = Vector2D::new(200.0, 150.0);
    flock.pointer_moved(pointer, Timestamp::from_millis(0.0));

    let mut now = Timestamp::from_millis(0.0);
    for _ in 0..600 {
        flock.tick(now);
        now = now.add_millis(FRAME_MS);
    }
    assert_eq!(flock.mode(now), MotionMode::Rest);

    // Rest offset (<= 12 px per axis) plus flutter (<= 10 x 8 px) plus a little lag
    for butterfly in flock.butterflies() {
        assert!((butterfly.position.x - pointer.x).abs() < 30.0);
        assert!((butterfly.position.y - pointer.y).abs() < 30.0);
    }
}

#[test]
fn facing_holds_while_velocity_stays_inside_deadzone() {
    let mut butterfly = Butterfly::new(Vector2D::zero(), Vector2D::zero(), Vector2D::zero());

    butterfly.velocity = Vector2D::new(0.05, 0.0);
    let here = butterfly.position;
    butterfly.integrate(here, 0.04, 1.0, 0.1);
    assert_eq!(butterfly.facing, Facing::Right);

    butterfly.velocity = Vector2D::new(-0.05, 0.0);
    let here = butterfly.position;
    butterfly.integrate(here, 0.04, 1.0, 0.1);
    assert_eq!(butterfly.facing, Facing::Right);

    butterfly.velocity = Vector2D::new(-2.0, 0.0);
    let here = butterfly.position;
    butterfly.integrate(here, 0.04, 1.0, 0.1);
    assert_eq!(butterfly.facing, Facing::Left);

    butterfly.velocity = Vector2D::new(0.05, 0.0);
    let here = butterfly.position;
    butterfly.integrate(here, 0.04, 1.0, 0.1);
    assert_eq!(butterfly.facing, Facing::Left);
}

#[test]
fn chasing_left_turns_the_flock_around() {
    let config = FlockConfig {
        chase_drift: DriftProfile::NONE,
        ..FlockConfig::default()
    };
    let mut flock = seeded_flock(config, Viewport::new(800.0, 600.0), 30);

    let mut now = Timestamp::from_millis(0.0);
    for _ in 0..10 {
        flock.pointer_moved(Vector2D::new(-2_000.0, 300.0), now);
        flock.tick(now);
        now = now.add_millis(FRAME_MS);
    }

    assert!(flock
        .butterflies()
        .iter()
        .all(|b| b.facing == Facing::Left && b.velocity.x < 0.0));
}

#[test]
fn variable_frame_intervals_keep_motion_bounded() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 12);
    let pointer = Vector2D::new(400.0, 300.0);

    let mut now = Timestamp::from_millis(1_700_000_000_000.0);
    let intervals = [16.0, 33.0, 8.0, 50.0, 16.7, 100.0];
    for frame in 0..400 {
        if frame % 3 == 0 {
            flock.pointer_moved(pointer, now);
        }
        flock.tick(now);
        now = now.add_millis(intervals[frame % intervals.len()]);
    }

    let reach = 100.0 * std::f32::consts::SQRT_2 + DriftProfile::CHASE.extent().magnitude();
    for butterfly in flock.butterflies() {
        assert!(butterfly.position.distance(&pointer) < reach + 20.0);
    }
}

/// Runs one tick from rest and checks each velocity against the spring step
/// of the expected mode
fn assert_first_step(flock: &mut Flock, mode: MotionMode, now: Timestamp, smoothing: f32, drag: f32) {
    assert_eq!(flock.mode(now), mode);
    let expected: Vec<Vector2D> = flock
        .butterflies()
        .iter()
        .map(|b| {
            assert_eq!(b.velocity, Vector2D::zero());
            (flock.target(b, mode, now) - b.position) * smoothing * drag
        })
        .collect();

    flock.tick(now);

    for (butterfly, velocity) in flock.butterflies().iter().zip(expected) {
        assert_eq!(butterfly.velocity, velocity);
    }
}

#[test]
fn resting_tick_uses_rest_smoothing_and_drag() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 21);
    flock.pointer_moved(Vector2D::new(650.0, 120.0), Timestamp::from_millis(0.0));

    assert_eq!(flock.config().rest_smoothing, 0.10);
    assert_eq!(flock.config().rest_drag, 0.70);
    assert_first_step(&mut flock, MotionMode::Rest, Timestamp::from_millis(200.0), 0.10, 0.70);
}

#[test]
fn chasing_tick_uses_chase_smoothing_and_drag() {
    let mut flock = seeded_flock(FlockConfig::default(), Viewport::new(800.0, 600.0), 21);
    flock.pointer_moved(Vector2D::new(650.0, 120.0), Timestamp::from_millis(0.0));

    assert_eq!(flock.config().chase_smoothing, 0.04);
    assert_eq!(flock.config().chase_drag, 0.75);
    assert_first_step(&mut flock, MotionMode::Chase, Timestamp::from_millis(50.0), 0.04, 0.75);
}
