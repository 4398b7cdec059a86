//! Solver properties checked on the CPU backend.

use bodyflow::aggregate::{force_impulse, swirl_impulse};
use bodyflow::grid::Bounds;
use bodyflow::pass::ndc_to_uv;
use bodyflow::prelude::*;
use bodyflow::stages::{external_force, swirl, viscous, StageContext};
use bodyflow::{Field, GridSize, PingPong, CONNECTIONS, MAX_BODY_PARTS, MAX_PEOPLE, MAX_SOURCES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sim(options: SimulationOptions, viewport: UVec2) -> Simulation<CpuBackend> {
    let mut sim = Simulation::new(CpuBackend::new(), options);
    sim.resize(viewport).unwrap();
    sim
}

fn velocity(sim: &Simulation<CpuBackend>) -> &Field<Vec2> {
    sim.backend().velocity().unwrap()
}

/// Largest Chebyshev distance from `center` of any cell with non-zero velocity.
fn support_radius(field: &Field<Vec2>, center: Vec2) -> f32 {
    let mut radius = 0.0f32;
    for y in 0..field.height() {
        for x in 0..field.width() {
            if field.get(x, y).length() > 1e-7 {
                let cell = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let d = (cell - center).abs();
                radius = radius.max(d.x.max(d.y));
            }
        }
    }
    radius
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_matches_scaled_viewport() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        let viewport = UVec2::new(rng.gen_range(1..900), rng.gen_range(1..900));
        let resolution = rng.gen_range(0.1..1.0f32);
        let mut sim = Simulation::new(CpuBackend::new(), SimulationOptions::default().with_resolution(resolution));
        let grid = sim.resize(viewport).unwrap();

        let expected = GridSize::new(
            (viewport.x as f32 * resolution).round() as u32,
            (viewport.y as f32 * resolution).round() as u32,
        );
        assert_eq!(grid, expected);
        let scale = grid.cell_scale().0;
        assert!((scale.x - 1.0 / grid.width as f32).abs() < 1e-7);
        assert!((scale.y - 1.0 / grid.height as f32).abs() < 1e-7);

        let fields = sim.backend().fields().unwrap();
        assert_eq!(fields.velocity.read().size(), grid);
        assert_eq!(fields.velocity.write().size(), grid);
        assert_eq!(fields.viscous.read().size(), grid);
        assert_eq!(fields.pressure.read().size(), grid);
        assert_eq!(fields.density.read().size(), grid);
        assert_eq!(fields.divergence.size(), grid);
        assert_eq!(fields.curl.size(), grid);
        assert_eq!(fields.gradient.size(), grid);
    }
}

#[test]
fn test_resize_resets_fields_and_runs() {
    let options = SimulationOptions::default().with_resolution(1.0).with_cursor_size(4.0);
    let mut sim = sim(options, UVec2::new(48, 32));
    let source = Source {
        coords: Vec2::ZERO,
        diff: Vec2::new(0.05, 0.0),
        moved: true,
    };
    sim.update(0.0, &FrameInputs::pointer(source)).unwrap();
    assert!(velocity(&sim).max_magnitude() > 0.0);

    let grid = sim.resize(UVec2::new(20, 30)).unwrap();
    assert_eq!(velocity(&sim).size(), grid);
    assert_eq!(velocity(&sim).max_magnitude(), 0.0);
    sim.update(0.016, &FrameInputs::default()).unwrap();
    assert_eq!(sim.backend().image().len(), grid.total_cells() * 4);
}

// ============================================================================
// Projection
// ============================================================================

/// A few random Gaussian sources and vortices, well away from the edges.
fn random_flow(grid: GridSize, seed: u64) -> Field<Vec2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs: Vec<(Vec2, f32, f32)> = (0..4)
        .map(|_| {
            let c = Vec2::new(
                rng.gen_range(0.35..0.65) * grid.width as f32,
                rng.gen_range(0.35..0.65) * grid.height as f32,
            );
            (c, rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05))
        })
        .collect();

    Field::from_fn(grid, |x, y| {
        let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        blobs.iter().fold(Vec2::ZERO, |v, (c, source, spin)| {
            let d = p - *c;
            let w = (-d.length_squared() / 40.0).exp();
            v + (d * *source + d.perp() * *spin) * w
        })
    })
}

#[test]
fn test_projection_reduces_divergence() {
    let grid = GridSize::new(64, 64);
    let interior = Bounds::inset(grid, UVec2::splat(4));

    for walled in [false, true] {
        let ctx = StageContext::new(grid, walled, 0.016);
        for seed in [1, 2, 3] {
            let mut backend = CpuBackend::new();
            backend.resize(UVec2::new(64, 64), grid).unwrap();
            backend.begin_frame().unwrap();
            *backend.fields_mut().unwrap().velocity.read_mut() = random_flow(grid, seed);

            backend.divergence(&ctx).unwrap();
            let before = backend.divergence_field().unwrap().rms_in(interior);
            assert!(before > 0.0);

            backend.solve_pressure(&ctx, 60).unwrap();
            backend.subtract_gradient(&ctx).unwrap();
            backend.divergence(&ctx).unwrap();
            let after = backend.divergence_field().unwrap().rms_in(interior);

            assert!(
                after < before * 0.5,
                "walled {} seed {}: divergence {} -> {}",
                walled,
                seed,
                before,
                after
            );
        }
    }
}

#[test]
fn test_zero_viscous_iterations_is_identity() {
    let grid = GridSize::new(32, 24);
    let ctx = StageContext::new(grid, false, 0.016);
    let input = random_flow(grid, 9);
    let mut scratch: PingPong<Field<Vec2>> = PingPong::zeroed(grid);

    assert!(!viscous::diffuse(&ctx, 30.0, 0, &input, &mut scratch));
    assert_eq!(scratch.read().max_magnitude(), 0.0);
    assert_eq!(scratch.write().max_magnitude(), 0.0);

    // Enabled with zero iterations matches disabled, frame for frame.
    let source = Source {
        coords: Vec2::new(0.1, -0.2),
        diff: Vec2::new(0.03, 0.02),
        moved: true,
    };
    let base = SimulationOptions::default().with_resolution(1.0).with_cursor_size(6.0);
    let mut off = sim(base.clone().with_viscous(false, 30.0, 32), UVec2::new(40, 40));
    let mut zero = sim(base.with_viscous(true, 30.0, 0), UVec2::new(40, 40));
    for frame in 0..3 {
        let now = frame as f32 * 0.016;
        let a = off.update(now, &FrameInputs::pointer(source)).unwrap();
        let b = zero.update(now, &FrameInputs::pointer(source)).unwrap();
        assert!(!a.viscous && !b.viscous);
    }
    assert_eq!(velocity(&off).data(), velocity(&zero).data());
}

// ============================================================================
// Source capacity
// ============================================================================

fn full_skeleton(offset: f32) -> [Option<Vec2>; MAX_BODY_PARTS] {
    let mut landmarks = [None; MAX_BODY_PARTS];
    for (i, slot) in landmarks.iter_mut().enumerate() {
        *slot = Some(Vec2::new(offset, 0.6 - i as f32 * 0.1));
    }
    landmarks
}

#[test]
fn test_source_capacity_truncates() {
    assert_eq!(MAX_SOURCES, MAX_BODY_PARTS * MAX_PEOPLE);

    let tracker = SharedTracker::new();
    for person in 0..MAX_PEOPLE {
        tracker.publish_person(person, &full_skeleton(-0.6 + person as f32 * 0.4), 0.0);
    }
    tracker.publish_hand(Hand::Left, Some(Vec2::new(-0.2, -0.8)), 0.0);
    tracker.publish_hand(Hand::Right, Some(Vec2::new(0.2, -0.8)), 0.0);

    let options = SimulationOptions::default()
        .with_resolution(1.0)
        .with_input_mode(InputMode::Body);
    let mut sim = sim(options, UVec2::new(64, 64));
    let report = sim.update(1.0, &FrameInputs::tracking(tracker.snapshot_at(1.0))).unwrap();

    // 4 x 13 body points plus two hands; 4 x 14 skeleton lines.
    assert_eq!(report.points, MAX_SOURCES);
    assert_eq!(report.lines, MAX_SOURCES);
    assert_eq!(report.dropped, 2 + (MAX_PEOPLE * CONNECTIONS.len() - MAX_SOURCES));

    let density = sim.backend().density().unwrap();
    assert!(density.data().iter().all(|d| d.is_finite()));
    assert!(density.max_magnitude() > 0.0);
}

// ============================================================================
// Swirl
// ============================================================================

fn hands_person(tracker: &SharedTracker, left: Vec2, right: Vec2, now: f32) {
    let mut landmarks = [None; MAX_BODY_PARTS];
    landmarks[BodyPart::LeftHand.index()] = Some(left);
    landmarks[BodyPart::RightHand.index()] = Some(right);
    tracker.publish_person(0, &landmarks, now);
}

#[test]
fn test_swirl_needs_both_sources_moving() {
    let left = Vec2::new(-0.3, 0.0);
    let right = Vec2::new(0.3, 0.0);

    let run = |is_swirl: bool, right_moves: bool| {
        let tracker = SharedTracker::new();
        hands_person(&tracker, left, right, 0.0);
        let right_next = if right_moves { right + Vec2::new(0.0, 0.05) } else { right };
        hands_person(&tracker, left + Vec2::new(0.0, -0.05), right_next, 0.05);

        let options = SimulationOptions::default()
            .with_resolution(1.0)
            .with_cursor_size(4.0)
            .with_input_mode(InputMode::Body)
            .with_swirl(is_swirl, 40.0);
        let mut sim = sim(options, UVec2::new(48, 48));
        let report = sim.update(0.06, &FrameInputs::tracking(tracker.snapshot_at(0.06))).unwrap();
        (report.swirls, velocity(&sim).clone())
    };

    let (swirls, one_moving) = run(true, false);
    assert_eq!(swirls, 0);
    let (_, swirl_off) = run(false, false);
    assert_eq!(one_moving.data(), swirl_off.data());

    let (swirls, both_moving) = run(true, true);
    assert_eq!(swirls, 1);
    let (_, both_no_swirl) = run(false, true);
    assert_ne!(both_moving.data(), both_no_swirl.data());
}

#[test]
fn test_swirl_between_sources_is_tangential() {
    let grid = GridSize::new(100, 100);
    let ctx = StageContext::new(grid, false, 0.016);
    let a = Source {
        coords: Vec2::new(-0.4, 0.0),
        diff: Vec2::new(0.0, -0.05),
        moved: true,
    };
    let b = Source {
        coords: Vec2::new(0.4, 0.0),
        diff: Vec2::new(0.0, 0.05),
        moved: true,
    };
    assert!((ndc_to_uv(a.coords) - Vec2::new(0.3, 0.5)).length() < 1e-6);
    assert!((ndc_to_uv(b.coords) - Vec2::new(0.7, 0.5)).length() < 1e-6);

    let impulse = swirl_impulse(&a, &b, 40.0, 5.0, grid.cell_scale()).unwrap();
    let mut field = Field::new(grid);
    swirl::apply_swirl(&ctx, &impulse, &mut field);

    // Along the line joining the sources the radial direction is x.
    let (mut tangential, mut radial) = (0.0, 0.0);
    for y in [49, 50] {
        for x in (32..=68).filter(|x| !(48..=51).contains(x)) {
            let v = field.get(x, y);
            tangential += v.y.abs();
            radial += v.x.abs();
        }
    }
    assert!(tangential > 0.0);
    assert!(tangential > radial * 5.0, "tangential {} radial {}", tangential, radial);
}

// ============================================================================
// End to end
// ============================================================================

/// Largest velocity magnitude at cells more than `radius` cells from `center`.
fn max_beyond(field: &Field<Vec2>, center: Vec2, radius: f32) -> f32 {
    let mut max = 0.0f32;
    for y in 0..field.height() {
        for x in 0..field.width() {
            let cell = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if (cell - center).length() > radius {
                max = max.max(field.get(x, y).length());
            }
        }
    }
    max
}

#[test]
fn test_single_pointer_force_is_local() {
    let options = SimulationOptions::default();
    assert!(!options.is_bounce && !options.is_viscous && options.is_bfecc);

    let viewport = UVec2::new(640, 640);
    let grid = GridSize::from_viewport(viewport, options.resolution);
    let cursor = options.cursor_size;
    let reach = cursor + 2.0 * options.iterations_poisson as f32 + 3.0;
    assert!(reach * 2.0 < grid.width as f32, "grid too small for the locality check");

    let source = Source {
        coords: Vec2::ZERO,
        diff: Vec2::new(0.1, 0.0),
        moved: true,
    };
    let center = grid.as_vec2() * 0.5;

    // The force pass alone is exactly zero beyond the cursor.
    let ctx = StageContext::new(grid, false, options.dt);
    let impulse = force_impulse(&source, options.mouse_force, cursor, grid.cell_scale());
    let mut forced = Field::new(grid);
    external_force::apply_force(&ctx, &impulse, &mut forced);
    assert!(forced.max_magnitude() > 0.0);
    assert_eq!(max_beyond(&forced, center, cursor + 1.0), 0.0);

    let mut sim = sim(options, viewport);
    sim.update(0.0, &FrameInputs::pointer(source)).unwrap();
    let v = velocity(&sim);
    let (cx, cy) = (grid.width / 2, grid.height / 2);
    for (x, y) in [(cx - 1, cy - 1), (cx, cy - 1), (cx - 1, cy), (cx, cy)] {
        assert!(v.get(x, y).length() > 1e-4, "no velocity at ({}, {})", x, y);
    }

    // Projection leaves a small residual beyond the cursor, bounded
    // relative to the peak, and nothing past the pressure stencil's reach.
    let peak = v.max_magnitude();
    let residual = max_beyond(v, center, cursor + 1.0);
    assert!(residual < peak * 0.05, "residual {} beyond the cursor, peak {}", residual, peak);
    assert!(support_radius(v, center) <= reach);
    assert_eq!(v.get(0, 0), Vec2::ZERO);
    assert_eq!(v.get(grid.width - 1, grid.height - 1), Vec2::ZERO);
}

// ============================================================================
// Walls
// ============================================================================

#[test]
fn test_walled_ring_stays_mirrored_after_projection() {
    let options = SimulationOptions::default()
        .with_resolution(1.0)
        .with_cursor_size(6.0)
        .with_bounce(true)
        .with_poisson_iterations(8);
    let mut sim = sim(options, UVec2::new(40, 30));
    let source = Source {
        coords: Vec2::new(0.85, 0.0),
        diff: Vec2::new(0.08, 0.03),
        moved: true,
    };
    for frame in 0..4 {
        sim.update(frame as f32 * 0.014, &FrameInputs::pointer(source)).unwrap();
    }

    let v = velocity(&sim);
    let (w, h) = (v.width(), v.height());
    assert!(v.max_magnitude() > 0.0);
    for y in 0..h {
        for x in 0..w {
            let on_x = x == 0 || x == w - 1;
            let on_y = y == 0 || y == h - 1;
            if !on_x && !on_y {
                continue;
            }
            let inner = v.get(x.clamp(1, w - 2), y.clamp(1, h - 2));
            let expected = Vec2::new(
                if on_x { -inner.x } else { inner.x },
                if on_y { -inner.y } else { inner.y },
            );
            assert_eq!(v.get(x, y), expected, "ring cell ({}, {})", x, y);
        }
    }

    // Opening the walls next frame starts from that consistent ring.
    sim.options_mut().is_bounce = false;
    let report = sim.update(0.1, &FrameInputs::default()).unwrap();
    assert!(!report.walled);
    assert!(velocity(&sim).data().iter().all(|v| v.is_finite()));
}
