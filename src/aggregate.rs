//! Source aggregation.
//!
//! Maps the pointer, tracked people and dedicated hands onto the impulses and
//! density sources consumed by the solver stages. Lists are rebuilt every
//! frame into storage owned by the [`SourceAggregator`].

use glam::{Vec2, Vec3};

use crate::body::{
    BodyConnection, BodyPart, ForceCategory, Hand, PartState, Person, CONNECTIONS, MAX_BODY_PARTS, MAX_PEOPLE,
};
use crate::grid::{CellScale, GridSize};
use crate::options::{InputMode, SimulationOptions};
use crate::pass::ndc_to_uv;
use crate::source::{ForceImpulse, FrameSources, LineSource, PointSource, Source, SwirlImpulse};
use crate::tracker::TrackerSnapshot;

/// Per-person tint, indexed by tracker slot. The last entry colours the
/// dedicated hands and the pointer.
pub const PALETTE: [Vec3; MAX_PEOPLE + 1] = [
    Vec3::new(0.20, 0.55, 1.00),
    Vec3::new(1.00, 0.35, 0.45),
    Vec3::new(0.35, 1.00, 0.55),
    Vec3::new(1.00, 0.80, 0.25),
    Vec3::new(0.90, 0.90, 1.00),
];

/// Everything the simulation reads from the outside world in one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInputs {
    /// The pointer, if it is inside the window.
    pub pointer: Option<Source>,
    pub tracking: TrackerSnapshot,
}

impl FrameInputs {
    pub fn pointer(source: Source) -> Self {
        Self {
            pointer: Some(source),
            ..Default::default()
        }
    }

    pub fn tracking(tracking: TrackerSnapshot) -> Self {
        Self {
            pointer: None,
            tracking,
        }
    }
}

/// An ExternalForce impulse for one source.
///
/// The kernel spans `cursor_size` cells around the source. Its center is
/// clipped so the whole kernel plus a two-cell margin stays inside the
/// domain; on grids too small for that, the center collapses to the middle.
pub fn force_impulse(source: &Source, scale: f32, cursor_size: f32, cell_scale: CellScale) -> ForceImpulse {
    let cell = cell_scale.ndc();
    let extent = cell * cursor_size;
    let limit = Vec2::ONE - extent - cell * 2.0;
    let center = Vec2::new(clip(source.coords.x, limit.x), clip(source.coords.y, limit.y));

    ForceImpulse {
        center,
        extent,
        force: Vec2::new(source.diff.x * 0.5, -source.diff.y * 0.5) * scale,
    }
}

fn clip(value: f32, limit: f32) -> f32 {
    if limit <= 0.0 {
        0.0
    } else {
        value.clamp(-limit, limit)
    }
}

/// A swirl between two sources, or `None` unless both are moving.
pub fn swirl_impulse(a: &Source, b: &Source, swirl_force: f32, cursor_size: f32, cell_scale: CellScale) -> Option<SwirlImpulse> {
    if !a.moved || !b.moved {
        return None;
    }

    let cell = cell_scale.ndc();
    let offset = b.coords - a.coords;
    let separation = offset.length();
    let relative = b.diff - a.diff;

    let inner = Vec2::ONE - cell;
    let center = ((a.coords + b.coords) * 0.5).clamp(-inner, inner);
    let extent = Vec2::splat(separation * 0.5) + cell * cursor_size;

    let cross = offset.perp_dot(relative);
    let sign = if cross < 0.0 { -1.0 } else { 1.0 };

    Some(SwirlImpulse {
        center,
        extent,
        strength: sign * swirl_force * relative.length() * separation,
    })
}

/// `part` as a source. A displacement already injected on an earlier frame
/// reads as zero until the tracker reports a new observation.
fn take_source(injected: &mut Option<f32>, part: &PartState, now: f32) -> Source {
    let mut source = Source::from_part(part, now);
    if *injected == Some(part.observed_at) {
        source.diff = Vec2::ZERO;
    } else {
        *injected = Some(part.observed_at);
    }
    source
}

/// Builds [`FrameSources`] from the frame's inputs, reusing its allocation.
///
/// Tracker observations arrive slower than frames, so the aggregator
/// remembers which observation each part's displacement was last injected
/// from.
#[derive(Debug, Default)]
pub struct SourceAggregator {
    sources: FrameSources,
    injected: [[Option<f32>; MAX_BODY_PARTS]; MAX_PEOPLE],
    injected_hands: [Option<f32>; 2],
}

impl SourceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources from the most recent [`collect`](Self::collect).
    pub fn sources(&self) -> &FrameSources {
        &self.sources
    }

    /// Rebuild the source lists for this frame.
    pub fn collect(&mut self, options: &SimulationOptions, grid: GridSize, inputs: &FrameInputs) -> &FrameSources {
        self.sources.clear();
        let cell_scale = grid.cell_scale();

        match options.input_mode {
            InputMode::Pointer => {
                if let Some(pointer) = inputs.pointer {
                    self.add_pointer(&pointer, options, cell_scale);
                }
            }
            InputMode::Body => {
                let tracking = &inputs.tracking;
                for (slot, person) in tracking.people() {
                    self.add_person(slot, person, tracking.taken_at, options, cell_scale);
                }
                self.add_hands(tracking, options, cell_scale);
            }
        }

        let dropped = self.sources.dropped();
        if dropped > 0 {
            log::warn!(
                "source capacity exceeded: dropped {} point and {} line sources",
                self.sources.points.dropped(),
                self.sources.lines.dropped()
            );
        }

        &self.sources
    }

    fn add_pointer(&mut self, pointer: &Source, options: &SimulationOptions, cell_scale: CellScale) {
        if !pointer.moved {
            return;
        }
        self.sources
            .forces
            .push(force_impulse(pointer, options.mouse_force, options.cursor_size, cell_scale));
        self.sources.points.push(PointSource {
            uv: ndc_to_uv(pointer.coords),
            radius: options.point_radius,
            strength: options.source_strength,
            color: PALETTE[MAX_PEOPLE],
        });
    }

    fn add_person(&mut self, slot: usize, person: &Person, now: f32, options: &SimulationOptions, cell_scale: CellScale) {
        if person.visible_count() == 0 {
            return;
        }
        let color = PALETTE[slot % MAX_PEOPLE];
        let mut hands = [None; 2];

        for part in BodyPart::ALL {
            let Some(state) = person.visible_part(part) else {
                continue;
            };
            self.sources.points.push(PointSource {
                uv: ndc_to_uv(state.coords),
                radius: options.point_radius,
                strength: options.source_strength,
                color,
            });

            let source = take_source(&mut self.injected[slot][part.index()], state, now);
            match part {
                BodyPart::LeftHand => hands[Hand::Left.index()] = Some(source),
                BodyPart::RightHand => hands[Hand::Right.index()] = Some(source),
                _ => {}
            }
            if !source.moved || source.diff == Vec2::ZERO {
                continue;
            }
            let scale = match part.force_category() {
                Some(ForceCategory::Hand) => options.hand_force,
                Some(ForceCategory::Limb) => options.body_force,
                None => continue,
            };
            self.sources
                .forces
                .push(force_impulse(&source, scale, options.cursor_size, cell_scale));
        }

        for BodyConnection(a, b) in CONNECTIONS {
            if let (Some(a), Some(b)) = (person.visible_part(a), person.visible_part(b)) {
                self.sources.lines.push(LineSource {
                    a: ndc_to_uv(a.coords),
                    b: ndc_to_uv(b.coords),
                    radius: options.line_radius,
                    strength: options.source_strength,
                    color,
                });
            }
        }

        if let [Some(left), Some(right)] = hands {
            self.add_swirl(&left, &right, options, cell_scale);
        }
    }

    fn add_hands(&mut self, tracking: &TrackerSnapshot, options: &SimulationOptions, cell_scale: CellScale) {
        let now = tracking.taken_at;
        let mut hands = [None; 2];
        for hand in [Hand::Left, Hand::Right] {
            if let Some(part) = tracking.hand(hand).filter(|p| p.in_bounds()) {
                let i = hand.index();
                hands[i] = Some(take_source(&mut self.injected_hands[i], part, now));
            }
        }

        for source in hands.iter().flatten() {
            self.sources.points.push(PointSource {
                uv: ndc_to_uv(source.coords),
                radius: options.point_radius,
                strength: options.source_strength,
                color: PALETTE[MAX_PEOPLE],
            });
            if source.moved && source.diff != Vec2::ZERO {
                self.sources
                    .forces
                    .push(force_impulse(source, options.hand_force, options.cursor_size, cell_scale));
            }
        }

        if let [Some(left), Some(right)] = hands {
            self.add_swirl(&left, &right, options, cell_scale);
        }
    }

    /// A swirl between two hands, skipped when neither has a fresh displacement.
    fn add_swirl(&mut self, left: &Source, right: &Source, options: &SimulationOptions, cell_scale: CellScale) {
        if !options.is_swirl || (left.diff == Vec2::ZERO && right.diff == Vec2::ZERO) {
            return;
        }
        if let Some(swirl) = swirl_impulse(left, right, options.swirl_force, options.cursor_size, cell_scale) {
            self.sources.swirls.push(swirl);
        }
    }
}
