//! Tracked body topology.
//!
//! A tracked person is a fixed array of optional part states indexed by the
//! closed [`BodyPart`] enumeration. A `None` slot means the part was not
//! detected; there are no sentinel coordinates.

use glam::Vec2;

/// Most people tracked at once.
pub const MAX_PEOPLE: usize = 4;

/// Number of [`BodyPart`] variants.
pub const MAX_BODY_PARTS: usize = 13;

/// Capacity of each per-frame source list.
pub const MAX_SOURCES: usize = MAX_BODY_PARTS * MAX_PEOPLE;

/// A part not updated for this long is considered at rest.
pub const MOVE_TIMEOUT: f32 = 0.1;

/// Displacements shorter than this (in NDC) do not count as movement.
pub const MOVE_EPSILON: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Head,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHand,
    RightHand,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftFoot,
    RightFoot,
}

/// How a part contributes velocity to the fluid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceCategory {
    Hand,
    Limb,
}

impl BodyPart {
    pub const ALL: [BodyPart; MAX_BODY_PARTS] = [
        BodyPart::Head,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftHand,
        BodyPart::RightHand,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftFoot,
        BodyPart::RightFoot,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Shoulders and hips move with the torso and would only smear the
    /// fluid, so they inject density but no force.
    pub fn force_category(self) -> Option<ForceCategory> {
        match self {
            BodyPart::LeftHand | BodyPart::RightHand => Some(ForceCategory::Hand),
            BodyPart::Head
            | BodyPart::LeftElbow
            | BodyPart::RightElbow
            | BodyPart::LeftKnee
            | BodyPart::RightKnee
            | BodyPart::LeftFoot
            | BodyPart::RightFoot => Some(ForceCategory::Limb),
            BodyPart::LeftShoulder | BodyPart::RightShoulder | BodyPart::LeftHip | BodyPart::RightHip => None,
        }
    }
}

/// A skeletal edge between two parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyConnection(pub BodyPart, pub BodyPart);

/// Head, torso, arms and legs.
pub const CONNECTIONS: [BodyConnection; 14] = [
    BodyConnection(BodyPart::Head, BodyPart::LeftShoulder),
    BodyConnection(BodyPart::Head, BodyPart::RightShoulder),
    BodyConnection(BodyPart::LeftShoulder, BodyPart::RightShoulder),
    BodyConnection(BodyPart::LeftShoulder, BodyPart::LeftHip),
    BodyConnection(BodyPart::RightShoulder, BodyPart::RightHip),
    BodyConnection(BodyPart::LeftHip, BodyPart::RightHip),
    BodyConnection(BodyPart::LeftShoulder, BodyPart::LeftElbow),
    BodyConnection(BodyPart::LeftElbow, BodyPart::LeftHand),
    BodyConnection(BodyPart::RightShoulder, BodyPart::RightElbow),
    BodyConnection(BodyPart::RightElbow, BodyPart::RightHand),
    BodyConnection(BodyPart::LeftHip, BodyPart::LeftKnee),
    BodyConnection(BodyPart::LeftKnee, BodyPart::LeftFoot),
    BodyConnection(BodyPart::RightHip, BodyPart::RightKnee),
    BodyConnection(BodyPart::RightKnee, BodyPart::RightFoot),
];

/// Which hand a dedicated hand tracker reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hand {
    Left = 0,
    Right = 1,
}

impl Hand {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Latest observation of one landmark.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartState {
    /// Position in NDC.
    pub coords: Vec2,
    /// Position at the previous observation.
    pub prev: Vec2,
    /// `coords - prev`.
    pub diff: Vec2,
    /// Clock time of the last observation with a non-trivial displacement.
    pub last_moved: f32,
    /// Clock time of the latest observation. `diff` belongs to it.
    pub observed_at: f32,
}

impl PartState {
    pub fn new(coords: Vec2, now: f32) -> Self {
        Self {
            coords,
            prev: coords,
            diff: Vec2::ZERO,
            // Never moved: far enough in the past to read as stale.
            last_moved: now - MOVE_TIMEOUT * 2.0,
            observed_at: now,
        }
    }

    /// Record a new observation.
    pub fn observe(&mut self, coords: Vec2, now: f32) {
        self.prev = self.coords;
        self.coords = coords;
        self.diff = coords - self.prev;
        self.observed_at = now;
        if self.diff.length() > MOVE_EPSILON {
            self.last_moved = now;
        }
    }

    /// Whether the part moved within the last [`MOVE_TIMEOUT`] seconds.
    #[inline]
    pub fn moved(&self, now: f32) -> bool {
        now - self.last_moved < MOVE_TIMEOUT
    }

    /// Inside the visible `[-1, 1]²` square.
    #[inline]
    pub fn in_bounds(&self) -> bool {
        self.coords.x.abs() <= 1.0 && self.coords.y.abs() <= 1.0
    }
}

/// One tracked person.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Person {
    pub parts: [Option<PartState>; MAX_BODY_PARTS],
}

impl Person {
    #[inline]
    pub fn part(&self, part: BodyPart) -> Option<&PartState> {
        self.parts[part.index()].as_ref()
    }

    /// A part that is present and inside the visible square.
    #[inline]
    pub fn visible_part(&self, part: BodyPart) -> Option<&PartState> {
        self.part(part).filter(|p| p.in_bounds())
    }

    /// Update or insert a part observation.
    pub fn observe(&mut self, part: BodyPart, coords: Vec2, now: f32) {
        match &mut self.parts[part.index()] {
            Some(state) => state.observe(coords, now),
            slot => *slot = Some(PartState::new(coords, now)),
        }
    }

    pub fn forget(&mut self, part: BodyPart) {
        self.parts[part.index()] = None;
    }

    pub fn visible_count(&self) -> usize {
        BodyPart::ALL.iter().filter(|p| self.visible_part(**p).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(Option::is_none)
    }
}
