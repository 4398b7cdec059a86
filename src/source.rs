//! Per-frame injection sources.
//!
//! Sources are rebuilt every frame from the pointer and the tracker snapshot.
//! Lists have a fixed capacity of [`MAX_SOURCES`]; pushes past capacity are
//! counted and dropped, never written.

use glam::{Vec2, Vec3};

use crate::body::{PartState, MAX_SOURCES};

/// A normalized input point with its per-frame displacement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Source {
    /// Position in NDC.
    pub coords: Vec2,
    /// Displacement since the previous frame, in NDC.
    pub diff: Vec2,
    /// Moved within the staleness window.
    pub moved: bool,
}

impl Source {
    /// A tracked part as seen at `now` on the tracker clock.
    pub fn from_part(part: &PartState, now: f32) -> Self {
        Self {
            coords: part.coords,
            diff: part.diff,
            moved: part.moved(now),
        }
    }
}

/// Density injected around a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSource {
    /// Center in UV space.
    pub uv: Vec2,
    /// Disc radius in cells.
    pub radius: f32,
    pub strength: f32,
    pub color: Vec3,
}

/// Density injected along a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSource {
    /// Endpoints in UV space.
    pub a: Vec2,
    pub b: Vec2,
    /// Capsule radius in cells.
    pub radius: f32,
    pub strength: f32,
    pub color: Vec3,
}

/// A localized velocity impulse for one ExternalForce pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceImpulse {
    /// Kernel center in NDC, already clipped away from the walls.
    pub center: Vec2,
    /// Kernel half-extent in NDC.
    pub extent: Vec2,
    /// Peak velocity added, in UV units.
    pub force: Vec2,
}

/// A rotational impulse between two paired sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwirlImpulse {
    /// Midpoint in NDC, clipped inside the domain.
    pub center: Vec2,
    /// Kernel half-extent in NDC.
    pub extent: Vec2,
    /// Signed tangential strength; positive turns counter-clockwise on screen.
    pub strength: f32,
}

/// A bounded list that drops pushes past [`MAX_SOURCES`].
#[derive(Clone, Debug)]
pub struct SourceList<T> {
    items: Vec<T>,
    dropped: usize,
}

impl<T> SourceList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(MAX_SOURCES),
            dropped: 0,
        }
    }

    /// Append a source. Returns `false` (and counts a drop) when full.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() >= MAX_SOURCES {
            self.dropped += 1;
            return false;
        }
        self.items.push(item);
        true
    }

    /// Empty the list, keeping its allocation.
    pub fn clear(&mut self) {
        self.items.clear();
        self.dropped = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sources dropped since the last clear.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for SourceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything injected during one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameSources {
    pub forces: Vec<ForceImpulse>,
    pub swirls: Vec<SwirlImpulse>,
    pub points: SourceList<PointSource>,
    pub lines: SourceList<LineSource>,
}

impl FrameSources {
    pub fn clear(&mut self) {
        self.forces.clear();
        self.swirls.clear();
        self.points.clear();
        self.lines.clear();
    }

    /// Total sources dropped for capacity this frame.
    pub fn dropped(&self) -> usize {
        self.points.dropped() + self.lines.dropped()
    }
}
