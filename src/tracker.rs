//! Body and hand tracking input.
//!
//! Landmark detection happens elsewhere; this module only holds the latest
//! observations. A producer thread publishes into a [`SharedTracker`] and the
//! frame loop copies one [`TrackerSnapshot`] per frame. Writes are
//! last-write-wins and the lock is held only for the copy.
//!
//! ```ignore
//! let tracker = SharedTracker::new();
//! let feeder = DemoDancer::new(2).spawn(tracker.clone());
//!
//! // frame loop
//! let snapshot = tracker.snapshot();
//!
//! tracker.stop();
//! feeder.join().ok();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec2;

use crate::body::{BodyPart, Hand, PartState, Person, MAX_BODY_PARTS, MAX_PEOPLE};

/// One frame's worth of landmarks for a person, `None` where undetected.
pub type Landmarks = [Option<Vec2>; MAX_BODY_PARTS];

/// A source of tracked people and hands.
pub trait Tracker {
    fn snapshot(&self) -> TrackerSnapshot;
}

/// A copy of everything the tracker knows at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackerSnapshot {
    pub people: [Option<Person>; MAX_PEOPLE],
    pub hands: [Option<PartState>; 2],
    /// Tracker clock when the snapshot was taken. Part timestamps are on the
    /// same clock, so staleness is judged against this.
    pub taken_at: f32,
}

impl TrackerSnapshot {
    /// Tracked people with their slot index.
    pub fn people(&self) -> impl Iterator<Item = (usize, &Person)> {
        self.people
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }

    #[inline]
    pub fn hand(&self, hand: Hand) -> Option<&PartState> {
        self.hands[hand.index()].as_ref()
    }

    pub fn person_count(&self) -> usize {
        self.people.iter().filter(|p| p.is_some()).count()
    }
}

/// Thread-safe tracker state shared between a producer and the frame loop.
#[derive(Clone, Debug)]
pub struct SharedTracker {
    state: Arc<RwLock<TrackerSnapshot>>,
    stop: Arc<AtomicBool>,
    epoch: Instant,
}

impl SharedTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerSnapshot::default())),
            stop: Arc::new(AtomicBool::new(false)),
            epoch: Instant::now(),
        }
    }

    /// Seconds since the tracker was created.
    pub fn now(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32()
    }

    /// Publish a person's landmarks. Parts missing from `landmarks` are forgotten.
    ///
    /// Slots at or past [`MAX_PEOPLE`] are ignored.
    pub fn publish_person(&self, slot: usize, landmarks: &Landmarks, now: f32) {
        if slot >= MAX_PEOPLE {
            log::warn!("tracker: person slot {} exceeds capacity {}", slot, MAX_PEOPLE);
            return;
        }
        self.with_state(|state| {
            let person = state.people[slot].get_or_insert_with(Person::default);
            for part in BodyPart::ALL {
                match landmarks[part.index()] {
                    Some(coords) => person.observe(part, coords, now),
                    None => person.forget(part),
                }
            }
            state.taken_at = now;
        });
    }

    /// The person in `slot` left the frame.
    pub fn clear_person(&self, slot: usize) {
        if slot < MAX_PEOPLE {
            self.with_state(|state| state.people[slot] = None);
        }
    }

    /// Publish a dedicated hand landmark, or `None` when the hand is lost.
    pub fn publish_hand(&self, hand: Hand, coords: Option<Vec2>, now: f32) {
        self.with_state(|state| {
            let slot = &mut state.hands[hand.index()];
            match coords {
                Some(c) => match slot {
                    Some(existing) => existing.observe(c, now),
                    None => *slot = Some(PartState::new(c, now)),
                },
                None => *slot = None,
            }
            state.taken_at = now;
        });
    }

    /// Ask producers to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Copy the current state, judging staleness at `now` on the caller's
    /// clock. Producers driven by a simulated clock read back through this.
    pub fn snapshot_at(&self, now: f32) -> TrackerSnapshot {
        let mut snapshot = *self.state.read().unwrap_or_else(|e| e.into_inner());
        snapshot.taken_at = now;
        snapshot
    }

    fn with_state(&self, f: impl FnOnce(&mut TrackerSnapshot)) {
        // A panicking producer leaves the snapshot structurally valid.
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }
}

impl Default for SharedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker for SharedTracker {
    fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot_at(self.now())
    }
}

/// A tracker with nobody in front of it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTracker;

impl Tracker for NoTracker {
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot::default()
    }
}

/// Scripted dancers for running body mode without a camera.
#[derive(Clone, Debug)]
pub struct DemoDancer {
    people: usize,
    hands: bool,
    rate_hz: f32,
}

impl DemoDancer {
    pub fn new(people: usize) -> Self {
        Self {
            people: people.min(MAX_PEOPLE),
            hands: false,
            rate_hz: 30.0,
        }
    }

    /// Also drive the dedicated hand slots.
    pub fn with_hands(mut self, hands: bool) -> Self {
        self.hands = hands;
        self
    }

    pub fn with_rate(mut self, rate_hz: f32) -> Self {
        self.rate_hz = rate_hz.max(1.0);
        self
    }

    /// Horizontal center of a dancer, spreading the group across the screen.
    pub fn offset(&self, person: usize) -> f32 {
        if self.people <= 1 {
            return 0.0;
        }
        let spacing = 1.2 / (self.people - 1) as f32;
        -0.6 + spacing * person as f32
    }

    /// Pose of one dancer at time `t`, in NDC.
    pub fn pose(&self, person: usize, t: f32) -> Landmarks {
        let cx = self.offset(person);
        let phase = t * 2.0 + person as f32 * 1.3;
        let scale = if self.people > 2 { 0.6 } else { 0.8 };
        let sway = 0.05 * (phase * 0.5).sin();

        let at = |x: f32, y: f32| Some(Vec2::new(cx + sway + x * scale, y * scale));

        let left_arm = phase.sin();
        let right_arm = (phase + std::f32::consts::PI).sin();
        let step = (phase * 0.5).sin() * 0.08;

        let mut pose = [None; MAX_BODY_PARTS];
        pose[BodyPart::Head.index()] = at(0.0, 0.75);
        pose[BodyPart::LeftShoulder.index()] = at(-0.18, 0.5);
        pose[BodyPart::RightShoulder.index()] = at(0.18, 0.5);
        pose[BodyPart::LeftElbow.index()] = at(-0.35, 0.4 + 0.15 * left_arm);
        pose[BodyPart::RightElbow.index()] = at(0.35, 0.4 + 0.15 * right_arm);
        pose[BodyPart::LeftHand.index()] = at(-0.45 - 0.05 * left_arm, 0.35 + 0.4 * left_arm);
        pose[BodyPart::RightHand.index()] = at(0.45 + 0.05 * right_arm, 0.35 + 0.4 * right_arm);
        pose[BodyPart::LeftHip.index()] = at(-0.12, -0.05);
        pose[BodyPart::RightHip.index()] = at(0.12, -0.05);
        pose[BodyPart::LeftKnee.index()] = at(-0.15 - step, -0.45);
        pose[BodyPart::RightKnee.index()] = at(0.15 + step, -0.45);
        pose[BodyPart::LeftFoot.index()] = at(-0.18 - step, -0.85);
        pose[BodyPart::RightFoot.index()] = at(0.18 + step, -0.85);
        pose
    }

    /// Dedicated hand positions at time `t`: two hands tracing a figure eight.
    pub fn hand_pose(&self, t: f32) -> [Vec2; 2] {
        let a = t * 1.5;
        let left = Vec2::new(-0.3 + 0.25 * a.sin(), 0.3 * (2.0 * a).sin());
        let right = Vec2::new(0.3 - 0.25 * a.sin(), -0.3 * (2.0 * a).sin());
        [left, right]
    }

    /// Publish one frame of every dancer.
    pub fn publish(&self, tracker: &SharedTracker, now: f32) {
        for person in 0..self.people {
            tracker.publish_person(person, &self.pose(person, now), now);
        }
        if self.hands {
            let [left, right] = self.hand_pose(now);
            tracker.publish_hand(Hand::Left, Some(left), now);
            tracker.publish_hand(Hand::Right, Some(right), now);
        }
    }

    /// Feed `tracker` from a background thread until it is stopped.
    pub fn spawn(self, tracker: SharedTracker) -> JoinHandle<()> {
        let period = Duration::from_secs_f32(1.0 / self.rate_hz);
        thread::spawn(move || {
            log::info!("demo dancer: feeding {} people at {} Hz", self.people, self.rate_hz);
            while !tracker.is_stopped() {
                self.publish(&tracker, tracker.now());
                thread::sleep(period);
            }
            log::debug!("demo dancer: stopped");
        })
    }
}
