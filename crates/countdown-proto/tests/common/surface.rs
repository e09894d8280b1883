#![allow(dead_code)]

use countdown_proto::presentation::{
    Effect, PresentationEvent, PresentationState, RevealTiming, SurfaceChange, Visibility,
};

/// Drives the state machine the way a host would and records what reaches
/// the visual surface.
pub struct FakeSurface {
    pub state: PresentationState,
    pub timing: RevealTiming,
    pub shown: Visibility,
    pub changes: Vec<SurfaceChange>,
    pub other: Vec<Effect>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            state: PresentationState::default(),
            timing: RevealTiming::default(),
            shown: Visibility::default(),
            changes: Vec::new(),
            other: Vec::new(),
        }
    }

    /// Returns the surface changes caused by this one event.
    pub fn send(&mut self, event: PresentationEvent) -> Vec<SurfaceChange> {
        let mut changes = Vec::new();
        for effect in self.state.step(&event, &self.timing) {
            match effect {
                Effect::Surface(change) => {
                    self.shown.apply(change);
                    changes.push(change);
                }
                other => self.other.push(other),
            }
        }
        self.changes.extend(changes.iter().copied());
        changes
    }

    pub fn progress(&mut self, elapsed: f64) -> Vec<SurfaceChange> {
        self.send(PresentationEvent::TimeProgress { elapsed })
    }

    pub fn count(&self, change: SurfaceChange) -> usize {
        self.changes.iter().filter(|c| **c == change).count()
    }
}
