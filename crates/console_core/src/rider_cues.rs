//! Pending pickup cues and the record of which ones were already answered.
//!
//! A cue id lives in exactly one of the two collections. Once submitted it
//! stays submitted for the rest of the session, so a re-pushed cue can never
//! open a second destination picker.

use std::collections::HashSet;

use shared::{
    domain::{CarName, FloorNumber, ServiceRequestId},
    protocol::RiderCue,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueInsert {
    Pending,
    AlreadyPending,
    AlreadySubmitted,
}

#[derive(Debug, Clone, Default)]
pub struct RiderCueMatcher {
    /// Arrival order is the tie-break for [`RiderCueMatcher::match_floor`].
    pending: Vec<RiderCue>,
    submitted: HashSet<ServiceRequestId>,
}

impl RiderCueMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cue: RiderCue) -> CueInsert {
        let id = cue.id().clone();
        if self.submitted.contains(&id) {
            debug!(cue_id = %id, "ignoring cue that was already submitted");
            return CueInsert::AlreadySubmitted;
        }
        if self.pending.iter().any(|pending| pending.id() == &id) {
            debug!(cue_id = %id, "ignoring duplicate pending cue");
            return CueInsert::AlreadyPending;
        }
        info!(
            cue_id = %id,
            car = %cue.car_name,
            floor = cue.origination_floor(),
            direction = %cue.direction(),
            "rider cue received"
        );
        self.pending.push(cue);
        CueInsert::Pending
    }

    /// Earliest-arrived pending cue for `floor`, whichever car it names.
    pub fn match_floor(&self, floor: FloorNumber) -> Option<&RiderCue> {
        self.pending
            .iter()
            .find(|cue| cue.origination_floor() == floor)
    }

    /// The floor's matched cue, but only when it names `car`. A floor whose
    /// first cue belongs to another car exposes nothing for this one.
    pub fn match_for_car(&self, floor: FloorNumber, car: &CarName) -> Option<&RiderCue> {
        self.match_floor(floor)
            .filter(|cue| &cue.car_name == car)
    }

    /// Moves `id` from pending to submitted. Returns `false` when the id was
    /// already submitted.
    pub fn mark_submitted(&mut self, id: ServiceRequestId) -> bool {
        if self.submitted.contains(&id) {
            return false;
        }
        self.pending.retain(|cue| cue.id() != &id);
        self.submitted.insert(id);
        true
    }

    pub fn is_submitted(&self, id: &ServiceRequestId) -> bool {
        self.submitted.contains(id)
    }

    pub fn pending(&self) -> &[RiderCue] {
        &self.pending
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.len()
    }
}

#[cfg(test)]
#[path = "tests/rider_cues_tests.rs"]
mod tests;
