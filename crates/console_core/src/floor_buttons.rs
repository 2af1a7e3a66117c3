//! Hall call buttons: one latch per floor and direction.

use shared::{
    domain::{Direction, FloorNumber},
    protocol::FloorCallRequest,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Armed,
    Pressed,
    /// Up on the top floor or down on floor 1. Never accepts a press.
    Disabled,
}

impl LatchState {
    pub fn is_pressable(self) -> bool {
        self == LatchState::Armed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PressRejected {
    #[error("floor {0} does not exist")]
    UnknownFloor(FloorNumber),
    #[error("the {direction} button on floor {floor} is disabled")]
    Disabled {
        floor: FloorNumber,
        direction: Direction,
    },
    #[error("the {direction} button on floor {floor} was already pressed")]
    AlreadyPressed {
        floor: FloorNumber,
        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FloorLatches {
    up: LatchState,
    down: LatchState,
}

#[derive(Debug, Clone, Default)]
pub struct FloorButtonStateMachine {
    total_floors: FloorNumber,
    /// Index 0 is floor 1.
    floors: Vec<FloorLatches>,
}

impl FloorButtonStateMachine {
    /// A non-positive floor count yields a building with no floors.
    pub fn new(total_floors: FloorNumber) -> Self {
        let total_floors = total_floors.max(0);
        let floors = (1..=total_floors)
            .map(|floor| FloorLatches {
                up: initial_state(floor, Direction::Ascending, total_floors),
                down: initial_state(floor, Direction::Descending, total_floors),
            })
            .collect();
        Self {
            total_floors,
            floors,
        }
    }

    pub fn total_floors(&self) -> FloorNumber {
        self.total_floors
    }

    pub fn latch(&self, floor: FloorNumber, direction: Direction) -> Option<LatchState> {
        self.slot(floor).map(|latches| match direction {
            Direction::Ascending => latches.up,
            Direction::Descending => latches.down,
        })
    }

    /// Armed → Pressed, producing the call request to enqueue.
    pub fn press(
        &mut self,
        floor: FloorNumber,
        direction: Direction,
    ) -> Result<FloorCallRequest, PressRejected> {
        let latch = self
            .slot_mut(floor)
            .map(|latches| latch_mut(latches, direction))
            .ok_or(PressRejected::UnknownFloor(floor))?;

        match *latch {
            LatchState::Disabled => Err(PressRejected::Disabled { floor, direction }),
            LatchState::Pressed => Err(PressRejected::AlreadyPressed { floor, direction }),
            LatchState::Armed => {
                *latch = LatchState::Pressed;
                debug!(floor, %direction, "call button latched");
                Ok(FloorCallRequest {
                    direction,
                    origination_floor: floor,
                })
            }
        }
    }

    /// Re-arms a latch after the rider answered the cue for it. Disabled
    /// latches and unknown floors are left untouched.
    pub fn clear(&mut self, floor: FloorNumber, direction: Direction) {
        let Some(latches) = self.slot_mut(floor) else {
            return;
        };
        let latch = latch_mut(latches, direction);
        if *latch == LatchState::Pressed {
            *latch = LatchState::Armed;
            debug!(floor, %direction, "call button re-armed");
        }
    }

    fn slot(&self, floor: FloorNumber) -> Option<&FloorLatches> {
        let index = usize::try_from(floor).ok()?.checked_sub(1)?;
        self.floors.get(index)
    }

    fn slot_mut(&mut self, floor: FloorNumber) -> Option<&mut FloorLatches> {
        let index = usize::try_from(floor).ok()?.checked_sub(1)?;
        self.floors.get_mut(index)
    }
}

fn initial_state(floor: FloorNumber, direction: Direction, total_floors: FloorNumber) -> LatchState {
    let structurally_invalid = match direction {
        Direction::Ascending => floor == total_floors,
        Direction::Descending => floor == 1,
    };
    if structurally_invalid {
        LatchState::Disabled
    } else {
        LatchState::Armed
    }
}

fn latch_mut(latches: &mut FloorLatches, direction: Direction) -> &mut LatchState {
    match direction {
        Direction::Ascending => &mut latches.up,
        Direction::Descending => &mut latches.down,
    }
}

#[cfg(test)]
#[path = "tests/floor_buttons_tests.rs"]
mod tests;
