//! Current status of every configured car.

use shared::{domain::CarName, protocol::CarStatus};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Updated,
    Unchanged,
    /// No configured car carries the update's name; the store was left alone.
    UnknownCar,
}

/// Owns one [`CarStatus`] per configured car, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct CarStateStore {
    cars: Vec<CarStatus>,
}

impl CarStateStore {
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = CarName>,
    {
        Self {
            cars: names.into_iter().map(CarStatus::initial).collect(),
        }
    }

    /// Replaces the entry named by `update` in place. Every other entry keeps
    /// its position.
    pub fn merge(&mut self, update: CarStatus) -> MergeOutcome {
        let Some(slot) = self
            .cars
            .iter_mut()
            .find(|car| car.car_name == update.car_name)
        else {
            warn!(
                car = %update.car_name,
                status = %update.status,
                current_floor = update.current_floor,
                "car status update for unconfigured car ignored"
            );
            return MergeOutcome::UnknownCar;
        };

        if *slot == update {
            return MergeOutcome::Unchanged;
        }
        *slot = update;
        MergeOutcome::Updated
    }

    pub fn get(&self, car_name: &CarName) -> Option<&CarStatus> {
        self.cars.iter().find(|car| &car.car_name == car_name)
    }

    pub fn snapshot(&self) -> Vec<CarStatus> {
        self.cars.clone()
    }

    pub fn car_names(&self) -> impl Iterator<Item = &CarName> {
        self.cars.iter().map(|car| &car.car_name)
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/car_state_tests.rs"]
mod tests;
