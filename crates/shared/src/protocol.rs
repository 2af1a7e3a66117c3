use serde::{Deserialize, Serialize};

use crate::domain::{CarName, CarStatusCode, Direction, FloorNumber, ServiceRequestId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub total_floors: FloorNumber,
    pub elevator_names: Vec<CarName>,
}

/// A call request once the backend has accepted it and assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderServiceRequest {
    pub id: ServiceRequestId,
    pub direction: Direction,
    pub origination_floor: FloorNumber,
}

/// Pushed when a car has arrived at a floor to answer a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderCue {
    pub service_request: RiderServiceRequest,
    pub car_name: CarName,
}

impl RiderCue {
    pub fn id(&self) -> &ServiceRequestId {
        &self.service_request.id
    }

    pub fn origination_floor(&self) -> FloorNumber {
        self.service_request.origination_floor
    }

    pub fn direction(&self) -> Direction {
        self.service_request.direction
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarStatus {
    pub car_name: CarName,
    pub status: CarStatusCode,
    pub current_floor: FloorNumber,
}

impl CarStatus {
    /// The state every configured car starts in before the first push arrives.
    pub fn initial(car_name: CarName) -> Self {
        Self {
            car_name,
            status: CarStatusCode::Available,
            current_floor: 0,
        }
    }
}

/// Body of `POST /service`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorCallRequest {
    pub direction: Direction,
    pub origination_floor: FloorNumber,
}

/// Body of `POST /service/{id}/floors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorSelectionSubmission {
    pub rider_service_request: RiderServiceRequest,
    pub requested_floors: Vec<FloorNumber>,
}

/// One message from the push channel after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Cue(RiderCue),
    Status(CarStatus),
    Unrecognized(serde_json::Value),
}
