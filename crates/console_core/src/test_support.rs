use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use shared::{
    domain::{CarName, CarStatusCode, Direction, FloorNumber, ServiceRequestId},
    protocol::{
        CarStatus, Configuration, FloorCallRequest, FloorSelectionSubmission, RiderCue,
        RiderServiceRequest,
    },
};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::{
    command_log::Command,
    error::ConsoleError,
    session::{ConsoleHandle, ConsoleSnapshot},
    transport::{BackendApi, PushByteStream},
};

pub fn request_id(n: u128) -> ServiceRequestId {
    ServiceRequestId::new(Uuid::from_u128(n).to_string())
}

pub fn cue(n: u128, car: &str, floor: FloorNumber, direction: Direction) -> RiderCue {
    RiderCue {
        service_request: RiderServiceRequest {
            id: request_id(n),
            direction,
            origination_floor: floor,
        },
        car_name: CarName::from(car),
    }
}

pub fn status(car: &str, code: CarStatusCode, floor: FloorNumber) -> CarStatus {
    CarStatus {
        car_name: CarName::from(car),
        status: code,
        current_floor: floor,
    }
}

pub fn configuration(total_floors: FloorNumber, cars: &[&str]) -> Configuration {
    Configuration {
        total_floors,
        elevator_names: cars.iter().map(|car| CarName::from(*car)).collect(),
    }
}

pub fn sse_event(payload: &serde_json::Value) -> Vec<u8> {
    format!("data: {payload}\n\n").into_bytes()
}

/// In-memory backend. Every command it receives is echoed to the tap in
/// the order the sends reached it.
pub struct FakeBackend {
    configuration: Option<Configuration>,
    command_failure_status: Option<u16>,
    push: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    sent: mpsc::UnboundedSender<Command>,
}

pub struct BackendTap {
    pub push: mpsc::UnboundedSender<Vec<u8>>,
    pub sent: mpsc::UnboundedReceiver<Command>,
}

impl FakeBackend {
    pub fn new(configuration: Option<Configuration>) -> (Self, BackendTap) {
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Self {
                configuration,
                command_failure_status: None,
                push: Mutex::new(Some(push_rx)),
                sent: sent_tx,
            },
            BackendTap {
                push: push_tx,
                sent: sent_rx,
            },
        )
    }

    pub fn failing_commands(mut self, status: u16) -> Self {
        self.command_failure_status = Some(status);
        self
    }

    fn command_result(&self, endpoint: &str) -> Result<(), ConsoleError> {
        match self.command_failure_status {
            Some(status) => Err(ConsoleError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status,
                detail: None,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn fetch_configuration(&self) -> Result<Configuration, ConsoleError> {
        self.configuration
            .clone()
            .ok_or_else(|| ConsoleError::UnexpectedStatus {
                endpoint: "/configuration".to_string(),
                status: 503,
                detail: None,
            })
    }

    async fn submit_call(
        &self,
        request: &FloorCallRequest,
    ) -> Result<RiderServiceRequest, ConsoleError> {
        let _ = self.sent.send(Command::Call(*request));
        self.command_result("/service")?;
        Ok(RiderServiceRequest {
            id: ServiceRequestId::new(Uuid::new_v4().to_string()),
            direction: request.direction,
            origination_floor: request.origination_floor,
        })
    }

    async fn submit_floors(
        &self,
        submission: &FloorSelectionSubmission,
    ) -> Result<FloorSelectionSubmission, ConsoleError> {
        let _ = self.sent.send(Command::FloorSelection(submission.clone()));
        self.command_result("/service/floors")?;
        Ok(submission.clone())
    }

    async fn open_push_stream(&self) -> Result<PushByteStream, ConsoleError> {
        let Some(rx) = self.push.lock().await.take() else {
            return Err(ConsoleError::SessionClosed);
        };
        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}

pub async fn wait_for_snapshot<F>(handle: &ConsoleHandle, predicate: F) -> ConsoleSnapshot
where
    F: FnMut(&ConsoleSnapshot) -> bool,
{
    let mut snapshots = handle.watch_snapshots();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(predicate))
        .await
        .expect("snapshot condition timed out")
        .expect("session closed");
    snapshot.clone()
}

pub async fn next_sent(tap: &mut BackendTap) -> Command {
    tokio::time::timeout(Duration::from_secs(5), tap.sent.recv())
        .await
        .expect("command was not sent in time")
        .expect("backend dropped")
}
