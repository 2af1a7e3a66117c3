//! The console's single control flow.
//!
//! [`ConsoleState`] is a synchronous reducer that owns every store.
//! [`ConsoleSession`] runs it on one task, fed by user intents, classified
//! push messages and dispatch outcomes, so no store is ever shared or locked.

use std::sync::Arc;

use shared::{
    domain::{CarName, Direction, FloorNumber},
    protocol::{CarStatus, Configuration, FloorSelectionSubmission, PushMessage, RiderCue},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    car_state::{CarStateStore, MergeOutcome},
    command_log::{
        Command, CommandLog, DispatchOutcome, DispatchResponse, Dispatcher, LoggedCommand,
    },
    error::{ConsoleError, Notification, NotificationContext, NotificationSeverity},
    event_channel::EventChannelAdapter,
    floor_buttons::{FloorButtonStateMachine, LatchState},
    rider_cues::RiderCueMatcher,
    transport::BackendApi,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarDoor {
    pub car_name: CarName,
    /// Set when this car has a cue waiting for destination input here.
    pub cue: Option<RiderCue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorSnapshot {
    pub floor: FloorNumber,
    pub up: LatchState,
    pub down: LatchState,
    pub doors: Vec<CarDoor>,
}

/// Rendering-time view of the whole console.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleSnapshot {
    pub configured: bool,
    pub total_floors: FloorNumber,
    pub cars: Vec<CarStatus>,
    /// Ascending floor order.
    pub floors: Vec<FloorSnapshot>,
    pub pending_cues: usize,
    pub commands_appended: usize,
    /// Why the console stayed unconfigured, if the configuration fetch failed.
    pub configuration_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConsoleState {
    configuration: Option<Configuration>,
    cars: CarStateStore,
    cues: RiderCueMatcher,
    buttons: FloorButtonStateMachine,
    log: CommandLog,
    configuration_error: Option<String>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, configuration: Configuration) {
        info!(
            total_floors = configuration.total_floors,
            cars = configuration.elevator_names.len(),
            "console configured"
        );
        self.cars = CarStateStore::from_names(configuration.elevator_names.iter().cloned());
        self.buttons = FloorButtonStateMachine::new(configuration.total_floors);
        self.configuration = Some(configuration);
    }

    /// The console stays unconfigured; the returned notification blocks the
    /// feature for the rest of the session.
    pub fn configuration_failed(&mut self, err: &ConsoleError) -> Notification {
        error!(error = %err, "configuration fetch failed");
        let message = format!("connection to server failed: {err}");
        self.configuration_error = Some(message.clone());
        Notification::new(
            NotificationSeverity::Blocking,
            NotificationContext::Configuration,
            message,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.configuration.is_some()
    }

    pub fn apply_push(&mut self, message: PushMessage) {
        match message {
            PushMessage::Cue(cue) => {
                self.cues.insert(cue);
            }
            PushMessage::Status(status) => {
                let car = status.car_name.clone();
                if self.cars.merge(status) == MergeOutcome::Updated {
                    debug!(car = %car, "car status merged");
                }
            }
            PushMessage::Unrecognized(value) => {
                debug!(payload = %value, "unrecognized push message ignored");
            }
        }
    }

    /// Latches the button and appends its call request.
    pub fn press_call(
        &mut self,
        floor: FloorNumber,
        direction: Direction,
    ) -> Result<usize, ConsoleError> {
        if !self.is_configured() {
            return Err(ConsoleError::Unconfigured);
        }
        let request = self.buttons.press(floor, direction)?;
        Ok(self.log.append(Command::Call(request)))
    }

    /// Answers the cue `car` is showing on `floor` and re-arms the button the
    /// cue was raised for.
    pub fn submit_floors(
        &mut self,
        floor: FloorNumber,
        car: &CarName,
        requested_floors: Vec<FloorNumber>,
    ) -> Result<usize, ConsoleError> {
        if !self.is_configured() {
            return Err(ConsoleError::Unconfigured);
        }
        if requested_floors.is_empty() {
            return Err(ConsoleError::InvalidFloorList {
                input: String::new(),
                reason: "at least one destination floor is required".to_string(),
            });
        }
        let cue = self
            .cues
            .match_for_car(floor, car)
            .cloned()
            .ok_or_else(|| ConsoleError::NoCueForCar {
                floor,
                car: car.clone(),
            })?;

        let index = self
            .log
            .append(Command::FloorSelection(FloorSelectionSubmission {
                rider_service_request: cue.service_request.clone(),
                requested_floors,
            }));
        self.buttons
            .clear(cue.origination_floor(), cue.direction());
        Ok(index)
    }

    /// Hands over every entry appended since the last call. A floor
    /// selection marks its cue submitted here, before the send starts, and
    /// that mark is never undone.
    pub fn take_dispatchable(&mut self) -> Vec<LoggedCommand> {
        let entries = self.log.undispatched();
        for entry in &entries {
            if let Command::FloorSelection(submission) = &entry.command {
                self.cues
                    .mark_submitted(submission.rider_service_request.id.clone());
            }
        }
        entries
    }

    /// Logs a finished send. Failures become a notification; local state is
    /// not compensated.
    pub fn record_outcome(&self, outcome: DispatchOutcome) -> Option<Notification> {
        let DispatchOutcome {
            index,
            command,
            result,
        } = outcome;
        match result {
            Ok(DispatchResponse::CallAccepted(request)) => {
                info!(
                    index,
                    id = %request.id,
                    direction = %request.direction,
                    floor = request.origination_floor,
                    "successfully submitted service request"
                );
                None
            }
            Ok(DispatchResponse::FloorsAccepted(submission)) => {
                info!(
                    index,
                    id = %submission.rider_service_request.id,
                    floors = ?submission.requested_floors,
                    "successfully submitted floor request"
                );
                None
            }
            Err(err) => {
                let context = match &command {
                    Command::Call(_) => NotificationContext::CallRequest,
                    Command::FloorSelection(_) => NotificationContext::FloorSelection,
                };
                warn!(index, kind = command.kind(), error = %err, "command submission failed");
                Some(Notification::new(
                    NotificationSeverity::Error,
                    context,
                    err.to_string(),
                ))
            }
        }
    }

    pub fn cars(&self) -> &CarStateStore {
        &self.cars
    }

    pub fn cues(&self) -> &RiderCueMatcher {
        &self.cues
    }

    pub fn buttons(&self) -> &FloorButtonStateMachine {
        &self.buttons
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        let total_floors = self
            .configuration
            .as_ref()
            .map(|conf| conf.total_floors)
            .unwrap_or_default();
        let floors = (1..=total_floors)
            .map(|floor| FloorSnapshot {
                floor,
                up: self
                    .buttons
                    .latch(floor, Direction::Ascending)
                    .unwrap_or(LatchState::Disabled),
                down: self
                    .buttons
                    .latch(floor, Direction::Descending)
                    .unwrap_or(LatchState::Disabled),
                doors: self
                    .cars
                    .car_names()
                    .map(|car_name| CarDoor {
                        car_name: car_name.clone(),
                        cue: self.cues.match_for_car(floor, car_name).cloned(),
                    })
                    .collect(),
            })
            .collect();

        ConsoleSnapshot {
            configured: self.is_configured(),
            total_floors,
            cars: self.cars.snapshot(),
            floors,
            pending_cues: self.cues.pending().len(),
            commands_appended: self.log.len(),
            configuration_error: self.configuration_error.clone(),
        }
    }
}

/// Parses rider input such as `3, 5,7` into destination floors.
pub fn parse_floor_list(input: &str) -> Result<Vec<FloorNumber>, ConsoleError> {
    let invalid = |reason: String| ConsoleError::InvalidFloorList {
        input: input.to_string(),
        reason,
    };
    if input.trim().is_empty() {
        return Err(invalid("at least one destination floor is required".to_string()));
    }
    input
        .split(',')
        .map(str::trim)
        .map(|entry| {
            entry
                .parse::<FloorNumber>()
                .map_err(|_| invalid(format!("'{entry}' is not a floor number")))
        })
        .collect()
}

pub enum SessionInput {
    Configured(Result<Configuration, ConsoleError>),
    Push(PushMessage),
    Dispatched(DispatchOutcome),
    PressCall {
        floor: FloorNumber,
        direction: Direction,
        reply: oneshot::Sender<Result<usize, ConsoleError>>,
    },
    SubmitFloors {
        floor: FloorNumber,
        car: CarName,
        requested_floors: Vec<FloorNumber>,
        reply: oneshot::Sender<Result<usize, ConsoleError>>,
    },
    Shutdown,
}

impl From<PushMessage> for SessionInput {
    fn from(value: PushMessage) -> Self {
        SessionInput::Push(value)
    }
}

impl From<DispatchOutcome> for SessionInput {
    fn from(value: DispatchOutcome) -> Self {
        SessionInput::Dispatched(value)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub notification_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            notification_capacity: 64,
        }
    }
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct ConsoleHandle {
    inputs: mpsc::UnboundedSender<SessionInput>,
    snapshots: watch::Receiver<ConsoleSnapshot>,
    notifications: broadcast::Sender<Notification>,
}

impl ConsoleHandle {
    pub async fn press_call(
        &self,
        floor: FloorNumber,
        direction: Direction,
    ) -> Result<usize, ConsoleError> {
        let (reply, rx) = oneshot::channel();
        self.inputs
            .send(SessionInput::PressCall {
                floor,
                direction,
                reply,
            })
            .map_err(|_| ConsoleError::SessionClosed)?;
        rx.await.map_err(|_| ConsoleError::SessionClosed)?
    }

    pub async fn submit_floors(
        &self,
        floor: FloorNumber,
        car: CarName,
        requested_floors: Vec<FloorNumber>,
    ) -> Result<usize, ConsoleError> {
        let (reply, rx) = oneshot::channel();
        self.inputs
            .send(SessionInput::SubmitFloors {
                floor,
                car,
                requested_floors,
                reply,
            })
            .map_err(|_| ConsoleError::SessionClosed)?;
        rx.await.map_err(|_| ConsoleError::SessionClosed)?
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<ConsoleSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.inputs.send(SessionInput::Shutdown);
    }
}

pub struct ConsoleSession {
    state: ConsoleState,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    dispatcher: Dispatcher,
    snapshots: watch::Sender<ConsoleSnapshot>,
    notifications: broadcast::Sender<Notification>,
}

impl ConsoleSession {
    /// Fetches the configuration, opens the push channel and starts the
    /// control loop. Returns immediately.
    pub fn start(
        api: Arc<dyn BackendApi>,
        options: SessionOptions,
    ) -> (ConsoleHandle, JoinHandle<()>) {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(ConsoleSnapshot::default());
        let (notifications, _) = broadcast::channel(options.notification_capacity.max(1));

        let handle = ConsoleHandle {
            inputs: inputs_tx.clone(),
            snapshots: snapshots_rx,
            notifications: notifications.clone(),
        };

        let configuration_api = Arc::clone(&api);
        let configured_tx = inputs_tx.clone();
        tokio::spawn(async move {
            let result = configuration_api.fetch_configuration().await;
            let _ = configured_tx.send(SessionInput::Configured(result));
        });

        let push_channel = EventChannelAdapter::new(Arc::clone(&api)).spawn(inputs_tx.clone());

        let session = ConsoleSession {
            state: ConsoleState::new(),
            inputs: inputs_rx,
            dispatcher: Dispatcher::spawn(api, inputs_tx),
            snapshots: snapshots_tx,
            notifications,
        };
        let task = tokio::spawn(async move {
            session.run().await;
            push_channel.abort();
        });
        (handle, task)
    }

    async fn run(mut self) {
        while let Some(input) = self.inputs.recv().await {
            match input {
                SessionInput::Configured(Ok(configuration)) => {
                    self.state.configure(configuration);
                }
                SessionInput::Configured(Err(err)) => {
                    let notification = self.state.configuration_failed(&err);
                    self.notify(notification);
                }
                SessionInput::Push(message) => self.state.apply_push(message),
                SessionInput::Dispatched(outcome) => {
                    if let Some(notification) = self.state.record_outcome(outcome) {
                        self.notify(notification);
                    }
                }
                SessionInput::PressCall {
                    floor,
                    direction,
                    reply,
                } => {
                    let result = self.state.press_call(floor, direction);
                    self.dispatch_new();
                    let _ = reply.send(result);
                }
                SessionInput::SubmitFloors {
                    floor,
                    car,
                    requested_floors,
                    reply,
                } => {
                    let result = self.state.submit_floors(floor, &car, requested_floors);
                    self.dispatch_new();
                    let _ = reply.send(result);
                }
                SessionInput::Shutdown => {
                    info!("console session shutting down");
                    break;
                }
            }
            self.snapshots.send_replace(self.state.snapshot());
        }
    }

    fn dispatch_new(&mut self) {
        let entries = self.state.take_dispatchable();
        self.dispatcher.dispatch(entries);
    }

    fn notify(&self, notification: Notification) {
        // Nobody listening is fine; the failure is already logged.
        let _ = self.notifications.send(notification);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
