//! Append-only log of outbound commands and the dispatcher that sends each
//! new entry exactly once.
//!
//! Sends are independent requests. They start in append order but may finish
//! in any order, and a new command never waits for an earlier one.

use std::sync::Arc;

use futures::{stream::FuturesUnordered, StreamExt};
use shared::protocol::{FloorCallRequest, FloorSelectionSubmission, RiderServiceRequest};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{error::ConsoleError, transport::BackendApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Call(FloorCallRequest),
    FloorSelection(FloorSelectionSubmission),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Call(_) => "floor_call",
            Command::FloorSelection(_) => "floor_selection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedCommand {
    pub index: usize,
    pub command: Command,
}

#[derive(Debug, Default)]
pub struct CommandLog {
    entries: Vec<LoggedCommand>,
    /// Entries before this index have been handed to the dispatcher.
    dispatched: usize,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, command: Command) -> usize {
        let index = self.entries.len();
        self.entries.push(LoggedCommand { index, command });
        index
    }

    /// Everything appended since the last call, oldest first. Each entry is
    /// returned by exactly one call.
    pub fn undispatched(&mut self) -> Vec<LoggedCommand> {
        let fresh = self.entries[self.dispatched..].to_vec();
        self.dispatched = self.entries.len();
        fresh
    }

    pub fn entries(&self) -> &[LoggedCommand] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    CallAccepted(RiderServiceRequest),
    FloorsAccepted(FloorSelectionSubmission),
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub index: usize,
    pub command: Command,
    pub result: Result<DispatchResponse, ConsoleError>,
}

/// Front half of the dispatch task. Entries are queued here in append order
/// and a single task starts their sends in that same order, whatever runtime
/// flavor it runs on.
pub struct Dispatcher {
    queue: mpsc::UnboundedSender<LoggedCommand>,
}

impl Dispatcher {
    pub fn spawn<T>(api: Arc<dyn BackendApi>, outcomes: mpsc::UnboundedSender<T>) -> Self
    where
        T: From<DispatchOutcome> + Send + 'static,
    {
        let (queue, entries) = mpsc::unbounded_channel();
        tokio::spawn(run_dispatch(api, entries, outcomes));
        Self { queue }
    }

    /// Queues one send per entry, in the order given. Completion is reported
    /// back through the outcome channel.
    pub fn dispatch(&self, entries: Vec<LoggedCommand>) {
        for entry in entries {
            info!(index = entry.index, kind = entry.command.kind(), "dispatching command");
            if let Err(mpsc::error::SendError(entry)) = self.queue.send(entry) {
                warn!(index = entry.index, "dispatch task is gone; command dropped");
            }
        }
    }
}

/// Sends run concurrently inside one `FuturesUnordered`. Its run queue is
/// FIFO, so each send is first polled in queue order while completions land
/// in any order.
async fn run_dispatch<T>(
    api: Arc<dyn BackendApi>,
    mut entries: mpsc::UnboundedReceiver<LoggedCommand>,
    outcomes: mpsc::UnboundedSender<T>,
) where
    T: From<DispatchOutcome> + Send + 'static,
{
    let mut in_flight = FuturesUnordered::new();
    loop {
        tokio::select! {
            entry = entries.recv() => match entry {
                Some(entry) => in_flight.push(send_logged(Arc::clone(&api), entry)),
                None => break,
            },
            Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                report(&outcomes, outcome);
            }
        }
    }
    while let Some(outcome) = in_flight.next().await {
        report(&outcomes, outcome);
    }
}

async fn send_logged(api: Arc<dyn BackendApi>, entry: LoggedCommand) -> DispatchOutcome {
    let LoggedCommand { index, command } = entry;
    let result = send(api.as_ref(), &command).await;
    DispatchOutcome {
        index,
        command,
        result,
    }
}

fn report<T: From<DispatchOutcome>>(outcomes: &mpsc::UnboundedSender<T>, outcome: DispatchOutcome) {
    let index = outcome.index;
    if outcomes.send(T::from(outcome)).is_err() {
        warn!(index, "command completed after the console session closed");
    }
}

async fn send(api: &dyn BackendApi, command: &Command) -> Result<DispatchResponse, ConsoleError> {
    match command {
        Command::Call(request) => api
            .submit_call(request)
            .await
            .map(DispatchResponse::CallAccepted),
        Command::FloorSelection(submission) => api
            .submit_floors(submission)
            .await
            .map(DispatchResponse::FloorsAccepted),
    }
}

#[cfg(test)]
#[path = "tests/command_log_tests.rs"]
mod tests;
