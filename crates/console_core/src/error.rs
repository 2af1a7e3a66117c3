use chrono::{DateTime, Utc};
use shared::domain::{CarName, FloorNumber};
use thiserror::Error;

use crate::floor_buttons::PressRejected;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("invalid server url '{url}': {source}")]
    InvalidServerUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("unexpected server response from {endpoint}: {status}{}", with_detail(.detail))]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("console is not configured yet")]
    Unconfigured,
    #[error(transparent)]
    Press(#[from] PressRejected),
    #[error("no rider cue is waiting for car {car} on floor {floor}")]
    NoCueForCar { floor: FloorNumber, car: CarName },
    #[error("invalid destination floor list '{input}': {reason}")]
    InvalidFloorList { input: String, reason: String },
    #[error("console session has shut down")]
    SessionClosed,
}

fn with_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(" ({detail})"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSeverity {
    /// The feature is unusable until restart.
    Blocking,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationContext {
    Configuration,
    CallRequest,
    FloorSelection,
}

/// A failure surfaced to the person at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub raised_at: DateTime<Utc>,
    pub severity: NotificationSeverity,
    pub context: NotificationContext,
    pub message: String,
}

impl Notification {
    pub fn new(
        severity: NotificationSeverity,
        context: NotificationContext,
        message: impl Into<String>,
    ) -> Self {
        Self {
            raised_at: Utc::now(),
            severity,
            context,
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == NotificationSeverity::Blocking
    }
}
