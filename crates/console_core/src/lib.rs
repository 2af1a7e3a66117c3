//! Client-side reconciliation for the elevator console: local stores for car
//! status, rider cues and call buttons, an append-only command log with its
//! dispatcher, and the push channel that feeds them.

pub mod car_state;
pub mod command_log;
pub mod error;
pub mod event_channel;
pub mod floor_buttons;
pub mod rider_cues;
pub mod session;
pub mod transport;

pub use error::{ConsoleError, Notification, NotificationContext, NotificationSeverity};
pub use session::{
    parse_floor_list, CarDoor, ConsoleHandle, ConsoleSession, ConsoleSnapshot, ConsoleState,
    FloorSnapshot, SessionOptions,
};
pub use transport::{BackendApi, HttpBackend};

#[cfg(test)]
mod test_support;
