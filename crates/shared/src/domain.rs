use std::fmt;

use serde::{Deserialize, Serialize};

/// A floor number as the backend numbers them (ground floor is 1).
pub type FloorNumber = i32;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

name_newtype!(CarName);
// Assigned by the backend and only ever compared for equality.
name_newtype!(ServiceRequestId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn iter() -> impl Iterator<Item = Direction> {
        [Direction::Ascending, Direction::Descending].into_iter()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Car status as reported by the backend. Codes this client does not know are
/// carried verbatim so they still render and round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CarStatusCode {
    Available,
    Moving,
    Waiting,
    Other(String),
}

impl From<String> for CarStatusCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AVAILABLE" => CarStatusCode::Available,
            "MOVING" => CarStatusCode::Moving,
            "WAITING" => CarStatusCode::Waiting,
            _ => CarStatusCode::Other(value),
        }
    }
}

impl From<CarStatusCode> for String {
    fn from(value: CarStatusCode) -> Self {
        match value {
            CarStatusCode::Available => "AVAILABLE".to_string(),
            CarStatusCode::Moving => "MOVING".to_string(),
            CarStatusCode::Waiting => "WAITING".to_string(),
            CarStatusCode::Other(raw) => raw,
        }
    }
}

impl fmt::Display for CarStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarStatusCode::Available => f.pad("AVAILABLE"),
            CarStatusCode::Moving => f.pad("MOVING"),
            CarStatusCode::Waiting => f.pad("WAITING"),
            CarStatusCode::Other(raw) => f.pad(raw),
        }
    }
}
