use serde::{Deserialize, Serialize};

/// Error body the backend returns alongside a non-success status. Every field
/// is optional because the body is produced by the backend framework and may
/// be absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ApiError {
    /// Best human readable summary of the body, if it carried one.
    pub fn summary(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) if !message.is_empty() => {
                Some(format!("{error}: {message}"))
            }
            (Some(error), _) => Some(error.clone()),
            (None, Some(message)) if !message.is_empty() => Some(message.clone()),
            _ => None,
        }
    }
}
