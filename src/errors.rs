use crate::messages::{self, MessageCatalog};
use crate::validation::ErrorTree;

/// Errors produced by the receiving workflow: local guard failures,
/// validation rejections, and everything that can go wrong talking to the
/// receiving API.
#[derive(Debug, thiserror::Error)]
pub enum ReceivingError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Form validation failed")]
    InvalidForm(ErrorTree),

    #[error("A request is already in flight")]
    RequestInFlight,

    #[error("Receiving is already completed")]
    AlreadyCompleted,

    #[error("Shipment has no lines to receive")]
    NothingToReceive,

    #[error("No submission is awaiting confirmation")]
    NothingPending,

    #[error("No shipment item at container {container}, item {item}")]
    UnknownItemPosition { container: usize, item: usize },

    #[error("Partial receiving is not supported at this location")]
    PartialReceivingUnsupported,
}

impl ReceivingError {
    /// True when the failure came from the network or the API rather than
    /// from local state, so retrying the same call may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ReceivingError::Transport(_) => true,
            ReceivingError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Translated, user-facing description of the failure.
    pub fn user_message(&self, catalog: &MessageCatalog) -> String {
        match self {
            ReceivingError::Transport(_) | ReceivingError::Api { .. } => catalog.translate(
                messages::ERROR_NETWORK,
                "Could not reach the receiving service",
            ),
            ReceivingError::InvalidForm(_) => catalog.translate(
                messages::ERROR_VALIDATION,
                "Please correct the highlighted fields",
            ),
            ReceivingError::RequestInFlight => catalog.translate(
                messages::ERROR_REQUEST_IN_FLIGHT,
                "A save is already in progress",
            ),
            other => other.to_string(),
        }
    }
}
