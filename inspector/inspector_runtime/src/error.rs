use thiserror::Error;

pub type InspectorResult<T> = Result<T, InspectorError>;

/// Failures surfaced by the inspector core and its transport.
///
/// Unknown events are not represented here: they are ignored, never errors.
#[derive(Debug, Error)]
pub enum InspectorError {
    /// Duplicate, malformed or out-of-session handshake.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// A recognized event carried a payload of unexpected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// No live channel (or no action context) to send through.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid launch configuration: {0}")]
    Config(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InspectorError {
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn channel_unavailable(message: impl Into<String>) -> Self {
        Self::ChannelUnavailable(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
