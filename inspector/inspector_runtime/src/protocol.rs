use crate::error::{InspectorError, InspectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const INSPECTOR_TO_HOST_CAP: usize = 65_536;
pub const HOST_TO_INSPECTOR_CAP: usize = 1_048_576;

pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_SEND_TO_PROPERTY_INSPECTOR: &str = "sendToPropertyInspector";
pub const EVENT_DID_RECEIVE_SETTINGS: &str = "didReceiveSettings";
pub const EVENT_DID_RECEIVE_GLOBAL_SETTINGS: &str = "didReceiveGlobalSettings";
pub const DEFAULT_REGISTER_EVENT: &str = "registerPropertyInspector";

/// Raw inbound frame. Everything except `event` is optional because the
/// host's event shapes differ and unknown fields must not fail decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, rename = "actionInfo")]
    pub action_info: Option<Value>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Handshake,
    PushToInspector,
    SettingsReceived,
    GlobalSettingsReceived,
    Unrecognized,
}

impl EventKind {
    pub fn classify(event: &str) -> Self {
        match event {
            EVENT_CONNECTED => Self::Handshake,
            EVENT_SEND_TO_PROPERTY_INSPECTOR => Self::PushToInspector,
            EVENT_DID_RECEIVE_SETTINGS => Self::SettingsReceived,
            EVENT_DID_RECEIVE_GLOBAL_SETTINGS => Self::GlobalSettingsReceived,
            _ => Self::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub instance_id: String,
    pub action_info: Option<ActionInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionInfo {
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub payload: ActionPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub settings: Option<Map<String, Value>>,
}

impl Handshake {
    pub fn from_message(message: &InboundMessage) -> InspectorResult<Self> {
        let instance_id = message
            .uuid
            .clone()
            .ok_or_else(|| InspectorError::protocol_violation("handshake without uuid"))?;

        let action_info = match &message.action_info {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                serde_json::from_value::<ActionInfo>(raw.clone()).map_err(|err| {
                    InspectorError::protocol_violation(format!("malformed actionInfo: {err}"))
                })?,
            ),
        };

        Ok(Self {
            instance_id,
            action_info,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum OutboundEnvelope {
    #[serde(rename = "setSettings")]
    SaveSettings { context: String, payload: Value },
}

/// First frame on a fresh socket. The event name is chosen by the host at
/// launch, so it cannot be a tagged variant of [`OutboundEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub event: String,
    pub uuid: String,
}

pub fn save_settings_envelope(context: impl Into<String>, payload: Value) -> OutboundEnvelope {
    OutboundEnvelope::SaveSettings {
        context: context.into(),
        payload,
    }
}

pub fn registration(event: impl Into<String>, uuid: impl Into<String>) -> Registration {
    Registration {
        event: event.into(),
        uuid: uuid.into(),
    }
}

pub fn encode_outbound(envelope: &OutboundEnvelope) -> InspectorResult<String> {
    let frame = serde_json::to_string(envelope)?;
    check_frame_len(frame.len(), INSPECTOR_TO_HOST_CAP)?;
    Ok(frame)
}

pub fn encode_registration(registration: &Registration) -> InspectorResult<String> {
    Ok(serde_json::to_string(registration)?)
}

pub fn decode_inbound(frame: &str) -> InspectorResult<InboundMessage> {
    check_frame_len(frame.len(), HOST_TO_INSPECTOR_CAP)?;
    Ok(serde_json::from_str(frame)?)
}

fn check_frame_len(len: usize, max_payload: usize) -> InspectorResult<()> {
    if len > max_payload {
        return Err(InspectorError::transport(format!(
            "frame too large: {len} > {max_payload}"
        )));
    }
    Ok(())
}
