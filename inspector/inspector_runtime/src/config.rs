use crate::error::{InspectorError, InspectorResult};
use crate::protocol::{DEFAULT_REGISTER_EVENT, EVENT_CONNECTED, InboundMessage};
use clap::Parser;
use serde_json::Value;

pub const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

/// Launch parameters handed to a property inspector by the host.
#[derive(Debug, Clone, Parser)]
#[command(name = "inspector_host", about = "Property inspector for a host-managed action")]
pub struct LaunchConfig {
    /// Host WebSocket port on 127.0.0.1.
    #[arg(long, env = "INSPECTOR_PORT")]
    pub port: u16,

    /// Property inspector instance id assigned by the host.
    #[arg(long, env = "INSPECTOR_UUID")]
    pub uuid: String,

    #[arg(long, env = "INSPECTOR_REGISTER_EVENT", default_value = DEFAULT_REGISTER_EVENT)]
    pub register_event: String,

    /// Host application info as a JSON object.
    #[arg(long, env = "INSPECTOR_INFO")]
    pub info: Option<String>,

    /// Action binding (`action`, `context`, `payload.settings`) as a JSON object.
    #[arg(long, env = "INSPECTOR_ACTION_INFO")]
    pub action_info: Option<String>,

    #[arg(long, env = "INSPECTOR_OUTBOUND_QUEUE_CAP", default_value_t = DEFAULT_OUTBOUND_QUEUE_CAP)]
    pub outbound_queue_cap: usize,

    /// Used when RUST_LOG is not set.
    #[arg(long, env = "INSPECTOR_LOG", default_value = "info")]
    pub log_filter: String,
}

impl LaunchConfig {
    pub fn validate(&self) -> InspectorResult<()> {
        if self.uuid.is_empty() {
            return Err(InspectorError::config("uuid must not be empty"));
        }
        if self.outbound_queue_cap == 0 {
            return Err(InspectorError::config(
                "outbound queue capacity must be greater than zero",
            ));
        }
        self.host_info()?;
        self.parsed_action_info()?;
        Ok(())
    }

    pub fn host_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    pub fn host_info(&self) -> InspectorResult<Option<Value>> {
        parse_json_object("info", self.info.as_deref())
    }

    /// The `connected` handshake as the host would describe this session.
    pub fn handshake_message(&self) -> InspectorResult<InboundMessage> {
        Ok(InboundMessage {
            event: EVENT_CONNECTED.to_string(),
            uuid: Some(self.uuid.clone()),
            action_info: self.parsed_action_info()?,
            ..InboundMessage::default()
        })
    }

    fn parsed_action_info(&self) -> InspectorResult<Option<Value>> {
        parse_json_object("action-info", self.action_info.as_deref())
    }
}

fn parse_json_object(name: &str, raw: Option<&str>) -> InspectorResult<Option<Value>> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(Some(value)),
        Ok(_) => Err(InspectorError::config(format!(
            "{name} must be a JSON object"
        ))),
        Err(err) => Err(InspectorError::config(format!(
            "{name} is not valid JSON: {err}"
        ))),
    }
}
