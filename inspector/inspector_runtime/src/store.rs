use crate::channel::EventChannel;
use crate::connection::ConnectionIdentity;
use crate::error::{InspectorError, InspectorResult};
use crate::protocol::save_settings_envelope;
use crate::{LocalEdit, RenderSurface};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Host-defined input record. The inspector never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputDescriptor(pub Value);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    pub inputs: Vec<InputDescriptor>,
    pub selected_index: i64,
    pub function_name: String,
}

/// The part of the snapshot the host persists. Inputs are host-provided and
/// are not written back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedSettings<'a> {
    selected_index: i64,
    function_name: &'a str,
}

impl<'a> From<&'a SettingsSnapshot> for SavedSettings<'a> {
    fn from(snapshot: &'a SettingsSnapshot) -> Self {
        Self {
            selected_index: snapshot.selected_index,
            function_name: &snapshot.function_name,
        }
    }
}

pub struct SettingsStore<C, S> {
    snapshot: SettingsSnapshot,
    identity: Arc<ConnectionIdentity>,
    channel: C,
    surface: S,
}

impl<C: EventChannel, S: RenderSurface> SettingsStore<C, S> {
    pub fn new(identity: Arc<ConnectionIdentity>, channel: C, surface: S) -> Self {
        Self {
            snapshot: SettingsSnapshot::default(),
            identity,
            channel,
            surface,
        }
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn inputs(&self) -> &[InputDescriptor] {
        &self.snapshot.inputs
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Total replacement. Callers decide whether a replacement is warranted.
    pub fn replace_inputs(&mut self, inputs: Vec<InputDescriptor>) {
        self.snapshot.inputs = inputs;
        self.surface.inputs_replaced(&self.snapshot.inputs);
    }

    /// Host echo of the persisted settings. Diagnostic only.
    pub fn apply_received_settings(&self, payload: &Value) {
        let settings = payload.get("settings").unwrap_or(&Value::Null);
        tracing::debug!(%settings, "received settings from host");
    }

    pub fn set_function_name(&mut self, name: impl Into<String>) {
        self.snapshot.function_name = name.into();
        self.commit_or_drop();
    }

    pub fn set_selected_index(&mut self, index: i64) {
        self.snapshot.selected_index = index;
        self.commit_or_drop();
    }

    pub fn apply_local_edit(&mut self, edit: LocalEdit) {
        match edit {
            LocalEdit::FunctionName(name) => self.set_function_name(name),
            LocalEdit::SelectedIndex(index) => self.set_selected_index(index),
        }
    }

    /// Sends the persisted fields to the host. Reads the snapshot only.
    pub fn commit(&self) -> InspectorResult<()> {
        if !self.identity.is_connected() {
            return Err(InspectorError::channel_unavailable(
                "session is not connected",
            ));
        }

        let context = self
            .identity
            .context_token()
            .ok_or_else(|| InspectorError::channel_unavailable("no action context bound"))?;

        let payload = serde_json::to_value(SavedSettings::from(&self.snapshot))?;
        self.channel.send(save_settings_envelope(context, payload))
    }

    pub(crate) fn notify_connection(&mut self, connected: bool) {
        self.surface.connection_changed(connected);
    }

    fn commit_or_drop(&self) {
        if let Err(err) = self.commit() {
            tracing::warn!(%err, "save settings dropped");
        }
    }
}
