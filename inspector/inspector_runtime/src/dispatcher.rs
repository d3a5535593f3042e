use crate::channel::EventChannel;
use crate::connection::{ConnectionManager, HandshakeOutcome};
use crate::protocol::{EventKind, Handshake, InboundMessage};
use crate::store::{InputDescriptor, SettingsStore};
use crate::{LocalEdit, RenderSurface};
use serde_json::Value;

/// What a single inbound message did. Only handshake failures are errors,
/// and even those are reported here rather than propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Handshake(HandshakeOutcome),
    HandshakeRejected,
    InputsReplaced { len: usize },
    InputsUnchanged,
    SettingsReceived,
    GlobalSettingsReceived,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingPayload,
    AwaitingHandshake,
    MalformedPayload,
    UnknownEvent,
}

/// Routes host events to the connection manager and the settings store.
///
/// Owns both so that every mutation of the snapshot goes through one
/// `&mut self` path, whether it comes from the host or from a local edit.
pub struct EventDispatcher<C, S> {
    connection: ConnectionManager,
    store: SettingsStore<C, S>,
}

impl<C: EventChannel, S: RenderSurface> EventDispatcher<C, S> {
    pub fn new(channel: C, surface: S) -> Self {
        let connection = ConnectionManager::new();
        let store = SettingsStore::new(connection.identity(), channel, surface);
        Self { connection, store }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn store(&self) -> &SettingsStore<C, S> {
        &self.store
    }

    pub fn on_message(&mut self, message: &InboundMessage) -> Dispatched {
        match EventKind::classify(&message.event) {
            EventKind::Handshake => self.handle_handshake(message),
            EventKind::PushToInspector => match self.gated_payload(message) {
                Ok(payload) => self.handle_push(payload),
                Err(reason) => self.ignore(message, reason),
            },
            EventKind::SettingsReceived => match self.gated_payload(message) {
                Ok(payload) => {
                    self.store.apply_received_settings(payload);
                    Dispatched::SettingsReceived
                }
                Err(reason) => self.ignore(message, reason),
            },
            EventKind::GlobalSettingsReceived => {
                tracing::debug!(payload = ?message.payload, "received global settings");
                Dispatched::GlobalSettingsReceived
            }
            EventKind::Unrecognized => self.ignore(message, IgnoreReason::UnknownEvent),
        }
    }

    pub fn apply_local_edit(&mut self, edit: LocalEdit) {
        self.store.apply_local_edit(edit);
    }

    /// The transport is gone. The session cannot be resumed afterwards.
    pub fn on_channel_lost(&mut self) {
        let was_connected = self.connection.is_connected();
        self.connection.on_disconnect();
        if was_connected {
            tracing::info!("host channel lost; session closed");
            self.store.notify_connection(false);
        }
    }

    fn handle_handshake(&mut self, message: &InboundMessage) -> Dispatched {
        let result = Handshake::from_message(message).and_then(|handshake| {
            if let Some(settings) = handshake
                .action_info
                .as_ref()
                .and_then(|info| info.payload.settings.as_ref())
            {
                tracing::debug!(?settings, "initial action settings");
            }
            self.connection.on_handshake(handshake)
        });

        match result {
            Ok(HandshakeOutcome::Established) => {
                let identity = self.connection.identity();
                tracing::info!(
                    instance_id = identity.instance_id().unwrap_or_default(),
                    action = identity.action_id().unwrap_or_default(),
                    context = identity.context_token().unwrap_or_default(),
                    "connected to host"
                );
                self.store.notify_connection(true);
                Dispatched::Handshake(HandshakeOutcome::Established)
            }
            Ok(HandshakeOutcome::AlreadyEstablished) => {
                tracing::debug!("repeated handshake for the live session");
                Dispatched::Handshake(HandshakeOutcome::AlreadyEstablished)
            }
            Err(err) => {
                tracing::error!(%err, "handshake rejected");
                Dispatched::HandshakeRejected
            }
        }
    }

    fn handle_push(&mut self, payload: &Value) -> Dispatched {
        let Some(incoming) = payload.get("inputs").and_then(Value::as_array) else {
            tracing::debug!("push without an inputs sequence");
            return Dispatched::Ignored(IgnoreReason::MalformedPayload);
        };

        // Length is the only change signal; equal-length updates are dropped.
        if incoming.len() == self.store.inputs().len() {
            return Dispatched::InputsUnchanged;
        }

        let len = incoming.len();
        let inputs = incoming.iter().cloned().map(InputDescriptor).collect();
        self.store.replace_inputs(inputs);
        tracing::debug!(len, "inputs replaced");
        Dispatched::InputsReplaced { len }
    }

    fn gated_payload<'m>(&self, message: &'m InboundMessage) -> Result<&'m Value, IgnoreReason> {
        let payload = message
            .payload
            .as_ref()
            .ok_or(IgnoreReason::MissingPayload)?;
        if !self.connection.is_connected() {
            return Err(IgnoreReason::AwaitingHandshake);
        }
        Ok(payload)
    }

    fn ignore(&self, message: &InboundMessage, reason: IgnoreReason) -> Dispatched {
        tracing::debug!(
            event = %message.event,
            action = message.action.as_deref().unwrap_or_default(),
            context = message.context.as_deref().unwrap_or_default(),
            ?reason,
            "event ignored"
        );
        Dispatched::Ignored(reason)
    }
}
