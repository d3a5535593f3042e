use crate::error::{InspectorError, InspectorResult};
use crate::protocol::Handshake;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Session identity shared between the connection manager (sole writer) and
/// the settings store (reader, for the commit context).
///
/// Tokens are set at most once; the action binding is part of the same
/// cell so `action_id` and `context_token` are always set together.
/// `Send + Sync` so the dispatcher that owns it can move onto a spawned
/// task; the session itself is still driven from one task.
#[derive(Debug, Default)]
pub struct ConnectionIdentity {
    tokens: OnceLock<SessionTokens>,
    connected: AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionTokens {
    instance_id: String,
    binding: Option<ActionBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActionBinding {
    action_id: String,
    context_token: String,
}

impl ConnectionIdentity {
    pub fn instance_id(&self) -> Option<&str> {
        self.tokens.get().map(|tokens| tokens.instance_id.as_str())
    }

    pub fn action_id(&self) -> Option<&str> {
        self.binding().map(|binding| binding.action_id.as_str())
    }

    pub fn context_token(&self) -> Option<&str> {
        self.binding().map(|binding| binding.context_token.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn binding(&self) -> Option<&ActionBinding> {
        self.tokens.get().and_then(|tokens| tokens.binding.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Established,
    /// Same instance id as the live session; nothing changed.
    AlreadyEstablished,
}

#[derive(Debug, Default)]
pub struct ConnectionManager {
    identity: Arc<ConnectionIdentity>,
    closed: bool,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for components that need to read the session tokens.
    pub fn identity(&self) -> Arc<ConnectionIdentity> {
        self.identity.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.identity.is_connected()
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.identity.is_connected() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn on_handshake(&mut self, handshake: Handshake) -> InspectorResult<HandshakeOutcome> {
        if self.closed {
            return Err(InspectorError::protocol_violation(
                "handshake received after the session closed",
            ));
        }

        if handshake.instance_id.is_empty() {
            return Err(InspectorError::protocol_violation(
                "handshake with empty instance id",
            ));
        }

        let binding = handshake.action_info.map(|info| ActionBinding {
            action_id: info.action,
            context_token: info.context,
        });
        let candidate = SessionTokens {
            instance_id: handshake.instance_id,
            binding,
        };

        match self.identity.tokens.set(candidate) {
            Ok(()) => {
                self.identity.connected.store(true, Ordering::Release);
                Ok(HandshakeOutcome::Established)
            }
            Err(candidate) => {
                let established = self.identity.instance_id().unwrap_or_default();
                if established == candidate.instance_id {
                    Ok(HandshakeOutcome::AlreadyEstablished)
                } else {
                    Err(InspectorError::protocol_violation(format!(
                        "second handshake for instance '{}' while '{established}' is established",
                        candidate.instance_id
                    )))
                }
            }
        }
    }

    /// Channel loss. Terminal: there is no resume state.
    pub fn on_disconnect(&mut self) {
        self.identity.connected.store(false, Ordering::Release);
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ActionInfo, ActionPayload};

    fn handshake(instance_id: &str, binding: Option<(&str, &str)>) -> Handshake {
        Handshake {
            instance_id: instance_id.to_string(),
            action_info: binding.map(|(action, context)| ActionInfo {
                action: action.to_string(),
                context: context.to_string(),
                payload: ActionPayload::default(),
            }),
        }
    }

    #[test]
    fn starts_disconnected_with_empty_identity() {
        let manager = ConnectionManager::new();
        assert!(!manager.is_connected());
        assert_eq!(manager.state(), SessionState::Disconnected);
        let identity = manager.identity();
        assert_eq!(identity.instance_id(), None);
        assert_eq!(identity.action_id(), None);
        assert_eq!(identity.context_token(), None);
    }

    #[test]
    fn handshake_sets_identity_and_connects() {
        let mut manager = ConnectionManager::new();
        let outcome = manager
            .on_handshake(handshake("abc", Some(("com.x.y", "ctx1"))))
            .expect("handshake accepted");

        assert_eq!(outcome, HandshakeOutcome::Established);
        assert!(manager.is_connected());
        let identity = manager.identity();
        assert_eq!(identity.instance_id(), Some("abc"));
        assert_eq!(identity.action_id(), Some("com.x.y"));
        assert_eq!(identity.context_token(), Some("ctx1"));
    }

    #[test]
    fn handshake_without_action_leaves_binding_unset() {
        let mut manager = ConnectionManager::new();
        manager
            .on_handshake(handshake("abc", None))
            .expect("handshake accepted");

        let identity = manager.identity();
        assert!(identity.is_connected());
        assert_eq!(identity.action_id(), None);
        assert_eq!(identity.context_token(), None);
    }

    #[test]
    fn empty_instance_id_is_rejected() {
        let mut manager = ConnectionManager::new();
        let err = manager
            .on_handshake(handshake("", Some(("com.x.y", "ctx1"))))
            .expect_err("empty id must fail");

        assert!(matches!(err, InspectorError::ProtocolViolation(_)));
        assert!(!manager.is_connected());
        assert_eq!(manager.identity().context_token(), None);
    }

    #[test]
    fn repeated_handshake_with_same_id_is_idempotent() {
        let mut manager = ConnectionManager::new();
        manager
            .on_handshake(handshake("abc", Some(("com.x.y", "ctx1"))))
            .expect("first handshake");
        let outcome = manager
            .on_handshake(handshake("abc", Some(("com.other", "ctx2"))))
            .expect("repeat handshake");

        assert_eq!(outcome, HandshakeOutcome::AlreadyEstablished);
        assert_eq!(manager.identity().context_token(), Some("ctx1"));
    }

    #[test]
    fn second_handshake_with_different_id_is_rejected() {
        let mut manager = ConnectionManager::new();
        manager
            .on_handshake(handshake("abc", Some(("com.x.y", "ctx1"))))
            .expect("first handshake");
        let err = manager
            .on_handshake(handshake("def", Some(("com.x.y", "ctx2"))))
            .expect_err("different id must fail");

        assert!(matches!(err, InspectorError::ProtocolViolation(_)));
        assert_eq!(manager.identity().instance_id(), Some("abc"));
        assert_eq!(manager.identity().context_token(), Some("ctx1"));
    }

    #[test]
    fn disconnect_is_terminal() {
        let mut manager = ConnectionManager::new();
        manager
            .on_handshake(handshake("abc", None))
            .expect("handshake accepted");
        manager.on_disconnect();

        assert!(!manager.is_connected());
        assert_eq!(manager.state(), SessionState::Closed);
        let err = manager
            .on_handshake(handshake("abc", None))
            .expect_err("no resume after disconnect");
        assert!(matches!(err, InspectorError::ProtocolViolation(_)));
    }
}
