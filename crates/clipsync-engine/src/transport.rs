//! Real-time Transport
//!
//! Publish/subscribe surface for the notification and message channel. The
//! playback engine never depends on it; it lives here so hosts share one
//! event vocabulary and one reconnect policy.
//!
//! `EventBus` does no I/O. The host owns the socket and reports what happens
//! to it (`on_open`, `deliver`, `on_error`, `on_closed`); the bus dispatches
//! payloads to subscribers and decides whether to reconnect.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Close code sent for an invalid or expired credential
pub const CLOSE_UNAUTHORIZED: u16 = 4001;
/// Close code sent when the account is banned
pub const CLOSE_BANNED: u16 = 4003;

/// Event kinds carried by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportEvent {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "message:new")]
    MessageNew,
    #[serde(rename = "message:seen")]
    MessageSeen,
    #[serde(rename = "notification:new")]
    NotificationNew,
    #[serde(rename = "notification:unseen_count")]
    NotificationUnseenCount,
    #[serde(rename = "admin:user_banned")]
    AdminUserBanned,
    #[serde(rename = "admin:video_deleted")]
    AdminVideoDeleted,
    #[serde(rename = "admin:report_resolved")]
    AdminReportResolved,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "error")]
    Error,
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("empty credential")]
    EmptyCredential,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unknown event type {0:?}")]
    UnknownEvent(String),
}

/// Subscription handle returned by `on`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub type Handler = Box<dyn FnMut(&Value)>;

/// Publish/subscribe transport
pub trait RealtimeTransport {
    fn connect(&mut self, credential: &str) -> Result<(), TransportError>;
    fn on(&mut self, event: TransportEvent, handler: Handler) -> HandlerId;
    /// Returns false when the handler was not registered.
    fn off(&mut self, event: TransportEvent, id: HandlerId) -> bool;
    fn disconnect(&mut self);
}

/// Reconnect schedule: linear back-off, bounded attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the `attempt`-th reconnect (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay * attempt
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// In-process event bus
pub struct EventBus {
    state: ConnectionState,
    credential: Option<String>,
    manual_close: bool,
    attempts: u32,
    policy: ReconnectPolicy,
    next_id: u64,
    handlers: HashMap<TransportEvent, Vec<(HandlerId, Handler)>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("policy", &self.policy)
            .field("handlers", &self.handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl EventBus {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            credential: None,
            manual_close: false,
            attempts: 0,
            policy,
            next_id: 1,
            handlers: HashMap::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn listener_count(&self, event: TransportEvent) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// The socket opened.
    pub fn on_open(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        tracing::info!("transport connected");
    }

    /// Dispatch one raw frame from the socket.
    pub fn deliver(&mut self, raw: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let event: TransportEvent = serde_json::from_value(Value::String(envelope.kind.clone()))
            .map_err(|_| TransportError::UnknownEvent(envelope.kind))?;

        if event == TransportEvent::Ping {
            tracing::trace!("transport ping");
            return Ok(());
        }
        let payload = envelope.data.or(envelope.error).unwrap_or(Value::Null);
        self.emit(event, &payload);
        Ok(())
    }

    /// The socket reported an error.
    pub fn on_error(&mut self) {
        tracing::warn!("transport error");
        self.emit(
            TransportEvent::Error,
            &json!({ "message": "WebSocket error occurred" }),
        );
    }

    /// The socket closed. Returns the delay after which the host should call
    /// `reconnect`, or `None` when no reconnect should happen.
    pub fn on_closed(&mut self, code: u16, reason: &str) -> Option<Duration> {
        self.state = ConnectionState::Disconnected;
        tracing::info!(code, reason, "transport closed");

        match code {
            CLOSE_UNAUTHORIZED => {
                tracing::warn!("transport credential rejected");
                self.emit(
                    TransportEvent::Error,
                    &json!({ "code": "UNAUTHORIZED", "message": "Invalid or expired token" }),
                );
                return None;
            }
            CLOSE_BANNED => {
                tracing::warn!("account banned");
                self.emit(TransportEvent::AdminUserBanned, &json!({ "reason": reason }));
                return None;
            }
            _ => {}
        }

        if self.manual_close || self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        self.state = ConnectionState::Reconnecting;
        let delay = self.policy.delay_for(self.attempts);
        tracing::info!(
            attempt = self.attempts,
            max = self.policy.max_attempts,
            ?delay,
            "scheduling reconnect"
        );
        Some(delay)
    }

    /// Reconnect with the last credential.
    pub fn reconnect(&mut self) -> Result<(), TransportError> {
        let credential = self.credential.clone().ok_or(TransportError::EmptyCredential)?;
        self.connect(&credential)
    }

    fn emit(&mut self, event: TransportEvent, payload: &Value) {
        if let Some(handlers) = self.handlers.get_mut(&event) {
            for (_, handler) in handlers.iter_mut() {
                handler(payload);
            }
        }
    }
}

impl RealtimeTransport for EventBus {
    fn connect(&mut self, credential: &str) -> Result<(), TransportError> {
        if credential.trim().is_empty() {
            return Err(TransportError::EmptyCredential);
        }
        if self.is_connected() {
            tracing::debug!("transport already connected");
            return Ok(());
        }
        self.credential = Some(credential.to_string());
        self.manual_close = false;
        self.state = ConnectionState::Connecting;
        tracing::info!("transport connecting");
        Ok(())
    }

    fn on(&mut self, event: TransportEvent, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.entry(event).or_default().push((id, handler));
        id
    }

    fn off(&mut self, event: TransportEvent, id: HandlerId) -> bool {
        let Some(handlers) = self.handlers.get_mut(&event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        before != handlers.len()
    }

    fn disconnect(&mut self) {
        self.manual_close = true;
        self.state = ConnectionState::Disconnected;
        tracing::info!("transport disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn connected_bus() -> EventBus {
        let mut bus = EventBus::default();
        bus.connect("token").unwrap();
        bus.on_open();
        bus
    }

    fn recorder(bus: &mut EventBus, event: TransportEvent) -> (HandlerId, Rc<RefCell<Vec<Value>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = bus.on(event, Box::new(move |payload| sink.borrow_mut().push(payload.clone())));
        (id, seen)
    }

    #[test]
    fn test_deliver_dispatches_by_type() {
        let mut bus = connected_bus();
        let (_, messages) = recorder(&mut bus, TransportEvent::MessageNew);
        let (_, counts) = recorder(&mut bus, TransportEvent::NotificationUnseenCount);

        bus.deliver(r#"{"type":"message:new","data":{"id":5}}"#).unwrap();
        bus.deliver(r#"{"type":"ping"}"#).unwrap();

        assert_eq!(messages.borrow().as_slice(), &[json!({ "id": 5 })]);
        assert!(counts.borrow().is_empty());
    }

    #[test]
    fn test_deliver_rejects_bad_frames() {
        let mut bus = EventBus::default();
        assert_eq!(bus.deliver(r#"{"type":"ping"}"#), Err(TransportError::NotConnected));

        let mut bus = connected_bus();
        assert!(matches!(bus.deliver("{"), Err(TransportError::Malformed(_))));
        assert_eq!(
            bus.deliver(r#"{"type":"typing"}"#),
            Err(TransportError::UnknownEvent("typing".into()))
        );
    }

    #[test]
    fn test_off_removes_handler() {
        let mut bus = connected_bus();
        let (id, seen) = recorder(&mut bus, TransportEvent::NotificationNew);
        assert!(bus.off(TransportEvent::NotificationNew, id));
        assert!(!bus.off(TransportEvent::NotificationNew, id));

        bus.deliver(r#"{"type":"notification:new","data":{}}"#).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.listener_count(TransportEvent::NotificationNew), 0);
    }

    #[test]
    fn test_reconnect_is_bounded() {
        let mut bus = connected_bus();
        let mut delays = Vec::new();
        while let Some(delay) = bus.on_closed(1006, "abnormal") {
            delays.push(delay);
            bus.reconnect().unwrap();
        }
        assert_eq!(delays.len(), 5);
        assert_eq!(delays[0], Duration::from_secs(3));
        assert_eq!(delays[4], Duration::from_secs(15));

        // A successful open resets the budget.
        bus.on_open();
        assert_eq!(bus.reconnect_attempts(), 0);
    }

    #[test]
    fn test_auth_and_ban_closes_do_not_reconnect() {
        let mut bus = connected_bus();
        let (_, errors) = recorder(&mut bus, TransportEvent::Error);
        let (_, bans) = recorder(&mut bus, TransportEvent::AdminUserBanned);

        assert_eq!(bus.on_closed(CLOSE_UNAUTHORIZED, ""), None);
        assert_eq!(errors.borrow()[0]["code"], "UNAUTHORIZED");

        bus.on_open();
        assert_eq!(bus.on_closed(CLOSE_BANNED, "spam"), None);
        assert_eq!(bans.borrow()[0]["reason"], "spam");
    }

    #[test]
    fn test_manual_disconnect_does_not_reconnect() {
        let mut bus = connected_bus();
        bus.disconnect();
        assert_eq!(bus.on_closed(1000, "client disconnect"), None);
        assert_eq!(bus.state(), ConnectionState::Disconnected);
        assert_eq!(bus.connect("  "), Err(TransportError::EmptyCredential));
    }
}
