//! The `LocalBus` capability trait and its in-process implementation
//! (spec §4.4).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use relaycore_core::Envelope;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{BusError, BusResult};
use crate::message::BusMessage;

/// Invoked once per inbound message (spec §4.4: "handler contract").
///
/// Returns a short diagnostic string; the trait is async so handlers may
/// themselves call back into the bus or another capability without
/// blocking the listener's accept loop for long.
#[async_trait]
pub trait BusHandler: Send + Sync {
    /// Handle one inbound message, returning a short diagnostic summary.
    async fn handle(&self, message: BusMessage) -> String;
}

/// A subject-addressed request/reply bus capability (spec §4.4).
#[async_trait]
pub trait LocalBus: Send + Sync {
    /// Publish `envelope` to `recipient` on
    /// `<root>.<recipient>.<envelope.subject>`, optionally setting a
    /// reply-to subject.
    async fn send(&self, envelope: &Envelope, recipient: &str, reply_to: Option<&str>) -> BusResult<()>;

    /// Subscribe to `<root>.<client_id>.>` and invoke `handler` for every
    /// inbound message, without blocking producers.
    async fn start_listener(&self, handler: Arc<dyn BusHandler>) -> BusResult<()>;
}

/// Shared routing table behind one or more [`InProcessBus`] handles,
/// grounded in the teacher's `astrid_kernel::socket` per-client channel
/// registry.
#[derive(Default)]
pub struct Broker {
    listeners: DashMap<String, mpsc::UnboundedSender<BusMessage>>,
}

impl Broker {
    /// Construct an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The in-process `LocalBus` implementation used by the composition root.
/// A `RemoteBus` over a real broker is out of scope (spec §1 Non-goals:
/// "not a general RPC framework").
pub struct InProcessBus {
    root: String,
    client_id: String,
    broker: Arc<Broker>,
}

impl InProcessBus {
    /// Construct a bus endpoint identified by `client_id`, rooted at
    /// `root`, sharing `broker` with every other endpoint in the process.
    #[must_use]
    pub fn new(root: impl Into<String>, client_id: impl Into<String>, broker: Arc<Broker>) -> Self {
        Self {
            root: root.into(),
            client_id: client_id.into(),
            broker,
        }
    }
}

#[async_trait]
impl LocalBus for InProcessBus {
    async fn send(&self, envelope: &Envelope, recipient: &str, reply_to: Option<&str>) -> BusResult<()> {
        let subject = format!("{}.{}.{}", self.root, recipient, envelope.subject);
        let data = serde_json::to_vec(envelope).map_err(BusError::Encode)?;
        let message = BusMessage {
            data,
            subject,
            reply: reply_to.map(str::to_string),
        };

        match self.broker.listeners.get(recipient) {
            Some(sender) => {
                if sender.send(message).is_err() {
                    warn!(recipient, "local bus listener channel closed");
                }
                Ok(())
            }
            None => {
                debug!(recipient, "no local bus listener registered, dropping message");
                Err(BusError::NoListener(recipient.to_string()))
            }
        }
    }

    async fn start_listener(&self, handler: Arc<dyn BusHandler>) -> BusResult<()> {
        if self.broker.listeners.contains_key(&self.client_id) {
            return Err(BusError::AlreadyListening(self.client_id.clone()));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.broker.listeners.insert(self.client_id.clone(), tx);

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let diagnostic = handler.handle(message).await;
                debug!(diagnostic, "local bus message handled");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct CollectingHandler {
        received: Mutex<Vec<BusMessage>>,
        notify: Notify,
    }

    #[async_trait]
    impl BusHandler for CollectingHandler {
        async fn handle(&self, message: BusMessage) -> String {
            self.received.lock().unwrap().push(message);
            self.notify.notify_one();
            "ok".to_string()
        }
    }

    #[tokio::test]
    async fn send_routes_to_listener_on_recipient_subject() {
        let broker = Arc::new(Broker::new());
        let core_bus = InProcessBus::new("relaycore", "core", Arc::clone(&broker));
        let controller_bus = InProcessBus::new("relaycore", "controller", Arc::clone(&broker));

        let handler = Arc::new(CollectingHandler {
            received: Mutex::new(Vec::new()),
            notify: Notify::new(),
        });
        core_bus.start_listener(handler.clone()).await.unwrap();

        let envelope = Envelope::builder("heartbeat", serde_json::json!({})).build();
        controller_bus.send(&envelope, "core", None).await.unwrap();

        handler.notify.notified().await;
        let received = handler.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].subject, "relaycore.core.heartbeat");
    }

    #[tokio::test]
    async fn send_without_listener_errors() {
        let broker = Arc::new(Broker::new());
        let bus = InProcessBus::new("relaycore", "controller", broker);
        let envelope = Envelope::builder("heartbeat", serde_json::json!({})).build();
        let err = bus.send(&envelope, "scheduler", None).await.unwrap_err();
        assert!(matches!(err, BusError::NoListener(_)));
    }

    #[tokio::test]
    async fn double_listener_registration_errors() {
        let broker = Arc::new(Broker::new());
        let bus = InProcessBus::new("relaycore", "core", Arc::clone(&broker));
        let handler = Arc::new(CollectingHandler {
            received: Mutex::new(Vec::new()),
            notify: Notify::new(),
        });
        bus.start_listener(handler.clone()).await.unwrap();
        let err = bus.start_listener(handler).await.unwrap_err();
        assert!(matches!(err, BusError::AlreadyListening(_)));
    }
}
