//! The message envelope shared by the cloud channel and the local bus
//! (spec §3/§6).

use serde::{Deserialize, Serialize};

/// A message crossing the cloud relay or the local bus.
///
/// Both surfaces use the same shape: a free-form JSON `body`, a routing
/// `subject`, a `source` identifying the sender, and an optional
/// `destination`. Builder grounded on the teacher's
/// `InboundMessage`/`OutboundMessage` builder pattern, collapsed to one type
/// since the spec names a single envelope shape for both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Arbitrary JSON payload.
    pub body: serde_json::Value,
    /// Routing subject (dotted path on the local bus; may carry a
    /// `"<recipient>.<subject>"` prefix on the cloud side).
    pub subject: String,
    /// Sender identity. Outbound envelopes from this process always set
    /// this to `"controller"` (spec §6).
    pub source: String,
    /// Destination identity. Defaults to `"broadcast"` when absent on
    /// outbound envelopes (spec §6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Reply-to subject, used by local bus request/reply (spec §4.4).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl Envelope {
    /// Start building an envelope with the given subject and body.
    #[must_use]
    pub fn builder(subject: impl Into<String>, body: serde_json::Value) -> EnvelopeBuilder {
        EnvelopeBuilder {
            body,
            subject: subject.into(),
            source: "controller".to_string(),
            destination: None,
            reply: None,
        }
    }

    /// The destination, defaulting to `"broadcast"` per spec §6.
    #[must_use]
    pub fn destination_or_broadcast(&self) -> &str {
        self.destination.as_deref().unwrap_or("broadcast")
    }

    /// Split an inbound subject into `(recipient, rest)` at the first dot,
    /// per spec §4.6 ("parse subject; if it contains a dot, split once").
    #[must_use]
    pub fn split_recipient(subject: &str) -> Option<(&str, &str)> {
        subject.split_once('.')
    }
}

/// Builder for [`Envelope`].
#[derive(Debug)]
pub struct EnvelopeBuilder {
    body: serde_json::Value,
    subject: String,
    source: String,
    destination: Option<String>,
    reply: Option<String>,
}

impl EnvelopeBuilder {
    /// Override the source (defaults to `"controller"`).
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set an explicit destination (defaults to `"broadcast"` if unset).
    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the reply-to subject.
    #[must_use]
    pub fn reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Consume the builder and produce an [`Envelope`].
    #[must_use]
    pub fn build(self) -> Envelope {
        Envelope {
            body: self.body,
            subject: self.subject,
            source: self.source,
            destination: self.destination,
            reply: self.reply,
        }
    }
}
