//! The shape delivered to a bus listener (spec §4.4).

/// An inbound message as handed to a [`crate::BusHandler`].
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// UTF-8 JSON-encoded [`relaycore_core::Envelope`] payload.
    pub data: Vec<u8>,
    /// The full subject the message was published on
    /// (`<root>.<recipient>.<subject>`).
    pub subject: String,
    /// The reply-to subject, if the sender set one.
    pub reply: Option<String>,
}

impl BusMessage {
    /// Decode the payload as an [`relaycore_core::Envelope`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed payloads —
    /// per spec §4.4, the handler is expected to report and drop these
    /// rather than propagate them further.
    pub fn envelope(&self) -> serde_json::Result<relaycore_core::Envelope> {
        serde_json::from_slice(&self.data)
    }
}
