//! Cloud channel state machine (spec §4.5).
//!
//! Maintains a durable, auto-rejoining connection to the cloud relay and
//! delivers inbound messages as a serialized stream into the routing layer
//! via a single-writer channel, while gating connection attempts on the
//! connectivity supervisor.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod channel;
mod error;
mod gate;
mod transport;

pub use auth::{AuthProvider, AuthResult, HttpAuthProvider};
pub use channel::CloudChannel;
pub use error::{CloudError, CloudResult};
pub use gate::ConnectivityGate;
pub use transport::{CloudSession, CloudTransport, WebSocketTransport};
