//! Internet reachability supervisor (spec §4.3).
//!
//! Periodically resolves a configured test domain and issues an HTTPS GET
//! against it, maintaining an authoritative `connected` flag and notifying
//! registered subscribers exactly once per transition, in registration
//! order.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod probe;
mod supervisor;

pub use probe::{HttpProbe, Probe};
pub use supervisor::ConnectivitySupervisor;
