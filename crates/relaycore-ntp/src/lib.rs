//! NTP reachability monitor (spec §4.7).
//!
//! Periodically probes a list of NTP servers with a minimal client request
//! packet over UDP, in order, stopping at the first that answers. Notifies
//! a caller-supplied [`NtpSink`] unconditionally on the first check and on
//! every subsequent state change.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod monitor;
mod packet;

pub use monitor::{NtpMonitor, NtpSink};
pub use packet::{client_request, PACKET_LEN};
