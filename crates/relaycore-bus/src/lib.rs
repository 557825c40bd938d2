//! Subject-addressed local bus adapter (spec §4.4).
//!
//! Bridges the routing layer to the on-device components over a dotted
//! subject namespace rooted at `mQueueSubjectRoot`. The capability is
//! specified as a trait (`LocalBus`) with one concrete in-process
//! implementation; a real broker-backed implementation is out of scope
//! (spec §1 Non-goals).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod error;
mod message;

pub use bus::{Broker, BusHandler, InProcessBus, LocalBus};
pub use error::{BusError, BusResult};
pub use message::BusMessage;
