//! Routing and heartbeat layer bridging the cloud channel and the local bus
//! (spec §4.6).
//!
//! [`Router`] is the composition point: it owns the closed-set dispatch
//! tables of [`subjects`], the component health map, the cloud heartbeat
//! pair, and this supervisor's own fixed 30s component-heartbeat loop.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod component_heartbeat;
pub mod health;
pub mod heartbeat;
pub mod router;
pub mod subjects;
pub mod system_info;

pub use component_heartbeat::spawn_component_heartbeat_loop;
pub use health::ComponentHealthRegistry;
pub use heartbeat::HeartbeatSupervisor;
pub use router::Router;
pub use subjects::{local_logical_subject, CloudSubject, LocalSubject, PublishableSubject};
pub use system_info::{SystemInfoModel, SystemInfoSource};
