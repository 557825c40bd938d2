//! Narrow view of the connectivity supervisor the cloud channel depends on.
//!
//! Grounded in spec.md §9's "narrow capability interfaces passed by
//! construction" design note: `CloudChannel` never depends on
//! `relaycore_connectivity::ConnectivitySupervisor<P>`'s probe type
//! parameter, only on this trait.

use relaycore_connectivity::{ConnectivitySupervisor, Probe};

/// The subset of [`ConnectivitySupervisor`] the cloud channel needs.
pub trait ConnectivityGate: Send + Sync {
    /// Whether the last probe succeeded.
    fn is_connected(&self) -> bool;

    /// Register a callback fired once per disconnected→connected
    /// transition, in registration order.
    fn on_connected(&self, callback: Box<dyn Fn() + Send + Sync>);
}

impl<P: Probe + 'static> ConnectivityGate for ConnectivitySupervisor<P> {
    fn is_connected(&self) -> bool {
        ConnectivitySupervisor::is_connected(self)
    }

    fn on_connected(&self, callback: Box<dyn Fn() + Send + Sync>) {
        ConnectivitySupervisor::on_connected(self, move || callback());
    }
}
