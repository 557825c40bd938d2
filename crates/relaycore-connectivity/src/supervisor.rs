//! Periodic reachability probe with subscriber fan-out (spec §4.3).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use relaycore_core::ConnectivityState;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::probe::Probe;

type Callback = Box<dyn Fn() + Send + Sync>;

/// Maintains the authoritative `connected` flag and notifies subscribers on
/// transitions.
///
/// Subscriber lists are guarded by a mutex (spec §5: "guarded by a
/// mutual-exclusion primitive; callbacks are invoked on a copy taken under
/// the lock") rather than a broadcast channel, since a broadcast channel
/// cannot guarantee "called exactly once per transition, in registration
/// order" to a subscriber that registers between transitions.
pub struct ConnectivitySupervisor<P: Probe> {
    probe: P,
    check_interval: Duration,
    state: Mutex<ConnectivityState>,
    on_connected: Mutex<Vec<Callback>>,
    on_disconnected: Mutex<Vec<Callback>>,
    changed: Notify,
    generation: AtomicU32,
}

impl<P: Probe + 'static> ConnectivitySupervisor<P> {
    /// Construct a supervisor. The returned value reports `connected =
    /// false` until the first [`ConnectivitySupervisor::start`] or
    /// [`ConnectivitySupervisor::force_check`] call completes.
    #[must_use]
    pub fn new(probe: P, check_interval: Duration) -> Self {
        Self {
            probe,
            check_interval,
            state: Mutex::new(ConnectivityState::default()),
            on_connected: Mutex::new(Vec::new()),
            on_disconnected: Mutex::new(Vec::new()),
            changed: Notify::new(),
            generation: AtomicU32::new(0),
        }
    }

    /// Register a callback invoked once, in registration order, on every
    /// disconnected→connected transition.
    pub fn on_connected(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_connected.lock().expect("lock poisoned").push(Box::new(callback));
    }

    /// Register a callback invoked once, in registration order, on every
    /// connected→disconnected transition.
    pub fn on_disconnected(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_disconnected.lock().expect("lock poisoned").push(Box::new(callback));
    }

    /// The current connectivity snapshot.
    #[must_use]
    pub fn state(&self) -> ConnectivityState {
        self.state.lock().expect("lock poisoned").clone()
    }

    /// Whether the last probe succeeded.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Run the probe immediately, update state, and — on a transition — fire
    /// the appropriate subscriber list before returning (spec §4.3:
    /// "`forceCheck()` ... on state change, fires subscribers before
    /// returning").
    pub async fn force_check(&self) -> bool {
        let connected = self.probe.check().await;
        let previous = {
            let mut state = self.state.lock().expect("lock poisoned");
            let previous = state.connected;
            state.connected = connected;
            state.last_probe_at = Some(SystemTime::now());
            state.consecutive_failures = if connected { 0 } else { state.consecutive_failures + 1 };
            previous
        };

        if previous != connected {
            info!(connected, "connectivity state transition");
            self.fire(connected);
        } else {
            debug!(connected, "connectivity probe unchanged");
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.changed.notify_waiters();
        connected
    }

    fn fire(&self, connected: bool) {
        let callbacks = if connected { &self.on_connected } else { &self.on_disconnected };
        let guard = callbacks.lock().expect("lock poisoned");
        for callback in guard.iter() {
            callback();
        }
    }

    /// Run the first probe synchronously, then spawn the periodic loop.
    /// Per spec §4.3, the first check must complete before subscriber
    /// registration calls made by the composition root return — callers
    /// should complete their `on_connected`/`on_disconnected` registration
    /// before calling `start`, or await `start` before relying on the
    /// initial state.
    pub async fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.force_check().await;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.check_interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                this.force_check().await;
            }
        })
    }

    /// Wait until connected, or until `timeout_after` elapses (spec §4.3
    /// `waitForConnection`). Returns `true` if connected by the time this
    /// returns.
    pub async fn wait_for_connection(&self, timeout_after: Option<Duration>) -> bool {
        if self.is_connected() {
            return true;
        }
        let wait = async {
            loop {
                self.changed.notified().await;
                if self.is_connected() {
                    return;
                }
            }
        };
        match timeout_after {
            Some(d) => timeout(d, wait).await.is_ok() && self.is_connected(),
            None => {
                wait.await;
                true
            }
        }
    }
}
