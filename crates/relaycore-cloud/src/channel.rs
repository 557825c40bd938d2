//! The cloud channel state machine (spec §4.5):
//! `Idle → Authenticating → Connecting → Joined ⇄ Disconnected → (retry) → Authenticating`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaycore_core::{CloudPhase, Envelope};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::AuthProvider;
use crate::error::CloudError;
use crate::gate::ConnectivityGate;
use crate::transport::{CloudSession, CloudTransport};

const RETRY_DELAY: Duration = Duration::from_secs(5);
const REJOIN_DELAY: Duration = Duration::from_secs(3);
const STABILIZATION_DELAY: Duration = Duration::from_secs(3);

/// The cloud channel: authenticated, auto-rejoining group session with a
/// single-writer inbound delivery surface.
pub struct CloudChannel {
    auth: Arc<dyn AuthProvider>,
    transport: Arc<dyn CloudTransport>,
    connectivity: Arc<dyn ConnectivityGate>,
    group_name: String,
    inbound_tx: mpsc::Sender<Envelope>,

    phase: Mutex<CloudPhase>,
    session: Mutex<Option<Box<dyn CloudSession>>>,

    should_be_connected: AtomicBool,
    broadcast_enabled: AtomicBool,
    retry_scheduled: AtomicBool,
    connect_in_flight: AtomicBool,
    subscribed: AtomicBool,
    on_joined: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
}

impl CloudChannel {
    /// Construct a channel. `inbound_tx` is the single-writer delivery
    /// surface the routing layer's main event loop reads from (spec §5:
    /// "Inbound cloud messages cross the thread boundary via a single
    /// run-on-loop primitive").
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn CloudTransport>,
        connectivity: Arc<dyn ConnectivityGate>,
        group_name: impl Into<String>,
        broadcast_enabled: bool,
        inbound_tx: mpsc::Sender<Envelope>,
    ) -> Arc<Self> {
        Arc::new(Self {
            auth,
            transport,
            connectivity,
            group_name: group_name.into(),
            inbound_tx,
            phase: Mutex::new(CloudPhase::Idle),
            session: Mutex::new(None),
            should_be_connected: AtomicBool::new(false),
            broadcast_enabled: AtomicBool::new(broadcast_enabled),
            retry_scheduled: AtomicBool::new(false),
            connect_in_flight: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            on_joined: Mutex::new(Vec::new()),
        })
    }

    /// Register a callback invoked every time the channel reaches `Joined`
    /// (spec §4.5: "On connected event, emits `system_info` via §4.6") —
    /// the routing layer is the only caller, supplied at construction time
    /// per spec §9's narrow-capability design note.
    pub fn on_joined(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_joined.lock().expect("lock poisoned").push(Box::new(callback));
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> CloudPhase {
        *self.phase.lock().expect("lock poisoned")
    }

    fn set_phase(&self, phase: CloudPhase) {
        *self.phase.lock().expect("lock poisoned") = phase;
    }

    /// `start()`: sets `should_be_connected = true`. If connectivity is
    /// down, stays `Idle` and returns without socket I/O (spec §8 boundary
    /// behavior); otherwise proceeds to `Authenticating`.
    pub async fn start(self: &Arc<Self>) {
        self.should_be_connected.store(true, Ordering::SeqCst);
        self.subscribe_to_connectivity();

        if !self.connectivity.is_connected() {
            self.set_phase(CloudPhase::Idle);
            return;
        }

        self.attempt_connect().await;
    }

    fn subscribe_to_connectivity(self: &Arc<Self>) {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        self.connectivity.on_connected(Box::new(move || {
            let this = Arc::clone(&this);
            tokio::spawn(async move {
                this.on_connectivity_restored().await;
            });
        }));
    }

    async fn on_connectivity_restored(self: Arc<Self>) {
        // Stabilization delay + double-check per spec §4.5.
        tokio::time::sleep(STABILIZATION_DELAY).await;
        if !self.should_be_connected.load(Ordering::SeqCst) {
            return;
        }
        if !self.connectivity.is_connected() {
            return;
        }
        if self.phase() == CloudPhase::Joined {
            return;
        }
        self.attempt_connect().await;
    }

    /// At-most-one-attempt guard around the Authenticating→Connecting→Joined
    /// sequence (spec §3/§8: "at most one reconnection attempt in flight").
    async fn attempt_connect(self: &Arc<Self>) {
        if self.connect_in_flight.swap(true, Ordering::SeqCst) {
            debug!("cloud connect already in flight, skipping");
            return;
        }
        self.authenticate_and_connect().await;
        self.connect_in_flight.store(false, Ordering::SeqCst);
    }

    async fn authenticate_and_connect(self: &Arc<Self>) {
        self.set_phase(CloudPhase::Authenticating);
        let auth_result = match self.auth.authenticate().await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "cloud authentication failed");
                self.transition_to_disconnected().await;
                return;
            }
        };

        self.set_phase(CloudPhase::Connecting);
        let mut session = match self.transport.connect(&auth_result.websocket_url, &self.group_name).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "cloud connect failed");
                self.transition_to_disconnected().await;
                return;
            }
        };

        // Joining the group is a distinct step from opening the socket
        // (spec §4.5): if it fails, retry the join alone on the same
        // socket rather than tearing down and re-authenticating.
        if let Err(e) = session.rejoin(&self.group_name).await {
            warn!(error = %e, group = %self.group_name, "initial group join failed, scheduling a rejoin-only retry");
            *self.session.lock().expect("lock poisoned") = Some(session);
            if !self.rejoin_group().await {
                warn!(group = %self.group_name, "rejoin retry failed, tearing down for a full reconnect");
                self.transition_to_disconnected().await;
                return;
            }
        } else {
            *self.session.lock().expect("lock poisoned") = Some(session);
        }

        self.set_phase(CloudPhase::Joined);
        info!(group = %self.group_name, "cloud channel joined");

        for callback in self.on_joined.lock().expect("lock poisoned").iter() {
            callback();
        }

        // Kick the countdown supervisor (spec §4.5: "emits a single
        // `heartbeat` envelope body 'Is anyone there?'").
        let kick = Envelope::builder("heartbeat", serde_json::json!("Is anyone there?")).build();
        let _ = self.publish(&kick, true).await;

        self.spawn_reader();
    }

    fn spawn_reader(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut guard = this.session.lock().expect("lock poisoned");
                    match guard.as_mut() {
                        Some(session) => session.recv().await,
                        None => return,
                    }
                };
                match next {
                    Ok(Some(envelope)) => {
                        // Ordering guarantee: posted to the main event loop
                        // in the order received from the underlying client.
                        if this.inbound_tx.send(envelope).await.is_err() {
                            warn!("inbound delivery channel closed, dropping cloud message");
                        }
                    }
                    Ok(None) => {
                        info!("cloud connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "cloud read failed");
                        break;
                    }
                }
            }
            this.transition_to_disconnected().await;
        });
    }

    async fn transition_to_disconnected(self: &Arc<Self>) {
        *self.session.lock().expect("lock poisoned") = None;
        if self.phase() == CloudPhase::Stopped {
            return;
        }
        self.set_phase(CloudPhase::Disconnected);

        let should_be_connected = self.should_be_connected.load(Ordering::SeqCst);
        let connected = self.connectivity.is_connected();

        if should_be_connected && connected {
            self.schedule_retry();
        }
        // If connectivity is false, reconnection is driven solely by the
        // connectivity-connected subscriber (spec §4.5) — no retry here.
    }

    fn schedule_retry(self: &Arc<Self>) {
        if self.retry_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(RETRY_DELAY).await;
            this.retry_scheduled.store(false, Ordering::SeqCst);
            // A connectivity-restored subscriber (or a rejoin) may have
            // already rejoined the channel while this retry was sleeping —
            // a stale retry must back off rather than reconnect a second
            // time (spec §8 reconnect-storm scenario).
            if this.phase() == CloudPhase::Joined {
                return;
            }
            if this.should_be_connected.load(Ordering::SeqCst) && this.connectivity.is_connected() {
                this.attempt_connect().await;
            }
        });
    }

    /// Rejoin the current group only, after a 3s delay, without tearing
    /// down the whole channel (spec §4.5: "if a rejoin of a specific group
    /// fails, waits 3s and rejoins that group only"). Returns whether the
    /// retried rejoin succeeded; the caller decides whether a further
    /// failure should fall back to a full reconnect.
    pub async fn rejoin_group(self: &Arc<Self>) -> bool {
        tokio::time::sleep(REJOIN_DELAY).await;
        let mut guard = self.session.lock().expect("lock poisoned");
        match guard.as_mut() {
            Some(session) => match session.rejoin(&self.group_name).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "rejoin retry failed");
                    false
                }
            },
            None => false,
        }
    }

    /// Publish an outbound envelope (spec §4.5/§4.6).
    ///
    /// Gated by `broadcast_enabled` unless `management` is set (unsolicited
    /// channel-management messages bypass the gate per spec §4.5). Dropped
    /// silently (debug log) when the channel is not `Joined`.
    pub async fn publish(self: &Arc<Self>, envelope: &Envelope, management: bool) -> Result<(), CloudError> {
        if !management && !self.broadcast_enabled.load(Ordering::SeqCst) {
            debug!(subject = %envelope.subject, "broadcast disabled, dropping outbound envelope");
            return Ok(());
        }

        if self.phase() != CloudPhase::Joined {
            debug!(subject = %envelope.subject, phase = ?self.phase(), "cloud channel not joined, dropping outbound envelope");
            return Ok(());
        }

        let mut guard = self.session.lock().expect("lock poisoned");
        match guard.as_mut() {
            Some(session) => session.send(envelope).await,
            None => {
                debug!(subject = %envelope.subject, "no active session, dropping outbound envelope");
                Ok(())
            }
        }
    }

    /// `stop()`: sets `should_be_connected = false` and closes the client.
    pub async fn stop(self: &Arc<Self>) {
        self.should_be_connected.store(false, Ordering::SeqCst);
        self.set_phase(CloudPhase::Stopped);
        let mut guard = self.session.lock().expect("lock poisoned");
        if let Some(session) = guard.as_mut() {
            session.close().await;
        }
        *guard = None;
    }

    /// Whether broadcasting outbound envelopes is currently enabled.
    #[must_use]
    pub fn broadcast_enabled(&self) -> bool {
        self.broadcast_enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable outbound broadcasting.
    pub fn set_broadcast_enabled(&self, enabled: bool) {
        self.broadcast_enabled.store(enabled, Ordering::SeqCst);
    }
}
