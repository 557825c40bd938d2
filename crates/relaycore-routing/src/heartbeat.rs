//! The cloud heartbeat pair: an alive loop and a countdown loop, armed and
//! disarmed together (spec §4.6).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relaycore_cloud::CloudChannel;
use relaycore_core::Envelope;
use tokio::task::JoinHandle;
use tracing::debug;

/// Coordinates the alive loop (emits `heartbeat` every `heartbeat_every`
/// while armed) and the countdown loop (decrements once per second from
/// `loop_duration`; at zero, queries the cloud group and disarms both).
pub struct HeartbeatSupervisor {
    armed: AtomicBool,
    remaining_secs: AtomicI64,
    heartbeat_every: Duration,
    loop_duration: Duration,
    cloud: Arc<CloudChannel>,
}

impl HeartbeatSupervisor {
    /// Construct a supervisor, unarmed, tied to `cloud`'s outbound publish
    /// path.
    #[must_use]
    pub fn new(cloud: Arc<CloudChannel>, heartbeat_every: Duration, loop_duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            armed: AtomicBool::new(false),
            remaining_secs: AtomicI64::new(loop_duration.as_secs() as i64),
            heartbeat_every,
            loop_duration,
            cloud,
        })
    }

    /// Arm both loops and reset the countdown (spec §4.6: inbound cloud
    /// `heartbeat` "arms the alive loop and resets the countdown").
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
        self.remaining_secs.store(self.loop_duration.as_secs() as i64, Ordering::SeqCst);
    }

    /// Whether either loop currently considers itself armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Spawn the alive loop and the countdown loop.
    pub fn start(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        (self.spawn_alive_loop(), self.spawn_countdown_loop())
    }

    fn spawn_alive_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.heartbeat_every);
            loop {
                ticker.tick().await;
                if this.is_armed() {
                    let envelope = Envelope::builder("heartbeat", serde_json::json!("I am alive")).build();
                    let _ = this.cloud.publish(&envelope, true).await;
                }
            }
        })
    }

    fn spawn_countdown_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                if !this.is_armed() {
                    continue;
                }
                let remaining = this.remaining_secs.fetch_sub(1, Ordering::SeqCst) - 1;
                if remaining <= 0 {
                    debug!("heartbeat countdown expired, querying cloud group");
                    let envelope = Envelope::builder("heartbeat", serde_json::json!("Is anyone there?")).build();
                    let _ = this.cloud.publish(&envelope, true).await;
                    this.disarm();
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaycore_cloud::{AuthProvider, AuthResult, CloudError, CloudSession, CloudTransport, ConnectivityGate};
    use relaycore_core::Envelope as CoreEnvelope;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::mpsc;

    struct OkAuth;
    #[async_trait]
    impl AuthProvider for OkAuth {
        async fn authenticate(&self) -> Result<AuthResult, CloudError> {
            Ok(AuthResult {
                websocket_url: "wss://example.invalid".to_string(),
                user_id: "u1".to_string(),
                display_name: "device".to_string(),
                profile: None,
            })
        }
    }

    struct CountingTransport {
        connects: Arc<AtomicU32>,
    }
    #[async_trait]
    impl CloudTransport for CountingTransport {
        async fn connect(&self, _url: &str, _group: &str) -> Result<Box<dyn CloudSession>, CloudError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullSession))
        }
    }

    struct NullSession;
    #[async_trait]
    impl CloudSession for NullSession {
        async fn send(&mut self, _e: &CoreEnvelope) -> Result<(), CloudError> {
            Ok(())
        }
        async fn recv(&mut self) -> Result<Option<CoreEnvelope>, CloudError> {
            std::future::pending().await
        }
        async fn rejoin(&mut self, _group: &str) -> Result<(), CloudError> {
            Ok(())
        }
        async fn close(&mut self) {}
    }

    struct AlwaysConnected;
    impl ConnectivityGate for AlwaysConnected {
        fn is_connected(&self) -> bool {
            true
        }
        fn on_connected(&self, _callback: Box<dyn Fn() + Send + Sync>) {}
    }

    async fn joined_channel() -> Arc<CloudChannel> {
        let (tx, _rx) = mpsc::channel(8);
        let transport = Arc::new(CountingTransport { connects: Arc::new(AtomicU32::new(0)) });
        let channel = CloudChannel::new(Arc::new(OkAuth), transport, Arc::new(AlwaysConnected), "g1", true, tx);
        channel.start().await;
        channel
    }

    #[tokio::test]
    async fn starts_unarmed() {
        let cloud = joined_channel().await;
        let supervisor = HeartbeatSupervisor::new(cloud, Duration::from_secs(60), Duration::from_secs(60));
        assert!(!supervisor.is_armed());
    }

    #[tokio::test]
    async fn arm_resets_countdown_and_marks_armed() {
        let cloud = joined_channel().await;
        let supervisor = HeartbeatSupervisor::new(cloud, Duration::from_secs(60), Duration::from_secs(5));
        supervisor.remaining_secs.store(1, Ordering::SeqCst);
        supervisor.arm();
        assert!(supervisor.is_armed());
        assert_eq!(supervisor.remaining_secs.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_disarms_both_loops() {
        let cloud = joined_channel().await;
        let supervisor = HeartbeatSupervisor::new(cloud, Duration::from_secs(3600), Duration::from_secs(2));
        supervisor.arm();
        let (alive, countdown) = supervisor.start();

        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert!(!supervisor.is_armed());
        alive.abort();
        countdown.abort();
    }
}
