//! Authoritative NTP reachability flag plus change-driven notification
//! (spec §4.7).

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use relaycore_core::NtpState;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::packet::{client_request, PACKET_LEN};

const NTP_PORT: u16 = 123;

/// Notified when the NTP monitor's availability flag is (re-)computed.
///
/// Grounded in spec.md §9's "narrow capability interfaces passed by
/// construction" design note: the monitor never depends on the local bus or
/// cloud channel types directly — the routing layer supplies an impl of
/// this trait that forwards to both.
pub trait NtpSink: Send + Sync {
    /// Called once per check — both on the synchronous initial check and on
    /// every subsequent state change (spec §4.7: "dispatches the initial
    /// status to the scheduler" unconditionally, then "on every state
    /// change thereafter").
    fn on_initial_status(&self, available: bool);

    /// Called only when `available` differs from the previous check.
    fn on_status_change(&self, available: bool);
}

/// Periodically probes a list of NTP servers and maintains [`NtpState`].
pub struct NtpMonitor {
    servers: Vec<String>,
    check_interval: Duration,
    timeout: Duration,
    state: Mutex<NtpState>,
}

impl NtpMonitor {
    /// Construct a monitor. `check_interval` of zero is clamped to 1s per
    /// spec §8 boundary behavior.
    #[must_use]
    pub fn new(servers: Vec<String>, check_interval: Duration, timeout: Duration) -> Self {
        let check_interval = if check_interval.is_zero() { Duration::from_secs(1) } else { check_interval };
        Self {
            servers,
            check_interval,
            timeout,
            state: Mutex::new(NtpState::default()),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> NtpState {
        self.state.lock().expect("lock poisoned").clone()
    }

    /// Probe every configured server in order, stopping at the first that
    /// answers with any bytes (spec §4.7). Empty `servers` deterministically
    /// returns `false` (spec §8 boundary behavior).
    pub async fn check_once(&self) -> bool {
        for server in &self.servers {
            match probe_server(server, self.timeout).await {
                Ok(true) => return true,
                Ok(false) => continue,
                Err(e) => {
                    debug!(server = %server, error = %e, "ntp probe failed");
                    continue;
                }
            }
        }
        false
    }

    /// Run the initial synchronous check, dispatch it unconditionally to
    /// `sink`, then spawn the periodic loop that dispatches only on change.
    pub async fn start(self: Arc<Self>, sink: Arc<dyn NtpSink>) -> tokio::task::JoinHandle<()> {
        let available = self.check_once().await;
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.available = available;
            state.last_checked_at = Some(SystemTime::now());
        }
        sink.on_initial_status(available);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.check_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let available = self.check_once().await;
                let changed = {
                    let mut state = self.state.lock().expect("lock poisoned");
                    let changed = state.available != available;
                    state.available = available;
                    state.last_checked_at = Some(SystemTime::now());
                    changed
                };
                if changed {
                    sink.on_status_change(available);
                }
            }
        })
    }
}

async fn probe_server(server: &str, timeout: Duration) -> Result<bool, std::io::Error> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let addr = format!("{server}:{NTP_PORT}");
    socket.connect(&addr).await?;
    socket.send(&client_request()).await?;

    let mut buf = [0u8; 1024];
    match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
        Ok(Ok(n)) => Ok(n > 0),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!(server = %server, "ntp probe timed out");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[test]
    fn packet_len_is_48() {
        assert_eq!(PACKET_LEN, 48);
    }

    #[tokio::test]
    async fn empty_server_list_is_deterministically_unavailable() {
        let monitor = NtpMonitor::new(Vec::new(), Duration::from_secs(60), Duration::from_millis(100));
        assert!(!monitor.check_once().await);
    }

    #[tokio::test]
    async fn unreachable_servers_return_false_within_timeout() {
        // spec.md §8 scenario 3, using reserved test-net addresses.
        let monitor = NtpMonitor::new(
            vec!["203.0.113.1".to_string(), "192.0.2.1".to_string()],
            Duration::from_secs(60),
            Duration::from_millis(200),
        );
        let started = std::time::Instant::now();
        let available = monitor.check_once().await;
        assert!(!available);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_interval_clamps_to_one_second() {
        let monitor = NtpMonitor::new(Vec::new(), Duration::ZERO, Duration::from_secs(1));
        assert_eq!(monitor.check_interval, Duration::from_secs(1));
    }

    struct RecordingSink {
        initial_calls: AtomicU32,
        change_calls: AtomicU32,
        last: AtomicBool,
    }

    impl NtpSink for RecordingSink {
        fn on_initial_status(&self, available: bool) {
            self.initial_calls.fetch_add(1, Ordering::SeqCst);
            self.last.store(available, Ordering::SeqCst);
        }

        fn on_status_change(&self, available: bool) {
            self.change_calls.fetch_add(1, Ordering::SeqCst);
            self.last.store(available, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn initial_check_dispatches_unconditionally() {
        let monitor = Arc::new(NtpMonitor::new(Vec::new(), Duration::from_secs(60), Duration::from_millis(50)));
        let sink = Arc::new(RecordingSink {
            initial_calls: AtomicU32::new(0),
            change_calls: AtomicU32::new(0),
            last: AtomicBool::new(true),
        });
        let handle = monitor.start(sink.clone()).await;
        handle.abort();
        assert_eq!(sink.initial_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.change_calls.load(Ordering::SeqCst), 0);
        assert!(!sink.last.load(Ordering::SeqCst));
    }
}
