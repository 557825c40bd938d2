//! The routing layer itself: bridges the cloud channel and the local bus
//! (spec §4.6).
//!
//! `Router` is the one type in this crate that depends on every sibling
//! capability (cloud channel, local bus, update orchestrator, NTP monitor,
//! system-info model, component health, heartbeat pair) — per spec §9's
//! cyclic-wiring note, everything it depends on is a narrow trait or a
//! concrete leaf type, never a sibling depending back on `Router` itself.

use std::sync::Arc;

use async_trait::async_trait;
use relaycore_bus::{BusHandler, BusMessage, LocalBus};
use relaycore_core::{ComponentKey, Envelope};
use relaycore_ntp::{NtpMonitor, NtpSink};
use relaycore_updater::UpdateOrchestrator;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::health::ComponentHealthRegistry;
use crate::heartbeat::HeartbeatSupervisor;
use crate::subjects::{local_logical_subject, CloudSubject, LocalSubject};
use crate::system_info::SystemInfoSource;

/// Bridges the cloud channel and the local bus, maintaining component
/// health and the cloud heartbeat pair.
pub struct Router {
    local_bus: Arc<dyn LocalBus>,
    cloud: Arc<relaycore_cloud::CloudChannel>,
    updater: Arc<UpdateOrchestrator>,
    ntp: Arc<NtpMonitor>,
    system_info: Arc<dyn SystemInfoSource>,
    health: Arc<ComponentHealthRegistry>,
    heartbeat: Arc<HeartbeatSupervisor>,
}

impl Router {
    /// Construct a router wired to every collaborating capability.
    #[must_use]
    pub fn new(
        local_bus: Arc<dyn LocalBus>,
        cloud: Arc<relaycore_cloud::CloudChannel>,
        updater: Arc<UpdateOrchestrator>,
        ntp: Arc<NtpMonitor>,
        system_info: Arc<dyn SystemInfoSource>,
        health: Arc<ComponentHealthRegistry>,
        heartbeat: Arc<HeartbeatSupervisor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            local_bus,
            cloud,
            updater,
            ntp,
            system_info,
            health,
            heartbeat,
        })
    }

    /// Dispatch one inbound cloud message (spec §4.6 "Inbound cloud message
    /// handling").
    pub async fn handle_cloud_inbound(&self, envelope: Envelope) {
        let Some((recipient, rest)) = Envelope::split_recipient(&envelope.subject) else {
            debug!(subject = %envelope.subject, "cloud inbound subject has no recipient prefix, dropping");
            return;
        };

        match recipient {
            "core" | "scheduler" => {
                let forwarded = Envelope { subject: rest.to_string(), ..envelope };
                if self.local_bus.send(&forwarded, recipient, None).await.is_err() {
                    debug!(recipient, "no local listener for forwarded cloud message");
                }
            }
            "controller" | "updater" => {
                self.dispatch_controller_subject(CloudSubject::parse(rest), envelope.body).await;
            }
            other => {
                debug!(recipient = %other, subject = %rest, "unknown cloud recipient, dropping");
            }
        }
    }

    async fn dispatch_controller_subject(&self, subject: CloudSubject, body: Value) {
        match subject {
            CloudSubject::Heartbeat => {
                let envelope = Envelope::builder("heartbeat", json!("I am alive")).build();
                let _ = self.cloud.publish(&envelope, true).await;
                self.heartbeat.arm();
            }
            CloudSubject::SystemInfo => {
                let envelope = Envelope::builder("system_info", self.system_info.snapshot()).build();
                let _ = self.cloud.publish(&envelope, true).await;
            }
            CloudSubject::NtpStatus => {
                let available = self.ntp.state().available;
                let envelope = Envelope::builder("ntp_status", json!({ "ntp_available": available })).build();
                let _ = self.cloud.publish(&envelope, true).await;
            }
            CloudSubject::CheckUpdates => {
                let force = body.get("force").and_then(Value::as_bool).unwrap_or(true);
                self.updater.check_updates(force).await;
                let running = self.health.running_snapshot();
                let info = self.updater.get_components_info(&running);
                let envelope = Envelope::builder(
                    "update_check_result",
                    serde_json::to_value(info).unwrap_or_else(|_| json!([])),
                )
                .build();
                let _ = self.cloud.publish(&envelope, true).await;
            }
            CloudSubject::Update => {
                let component_str = body
                    .as_str()
                    .map(str::to_string)
                    .or_else(|| body.get("component").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_default();
                let stripped = component_str.strip_prefix("dunebugger-").unwrap_or(&component_str);
                match stripped.parse::<ComponentKey>() {
                    Ok(key) => {
                        let outcome = self.updater.update_component(key).await;
                        let log_envelope = Envelope::builder(
                            "log",
                            json!({
                                "success": outcome.success,
                                "level": outcome.level,
                                "message": outcome.message,
                            }),
                        )
                        .build();
                        let _ = self.cloud.publish(&log_envelope, true).await;
                    }
                    Err(e) => warn!(component = %component_str, error = %e, "update request named unknown component"),
                }
            }
            CloudSubject::Unknown(subject) => {
                debug!(subject = %subject, "unknown controller/updater subject, dropping");
            }
        }
    }

    async fn dispatch_local_subject(&self, subject: LocalSubject, envelope: Envelope, reply: Option<String>) -> String {
        match subject {
            LocalSubject::Heartbeat => match envelope.source.parse::<ComponentKey>() {
                Ok(key) => {
                    self.health.record_heartbeat(key);
                    "component heartbeat recorded".to_string()
                }
                Err(_) => "heartbeat from unrecognized source ignored".to_string(),
            },
            LocalSubject::GetNtpStatus => {
                if envelope.source == "scheduler" {
                    let available = self.ntp.state().available;
                    let response = Envelope::builder("ntp_status", json!({ "ntp_available": available })).build();
                    let _ = self.local_bus.send(&response, "scheduler", None).await;
                    "ntp status dispatched to scheduler".to_string()
                } else {
                    "get_ntp_status from non-scheduler source ignored".to_string()
                }
            }
            LocalSubject::GetVersion => {
                let recipient = reply.as_deref().unwrap_or(envelope.source.as_str()).to_string();
                let running = self.health.running_snapshot();
                let info = self.updater.get_components_info(&running);
                let response =
                    Envelope::builder("version_info", serde_json::to_value(info).unwrap_or_else(|_| json!([]))).build();
                let _ = self.local_bus.send(&response, &recipient, None).await;
                format!("version info replied to {recipient}")
            }
            LocalSubject::Publishable(subject) => match self.cloud.publish(&envelope, false).await {
                Ok(()) => format!("published {subject:?} to cloud"),
                Err(e) => format!("failed to publish {subject:?} to cloud: {e}"),
            },
            LocalSubject::Unknown(subject) => {
                debug!(subject = %subject, "unknown local bus subject, dropping");
                format!("dropped unknown subject {subject}")
            }
        }
    }

    /// Publish a fresh `system_info` envelope to the cloud group (spec
    /// §4.5: "On connected event, emits `system_info`"), wired to
    /// `CloudChannel::on_joined` by the composition root.
    pub fn publish_system_info_on_joined(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let envelope = Envelope::builder("system_info", this.system_info.snapshot()).build();
            let _ = this.cloud.publish(&envelope, true).await;
        });
    }

    /// An [`NtpSink`] adapter dispatching this router's NTP side effects
    /// (spec §4.7).
    #[must_use]
    pub fn ntp_sink(self: &Arc<Self>) -> Arc<dyn NtpSink> {
        Arc::new(RouterNtpSink(Arc::clone(self)))
    }
}

#[async_trait]
impl BusHandler for Router {
    async fn handle(&self, message: BusMessage) -> String {
        let Some(logical) = local_logical_subject(&message.subject) else {
            return format!("malformed subject with no logical segment: {}", message.subject);
        };

        let envelope = match message.envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, subject = %message.subject, "dropping non-JSON local bus payload");
                return format!("dropped: invalid JSON payload: {e}");
            }
        };

        self.dispatch_local_subject(LocalSubject::parse(logical), envelope, message.reply).await
    }
}

struct RouterNtpSink(Arc<Router>);

impl NtpSink for RouterNtpSink {
    fn on_initial_status(&self, available: bool) {
        self.0.system_info.set_ntp_available(available);
        let router = Arc::clone(&self.0);
        tokio::spawn(async move {
            let response = Envelope::builder("ntp_status", json!({ "ntp_available": available })).build();
            let _ = router.local_bus.send(&response, "scheduler", None).await;
        });
    }

    fn on_status_change(&self, available: bool) {
        self.0.system_info.set_ntp_available(available);
        let router = Arc::clone(&self.0);
        tokio::spawn(async move {
            let response = Envelope::builder("ntp_status", json!({ "ntp_available": available })).build();
            let _ = router.local_bus.send(&response, "scheduler", None).await;
            let _ = router.cloud.publish(&response, true).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use relaycore_bus::{Broker, InProcessBus};
    use relaycore_cloud::{AuthProvider, AuthResult, CloudError, CloudSession, CloudTransport, ConnectivityGate};
    use relaycore_core::ComponentType;
    use relaycore_updater::VersionFetcher;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct OkAuth;
    #[at]
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

    struct NullTransport;
    #[at]
    impl CloudTransport for NullTransport {
        async fn connect(&self, _url: &str, _group: &str) -> Result<Box<dyn CloudSession>, CloudError> {
            Ok(Box::new(NullSession))
        }
    }

    struct NullSession;
    #[at]
    impl CloudSession for NullSession {
        async fn send(&mut self, _e: &Envelope) -> Result<(), CloudError> {
            Ok(())
        }
        async fn recv(&mut self) -> Result<Option<Envelope>, CloudError> {
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

    struct FixedFetcher(&'static str);
    #[at]
    impl VersionFetcher for FixedFetcher {
        async fn current_version(&self) -> String {
            self.0.to_string()
        }
    }

    async fn test_router() -> (Arc<Router>, Arc<Broker>) {
        let broker = Arc::new(Broker::new());
        let local_bus: Arc<dyn LocalBus> = Arc::new(InProcessBus::new("relaycore", "controller", Arc::clone(&broker)));

        let (tx, _rx) = mpsc::channel(8);
        let cloud = relaycore_cloud::CloudChannel::new(
            Arc::new(OkAuth),
            Arc::new(NullTransport),
            Arc::new(AlwaysConnected),
            "g1",
            true,
            tx,
        );
        cloud.start().await;

        let mut fetchers: HashMap<ComponentKey, (ComponentType, Arc<dyn VersionFetcher>)> = HashMap::new();
        fetchers.insert(ComponentKey::Core, (ComponentType::PythonApp, Arc::new(FixedFetcher("1.0.0"))));
        fetchers.insert(ComponentKey::Scheduler, (ComponentType::PythonApp, Arc::new(FixedFetcher("1.0.0"))));
        fetchers.insert(ComponentKey::Remote, (ComponentType::Container, Arc::new(FixedFetcher("1.0.0"))));
        let dir = tempfile::tempdir().unwrap();
        let updater = Arc::new(UpdateOrchestrator::new(
            fetchers,
            "relaycore",
            false,
            Duration::from_secs(3600),
            dir.path().join("requests"),
            dir.path().join("status"),
        ));

        let ntp = Arc::new(NtpMonitor::new(Vec::new(), Duration::from_secs(60), Duration::from_millis(50)));
        let system_info = Arc::new(crate::system_info::SystemInfoModel::new());
        let health = Arc::new(ComponentHealthRegistry::new());
        let heartbeat = HeartbeatSupervisor::new(Arc::clone(&cloud), Duration::from_secs(60), Duration::from_secs(60));

        let router = Router::new(local_bus, cloud, updater, ntp, system_info, health, heartbeat);
        (router, broker)
    }

    #[tokio::test]
    async fn forwards_core_prefixed_cloud_message_to_local_bus() {
        let (router, broker) = test_router().await;

        let core_bus = InProcessBus::new("relaycore", "core", Arc::clone(&broker));
        let received = Arc::new(std::sync::Mutex::new(None));
        let r = Arc::clone(&received);
        struct Capture(Arc<std::sync::Mutex<Option<String>>>);
        #[at]
        impl BusHandler for Capture {
            async fn handle(&self, message: BusMessage) -> String {
                *self.0.lock().unwrap() = Some(message.subject.clone());
                "ok".to_string()
            }
        }
        core_bus.start_listener(Arc::new(Capture(r))).await.unwrap();

        let inbound = Envelope::builder("core.dunebugger_set", json!({"value": 1})).build();
        router.handle_cloud_inbound(inbound).await;
        tokio::task::yield_now().await;

        assert_eq!(received.lock().unwrap().as_deref(), Some("relaycore.core.dunebugger_set"));
    }

    #[tokio::test]
    async fn unknown_cloud_recipient_is_dropped_without_panicking() {
        let (router, _broker) = test_router().await;
        let inbound = Envelope::builder("unknown.xyz", json!({})).build();
        router.handle_cloud_inbound(inbound).await;
    }

    #[tokio::test]
    async fn controller_heartbeat_arms_supervisor() {
        let (router, _broker) = test_router().await;
        assert!(!router.heartbeat.is_armed());
        let inbound = Envelope::builder("controller.heartbeat", json!("Is anyone there?")).build();
        router.handle_cloud_inbound(inbound).await;
        assert!(router.heartbeat.is_armed());
    }

    #[tokio::test]
    async fn local_heartbeat_marks_component_running() {
        let (router, _broker) = test_router().await;
        let envelope = Envelope::builder("heartbeat", json!("core")).source("core").build();
        let message = BusMessage {
            data: serde_json::to_vec(&envelope).unwrap(),
            subject: "relaycore.controller.heartbeat".to_string(),
            reply: None,
        };
        let outcome = router.handle(message).await;
        assert_eq!(outcome, "component heartbeat recorded");
        assert!(router.health.running_snapshot()[&ComponentKey::Core]);
    }

    #[tokio::test]
    async fn publishable_local_subject_goes_to_cloud() {
        let (router, _broker) = test_router().await;
        let envelope = Envelope::builder("gpio_state", json!({"pin": 4})).source("core").build();
        let message = BusMessage {
            data: serde_json::to_vec(&envelope).unwrap(),
            subject: "relaycore.controller.gpio_state".to_string(),
            reply: None,
        };
        let outcome = router.handle(message).await;
        assert!(outcome.starts_with("published"));
    }

    #[tokio::test]
    async fn malformed_local_payload_is_reported_and_dropped() {
        let (router, _broker) = test_router().await;
        let message = BusMessage {
            data: b"not json".to_vec(),
            subject: "relaycore.controller.heartbeat".to_string(),
            reply: None,
        };
        let outcome = router.handle(message).await;
        assert!(outcome.starts_with("dropped: invalid JSON payload"));
    }

}
