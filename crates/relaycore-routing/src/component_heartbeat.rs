//! This supervisor's own component heartbeat: a fixed 30s loop publishing
//! liveness to `{core, scheduler}` on the local bus (spec §4.6), independent
//! of the cloud heartbeat pair in [`crate::heartbeat`].

use std::sync::Arc;
use std::time::Duration;

use relaycore_bus::LocalBus;
use relaycore_core::{ComponentKey, Envelope};
use tokio::task::JoinHandle;

const COMPONENT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const RECIPIENTS: [ComponentKey; 2] = [ComponentKey::Core, ComponentKey::Scheduler];

/// Spawn the fixed 30s loop. The handle is owned by the caller for
/// shutdown.
pub fn spawn_component_heartbeat_loop(local_bus: Arc<dyn LocalBus>, source: ComponentKey) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(COMPONENT_HEARTBEAT_INTERVAL);
        loop {
            ticker.tick().await;
            for recipient in RECIPIENTS {
                let envelope = Envelope::builder("heartbeat", serde_json::json!(source.to_string()))
                    .source(source.to_string())
                    .build();
                let _ = local_bus.send(&envelope, &recipient.to_string(), None).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaycore_bus::{BusHandler, BusMessage, Broker, InProcessBus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct CountingHandler {
        count: StdArc<AtomicUsize>,
    }

    #[async_trait]
    impl BusHandler for CountingHandler {
        async fn handle(&self, _message: BusMessage) -> String {
            self.count.fetch_add(1, Ordering::SeqCst);
            "ok".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_to_core_and_scheduler_every_thirty_seconds() {
        let broker = StdArc::new(Broker::new());
        let count = StdArc::new(AtomicUsize::new(0));

        let core_bus = InProcessBus::new("relaycore", "core", StdArc::clone(&broker));
        core_bus
            .start_listener(StdArc::new(CountingHandler { count: StdArc::clone(&count) }))
            .await
            .unwrap();
        let scheduler_bus = InProcessBus::new("relaycore", "scheduler", StdArc::clone(&broker));
        scheduler_bus
            .start_listener(StdArc::new(CountingHandler { count: StdArc::clone(&count) }))
            .await
            .unwrap();

        let publisher: Arc<dyn LocalBus> = Arc::new(InProcessBus::new("relaycore", "remote", broker));
        let handle = spawn_component_heartbeat_loop(publisher, ComponentKey::Remote);
        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        handle.abort();
    }
}
