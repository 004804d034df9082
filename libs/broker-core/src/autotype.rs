//! Best-effort event-type auto-registration: Ingress enqueues a discovered
//! `(broker, type, source, schema)` tuple after a successful forward; a
//! background worker deduplicates within a rolling window and calls the
//! control-plane API (external collaborator) to ensure an EventType exists.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredType {
    pub broker: String,
    pub event_type: String,
    pub source: String,
}

/// External collaborator: the control-plane call that ensures an EventType
/// object exists for a discovered `(broker, type, source)` tuple.
pub trait EventTypeSink: Send + Sync {
    fn ensure_exists(&self, discovered: &DiscoveredType);
}

/// Bounded channel front-end to the registrar. Enqueue never blocks the
/// caller: a full queue drops the tuple and increments a counter.
#[derive(Clone)]
pub struct Registrar {
    sender: mpsc::Sender<DiscoveredType>,
}

impl Registrar {
    /// Spawn the registrar's background dedup worker and return the
    /// enqueue handle. `capacity` bounds the channel; `window` is the
    /// rolling dedup period.
    pub fn spawn(sink: std::sync::Arc<dyn EventTypeSink>, capacity: usize, window: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_worker(receiver, sink, window));
        Self { sender }
    }

    /// Enqueue a discovered type. Returns `false` (and increments the
    /// drop counter via a `tracing` warning) when the queue is full.
    pub fn try_enqueue(&self, discovered: DiscoveredType) -> bool {
        match self.sender.try_send(discovered) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("auto-type registrar queue full, dropping discovered type");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("auto-type registrar worker gone, dropping discovered type");
                false
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<DiscoveredType>, sink: std::sync::Arc<dyn EventTypeSink>, window: Duration) {
    let mut seen: HashMap<DiscoveredType, Instant> = HashMap::new();
    while let Some(discovered) = receiver.recv().await {
        let now = Instant::now();
        seen.retain(|_, seen_at| now.duration_since(*seen_at) < window);
        if seen.contains_key(&discovered) {
            continue;
        }
        seen.insert(discovered.clone(), now);
        sink.ensure_exists(&discovered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        calls: Arc<AtomicUsize>,
    }

    impl EventTypeSink for CountingSink {
        fn ensure_exists(&self, _discovered: &DiscoveredType) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dedups_repeated_tuples_within_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registrar = Registrar::spawn(Arc::new(CountingSink { calls: calls.clone() }), 16, Duration::from_secs(60));

        let t = DiscoveredType { broker: "b".to_owned(), event_type: "t".to_owned(), source: "s".to_owned() };
        registrar.try_enqueue(t.clone());
        registrar.try_enqueue(t);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_queue_reports_drop() {
        let (sender, _receiver) = mpsc::channel(1);
        let registrar = Registrar { sender };
        let t = DiscoveredType { broker: "b".to_owned(), event_type: "t".to_owned(), source: "s".to_owned() };
        assert!(registrar.try_enqueue(t.clone()));
        assert!(!registrar.try_enqueue(t));
    }
}
