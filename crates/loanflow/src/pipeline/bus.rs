//! In-process event transport with the delivery semantics the pipeline is
//! written against: partitioned by application id, ordered within a
//! partition, at-least-once. A broker-backed adapter can replace
//! [`PartitionedBus`] behind the same publisher/consumer seams.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::domain::ApplicationId;
use super::events::{ApplicationReceived, AssessmentCompleted, DecisionMade};

/// Events that can be routed to a partition. Events for the same application
/// land on the same partition and are consumed in publish order.
pub trait Partitioned {
    fn partition_key(&self) -> &ApplicationId;
}

impl Partitioned for ApplicationReceived {
    fn partition_key(&self) -> &ApplicationId {
        &self.application_id
    }
}

impl Partitioned for AssessmentCompleted {
    fn partition_key(&self) -> &ApplicationId {
        &self.application_id
    }
}

impl Partitioned for DecisionMade {
    fn partition_key(&self) -> &ApplicationId {
        &self.application_id
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event bus partition is no longer accepting events")]
    Closed,
}

/// Outbound seam used by intake, assessment, and decision stages.
#[async_trait]
pub trait EventPublisher<E>: Send + Sync {
    async fn publish(&self, event: E) -> Result<(), PublishError>;
}

/// Inbound seam: one consumer per topic. Handlers own their error handling;
/// a failed event is logged by the consumer, not redelivered by this bus.
#[async_trait]
pub trait EventConsumer<E>: Send + Sync {
    async fn handle(&self, event: E);
}

/// Fixed set of partitions, each drained by a dedicated task. Hashing the
/// application id onto a partition gives in-order processing per application
/// with no ordering guarantee across applications.
pub struct PartitionedBus<E> {
    senders: Vec<mpsc::UnboundedSender<E>>,
}

impl<E> PartitionedBus<E>
where
    E: Partitioned + Send + 'static,
{
    pub fn start(partitions: usize, consumer: Arc<dyn EventConsumer<E>>) -> Self {
        let partitions = partitions.max(1);
        let mut senders = Vec::with_capacity(partitions);
        for partition in 0..partitions {
            let (sender, mut receiver) = mpsc::unbounded_channel::<E>();
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move {
                while let Some(event) = receiver.recv().await {
                    consumer.handle(event).await;
                }
                debug!(partition, "event bus partition drained and closed");
            });
            senders.push(sender);
        }
        Self { senders }
    }

    fn partition_for(&self, key: &ApplicationId) -> usize {
        let mut hasher = DefaultHasher::new();
        key.0.hash(&mut hasher);
        (hasher.finish() as usize) % self.senders.len()
    }
}

#[async_trait]
impl<E> EventPublisher<E> for PartitionedBus<E>
where
    E: Partitioned + Send + 'static,
{
    async fn publish(&self, event: E) -> Result<(), PublishError> {
        let partition = self.partition_for(event.partition_key());
        self.senders[partition]
            .send(event)
            .map_err(|_| PublishError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventConsumer<ApplicationReceived> for Recording {
        async fn handle(&self, event: ApplicationReceived) {
            self.seen
                .lock()
                .expect("recording mutex poisoned")
                .push(event.cpf);
        }
    }

    fn event(application_id: &str, cpf: &str) -> ApplicationReceived {
        ApplicationReceived {
            application_id: ApplicationId(application_id.to_string()),
            cpf: cpf.to_string(),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 3, 14).expect("valid date"),
            amount_requested: dec!(5000),
            number_of_installments: 12,
            monthly_income: dec!(3000),
            timestamp: Utc::now(),
        }
    }

    async fn drained(recording: &Recording, expected: usize) -> Vec<String> {
        for _ in 0..100 {
            {
                let seen = recording.seen.lock().expect("recording mutex poisoned");
                if seen.len() >= expected {
                    return seen.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        recording
            .seen
            .lock()
            .expect("recording mutex poisoned")
            .clone()
    }

    #[tokio::test]
    async fn same_application_events_are_consumed_in_publish_order() {
        let recording = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let consumer: Arc<dyn EventConsumer<ApplicationReceived>> = recording.clone();
        let bus = PartitionedBus::start(4, consumer);

        for sequence in 0..20 {
            bus.publish(event("app-ordered", &format!("cpf-{sequence:02}")))
                .await
                .expect("publish succeeds");
        }

        let seen = drained(&recording, 20).await;
        let expected: Vec<String> = (0..20).map(|sequence| format!("cpf-{sequence:02}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn events_across_applications_are_all_delivered() {
        let recording = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let consumer: Arc<dyn EventConsumer<ApplicationReceived>> = recording.clone();
        let bus = PartitionedBus::start(3, consumer);

        for application in 0..12 {
            bus.publish(event(&format!("app-{application}"), "11122233344"))
                .await
                .expect("publish succeeds");
        }

        let seen = drained(&recording, 12).await;
        assert_eq!(seen.len(), 12);
    }
}
