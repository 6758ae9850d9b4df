//! Thin Kafka plumbing for the event pipeline.
//!
//! Transport is strictly best-effort on the produce side: every event is
//! already durable in its service's outbox before [`Publisher::publish`]
//! runs, so a lost broker write costs availability, never correctness.
//! Consumers run in consumer groups with auto-commit disabled and commit
//! only after the inbox+side-effect transaction, so a crash between commit
//! and offset advance is absorbed by inbox dedup on redelivery.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

/// Errors raised while wiring up Kafka clients.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort producer. Disabled (a no-op) when no brokers are
/// configured, which keeps tests and broker-less deployments running on
/// the outbox alone.
pub struct Publisher {
    producer: Option<FutureProducer>,
}

impl Publisher {
    pub fn connect(brokers: Option<&str>) -> Result<Self, BrokerError> {
        let producer = match brokers {
            Some(list) if !list.trim().is_empty() => {
                let producer: FutureProducer = ClientConfig::new()
                    .set("bootstrap.servers", list.trim())
                    .set("message.timeout.ms", "5000")
                    .create()?;
                tracing::info!(brokers = list.trim(), "Kafka publisher configured");
                Some(producer)
            }
            _ => {
                tracing::info!("Kafka publisher disabled, events stay in the outbox");
                None
            }
        };
        Ok(Self { producer })
    }

    /// Construct a disabled publisher.
    pub fn disabled() -> Self {
        Self { producer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.producer.is_some()
    }

    /// Sends one payload to `topic`. Failures are logged and swallowed;
    /// the outbox row remains the durable record.
    pub async fn publish(&self, topic: &str, payload: &[u8]) {
        let Some(producer) = &self.producer else {
            return;
        };
        let record = FutureRecord::<(), [u8]>::to(topic).payload(payload);
        if let Err((error, _)) = producer.send(record, Timeout::After(PUBLISH_TIMEOUT)).await {
            tracing::warn!(topic, error = %error, "Kafka publish failed");
        }
    }
}

/// Builds a group consumer subscribed to `topics`, with auto-commit off so
/// offsets advance only after successful processing.
pub fn subscribe(
    brokers: &str,
    group_id: &str,
    topics: &[&str],
) -> Result<StreamConsumer, BrokerError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "6000")
        .create()?;
    consumer.subscribe(topics)?;
    tracing::info!(brokers, group_id, ?topics, "Kafka consumer subscribed");
    Ok(consumer)
}
