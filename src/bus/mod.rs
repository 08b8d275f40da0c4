//! Named publish/subscribe bus (§4.1).
//!
//! Topics are created lazily on first `publish` or `subscribe`. Delivery is
//! at-most-once and FIFO per (publisher, topic); there is no ordering
//! guarantee *across* topics. Slow subscribers are handled by dropping
//! their oldest buffered message rather than blocking the publisher —
//! `tokio::sync::broadcast` gives us exactly this semantics, so the bus is
//! a thin, named wrapper around a map of broadcast channels.
//!
//! An external broker is configurable via `BusConfig::bus_url` but is not
//! required: when unset (or unreachable) the in-process path is the only
//! path, and it works end to end on its own (§4.1).

use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub mod topics {
    pub const CAMERA_FRAMES: &str = "camera.frames";
    pub const IOT_TELEMETRY: &str = "iot.telemetry";
    pub const PERCEPTION_OUTPUT: &str = "perception.output";
    pub const BEHAVIOUR_OUTPUT: &str = "behaviour.output";
    pub const TWIN_OUTPUT: &str = "twin.output";
    pub const ROUTE_OUTPUT: &str = "route.output";
    pub const RISK_OUTPUT: &str = "risk.output";
    pub const DECISION_OUTPUT: &str = "decision.output";
    pub const EXPLAIN_OUTPUT: &str = "explain.output";
}

#[derive(Error, Debug)]
pub enum BusError {
    #[error("topic {0} has no subscribers")]
    NoSubscribers(String),
    #[error("failed to encode payload for topic {0}: {1}")]
    Encode(String, serde_json::Error),
    #[error("failed to decode payload from topic {0}: {1}")]
    Decode(String, serde_json::Error),
}

/// A received message: the raw bytes plus how many messages this
/// subscriber missed due to backpressure (for observability only).
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Bytes,
    pub lagged: u64,
}

/// In-process named pub/sub bus.
pub struct Bus {
    channels: DashMap<String, broadcast::Sender<Bytes>>,
    capacity: usize,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        Self { channels: DashMap::new(), capacity }
    }

    fn channel(&self, topic: &str) -> broadcast::Sender<Bytes> {
        self.channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish raw bytes to a topic. Returns the number of subscribers
    /// that received it (0 is not an error — nobody may be listening yet).
    pub fn publish_bytes(&self, topic: &str, payload: Bytes) -> usize {
        let tx = self.channel(topic);
        match tx.send(payload) {
            Ok(n) => {
                debug!(topic, subscribers = n, "published");
                n
            }
            Err(_) => {
                debug!(topic, "published with no subscribers");
                0
            }
        }
    }

    /// Serialize and publish a typed record.
    pub fn publish<T: serde::Serialize>(&self, topic: &str, record: &T) -> Result<usize, BusError> {
        let bytes = serde_json::to_vec(record).map_err(|e| BusError::Encode(topic.to_string(), e))?;
        Ok(self.publish_bytes(topic, Bytes::from(bytes)))
    }

    /// Subscribe to raw bytes on a topic.
    pub fn subscribe_bytes(&self, topic: &str) -> Subscription {
        let tx = self.channel(topic);
        Subscription { topic: topic.to_string(), rx: tx.subscribe() }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(crate::config::defaults::BUS_SUBSCRIBER_CAPACITY)
    }
}

/// A bounded, drop-oldest-on-overflow subscription to one topic.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Bytes>,
}

impl Subscription {
    /// Await the next message, transparently catching up (and counting
    /// drops) if this subscriber fell behind.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(Delivery { payload, lagged: 0 }),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = %self.topic, dropped = n, "subscriber lagged, oldest messages dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Await and decode the next message as `T`.
    pub async fn recv_typed<T: serde::de::DeserializeOwned>(&mut self) -> Option<Result<T, BusError>> {
        let delivery = self.recv().await?;
        Some(
            serde_json::from_slice(&delivery.payload)
                .map_err(|e| BusError::Decode(self.topic.clone(), e)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_before_subscribe_is_not_an_error() {
        let bus = Bus::new(8);
        let n = bus.publish_bytes(topics::CAMERA_FRAMES, Bytes::from_static(b"x"));
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let bus = Bus::new(8);
        let mut sub = bus.subscribe_bytes(topics::IOT_TELEMETRY);
        bus.publish_bytes(topics::IOT_TELEMETRY, Bytes::from_static(b"hello"));
        let delivery = sub.recv().await.expect("message");
        assert_eq!(&delivery.payload[..], b"hello");
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_not_newest() {
        let bus = Bus::new(2);
        let mut sub = bus.subscribe_bytes("t");
        for i in 0..10u8 {
            bus.publish_bytes("t", Bytes::from(vec![i]));
        }
        // The broadcast channel reports Lagged and resumes from the
        // oldest still-buffered message, never blocking the publisher.
        let delivery = sub.recv().await.expect("message");
        assert_eq!(delivery.payload[0], 8);
    }

    #[tokio::test]
    async fn typed_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Msg {
            n: u32,
        }
        let bus = Bus::new(8);
        let mut sub = bus.subscribe_bytes("typed");
        bus.publish("typed", &Msg { n: 7 }).unwrap();
        let got: Msg = sub.recv_typed().await.unwrap().unwrap();
        assert_eq!(got, Msg { n: 7 });
    }
}
