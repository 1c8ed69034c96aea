//! In-process, topic-routed publish/subscribe bus for transform traffic.
//!
//! Uses [`tokio::sync::broadcast`] channels so that every subscriber receives
//! every publication without any single subscriber blocking the others.
//!
//! # Topics
//!
//! | Topic | Name | Traffic |
//! |---|---|---|
//! | [`TfTopic::Dynamic`] | `/tf` | Time-varying transforms (odometry, joints) |
//! | [`TfTopic::Static`] | `/tf_static` | Fixed mounting transforms, published once |

use std::fmt;

use thiserror::Error;
use tflcm_types::TfMessage;
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered publications before old ones
/// are dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

/// The two transform lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TfTopic {
    /// `/tf`: dynamic transforms, aged out by the buffer.
    Dynamic,
    /// `/tf_static`: static transforms, kept forever.
    Static,
}

impl TfTopic {
    pub fn name(self) -> &'static str {
        match self {
            TfTopic::Dynamic => "/tf",
            TfTopic::Static => "/tf_static",
        }
    }

    pub fn is_static(self) -> bool {
        matches!(self, TfTopic::Static)
    }
}

impl fmt::Display for TfTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One batch as it travels on the bus, tagged with its publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct TfPublication {
    pub authority: String,
    pub message: TfMessage,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("No subscribers for topic {0}")]
    NoSubscribers(TfTopic),
}

/// Shared transform bus. Clone it cheaply – all clones share the same
/// underlying broadcast channels.  The channels close once every clone is
/// dropped.
#[derive(Clone, Debug)]
pub struct TfBus {
    dynamic: broadcast::Sender<TfPublication>,
    statics: broadcast::Sender<TfPublication>,
}

impl TfBus {
    /// Create a new bus; `capacity` applies to each lane independently.
    pub fn new(capacity: usize) -> Self {
        let (dynamic, _) = broadcast::channel(capacity);
        let (statics, _) = broadcast::channel(capacity);
        Self { dynamic, statics }
    }

    /// Publish to one lane.
    ///
    /// Returns the number of subscribers handed the publication.
    ///
    /// # Errors
    ///
    /// [`BusError::NoSubscribers`] when nobody listens on the lane.
    pub fn publish(&self, topic: TfTopic, publication: TfPublication) -> Result<usize, BusError> {
        self.sender(topic)
            .send(publication)
            .map_err(|broadcast::error::SendError(_)| BusError::NoSubscribers(topic))
    }

    /// Subscribe to one lane.
    pub fn subscribe(&self, topic: TfTopic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.sender(topic).subscribe(),
        }
    }

    pub fn subscriber_count(&self, topic: TfTopic) -> usize {
        self.sender(topic).receiver_count()
    }

    fn sender(&self, topic: TfTopic) -> &broadcast::Sender<TfPublication> {
        match topic {
            TfTopic::Dynamic => &self.dynamic,
            TfTopic::Static => &self.statics,
        }
    }
}

impl Default for TfBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`TfTopic`] lane.
///
/// Obtained via [`TfBus::subscribe`].
#[derive(Debug)]
pub struct TopicReceiver {
    topic: TfTopic,
    receiver: broadcast::Receiver<TfPublication>,
}

impl TopicReceiver {
    /// Wait for the next publication on this lane.
    ///
    /// * `Err(RecvError::Lagged(n))` – the subscriber fell behind and `n`
    ///   publications were dropped.
    /// * `Err(RecvError::Closed)` – every bus handle has been dropped.
    pub async fn recv(&mut self) -> Result<TfPublication, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next queued publication without waiting.
    pub fn try_recv(&mut self) -> Result<TfPublication, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn topic(&self) -> TfTopic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tflcm_types::{Stamp, TransformStamped};

    fn publication(authority: &str) -> TfPublication {
        TfPublication {
            authority: authority.to_string(),
            message: TfMessage::from(vec![TransformStamped::identity("map", "odom", Stamp::new(1, 0))]),
        }
    }

    #[test]
    fn topic_names() {
        assert_eq!(TfTopic::Dynamic.to_string(), "/tf");
        assert_eq!(TfTopic::Static.name(), "/tf_static");
        assert!(TfTopic::Static.is_static());
        assert!(!TfTopic::Dynamic.is_static());
    }

    #[test]
    fn publish_without_subscribers_returns_error() {
        let bus = TfBus::default();
        let err = bus.publish(TfTopic::Dynamic, publication("test")).unwrap_err();
        assert_eq!(err, BusError::NoSubscribers(TfTopic::Dynamic));
        assert_eq!(err.to_string(), "No subscribers for topic /tf");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_publication() -> Result<(), Box<dyn std::error::Error>> {
        let bus = TfBus::default();
        let mut rx1 = bus.subscribe(TfTopic::Dynamic);
        let mut rx2 = bus.subscribe(TfTopic::Dynamic);
        assert_eq!(bus.subscriber_count(TfTopic::Dynamic), 2);

        let sent = publication("odometry");
        assert_eq!(bus.publish(TfTopic::Dynamic, sent.clone())?, 2);

        assert_eq!(rx1.recv().await?, sent);
        assert_eq!(rx2.recv().await?, sent);
        assert_eq!(rx1.topic(), TfTopic::Dynamic);
        Ok(())
    }

    /// A `/tf_static` subscriber must not see `/tf` traffic.
    #[tokio::test]
    async fn lanes_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = TfBus::default();
        let mut static_rx = bus.subscribe(TfTopic::Static);
        let _dynamic_rx = bus.subscribe(TfTopic::Dynamic);

        bus.publish(TfTopic::Dynamic, publication("odometry"))?;

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), static_rx.recv()).await;
        assert!(result.is_err(), "static lane must not receive /tf traffic");
        Ok(())
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = TfBus::new(16);
        let mut slow = bus.subscribe(TfTopic::Dynamic);
        for _ in 0..1_000 {
            let _ = bus.publish(TfTopic::Dynamic, publication("flood"));
        }
        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn receiver_sees_closed_after_bus_dropped() {
        let bus = TfBus::default();
        let mut rx = bus.subscribe(TfTopic::Static);
        drop(bus);
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }
}
