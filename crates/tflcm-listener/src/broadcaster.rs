//! [`TransformBroadcaster`] – publishes transforms onto a [`TfBus`].

use tflcm_types::{TfMessage, TransformStamped};
use tracing::debug;

use crate::bus::{BusError, TfBus, TfPublication, TfTopic};

/// Publisher handle tagging every batch with one authority name.
#[derive(Debug, Clone)]
pub struct TransformBroadcaster {
    bus: TfBus,
    authority: String,
}

impl TransformBroadcaster {
    pub fn new(bus: TfBus, authority: impl Into<String>) -> Self {
        Self {
            bus,
            authority: authority.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Publish one dynamic transform on `/tf`.
    pub fn send_transform(&self, transform: TransformStamped) -> Result<usize, BusError> {
        self.send(TfTopic::Dynamic, vec![transform])
    }

    /// Publish a batch of dynamic transforms on `/tf`.
    pub fn send_transforms(&self, transforms: Vec<TransformStamped>) -> Result<usize, BusError> {
        self.send(TfTopic::Dynamic, transforms)
    }

    /// Publish one static transform on `/tf_static`.
    pub fn send_static_transform(&self, transform: TransformStamped) -> Result<usize, BusError> {
        self.send(TfTopic::Static, vec![transform])
    }

    /// Publish a batch of static transforms on `/tf_static`.
    pub fn send_static_transforms(&self, transforms: Vec<TransformStamped>) -> Result<usize, BusError> {
        self.send(TfTopic::Static, transforms)
    }

    fn send(&self, topic: TfTopic, transforms: Vec<TransformStamped>) -> Result<usize, BusError> {
        debug!(topic = %topic, authority = %self.authority, count = transforms.len(), "publishing transforms");
        self.bus.publish(
            topic,
            TfPublication {
                authority: self.authority.clone(),
                message: TfMessage::from(transforms),
            },
        )
    }
}
