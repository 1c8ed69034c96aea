//! [`TransformListener`] – feeds bus traffic into a transform store.
//!
//! The listener subscribes to both lanes of a [`TfBus`] and hands every
//! publication to a [`TransformSink`], flagging `/tf_static` batches as
//! static.  Rejected transforms are logged by the sink and counted here;
//! they never stop the task.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tflcm_core::TransformBuffer;
//! use tflcm_listener::{TfBus, TransformBroadcaster, TransformListener};
//! use tflcm_types::{Stamp, TransformStamped};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = TfBus::default();
//! let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(10)));
//! let listener = TransformListener::spawn(&bus, buffer.clone());
//!
//! let broadcaster = TransformBroadcaster::new(bus.clone(), "urdf");
//! broadcaster
//!     .send_static_transform(TransformStamped::identity("base", "laser", Stamp::now()))
//!     .unwrap();
//!
//! let stats = listener.shutdown().await;
//! assert_eq!(stats.batches, 1);
//! assert!(buffer.can_transform("laser", "base", Stamp::now(), Duration::from_millis(100)));
//! # }
//! ```

use std::sync::Arc;

use tflcm_core::TransformSink;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{TfBus, TfPublication, TfTopic, TopicReceiver};

/// Counters reported when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Publications handed to the sink.
    pub batches: u64,
    /// Publications with at least one rejected transform.
    pub rejected: u64,
    /// Publications dropped because the listener lagged behind the bus.
    pub lagged: u64,
}

/// Handle to the background ingestion task.  Dropping it stops the task.
#[derive(Debug)]
pub struct TransformListener {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ListenerStats>,
}

impl TransformListener {
    /// Subscribe to `bus` and start forwarding into `sink` on the current
    /// tokio runtime.
    ///
    /// Subscriptions are taken before this returns, so anything published
    /// afterwards is delivered.
    pub fn spawn(bus: &TfBus, sink: Arc<dyn TransformSink>) -> Self {
        let dynamic = bus.subscribe(TfTopic::Dynamic);
        let statics = bus.subscribe(TfTopic::Static);
        let (shutdown, stop) = oneshot::channel();
        let handle = tokio::spawn(run(dynamic, statics, sink, stop));
        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    /// Whether the task has ended (bus closed or shut down).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Drain what is already queued, stop the task and return its counters.
    pub async fn shutdown(mut self) -> ListenerStats {
        if let Some(tx) = self.shutdown.take() {
            // The task may already have stopped on a closed bus.
            let _ = tx.send(());
        }
        match (&mut self.handle).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "transform listener task failed");
                ListenerStats::default()
            }
        }
    }
}

async fn run(
    mut dynamic: TopicReceiver,
    mut statics: TopicReceiver,
    sink: Arc<dyn TransformSink>,
    mut stop: oneshot::Receiver<()>,
) -> ListenerStats {
    let mut stats = ListenerStats::default();
    info!("transform listener started");

    loop {
        tokio::select! {
            biased;
            result = statics.recv() => {
                if !handle(result, TfTopic::Static, sink.as_ref(), &mut stats) {
                    break;
                }
            }
            result = dynamic.recv() => {
                if !handle(result, TfTopic::Dynamic, sink.as_ref(), &mut stats) {
                    break;
                }
            }
            _ = &mut stop => {
                drain(&mut statics, TfTopic::Static, sink.as_ref(), &mut stats);
                drain(&mut dynamic, TfTopic::Dynamic, sink.as_ref(), &mut stats);
                break;
            }
        }
    }

    info!(
        batches = stats.batches,
        rejected = stats.rejected,
        lagged = stats.lagged,
        "transform listener stopped"
    );
    stats
}

/// Process one receive result; `false` once the lane is closed.
fn handle(
    result: Result<TfPublication, broadcast::error::RecvError>,
    topic: TfTopic,
    sink: &dyn TransformSink,
    stats: &mut ListenerStats,
) -> bool {
    match result {
        Ok(publication) => {
            ingest(publication, topic, sink, stats);
            true
        }
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(topic = %topic, lagged_by = n, "transform listener lagged");
            stats.lagged += n;
            true
        }
        Err(broadcast::error::RecvError::Closed) => {
            debug!(topic = %topic, "bus closed");
            false
        }
    }
}

fn drain(receiver: &mut TopicReceiver, topic: TfTopic, sink: &dyn TransformSink, stats: &mut ListenerStats) {
    loop {
        match receiver.try_recv() {
            Ok(publication) => ingest(publication, topic, sink, stats),
            Err(broadcast::error::TryRecvError::Lagged(n)) => stats.lagged += n,
            Err(_) => break,
        }
    }
}

fn ingest(publication: TfPublication, topic: TfTopic, sink: &dyn TransformSink, stats: &mut ListenerStats) {
    let TfPublication { authority, message } = publication;
    stats.batches += 1;
    if !sink.set_transforms(&message.transforms, &authority, topic.is_static()) {
        stats.rejected += 1;
        warn!(topic = %topic, authority = %authority, "publication contained rejected transforms");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tflcm_core::TransformBuffer;
    use tflcm_types::{Quaternion, Stamp, Transform3D, TransformStamped, Vec3};

    use crate::broadcaster::TransformBroadcaster;

    fn tf(parent: &str, child: &str, stamp: Stamp, x: f64) -> TransformStamped {
        TransformStamped::new(parent, child, stamp, Transform3D::new(Vec3::new(x, 0.0, 0.0), Quaternion::identity()))
    }

    #[tokio::test]
    async fn forwards_both_lanes_into_buffer() -> Result<(), Box<dyn std::error::Error>> {
        let bus = TfBus::default();
        let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(10)));
        let listener = TransformListener::spawn(&bus, buffer.clone());
        let broadcaster = TransformBroadcaster::new(bus.clone(), "test");

        let now = Stamp::now();
        broadcaster.send_transform(tf("odom", "base", now, 1.0))?;
        broadcaster.send_static_transform(tf("base", "laser", now, 0.5))?;

        let stats = listener.shutdown().await;
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.rejected, 0);

        assert_eq!(buffer.records("odom", "base", false).len(), 1);
        assert_eq!(buffer.records("base", "laser", true).len(), 1);
        let t = buffer.lookup_transform("odom", "laser", now, Duration::from_millis(100))?;
        assert!((t.transform.translation.x - 1.5).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_transforms_are_counted_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let bus = TfBus::default();
        let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(10)));
        let listener = TransformListener::spawn(&bus, buffer.clone());
        let broadcaster = TransformBroadcaster::new(bus.clone(), "faulty");

        let now = Stamp::now();
        broadcaster.send_transforms(vec![tf("base", "base", now, 0.0), tf("map", "odom", now, 2.0)])?;
        broadcaster.send_transform(tf("odom", "base", now, 1.0))?;

        let stats = listener.shutdown().await;
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(buffer.all_frame_names(), ["base", "map", "odom"]);
        Ok(())
    }

    #[tokio::test]
    async fn task_ends_when_bus_is_dropped() {
        let bus = TfBus::default();
        let buffer = Arc::new(TransformBuffer::new(Duration::from_secs(10)));
        let listener = TransformListener::spawn(&bus, buffer);
        drop(bus);

        for _ in 0..100 {
            if listener.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(listener.is_finished());
        assert_eq!(listener.shutdown().await, ListenerStats::default());
    }
}
