//! Seams between the buffer and its collaborators.
//!
//! Ingestion paths (the transport listener, a log player) only need
//! [`TransformSink`]; consumers that only query need [`TransformLookup`].
//! [`TransformBuffer`] implements both.

use std::time::Duration;

use tflcm_types::{Stamp, TfError, TransformStamped};

use crate::buffer::TransformBuffer;

/// Something that accepts observed transforms.
pub trait TransformSink: Send + Sync {
    /// Store one observation; `false` if it was rejected.
    fn set_transform(&self, transform: &TransformStamped, authority: &str, is_static: bool) -> bool;

    /// Store a batch, attempting every element.
    fn set_transforms(&self, transforms: &[TransformStamped], authority: &str, is_static: bool) -> bool {
        transforms
            .iter()
            .fold(true, |all_ok, t| self.set_transform(t, authority, is_static) && all_ok)
    }
}

/// Something that answers frame-to-frame queries.
pub trait TransformLookup: Send + Sync {
    fn can_transform(&self, target: &str, source: &str, time: Stamp, tolerance: Duration) -> bool;

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Stamp,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError>;

    fn lookup_transform_full(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError>;
}

impl TransformSink for TransformBuffer {
    fn set_transform(&self, transform: &TransformStamped, authority: &str, is_static: bool) -> bool {
        TransformBuffer::set_transform(self, transform, authority, is_static)
    }

    fn set_transforms(&self, transforms: &[TransformStamped], authority: &str, is_static: bool) -> bool {
        TransformBuffer::set_transforms(self, transforms, authority, is_static)
    }
}

impl TransformLookup for TransformBuffer {
    fn can_transform(&self, target: &str, source: &str, time: Stamp, tolerance: Duration) -> bool {
        TransformBuffer::can_transform(self, target, source, time, tolerance)
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Stamp,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        TransformBuffer::lookup_transform(self, target, source, time, tolerance)
    }

    fn lookup_transform_full(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        TransformBuffer::lookup_transform_full(self, target, target_time, source, source_time, fixed, tolerance)
    }
}
