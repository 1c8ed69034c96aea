//! [`TransformRecord`] – one stored observation.

use tflcm_types::{Stamp, Transform3D, TransformStamped};

/// An immutable observed transform plus its provenance.
///
/// Records are created by the buffer on ingestion and never mutated
/// afterwards; the `authority` string is kept for diagnostics only and takes
/// no part in lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRecord {
    parent_frame: String,
    child_frame: String,
    stamp: Stamp,
    transform: Transform3D,
    authority: String,
}

impl TransformRecord {
    pub(crate) fn new(transform: &TransformStamped, authority: &str) -> Self {
        Self {
            parent_frame: transform.parent_frame.clone(),
            child_frame: transform.child_frame.clone(),
            stamp: transform.stamp,
            transform: transform.transform,
            authority: authority.to_string(),
        }
    }

    pub fn parent_frame(&self) -> &str {
        &self.parent_frame
    }

    pub fn child_frame(&self) -> &str {
        &self.child_frame
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub fn transform(&self) -> Transform3D {
        self.transform
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn to_transform_stamped(&self) -> TransformStamped {
        TransformStamped {
            parent_frame: self.parent_frame.clone(),
            child_frame: self.child_frame.clone(),
            stamp: self.stamp,
            transform: self.transform,
        }
    }
}
