//! `tflcm-types` – value types shared by the transform buffer, its
//! ingestion collaborators and its query callers.
//!
//! - [`stamp`] – [`Stamp`]: seconds + nanoseconds observation time.
//! - [`geometry`] – [`Vec3`], [`Quaternion`], [`Transform3D`]: rigid-body
//!   primitives.
//! - [`TransformStamped`] – one observed parent → child transform, the shape
//!   decoded messages arrive in and queries answer with.
//! - [`TfError`] – the single error type of the workspace.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod geometry;
pub mod stamp;

pub use geometry::{Quaternion, Transform3D, Vec3};
pub use stamp::Stamp;

/// An observed rigid transform between two named frames.
///
/// `transform` maps coordinates expressed in `child_frame` into
/// `parent_frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    pub parent_frame: String,
    pub child_frame: String,
    pub stamp: Stamp,
    pub transform: Transform3D,
}

impl TransformStamped {
    pub fn new(
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        stamp: Stamp,
        transform: Transform3D,
    ) -> Self {
        Self {
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            stamp,
            transform,
        }
    }

    /// Identity transform between two frame labels.
    pub fn identity(
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        stamp: Stamp,
    ) -> Self {
        Self::new(parent_frame, child_frame, stamp, Transform3D::identity())
    }

    /// Check the frame labels an observation must carry to be stored.
    ///
    /// # Errors
    ///
    /// [`TfError::SelfTransform`] when both labels are equal,
    /// [`TfError::EmptyChildFrame`] / [`TfError::EmptyParentFrame`] when a
    /// label is missing.
    pub fn validate(&self) -> Result<(), TfError> {
        if self.child_frame == self.parent_frame {
            return Err(TfError::SelfTransform {
                frame: self.child_frame.clone(),
            });
        }
        if self.child_frame.is_empty() {
            return Err(TfError::EmptyChildFrame);
        }
        if self.parent_frame.is_empty() {
            return Err(TfError::EmptyParentFrame);
        }
        Ok(())
    }
}

/// One publication batch as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfMessage {
    pub transforms: Vec<TransformStamped>,
}

impl From<Vec<TransformStamped>> for TfMessage {
    fn from(transforms: Vec<TransformStamped>) -> Self {
        Self { transforms }
    }
}

/// Errors raised by ingestion, queries and configuration.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TfError {
    #[error("TF_SELF_TRANSFORM: frame_id and child_frame_id are both '{frame}'")]
    SelfTransform { frame: String },

    #[error("TF_NO_CHILD_FRAME_ID: empty child_frame_id")]
    EmptyChildFrame,

    #[error("TF_NO_FRAME_ID: empty frame_id")]
    EmptyParentFrame,

    #[error("Cannot transform from '{source_frame}' to '{target_frame}': {detail}")]
    Lookup {
        target_frame: String,
        source_frame: String,
        detail: String,
    },

    #[error("Timeout after {waited:?} waiting for transform from '{source_frame}' to '{target_frame}'")]
    Timeout {
        target_frame: String,
        source_frame: String,
        waited: Duration,
    },

    #[error("Cannot compose: left child '{left_child}' is not right parent '{right_parent}'")]
    FrameMismatch {
        left_child: String,
        right_parent: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TfError {
    /// `true` for the rejection reasons of invalid input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            TfError::SelfTransform { .. } | TfError::EmptyChildFrame | TfError::EmptyParentFrame
        )
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, TfError::Lookup { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TfError::Timeout { .. })
    }
}
