//! Blocking façade over [`TransformBuffer`].
//!
//! Waiting polls the buffer at the configured interval and sleeps between
//! polls without holding the buffer lock, so ingestion from other threads
//! proceeds while a caller waits.  Deadlines are measured on the monotonic
//! clock, independent of the buffer's [`Clock`][crate::clock::Clock].

use std::thread;
use std::time::{Duration, Instant};

use tflcm_types::{Stamp, TfError, TransformStamped};
use tracing::debug;

use crate::buffer::TransformBuffer;

impl TransformBuffer {
    /// Block until `source` can be expressed in `target` at `time`, or
    /// until `timeout` elapses.
    ///
    /// Availability is checked with the configured wait tolerance, which is
    /// large enough to read as log replay.  A zero `timeout` fails at once
    /// without checking.
    ///
    /// # Errors
    ///
    /// [`TfError::Timeout`] when the deadline passes first.
    pub fn wait_for_transform(&self, target: &str, source: &str, time: Stamp, timeout: Duration) -> Result<(), TfError> {
        let tolerance = self.config().wait_tolerance();
        self.poll_until(target, source, timeout, || {
            self.can_transform(target, source, time, tolerance)
        })
    }

    /// [`wait_for_transform`][Self::wait_for_transform] followed by
    /// [`lookup_transform`][Self::lookup_transform].  With a zero `timeout`
    /// the lookup runs immediately.
    pub fn lookup_transform_blocking(
        &self,
        target: &str,
        source: &str,
        time: Stamp,
        timeout: Duration,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        if !timeout.is_zero() {
            self.wait_for_transform(target, source, time, timeout)?;
        }
        self.lookup_transform(target, source, time, tolerance)
    }

    /// Blocking form of
    /// [`lookup_transform_full`][Self::lookup_transform_full]: waits until
    /// both legs through `fixed` are available.
    #[allow(clippy::too_many_arguments)]
    pub fn lookup_transform_full_blocking(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
        timeout: Duration,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        if !timeout.is_zero() {
            let wait_tolerance = self.config().wait_tolerance();
            self.poll_until(target, source, timeout, || {
                self.check_full(target, target_time, source, source_time, fixed, wait_tolerance)
                    .is_ok()
            })?;
        }
        self.lookup_transform_full(target, target_time, source, source_time, fixed, tolerance)
    }

    fn poll_until(
        &self,
        target: &str,
        source: &str,
        timeout: Duration,
        mut ready: impl FnMut() -> bool,
    ) -> Result<(), TfError> {
        let poll = self.config().wait_poll_interval();
        let start = Instant::now();
        loop {
            let waited = start.elapsed();
            if waited >= timeout {
                debug!(target_frame = target, source_frame = source, ?waited, "wait for transform timed out");
                return Err(TfError::Timeout {
                    target_frame: target.to_string(),
                    source_frame: source.to_string(),
                    waited,
                });
            }
            if ready() {
                return Ok(());
            }
            let remaining = timeout.saturating_sub(start.elapsed());
            thread::sleep(poll.min(remaining));
        }
    }
}
