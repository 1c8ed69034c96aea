//! [`TransformBuffer`] – the time-indexed store of frame relationships.
//!
//! Observations are kept per ordered `(parent, child)` pair in two
//! independent stores: one for dynamic (time-varying) transforms, aged out
//! after the retention window, and one for static transforms, which are
//! never aged out.  Queries either hit a stored pair directly (inverting it
//! when only the reverse direction is known) or walk the shortest path in
//! the undirected frame graph and fold the hops into one answer.
//!
//! One mutex guards all stored state; every public call holds it for its
//! whole duration and no call blocks while holding it.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tflcm_core::TransformBuffer;
//! use tflcm_types::{Quaternion, Stamp, Transform3D, TransformStamped, Vec3};
//!
//! let buffer = TransformBuffer::new(Duration::from_secs(10));
//! let now = Stamp::now();
//!
//! // robot_base is 1 m forward of world, camera 0.5 m forward of robot_base.
//! buffer.set_transform(
//!     &TransformStamped::new("world", "robot_base", now,
//!         Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity())),
//!     "odometry", false);
//! buffer.set_transform(
//!     &TransformStamped::new("robot_base", "camera", now,
//!         Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity())),
//!     "urdf", true);
//!
//! let t = buffer
//!     .lookup_transform("world", "camera", now, Duration::from_millis(100))
//!     .unwrap();
//! assert!((t.transform.translation.x - 1.5).abs() < 1e-9);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tflcm_types::{Stamp, TfError, TransformStamped};
use tracing::{debug, warn};

use crate::algebra::{compose, invert};
use crate::clock::{Clock, SystemClock};
use crate::config::BufferConfig;
use crate::graph::FrameGraph;
use crate::record::TransformRecord;

/// Emit a `debug!` event only while the buffer's debug toggle is on.
macro_rules! tf_debug {
    ($buffer:expr, $($arg:tt)+) => {
        if $buffer.debug_enabled() {
            debug!($($arg)+);
        }
    };
}

/// `parent → child → records`, newest record first.
type Store = BTreeMap<String, BTreeMap<String, Vec<TransformRecord>>>;

fn pair<'a>(store: &'a Store, parent: &str, child: &str) -> &'a [TransformRecord] {
    store
        .get(parent)
        .and_then(|children| children.get(child))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Default)]
struct BufferState {
    dynamic: Store,
    statics: Store,
    graph: FrameGraph,
    most_recent: Option<Stamp>,
}

impl BufferState {
    fn has_pair(&self, parent: &str, child: &str) -> bool {
        !pair(&self.dynamic, parent, child).is_empty() || !pair(&self.statics, parent, child).is_empty()
    }
}

/// Time and tolerance of one query, with the log-replay decision made once.
#[derive(Debug, Clone, Copy)]
struct Query {
    time: Stamp,
    tolerance: Duration,
    replay: bool,
    threshold: Duration,
}

/// Thread-safe store of stamped transforms between named frames.
///
/// Share it as `Arc<TransformBuffer>`: all methods take `&self`.
pub struct TransformBuffer {
    state: Mutex<BufferState>,
    config: BufferConfig,
    clock: Arc<dyn Clock>,
    debug: AtomicBool,
}

impl fmt::Debug for TransformBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformBuffer")
            .field("config", &self.config)
            .field("debug", &self.debug_enabled())
            .finish_non_exhaustive()
    }
}

impl Default for TransformBuffer {
    fn default() -> Self {
        Self::with_config(BufferConfig::default())
    }
}

impl TransformBuffer {
    /// Create a buffer that keeps dynamic records for `cache_time`, with all
    /// other settings at their defaults.
    pub fn new(cache_time: Duration) -> Self {
        Self::with_config(BufferConfig {
            cache_time_secs: cache_time.as_secs_f64(),
            ..BufferConfig::default()
        })
    }

    pub fn with_config(config: BufferConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a buffer that reads "now" from `clock`.
    pub fn with_clock(config: BufferConfig, clock: Arc<dyn Clock>) -> Self {
        let debug = AtomicBool::new(config.debug);
        Self {
            state: Mutex::new(BufferState::default()),
            config,
            clock,
            debug,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Turn verbose tracing of lookup decisions on or off.  Never changes
    /// any result.
    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    fn state(&self) -> MutexGuard<'_, BufferState> {
        // No operation panics halfway through a mutation, so a poisoned
        // guard still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query(&self, time: Stamp, tolerance: Duration) -> Query {
        let threshold = self.config.replay_threshold();
        let offset = time.abs_diff(self.clock.now());
        let replay = tolerance > threshold || offset > threshold;
        if replay {
            tf_debug!(self, offset_secs = offset.as_secs_f64(), "log playback mode");
        }
        Query {
            time,
            tolerance,
            replay,
            threshold,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────

    /// Store one observation.
    ///
    /// Returns `false`, after logging the reason, when the frame labels are
    /// invalid (self-transform or empty id); the buffer is left untouched.
    pub fn set_transform(&self, transform: &TransformStamped, authority: &str, is_static: bool) -> bool {
        let now = self.clock.now();
        let mut state = self.state();
        self.insert(&mut state, transform, authority, is_static, now)
    }

    /// Store a batch of observations in order.  Every element is attempted;
    /// the result is `true` only if all of them were accepted.
    pub fn set_transforms(&self, transforms: &[TransformStamped], authority: &str, is_static: bool) -> bool {
        let now = self.clock.now();
        let mut state = self.state();
        transforms.iter().fold(true, |all_ok, t| {
            self.insert(&mut state, t, authority, is_static, now) && all_ok
        })
    }

    fn insert(
        &self,
        state: &mut BufferState,
        transform: &TransformStamped,
        authority: &str,
        is_static: bool,
        now: Stamp,
    ) -> bool {
        if let Err(e) = transform.validate() {
            warn!(error = %e, authority, "ignoring transform");
            return false;
        }

        let record = TransformRecord::new(transform, authority);
        let stamp = record.stamp();
        if state.most_recent.is_none_or(|latest| stamp > latest) {
            state.most_recent = Some(stamp);
        }

        let store = if is_static { &mut state.statics } else { &mut state.dynamic };
        let records = store
            .entry(transform.parent_frame.clone())
            .or_default()
            .entry(transform.child_frame.clone())
            .or_default();
        // Keep newest first; a repeated stamp lands ahead of its twins.
        let pos = records.partition_point(|r| r.stamp() > stamp);
        records.insert(pos, record);
        state
            .graph
            .add_edge(&transform.parent_frame, &transform.child_frame);

        self.evict(&mut state.dynamic, now);
        true
    }

    /// Drop dynamic records older than the retention window, always keeping
    /// the newest record of every pair.
    fn evict(&self, dynamic: &mut Store, now: Stamp) {
        let window = i128::try_from(self.config.cache_time().as_nanos()).unwrap_or(i128::MAX);
        for children in dynamic.values_mut() {
            for records in children.values_mut() {
                if records.len() <= 1 {
                    continue;
                }
                let mut newest = true;
                records.retain(|r| {
                    let keep = newest || now.signed_nanos_since(r.stamp()) <= window;
                    newest = false;
                    keep
                });
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Existence queries
    // ─────────────────────────────────────────────────────────────────────

    /// Whether `source` can be expressed in `target` at `time`.
    pub fn can_transform(&self, target: &str, source: &str, time: Stamp, tolerance: Duration) -> bool {
        self.check_transform(target, source, time, tolerance).is_ok()
    }

    /// Same decision as [`can_transform`][Self::can_transform], returning the
    /// reason when the frames cannot be related.
    pub fn check_transform(&self, target: &str, source: &str, time: Stamp, tolerance: Duration) -> Result<(), TfError> {
        let state = self.state();
        self.check_locked(&state, target, source, time, tolerance)
    }

    /// Whether both legs of a fixed-frame lookup are available.
    pub fn can_transform_full(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
    ) -> bool {
        self.check_full(target, target_time, source, source_time, fixed, self.config.time_tolerance())
            .is_ok()
    }

    pub(crate) fn check_full(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
        tolerance: Duration,
    ) -> Result<(), TfError> {
        let state = self.state();
        self.check_locked(&state, fixed, source, source_time, tolerance)?;
        self.check_locked(&state, fixed, target, target_time, tolerance)
    }

    fn check_locked(
        &self,
        state: &BufferState,
        target: &str,
        source: &str,
        time: Stamp,
        tolerance: Duration,
    ) -> Result<(), TfError> {
        if target == source {
            return Ok(());
        }
        let q = self.query(time, tolerance);

        for (parent, child) in [(target, source), (source, target)] {
            let records = pair(&state.dynamic, parent, child);
            if records.is_empty() {
                continue;
            }
            if q.replay {
                tf_debug!(self, parent, child, "direct transform accepted in log playback mode");
                return Ok(());
            }
            if records.iter().any(|r| r.stamp().abs_diff(time) <= tolerance) {
                return Ok(());
            }
        }

        if !pair(&state.statics, target, source).is_empty() || !pair(&state.statics, source, target).is_empty() {
            return Ok(());
        }

        if state.graph.is_connected(source, target) {
            return Ok(());
        }
        Err(lookup_error(target, source, "no connecting path"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Value queries
    // ─────────────────────────────────────────────────────────────────────

    /// The transform mapping coordinates in `source` into `target` at `time`.
    ///
    /// # Errors
    ///
    /// [`TfError::Lookup`] when the frames are disconnected or a hop has no
    /// record acceptable under `tolerance`.
    pub fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        time: Stamp,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        let state = self.state();
        self.lookup_locked(&state, target, source, time, tolerance)
    }

    /// Relate `source` at `source_time` to `target` at `target_time` through
    /// a frame `fixed` that is assumed not to move between the two times.
    ///
    /// The answer is labelled `(target, source)` and stamped `target_time`.
    pub fn lookup_transform_full(
        &self,
        target: &str,
        target_time: Stamp,
        source: &str,
        source_time: Stamp,
        fixed: &str,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        let state = self.state();
        let fixed_from_source = self.lookup_locked(&state, fixed, source, source_time, tolerance)?;
        let fixed_from_target = self.lookup_locked(&state, fixed, target, target_time, tolerance)?;
        let mut result = compose(&invert(&fixed_from_target), &fixed_from_source)?;
        result.parent_frame = target.to_string();
        result.child_frame = source.to_string();
        result.stamp = target_time;
        Ok(result)
    }

    fn lookup_locked(
        &self,
        state: &BufferState,
        target: &str,
        source: &str,
        time: Stamp,
        tolerance: Duration,
    ) -> Result<TransformStamped, TfError> {
        if target == source {
            return Ok(TransformStamped::identity(target, source, time));
        }
        let q = self.query(time, tolerance);

        if state.has_pair(source, target) {
            return self
                .resolve_edge(state, source, target, &q)
                .map(|t| invert(&t))
                .ok_or_else(|| lookup_error(target, source, "no direct record within tolerance"));
        }
        if state.has_pair(target, source) {
            return self
                .nearest_direct(state, target, source, time)
                .ok_or_else(|| lookup_error(target, source, "no direct record"));
        }

        let path = state
            .graph
            .shortest_path(source, target)
            .ok_or_else(|| lookup_error(target, source, "no connecting path"))?;
        tf_debug!(
            self,
            path = %path.iter().map(|(a, b)| format!("{a} -> {b}")).collect::<Vec<_>>().join(", "),
            "transform path"
        );

        let mut accumulated: Option<TransformStamped> = None;
        for (from, to) in &path {
            let Some(hop) = self.resolve_edge(state, from, to, &q) else {
                self.dump_pairs(state);
                return Err(lookup_error(
                    target,
                    source,
                    &format!("no record for hop '{from}' -> '{to}'"),
                ));
            };
            accumulated = Some(match accumulated {
                None => hop,
                Some(acc) => compose(&acc, &hop)?,
            });
        }
        let Some(source_to_target) = accumulated else {
            return Err(lookup_error(target, source, "empty path"));
        };

        let mut result = invert(&source_to_target);
        result.parent_frame = target.to_string();
        result.child_frame = source.to_string();
        result.stamp = time;
        Ok(result)
    }

    /// A record stored exactly as `parent → child`, taken as is: the dynamic
    /// record nearest to `time` at any distance, else the newest static one.
    fn nearest_direct(&self, state: &BufferState, parent: &str, child: &str, time: Stamp) -> Option<TransformStamped> {
        if let Some(r) = pair(&state.dynamic, parent, child)
            .iter()
            .min_by_key(|r| r.stamp().abs_diff(time))
        {
            tf_debug!(self, parent, child, stamp = %r.stamp(), "using nearest direct transform");
            return Some(r.to_transform_stamped());
        }
        pair(&state.statics, parent, child)
            .first()
            .map(TransformRecord::to_transform_stamped)
    }

    /// Resolve one hop into a transform labelled `(from, to)`.
    ///
    /// Tries dynamic `[from][to]`, dynamic `[to][from]` inverted, static
    /// `[from][to]`, then static `[to][from]` inverted.
    fn resolve_edge(&self, state: &BufferState, from: &str, to: &str, q: &Query) -> Option<TransformStamped> {
        tf_debug!(self, from, to, "looking for direct transform");

        if let Some(r) = self.pick_dynamic(pair(&state.dynamic, from, to), q) {
            return Some(r.to_transform_stamped());
        }
        if let Some(r) = self.pick_dynamic(pair(&state.dynamic, to, from), q) {
            tf_debug!(self, from, to, "using inverse of dynamic transform");
            return Some(invert(&r.to_transform_stamped()));
        }
        if let Some(r) = pair(&state.statics, from, to).first() {
            tf_debug!(self, from, to, "using static transform");
            return Some(r.to_transform_stamped());
        }
        if let Some(r) = pair(&state.statics, to, from).first() {
            tf_debug!(self, from, to, "using inverse of static transform");
            return Some(invert(&r.to_transform_stamped()));
        }
        None
    }

    /// The record nearest to the query time, if acceptable: within
    /// tolerance, in log playback mode, or so far from the query time that
    /// the data can only be a recording.  The nearest record is the only
    /// candidate, since no other can be closer to `q.time`.
    fn pick_dynamic<'a>(&self, records: &'a [TransformRecord], q: &Query) -> Option<&'a TransformRecord> {
        let nearest = records.iter().min_by_key(|r| r.stamp().abs_diff(q.time))?;
        let diff = nearest.stamp().abs_diff(q.time);
        tf_debug!(
            self,
            time_diff = diff.as_secs_f64(),
            tolerance = q.tolerance.as_secs_f64(),
            "nearest record"
        );
        if q.replay || diff > q.threshold || diff <= q.tolerance {
            Some(nearest)
        } else {
            None
        }
    }

    fn dump_pairs(&self, state: &BufferState) {
        if !self.debug_enabled() {
            return;
        }
        debug!("no transform found, dumping stored pairs");
        for (kind, store) in [("dynamic", &state.dynamic), ("static", &state.statics)] {
            for (parent, children) in store {
                for (child, records) in children {
                    debug!(kind, parent = %parent, child = %child, count = records.len(), "buffer contains");
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Every frame seen as a parent or child, deduplicated and sorted.
    pub fn all_frame_names(&self) -> Vec<String> {
        self.state().graph.frames().cloned().collect()
    }

    /// Stamp of the newest stored record, or "now" when the buffer is empty.
    ///
    /// Useful for log playback, where wall-clock time says nothing about
    /// the recorded data.
    pub fn most_recent_timestamp(&self) -> Stamp {
        let mut state = self.state();
        if let Some(latest) = state.most_recent {
            return latest;
        }
        let scanned = [&state.dynamic, &state.statics]
            .into_iter()
            .flat_map(|store| store.values())
            .flat_map(|children| children.values())
            .filter_map(|records| records.first().map(TransformRecord::stamp))
            .max();
        match scanned {
            Some(latest) => {
                state.most_recent = Some(latest);
                latest
            }
            None => self.clock.now(),
        }
    }

    /// A stamp taken from the stored data: the newest record of the first
    /// dynamic pair, else of the first static pair, else "now".
    pub fn valid_timestamp(&self) -> Stamp {
        let state = self.state();
        [&state.dynamic, &state.statics]
            .into_iter()
            .flat_map(|store| store.values())
            .flat_map(|children| children.values())
            .find_map(|records| records.first().map(TransformRecord::stamp))
            .unwrap_or_else(|| self.clock.now())
    }

    /// Snapshot of one stored collection, newest first.
    pub fn records(&self, parent: &str, child: &str, is_static: bool) -> Vec<TransformRecord> {
        let state = self.state();
        let store = if is_static { &state.statics } else { &state.dynamic };
        pair(store, parent, child).to_vec()
    }

    /// Drop every stored record and reset the cached timestamp.
    pub fn clear(&self) {
        let mut state = self.state();
        state.dynamic.clear();
        state.statics.clear();
        state.graph.clear();
        state.most_recent = None;
    }
}

fn lookup_error(target: &str, source: &str, detail: &str) -> TfError {
    TfError::Lookup {
        target_frame: target.to_string(),
        source_frame: source.to_string(),
        detail: detail.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
