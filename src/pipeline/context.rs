//! Per-invocation execution state.
//!
//! One [`ExecutionContext`] is created for every `update` call and handed to
//! each node's hooks. It carries the abort flag, progress reporting, and the
//! warning-dedup set, so nothing about a run lives in global state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashSet;

/// Shared abort flag; clone it into another thread to cancel a running update.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Warnings emitted during one invocation, each distinct message logged once.
#[derive(Clone, Debug, Default)]
pub struct WarningLog {
    seen: HashSet<String>,
    messages: Vec<String>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log `message` unless it was already emitted. Returns `true`
    /// when the message is new.
    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.seen.contains(&message) {
            return false;
        }
        log::warn!("{message}");
        self.seen.insert(message.clone());
        self.messages.push(message);
        true
    }

    /// Distinct warnings in emission order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Progress observer: `(node id, fraction in [0, 1])`.
pub type ProgressFn = Arc<dyn Fn(usize, f64) + Send + Sync>;

/// State shared by every node executed during one `update` call.
pub struct ExecutionContext {
    abort: AbortHandle,
    progress: Option<ProgressFn>,
    warnings: WarningLog,
    node: usize,
}

impl ExecutionContext {
    pub fn new(abort: AbortHandle, progress: Option<ProgressFn>) -> Self {
        Self {
            abort,
            progress,
            warnings: WarningLog::new(),
            node: 0,
        }
    }

    /// Id of the node currently executing.
    pub fn node(&self) -> usize {
        self.node
    }

    pub(crate) fn enter(&mut self, node: usize) {
        self.node = node;
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Report progress and poll the abort flag. Returns `true` when the node
    /// should stop.
    pub fn checkpoint(&self, fraction: f64) -> bool {
        if let Some(f) = &self.progress {
            f(self.node, fraction.clamp(0.0, 1.0));
        }
        self.abort.is_aborted()
    }

    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        self.warnings.warn(message)
    }

    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    pub fn warnings_mut(&mut self) -> &mut WarningLog {
        &mut self.warnings
    }

    pub(crate) fn into_warnings(self) -> WarningLog {
        self.warnings
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(AbortHandle::new(), None)
    }
}
