//! Modification times.
//!
//! Every [`Pipeline`](crate::pipeline::executive::Pipeline) owns its own
//! [`Clock`]; stamps from different pipelines are not comparable.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A point on a pipeline's modification clock. Zero means "never".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeStamp(u64);

impl TimeStamp {
    pub const NEVER: TimeStamp = TimeStamp(0);

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Strictly increasing stamp source.
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stamp later than every stamp handed out before.
    pub fn tick(&self) -> TimeStamp {
        TimeStamp(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The most recent stamp handed out.
    pub fn now(&self) -> TimeStamp {
        TimeStamp(self.last.load(Ordering::Relaxed))
    }
}
