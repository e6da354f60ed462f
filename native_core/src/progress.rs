use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A progress increment, or a snapshot of accumulated [`Progress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressValues {
    pub read_rows: u64,
    pub read_bytes: u64,
}

impl ProgressValues {
    pub fn new(read_rows: u64, read_bytes: u64) -> Self {
        Self {
            read_rows,
            read_bytes,
        }
    }
}

/// Session-wide row and byte counters.
///
/// Increments may come from any thread. Each counter is updated atomically
/// on its own, so a concurrent `fetch()` can observe the rows of an
/// increment before its bytes. Both counters only ever grow between resets.
#[derive(Debug, Default)]
pub struct Progress {
    read_rows: AtomicU64,
    read_bytes: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_piecewise_atomically(&self, delta: &ProgressValues) {
        self.read_rows.fetch_add(delta.read_rows, Ordering::Relaxed);
        self.read_bytes.fetch_add(delta.read_bytes, Ordering::Relaxed);
    }

    pub fn fetch(&self) -> ProgressValues {
        ProgressValues {
            read_rows: self.read_rows.load(Ordering::Relaxed),
            read_bytes: self.read_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.read_rows.store(0, Ordering::Relaxed);
        self.read_bytes.store(0, Ordering::Relaxed);
    }
}
