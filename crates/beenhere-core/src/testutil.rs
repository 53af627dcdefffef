use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beenhere_types::error::{Result, TrackerError};

use crate::storage::{MemoryBackend, StoreBackend};
use crate::tracker::{Tracker, TrackerOptions};

pub fn memory_tracker() -> Tracker {
    Tracker::in_memory(TrackerOptions::default())
}

pub fn tracker_with_options(options: TrackerOptions) -> Tracker {
    Tracker::in_memory(options)
}

/// Backend that can be flipped read-only at runtime to exercise the
/// sticky in-memory degradation path.
pub struct FlakyBackend {
    inner: MemoryBackend,
    read_only: Arc<AtomicBool>,
}

impl FlakyBackend {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let read_only = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner: MemoryBackend::new(),
                read_only: read_only.clone(),
            },
            read_only,
        )
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::Acquire) {
            Err(TrackerError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "backend is read-only",
            )))
        } else {
            Ok(())
        }
    }
}

impl StoreBackend for FlakyBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.check_writable()?;
        self.inner.put(key, data)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix)
    }

    fn clear(&self) -> Result<()> {
        self.check_writable()?;
        self.inner.clear()
    }
}
