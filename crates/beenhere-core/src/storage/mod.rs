pub mod local;
pub mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use beenhere_types::error::{Result, TrackerError};

/// Flat key-value backend under the visit store.
///
/// Keys are `/`-separated paths. Implementations must be safe for
/// concurrent use from multiple logical callers; last write wins.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    /// All keys starting with `prefix`, in unspecified order.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
    fn clear(&self) -> Result<()>;
}

/// Whether an error means the backend cannot be written at all —
/// read-only media, revoked permissions, unsupported operations. These
/// trigger the sticky switch to the in-memory fallback; anything else is
/// surfaced to the caller.
pub fn is_capability_error(err: &TrackerError) -> bool {
    match err {
        TrackerError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::PermissionDenied
                | std::io::ErrorKind::ReadOnlyFilesystem
                | std::io::ErrorKind::Unsupported
        ),
        _ => false,
    }
}
