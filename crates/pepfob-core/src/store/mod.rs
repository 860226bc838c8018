// ── Credential persistence ──
//
// The device keeps a small namespaced byte store for records that must
// survive a power cycle. Core defines the seam; the CLI backs it with
// files and tests/simulator with memory.

mod file;
pub mod jar;
mod memory;

pub use file::FileStore;
pub use jar::{CredentialJar, JAR_NAMESPACE, JarError};
pub use memory::MemoryStore;

use crate::error::CoreError;

/// Byte-addressed persistent key space, one opaque record per namespace.
pub trait CredentialStore: Send + Sync {
    /// Read a record. `Ok(None)` when nothing was ever saved.
    fn load(&self, namespace: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Replace a record.
    fn save(&self, namespace: &str, bytes: &[u8]) -> Result<(), CoreError>;

    /// Remove a record. Erasing a missing record is not an error.
    fn erase(&self, namespace: &str) -> Result<(), CoreError>;
}

/// Which remembered station network a scanned SSID replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SsidSlot {
    Primary,
    Secondary,
}

/// The user-settings record. Lives outside core (pepfob-config owns the
/// format); the device only needs these two mutations.
pub trait SettingsStore: Send + Sync {
    /// Remember `ssid` as the primary or secondary station network.
    fn remember_ssid(&self, slot: SsidSlot, ssid: &str) -> Result<(), CoreError>;

    /// Restore every setting to its default.
    fn factory_reset(&self) -> Result<(), CoreError>;
}
