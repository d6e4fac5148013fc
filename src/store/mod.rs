//! Durable holder for the credential pair.
//!
//! The coordinator reads the store once at construction and then mirrors every
//! credential change into it: one `set` after a successful refresh, one `clear`
//! after a failed one. Implementations only need interior mutability; the
//! coordinator never calls them concurrently.

pub mod file;
pub mod memory;

pub use self::file::FileTokenStore;
pub use self::memory::MemoryTokenStore;

use crate::{credentials::Credentials, error::StoreError};

pub trait TokenStore: Send + Sync {
    /// `None` means the user never authenticated (or signed out).
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<Credentials>, StoreError>;

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}
