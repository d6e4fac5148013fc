use super::TokenStore;
use crate::{credentials::Credentials, error::StoreError, sync::MutexExt};
use std::sync::Mutex;

/// Process-local store, used when nothing has to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    credentials: Mutex<Option<Credentials>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials: Mutex::new(credentials),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.credentials.lock_or_recover().clone())
    }

    fn set(&self, credentials: &Credentials) -> Result<(), StoreError> {
        *self.credentials.lock_or_recover() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.credentials.lock_or_recover() = None;
        Ok(())
    }
}
