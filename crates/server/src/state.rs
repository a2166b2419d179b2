//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::services::CheckoutLocks;
use crate::storage::Storage;

/// Application state shared across all request handlers.
///
/// Cheap to clone; handlers get one per request via the axum `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    storage: Arc<dyn Storage>,
    checkout_locks: CheckoutLocks,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                checkout_locks: CheckoutLocks::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }

    #[must_use]
    pub fn checkout_locks(&self) -> &CheckoutLocks {
        &self.inner.checkout_locks
    }
}
