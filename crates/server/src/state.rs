//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::cache::EphemeralStore;
use crate::config::HackshopConfig;

/// Timeout for outbound fetches made on behalf of the back office.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: HackshopConfig,
    pool: PgPool,
    store: EphemeralStore,
    http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HackshopConfig, pool: PgPool) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("hackshop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store: EphemeralStore::new(),
                http,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &HackshopConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the ephemeral key/value store.
    #[must_use]
    pub fn store(&self) -> &EphemeralStore {
        &self.inner.store
    }

    /// Get a reference to the outbound HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}
