use crate::engine::LifecycleEngine;
use crate::error::LifecycleError;
use async_trait::async_trait;
use littleurl_core::{Clock, LittleUrl, RecordStore, ServiceError, ShortKey, SystemClock, UrlRecord};
use littleurl_generator::Generator;
use tracing::{error, instrument};

type Result<T> = std::result::Result<T, ServiceError>;

/// [`LittleUrl`] backed by a [`LifecycleEngine`].
///
/// Only checks that required inputs are non-empty; everything else is the
/// engine's business.
pub struct LittleUrlService<S, G, C = SystemClock> {
    engine: LifecycleEngine<S, G, C>,
}

impl<S, G, C> LittleUrlService<S, G, C> {
    pub fn new(engine: LifecycleEngine<S, G, C>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LifecycleEngine<S, G, C> {
        &self.engine
    }
}

fn parse_key(key: &str) -> Result<ShortKey> {
    ShortKey::parse(key).map_err(|_| ServiceError::Validation("Key value required.".to_string()))
}

fn storage_failure(op: &'static str, e: LifecycleError) -> ServiceError {
    error!(op, error = %e, "request failed");
    ServiceError::Storage(e.to_string())
}

#[async_trait]
impl<S: RecordStore, G: Generator, C: Clock> LittleUrl for LittleUrlService<S, G, C> {
    async fn list(&self) -> Result<Vec<UrlRecord>> {
        self.engine
            .list()
            .await
            .map_err(|e| storage_failure("list", e))
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<UrlRecord> {
        let key = parse_key(key)?;
        self.engine
            .lookup(&key, false)
            .await
            .map_err(|e| storage_failure("get", e))?
            .ok_or(ServiceError::NotFound)
    }

    #[instrument(skip(self))]
    async fn create(&self, long_url: &str) -> Result<UrlRecord> {
        if long_url.trim().is_empty() {
            return Err(ServiceError::Validation(
                "URL value is required.".to_string(),
            ));
        }
        self.engine.create(long_url).await.map_err(|e| {
            error!(error = %e, "create failed");
            ServiceError::CreateFailed(e.to_string())
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<UrlRecord> {
        let key = parse_key(key)?;
        self.engine
            .delete(&key)
            .await
            .map_err(|e| storage_failure("delete", e))?
            .ok_or(ServiceError::NotFound)
    }

    #[instrument(skip(self))]
    async fn undelete(&self, key: &str) -> Result<UrlRecord> {
        let key = parse_key(key)?;
        self.engine
            .undelete(&key)
            .await
            .map_err(|e| storage_failure("undelete", e))?
            .ok_or(ServiceError::NotFound)
    }
}
