use crate::error::ServiceError;
use crate::record::UrlRecord;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, ServiceError>;

/// The operations exposed to the HTTP layer.
///
/// Keys are accepted as raw caller input; implementations normalize them and
/// only reject empty values.
#[async_trait]
pub trait LittleUrl: Send + Sync + 'static {
    /// Lists every record, active and deleted.
    async fn list(&self) -> Result<Vec<UrlRecord>>;

    /// Resolves an active record by key, case-insensitively.
    async fn get(&self, key: &str) -> Result<UrlRecord>;

    /// Returns the record for `long_url`, creating or reviving it as needed.
    async fn create(&self, long_url: &str) -> Result<UrlRecord>;

    /// Soft-deletes an active record.
    async fn delete(&self, key: &str) -> Result<UrlRecord>;

    /// Restores a soft-deleted record.
    async fn undelete(&self, key: &str) -> Result<UrlRecord>;
}
