//! Repository traits describing content adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::articles::ArticleName;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("resource not found")]
    NotFound,
    #[error("article `{name}` is not valid UTF-8")]
    Encoding { name: String },
}

impl RepoError {
    pub fn from_storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Raw article contents as stored, before any caching.
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub markdown: String,
    pub modified: OffsetDateTime,
}

#[async_trait]
pub trait ArticleRepo: Send + Sync {
    /// Names of all listable articles, in no particular order.
    async fn list_names(&self) -> Result<Vec<ArticleName>, RepoError>;

    /// Last modification time, used to validate cached entries.
    async fn modified(&self, name: &ArticleName) -> Result<OffsetDateTime, RepoError>;

    async fn read(&self, name: &ArticleName) -> Result<StoredArticle, RepoError>;

    /// Succeeds when the backing store is reachable.
    async fn health_check(&self) -> Result<(), RepoError>;
}
