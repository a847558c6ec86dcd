use crate::error::DataResult;
use crate::query::{Filter, Query, Row};
use async_trait::async_trait;

/// Row-level access to the remote data service.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> DataResult<Vec<Row>>;

    /// Insert rows and return the first inserted row as stored.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> DataResult<Row>;

    /// Patch every row matching `filters`; returns the first updated row.
    /// Fails with `NotFound` when nothing matched.
    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> DataResult<Row>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> DataResult<()>;
}
