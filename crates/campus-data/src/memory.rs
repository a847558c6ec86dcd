//! In-memory data service used by tests and dry runs.

use crate::error::{DataError, DataResult};
use crate::query::{compare_values, Filter, Query, Row};
use crate::service::DataService;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

/// Tables of JSON rows. Inserted rows without an `id` get a sequential one.
#[derive(Default)]
pub struct MemoryDataService {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    next_id: AtomicU64,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn select(&self, table: &str, query: &Query) -> DataResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> DataResult<Row> {
        if rows.is_empty() {
            return Err(DataError::InvalidQuery("Nothing to insert".to_string()));
        }
        let mut tables = self.tables.write().await;
        let stored = tables.entry(table.to_string()).or_default();

        let mut first = None;
        for mut row in rows {
            if !row.contains_key("id") {
                let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                row.insert("id".to_string(), Value::from(id));
            }
            if let Some(id) = row.get("id") {
                if stored.iter().any(|r| r.get("id") == Some(id)) {
                    return Err(DataError::Conflict(format!(
                        "Duplicate id {} in {}",
                        id, table
                    )));
                }
            }
            if first.is_none() {
                first = Some(row.clone());
            }
            stored.push(row);
        }

        first.ok_or_else(|| DataError::InvalidQuery("Nothing to insert".to_string()))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> DataResult<Row> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| DataError::NotFound(format!("No {} row matched the update", table)))?;

        let mut first = None;
        for row in rows.iter_mut().filter(|r| matches_all(filters, r)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
            if first.is_none() {
                first = Some(row.clone());
            }
        }

        first.ok_or_else(|| DataError::NotFound(format!("No {} row matched the update", table)))
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> DataResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| !matches_all(filters, r));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Order;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_select_update_delete() {
        let data = MemoryDataService::new();
        let first = data
            .insert(
                "courses",
                vec![
                    row(json!({"title": "Rust", "price": 30})),
                    row(json!({"title": "Go", "price": 20})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(first.get("id"), Some(&json!(1)));
        data.insert("courses", vec![row(json!({"title": "Zig", "price": 25}))])
            .await
            .unwrap();

        let cheap = data
            .select(
                "courses",
                &Query::new()
                    .filter(Filter::lt("price", 30))
                    .order(Order::desc("price")),
            )
            .await
            .unwrap();
        let titles: Vec<_> = cheap.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Zig"), json!("Go")]);

        let updated = data
            .update(
                "courses",
                &[Filter::eq("title", "Go")],
                row(json!({"image_url": "https://cdn/go.png"})),
            )
            .await
            .unwrap();
        assert_eq!(updated["image_url"], json!("https://cdn/go.png"));
        assert_eq!(updated["price"], json!(20));

        data.delete("courses", &[Filter::eq("title", "Go")]).await.unwrap();
        assert_eq!(data.row_count("courses").await, 2);
    }

    #[tokio::test]
    async fn update_without_match_is_not_found() {
        let data = MemoryDataService::new();
        data.insert("users", vec![row(json!({"id": 7, "name": "Ana"}))])
            .await
            .unwrap();
        let result = data
            .update("users", &[Filter::eq("id", 8)], row(json!({"name": "B"})))
            .await;
        assert!(matches!(result, Err(DataError::NotFound(_))));

        let result = data
            .update("missing", &[Filter::eq("id", 7)], row(json!({"name": "B"})))
            .await;
        assert!(matches!(result, Err(DataError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let data = MemoryDataService::new();
        data.insert("users", vec![row(json!({"id": 1}))]).await.unwrap();
        let result = data.insert("users", vec![row(json!({"id": 1}))]).await;
        assert!(matches!(result, Err(DataError::Conflict(_))));
    }

    #[tokio::test]
    async fn limit_and_offset() {
        let data = MemoryDataService::new();
        for i in 0..5 {
            data.insert("n", vec![row(json!({"v": i}))]).await.unwrap();
        }
        let page = data
            .select("n", &Query::new().order(Order::asc("v")).offset(1).limit(2))
            .await
            .unwrap();
        let values: Vec<_> = page.iter().map(|r| r["v"].clone()).collect();
        assert_eq!(values, vec![json!(1), json!(2)]);
    }
}
