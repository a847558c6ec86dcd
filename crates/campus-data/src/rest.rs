//! PostgREST client for the hosted data service.

use crate::error::{DataError, DataResult};
use crate::query::{Filter, Query, Row};
use crate::service::DataService;
use async_trait::async_trait;
use campus_core::Config;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Data service client speaking PostgREST (`{base}/rest/v1/{table}`).
#[derive(Clone, Debug)]
pub struct RestDataClient {
    client: Client,
    base_url: String,
    api_key: String,
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_query_param).collect()
}

impl RestDataClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> DataResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> DataResult<Self> {
        let url = config
            .data_api_url()
            .ok_or_else(|| DataError::Config("DATA_API_URL not configured".to_string()))?;
        let key = config
            .data_api_key()
            .ok_or_else(|| DataError::Config("DATA_API_KEY not configured".to_string()))?;
        Self::new(url, key, config.http_timeout())
    }

    fn table_url(&self, table: &str) -> DataResult<String> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DataError::InvalidQuery(format!("Invalid table name: {}", table)));
        }
        Ok(format!("{}/rest/v1/{}", self.base_url, table))
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> DataResult<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let parsed: PostgrestError = serde_json::from_str(&error_text).unwrap_or_default();
            let message = match (parsed.message, parsed.details) {
                (Some(message), Some(details)) => format!("{} ({})", message, details),
                (Some(message), None) => message,
                (None, _) => error_text,
            };
            return Err(DataError::from_status(
                status.as_u16(),
                parsed.code.as_deref(),
                message,
            ));
        }
        Ok(response)
    }

    async fn rows(&self, request: RequestBuilder) -> DataResult<Vec<Row>> {
        self.send(request)
            .await?
            .json::<Vec<Row>>()
            .await
            .map_err(|e| DataError::Service {
                status: 200,
                message: format!("Failed to parse response as JSON: {}", e),
            })
    }
}

#[async_trait]
impl DataService for RestDataClient {
    #[tracing::instrument(skip(self, query), fields(db.table = %table, db.operation = "select"))]
    async fn select(&self, table: &str, query: &Query) -> DataResult<Vec<Row>> {
        let request = self
            .client
            .get(self.table_url(table)?)
            .query(&query.to_query_params());
        self.rows(request).await
    }

    #[tracing::instrument(skip(self, rows), fields(db.table = %table, db.operation = "insert"))]
    async fn insert(&self, table: &str, rows: Vec<Row>) -> DataResult<Row> {
        if rows.is_empty() {
            return Err(DataError::InvalidQuery("Nothing to insert".to_string()));
        }
        let request = self
            .client
            .post(self.table_url(table)?)
            .header("Prefer", "return=representation")
            .json(&rows);

        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Service {
                status: 201,
                message: format!("Insert into {} returned no rows", table),
            })
    }

    #[tracing::instrument(skip(self, filters, patch), fields(db.table = %table, db.operation = "update"))]
    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> DataResult<Row> {
        if filters.is_empty() {
            return Err(DataError::InvalidQuery(
                "Refusing to update without filters".to_string(),
            ));
        }
        let request = self
            .client
            .patch(self.table_url(table)?)
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&patch);

        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NotFound(format!("No {} row matched the update", table)))
    }

    #[tracing::instrument(skip(self, filters), fields(db.table = %table, db.operation = "delete"))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> DataResult<()> {
        if filters.is_empty() {
            return Err(DataError::InvalidQuery(
                "Refusing to delete without filters".to_string(),
            ));
        }
        let request = self
            .client
            .delete(self.table_url(table)?)
            .query(&filter_params(filters));
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_checked() {
        let client =
            RestDataClient::new("https://project.example.org/", "anon", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.table_url("course_images").unwrap(),
            "https://project.example.org/rest/v1/course_images"
        );
        assert!(client.table_url("courses?select=*").is_err());
        assert!(client.table_url("").is_err());
    }

    #[test]
    fn from_config_needs_url() {
        assert!(matches!(
            RestDataClient::from_config(&Config::in_memory()),
            Err(DataError::Config(_))
        ));
    }

    #[tokio::test]
    async fn writes_without_filters_are_rejected() {
        let client =
            RestDataClient::new("http://127.0.0.1:9", "anon", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.delete("courses", &[]).await,
            Err(DataError::InvalidQuery(_))
        ));
        assert!(matches!(
            client.update("courses", &[], Row::new()).await,
            Err(DataError::InvalidQuery(_))
        ));
    }
}
