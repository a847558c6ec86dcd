use crate::error::FetchError;
use crate::request::{CachedResponse, GatewayRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Issues requests to the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Any HTTP status is a response; only a missing response is an error.
    async fn fetch(&self, request: &GatewayRequest) -> Result<CachedResponse, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<CachedResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let request = GatewayRequest::get(Url::parse("http://127.0.0.1:9/index.html").unwrap());
        assert!(matches!(
            fetcher.fetch(&request).await,
            Err(FetchError::Network(_))
        ));
    }
}
