//! Offline cache gateway: precache on install, rotate generations on activate,
//! network-first with cache fallback on intercept.

use crate::cache::CacheStorage;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::fetch::Fetcher;
use crate::request::{CacheKey, CachedResponse, GatewayRequest, RequestMode};
use futures::future::join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        }
    }
}

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// Not handled; the caller issues the request itself.
    Passthrough,
    Response(CachedResponse),
    /// Offline and nothing cached; the caller observes a failed fetch.
    NoResponse,
}

/// Messages posted to the gateway by pages it controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayMessage {
    SkipWaiting,
}

impl GatewayMessage {
    /// Parse a posted JSON message. Unknown messages are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

pub struct OfflineGateway {
    config: GatewayConfig,
    caches: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl OfflineGateway {
    pub fn new(
        config: GatewayConfig,
        caches: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            caches,
            fetcher,
            state: RwLock::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    async fn transition(
        &self,
        action: &'static str,
        from: LifecycleState,
        to: LifecycleState,
    ) -> GatewayResult<()> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(GatewayError::InvalidLifecycle {
                action,
                state: state.name(),
            });
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: LifecycleState) {
        *self.state.write().await = to;
    }

    /// Fetch every precache path and store it in the precache generation.
    ///
    /// Nothing is written unless every asset answers with a success status.
    /// On failure the gateway returns to `Parsed` so the runtime can retry.
    #[tracing::instrument(skip(self), fields(cache = %self.config.precache_name))]
    pub async fn install(&self) -> GatewayResult<()> {
        let start = Instant::now();
        self.transition("install", LifecycleState::Parsed, LifecycleState::Installing)
            .await?;

        match self.precache().await {
            Ok(count) => {
                self.set_state(LifecycleState::Installed).await;
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(
                    assets = count,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Precache installed"
                );
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Parsed).await;
                tracing::warn!(error = %e, "Install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> GatewayResult<usize> {
        let mut requests = Vec::with_capacity(self.config.precache_paths.len());
        for path in &self.config.precache_paths {
            requests.push((path.as_str(), GatewayRequest::get(self.resolve(path)?)));
        }

        let fetches = requests
            .iter()
            .map(|(_, request)| self.fetcher.fetch(request));
        let results = join_all(fetches).await;

        let mut entries = Vec::with_capacity(results.len());
        for ((path, request), result) in requests.iter().zip(results) {
            let response = result.map_err(|e| GatewayError::InstallFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(GatewayError::InstallFailed {
                    path: path.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            entries.push((request.cache_key(), response));
        }

        let cache = self.caches.open(&self.config.precache_name).await?;
        let count = entries.len();
        for (key, response) in entries {
            cache.put(key, response).await?;
        }
        Ok(count)
    }

    /// Delete every cache generation other than the current two, then claim clients.
    /// Returns the names of the deleted caches.
    #[tracing::instrument(skip(self))]
    pub async fn activate(&self) -> GatewayResult<Vec<String>> {
        self.transition("activate", LifecycleState::Installed, LifecycleState::Activating)
            .await?;

        let result = self.evict_stale().await;
        match result {
            Ok(deleted) => {
                self.clients_claimed.store(true, Ordering::SeqCst);
                self.set_state(LifecycleState::Activated).await;
                tracing::info!(deleted = ?deleted, "Gateway activated");
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(LifecycleState::Installed).await;
                Err(e)
            }
        }
    }

    async fn evict_stale(&self) -> GatewayResult<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.caches.keys().await? {
            if self.config.is_current(&name) {
                continue;
            }
            if self.caches.delete(&name).await? {
                tracing::info!(cache = %name, "Deleted stale cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Handle one outgoing request.
    ///
    /// Excluded hosts go straight to the network and network errors propagate.
    /// Other GET requests are network-first; a 200 response is written to the
    /// runtime cache, and on network failure the cache (then, for navigations,
    /// the offline fallback document) answers instead.
    pub async fn intercept(&self, request: &GatewayRequest) -> GatewayResult<Intercept> {
        if request.method != Method::GET || self.state().await != LifecycleState::Activated {
            return Ok(Intercept::Passthrough);
        }

        if self.config.policy.is_excluded(&request.url) {
            tracing::debug!(url = %request.url, "Bypassing cache for excluded host");
            let response = self.fetcher.fetch(request).await?;
            return Ok(Intercept::Response(response));
        }

        let runtime = self.caches.open(&self.config.runtime_name).await?;
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    if let Err(e) = runtime.put(key, response.clone()).await {
                        tracing::warn!(url = %request.url, error = %e, "Failed to cache response");
                    }
                }
                Ok(Intercept::Response(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "Network failed, trying cache");
                if let Some(cached) = self.caches.match_any(&key).await? {
                    return Ok(Intercept::Response(cached));
                }
                if request.mode == RequestMode::Navigate {
                    let fallback = CacheKey::new(
                        Method::GET,
                        &self.resolve(&self.config.offline_fallback)?,
                    );
                    if let Some(cached) = self.caches.match_any(&fallback).await? {
                        return Ok(Intercept::Response(cached));
                    }
                }
                Ok(Intercept::NoResponse)
            }
        }
    }

    pub fn handle_message(&self, message: GatewayMessage) {
        match message {
            GatewayMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!("Skip waiting requested");
            }
        }
    }

    fn resolve(&self, path: &str) -> GatewayResult<reqwest::Url> {
        self.config
            .origin
            .join(path)
            .map_err(|e| GatewayError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }
}
