//! Compile-time gateway configuration: cache generations, precache list and exclusions.

use reqwest::Url;

pub const PRECACHE_NAME: &str = "cein-cache-v1";
pub const RUNTIME_CACHE_NAME: &str = "cein-runtime-v1";
pub const OFFLINE_FALLBACK: &str = "/index.html";

pub const PRECACHE_PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/css/styles.css",
    "/js/init.js",
    "/images/logo.png",
    "/manifest.json",
];

/// Backend data/storage API, analytics and the avatar CDN.
pub const EXCLUDED_HOSTS: &[&str] = &[
    "supabase.co",
    "googletagmanager.com",
    "google-analytics.com",
    "pravatar.cc",
];

/// Hosts whose requests never touch a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    excluded_hosts: Vec<String>,
}

impl CachePolicy {
    pub fn new<I, S>(excluded_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_hosts: excluded_hosts
                .into_iter()
                .map(|h| h.into().to_lowercase())
                .collect(),
        }
    }

    /// True when the URL's host contains any excluded pattern.
    pub fn is_excluded(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => {
                let host = host.to_lowercase();
                self.excluded_hosts.iter().any(|pattern| host.contains(pattern.as_str()))
            }
            None => false,
        }
    }

    pub fn excluded_hosts(&self) -> &[String] {
        &self.excluded_hosts
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(EXCLUDED_HOSTS.iter().copied())
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Origin the site is served from; relative request URLs resolve against it.
    pub origin: Url,
    pub precache_name: String,
    pub runtime_name: String,
    pub precache_paths: Vec<String>,
    pub offline_fallback: String,
    pub policy: CachePolicy,
}

impl GatewayConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            precache_name: PRECACHE_NAME.to_string(),
            runtime_name: RUNTIME_CACHE_NAME.to_string(),
            precache_paths: PRECACHE_PATHS.iter().map(|p| p.to_string()).collect(),
            offline_fallback: OFFLINE_FALLBACK.to_string(),
            policy: CachePolicy::default(),
        }
    }

    /// Caches that survive activation.
    pub fn current_caches(&self) -> [&str; 2] {
        [&self.precache_name, &self.runtime_name]
    }

    pub fn is_current(&self, cache_name: &str) -> bool {
        self.current_caches().contains(&cache_name)
    }
}
