// offline.rs - Offline asset cache
//! Network-first cache for the static shell, mirroring the install /
//! activate / fetch lifecycle of a service worker. API and auth paths are
//! never cached; a fresh response refreshes the cache; when the network is
//! down, cached assets are served and navigations fall back to the offline
//! page.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const CACHE_NAME: &str = "reelcast-static-v1";
pub const OFFLINE_PATH: &str = "/offline";

/// Shell assets fetched eagerly at install time.
pub const PRECACHE_PATHS: &[&str] = &[
    "/",
    "/offline",
    "/static/css/style.css",
    "/static/js/app.js",
    "/static/manifest.json",
];

/// Paths that must always hit the network. Caching any of these would replay
/// stale auth or job state.
pub const BYPASS_PREFIXES: &[&str] = &[
    "/api/",
    "/auth/",
    "/check-auth",
    "/auto-upload",
    "/upload",
    "/task-status",
    "/download",
    "/generate",
    "/cleanup",
    "/logout",
    "/health",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// How a request was satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum Served {
    Network(Asset),
    Cached(Asset),
    OfflinePage(Asset),
}

#[async_trait]
pub trait AssetFetch: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Asset>;
}

/// Named-cache storage, the moral equivalent of the Cache Storage API.
pub trait AssetStore: Send + Sync {
    fn put(&self, cache: &str, path: &str, asset: Asset);
    fn get(&self, cache: &str, path: &str) -> Option<Asset>;
    fn cache_names(&self) -> Vec<String>;
    fn drop_cache(&self, cache: &str);
}

#[derive(Default)]
pub struct MemoryStore {
    caches: Mutex<HashMap<String, HashMap<String, Asset>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetStore for MemoryStore {
    fn put(&self, cache: &str, path: &str, asset: Asset) {
        self.caches
            .lock()
            .unwrap()
            .entry(cache.to_string())
            .or_default()
            .insert(path.to_string(), asset);
    }

    fn get(&self, cache: &str, path: &str) -> Option<Asset> {
        self.caches
            .lock()
            .unwrap()
            .get(cache)
            .and_then(|entries| entries.get(path))
            .cloned()
    }

    fn cache_names(&self) -> Vec<String> {
        self.caches.lock().unwrap().keys().cloned().collect()
    }

    fn drop_cache(&self, cache: &str) {
        self.caches.lock().unwrap().remove(cache);
    }
}

/// Named-cache storage persisted on disk: one directory per cache, one file
/// per asset (percent-encoded path as the filename) plus a sidecar carrying
/// the content type. Write failures are logged and the entry treated as
/// absent.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn asset_path(&self, cache: &str, path: &str) -> PathBuf {
        self.root
            .join(cache)
            .join(urlencoding::encode(path).into_owned())
    }
}

fn sidecar(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".ct");
    PathBuf::from(name)
}

impl AssetStore for DirStore {
    fn put(&self, cache: &str, path: &str, asset: Asset) {
        let file = self.asset_path(cache, path);
        let written = std::fs::create_dir_all(self.root.join(cache))
            .and_then(|_| std::fs::write(&file, &asset.body))
            .and_then(|_| std::fs::write(sidecar(&file), asset.content_type.as_bytes()));
        if let Err(e) = written {
            tracing::warn!("Failed to store cached asset {}: {}", path, e);
        }
    }

    fn get(&self, cache: &str, path: &str) -> Option<Asset> {
        let file = self.asset_path(cache, path);
        let body = std::fs::read(&file).ok()?;
        let content_type = std::fs::read_to_string(sidecar(&file))
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Some(Asset { content_type, body })
    }

    fn cache_names(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn drop_cache(&self, cache: &str) {
        if let Err(e) = std::fs::remove_dir_all(self.root.join(cache)) {
            tracing::debug!("Nothing to drop for cache {}: {}", cache, e);
        }
    }
}

/// Fetches shell assets over HTTP from the backend origin.
pub struct HttpAssetFetch {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetFetch {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssetFetch for HttpAssetFetch {
    async fn fetch(&self, path: &str) -> Result<Asset> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "Fetch of {} failed with status {}",
                path,
                response.status()
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response.bytes().await?.to_vec();
        Ok(Asset { content_type, body })
    }
}

pub struct AssetCache {
    store: Arc<dyn AssetStore>,
    fetch: Arc<dyn AssetFetch>,
}

impl AssetCache {
    pub fn new(store: Arc<dyn AssetStore>, fetch: Arc<dyn AssetFetch>) -> Self {
        Self { store, fetch }
    }

    /// Eagerly cache the shell. Installation is all-or-nothing; a single
    /// failed precache fetch fails the whole install.
    pub async fn install(&self) -> Result<()> {
        for path in PRECACHE_PATHS {
            let asset = self.fetch.fetch(path).await?;
            self.store.put(CACHE_NAME, path, asset);
        }
        tracing::info!("Asset cache installed ({} entries)", PRECACHE_PATHS.len());
        Ok(())
    }

    /// Drop caches left over from previous shell versions.
    pub fn activate(&self) {
        for name in self.store.cache_names() {
            if name != CACHE_NAME {
                tracing::info!("Dropping stale cache {}", name);
                self.store.drop_cache(&name);
            }
        }
    }

    /// Serve one request. Bypass paths go straight to the network with no
    /// cache on either side. Everything else is network-first: a fresh
    /// response refreshes the cache; on network failure the cache answers,
    /// and a navigation with no cached entry gets the offline page.
    pub async fn handle(&self, path: &str, is_navigation: bool) -> Result<Served> {
        if Self::bypasses_cache(path) {
            return Ok(Served::Network(self.fetch.fetch(path).await?));
        }

        match self.fetch.fetch(path).await {
            Ok(asset) => {
                self.store.put(CACHE_NAME, path, asset.clone());
                Ok(Served::Network(asset))
            }
            Err(e) => {
                if let Some(asset) = self.store.get(CACHE_NAME, path) {
                    tracing::debug!("Serving {} from cache: {}", path, e);
                    return Ok(Served::Cached(asset));
                }
                if is_navigation {
                    if let Some(page) = self.store.get(CACHE_NAME, OFFLINE_PATH) {
                        tracing::debug!("Offline fallback for {}", path);
                        return Ok(Served::OfflinePage(page));
                    }
                }
                Err(e)
            }
        }
    }

    pub fn bypasses_cache(path: &str) -> bool {
        BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scripted origin that can be taken offline.
    #[derive(Default)]
    struct ScriptedFetch {
        assets: Mutex<HashMap<String, Asset>>,
        online: AtomicBool,
    }

    impl ScriptedFetch {
        fn new() -> Self {
            let fetch = Self::default();
            fetch.online.store(true, Ordering::SeqCst);
            fetch
        }

        fn serve(&self, path: &str, body: &str) {
            self.assets.lock().unwrap().insert(
                path.to_string(),
                Asset {
                    content_type: "text/html".into(),
                    body: body.as_bytes().to_vec(),
                },
            );
        }

        fn go_offline(&self) {
            self.online.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AssetFetch for ScriptedFetch {
        async fn fetch(&self, path: &str) -> Result<Asset> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(Error::Api("network unreachable".into()));
            }
            self.assets
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Api(format!("no asset at {}", path)))
        }
    }

    fn cache_with_shell() -> (Arc<ScriptedFetch>, AssetCache) {
        let fetch = Arc::new(ScriptedFetch::new());
        for path in PRECACHE_PATHS {
            fetch.serve(path, &format!("shell:{}", path));
        }
        let cache = AssetCache::new(Arc::new(MemoryStore::new()), fetch.clone());
        (fetch, cache)
    }

    fn body(served: &Served) -> String {
        let asset = match served {
            Served::Network(a) | Served::Cached(a) | Served::OfflinePage(a) => a,
        };
        String::from_utf8(asset.body.clone()).unwrap()
    }

    #[tokio::test]
    async fn precached_asset_survives_going_offline() {
        let (fetch, cache) = cache_with_shell();
        cache.install().await.unwrap();

        fetch.go_offline();
        let served = cache.handle("/static/css/style.css", false).await.unwrap();
        assert!(matches!(served, Served::Cached(_)));
        assert_eq!(body(&served), "shell:/static/css/style.css");
    }

    #[tokio::test]
    async fn offline_navigation_to_uncached_path_gets_offline_page() {
        let (fetch, cache) = cache_with_shell();
        cache.install().await.unwrap();

        fetch.go_offline();
        let served = cache.handle("/gallery", true).await.unwrap();
        assert!(matches!(served, Served::OfflinePage(_)));
        assert_eq!(body(&served), "shell:/offline");

        // A non-navigation request gets the error instead of the page.
        assert!(cache.handle("/static/js/other.js", false).await.is_err());
    }

    #[tokio::test]
    async fn api_paths_never_touch_the_cache() {
        let (fetch, cache) = cache_with_shell();
        cache.install().await.unwrap();
        fetch.serve("/check-auth", "{\"authenticated\":false}");

        let served = cache.handle("/check-auth", false).await.unwrap();
        assert!(matches!(served, Served::Network(_)));

        // Even though the endpoint just answered, offline it must fail
        // rather than replay a stale auth response.
        fetch.go_offline();
        assert!(cache.handle("/check-auth", false).await.is_err());
    }

    #[tokio::test]
    async fn fresh_response_refreshes_the_cached_copy() {
        let (fetch, cache) = cache_with_shell();
        cache.install().await.unwrap();

        fetch.serve("/static/js/app.js", "shell:v2");
        cache.handle("/static/js/app.js", false).await.unwrap();

        fetch.go_offline();
        let served = cache.handle("/static/js/app.js", false).await.unwrap();
        assert_eq!(body(&served), "shell:v2");
    }

    #[tokio::test]
    async fn activate_drops_stale_caches_only() {
        let store = Arc::new(MemoryStore::new());
        store.put(
            "reelcast-static-v0",
            "/",
            Asset {
                content_type: "text/html".into(),
                body: b"old".to_vec(),
            },
        );
        store.put(
            CACHE_NAME,
            "/",
            Asset {
                content_type: "text/html".into(),
                body: b"new".to_vec(),
            },
        );

        let cache = AssetCache::new(store.clone(), Arc::new(ScriptedFetch::new()));
        cache.activate();

        assert!(store.get("reelcast-static-v0", "/").is_none());
        assert!(store.get(CACHE_NAME, "/").is_some());
    }

    #[tokio::test]
    async fn auth_start_bypasses_even_a_seeded_cache_entry() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.serve("/auth/start", "{\"auth_url\":\"https://accounts.example.com\"}");
        let store = Arc::new(MemoryStore::new());
        store.put(
            CACHE_NAME,
            "/auth/start",
            Asset {
                content_type: "application/json".into(),
                body: b"stale".to_vec(),
            },
        );
        let cache = AssetCache::new(store.clone(), fetch.clone());

        let served = cache.handle("/auth/start", false).await.unwrap();
        assert!(matches!(served, Served::Network(_)));
        assert_eq!(
            body(&served),
            "{\"auth_url\":\"https://accounts.example.com\"}"
        );

        // Offline, the seeded entry must stay unread.
        fetch.go_offline();
        assert!(cache.handle("/auth/start", false).await.is_err());
        assert_eq!(
            store.get(CACHE_NAME, "/auth/start").unwrap().body,
            b"stale"
        );
    }

    #[test]
    fn dir_store_round_trips_assets_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        store.put(
            CACHE_NAME,
            "/static/css/style.css",
            Asset {
                content_type: "text/css".into(),
                body: b"body{}".to_vec(),
            },
        );

        let reopened = DirStore::new(dir.path());
        let asset = reopened.get(CACHE_NAME, "/static/css/style.css").unwrap();
        assert_eq!(asset.content_type, "text/css");
        assert_eq!(asset.body, b"body{}");
        assert_eq!(reopened.cache_names(), vec![CACHE_NAME.to_string()]);

        reopened.drop_cache(CACHE_NAME);
        assert!(reopened.get(CACHE_NAME, "/static/css/style.css").is_none());
    }

    #[tokio::test]
    async fn failed_precache_fails_the_install() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.serve("/", "shell:/");
        // The rest of the shell is missing.
        let cache = AssetCache::new(Arc::new(MemoryStore::new()), fetch);
        assert!(cache.install().await.is_err());
    }
}
