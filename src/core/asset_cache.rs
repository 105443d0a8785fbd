//! Offline cache for static assets (icons, page shell).
//!
//! Network first, cached copy on failure. Each cache version lives in its
//! own namespace directory under the cache root; activating a version purges
//! every other namespace.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::CacheError;

/// Namespace prefix; the version is appended (`hud-cache-v1`).
pub const NAMESPACE_PREFIX: &str = "hud-cache-";

/// Where asset bytes come from when the network is up.
pub trait AssetSource {
    fn get(&self, url: &str) -> Result<Vec<u8>, CacheError>;
}

/// Blocking HTTP source; call it off the async loop.
pub struct HttpAssetSource {
    client: reqwest::blocking::Client,
}

impl HttpAssetSource {
    pub fn new() -> Result<Self, CacheError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CacheError::Network {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl AssetSource for HttpAssetSource {
    fn get(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let network = |reason: String| CacheError::Network {
            url: url.to_string(),
            reason,
        };
        let response = self.client.get(url).send().map_err(|e| network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(network(format!("HTTP {}", response.status().as_u16())));
        }
        let body = response.bytes().map_err(|e| network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

pub struct AssetCache {
    root: PathBuf,
    namespace: String,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>, version: &str) -> Self {
        Self {
            root: root.into(),
            namespace: format!("{NAMESPACE_PREFIX}{version}"),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.namespace_dir().join(entry_key(url))
    }

    /// Pre-caches `urls`. Fails on the first url that cannot be fetched.
    pub fn install(&self, source: &impl AssetSource, urls: &[String]) -> Result<usize, CacheError> {
        for url in urls {
            let body = source.get(url)?;
            self.put(url, &body)?;
        }
        log::info!("Cached {} assets in {}", urls.len(), self.namespace);
        Ok(urls.len())
    }

    /// Deletes every namespace except the current one. Returns what was purged.
    pub fn activate(&self) -> Result<Vec<String>, CacheError> {
        let mut purged = Vec::new();
        if !self.root.exists() {
            return Ok(purged);
        }
        let entries = fs::read_dir(&self.root).map_err(|source| io_error(&self.root, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.root, source))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == self.namespace || !entry.path().is_dir() {
                continue;
            }
            fs::remove_dir_all(entry.path()).map_err(|source| io_error(&entry.path(), source))?;
            log::info!("Purged stale asset cache {name}");
            purged.push(name);
        }
        purged.sort();
        Ok(purged)
    }

    /// Network first; on failure serve the cached copy.
    pub fn fetch(&self, source: &impl AssetSource, url: &str) -> Result<Vec<u8>, CacheError> {
        match source.get(url) {
            Ok(body) => {
                if let Err(e) = self.put(url, &body) {
                    log::warn!("Could not refresh cached {url}: {e}");
                }
                Ok(body)
            }
            Err(e) => {
                log::debug!("Network miss for {url} ({e}), trying cache");
                self.cached(url).ok_or_else(|| CacheError::Miss(url.to_string()))
            }
        }
    }

    pub fn cached(&self, url: &str) -> Option<Vec<u8>> {
        fs::read(self.entry_path(url)).ok()
    }

    fn put(&self, url: &str, body: &[u8]) -> Result<(), CacheError> {
        let dir = self.namespace_dir();
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        let path = self.entry_path(url);
        fs::write(&path, body).map_err(|source| io_error(&path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File-name-safe, collision-free key: unsafe bytes become `_XX`.
fn entry_key(url: &str) -> String {
    let mut key = String::with_capacity(url.len());
    for byte in url.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            key.push(char::from(byte));
        } else {
            key.push_str(&format!("_{byte:02X}"));
        }
    }
    key
}
