use std::future::Future;
use std::path::PathBuf;

use chrono::Utc;

use super::error::FeedError;
use super::model::Target;

/// Source of the flat target list polled every cycle.
pub trait TargetFeed: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Target>, FeedError>> + Send;
}

/// Parses a feed payload: a JSON array of target records.
pub fn parse_targets(body: &[u8]) -> Result<Vec<Target>, FeedError> {
    Ok(serde_json::from_slice(body)?)
}

/// Appends the `nocache` token so intermediaries never serve a stale list.
pub fn cache_busted_url(base: &str, token: i64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}nocache={token}")
}

/// Polls a target list over HTTP. No authentication.
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FeedError::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TargetFeed for HttpFeed {
    async fn fetch(&self) -> Result<Vec<Target>, FeedError> {
        let url = cache_busted_url(&self.url, Utc::now().timestamp_millis());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Fetch(e.to_string()))?;
        parse_targets(&body)
    }
}

/// Reads the target list from a local JSON file, re-read on every fetch.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TargetFeed for FileFeed {
    async fn fetch(&self) -> Result<Vec<Target>, FeedError> {
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FeedError::Fetch(format!("{}: {e}", self.path.display())))?;
        parse_targets(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TargetKind;
    use tempfile::tempdir;

    #[test]
    fn test_parse_feed_payload() {
        let body = br#"[
            {"id": 1, "type": "missile", "label": "Kh-101", "lat": 49.0, "lng": 31.0,
             "icon": "img/missile.png", "time": "2025-03-01T12:00:00Z"},
            {"id": "shahed-7", "type": "drone", "label": "Shahed", "lat": 48.5, "lng": 32.1,
             "expire_at": "2025-03-01T12:30:00Z"}
        ]"#;
        let targets = parse_targets(body).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id.as_str(), "1");
        assert_eq!(targets[0].kind, TargetKind::Missile);
        assert_eq!(targets[1].expire_at.as_deref(), Some("2025-03-01T12:30:00Z"));
    }

    #[test]
    fn test_malformed_payload_is_parse_error() {
        assert!(matches!(parse_targets(b"{\"id\": 1}"), Err(FeedError::Parse(_))));
        assert!(matches!(parse_targets(b"<html>"), Err(FeedError::Parse(_))));
        assert!(matches!(
            parse_targets(br#"[{"id": 1, "lat": "north", "lng": 2.0}]"#),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_cache_busted_url() {
        assert_eq!(
            cache_busted_url("https://example.org/targets.json", 17),
            "https://example.org/targets.json?nocache=17"
        );
        assert_eq!(
            cache_busted_url("https://example.org/targets?region=south", 17),
            "https://example.org/targets?region=south&nocache=17"
        );
    }

    #[tokio::test]
    async fn test_file_feed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(&path, r#"[{"id": 3, "type": "kab", "lat": 49.0, "lng": 31.0}]"#).unwrap();

        let feed = FileFeed::new(&path);
        let targets = feed.fetch().await.unwrap();
        assert_eq!(targets.len(), 1);

        let missing = FileFeed::new(dir.path().join("missing.json"));
        assert!(matches!(missing.fetch().await, Err(FeedError::Fetch(_))));
    }
}
