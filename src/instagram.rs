use crate::db::{self, Pool};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

const GRAPH_API_BASE: &str = "https://graph.instagram.com/";

/// One media item as returned by the Graph API media edge.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub media_url: String,
    pub permalink: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    data: Vec<MediaItem>,
}

#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// Fetch the account's most recent media, newest first.
    async fn fetch_recent_media(&self, limit: u32) -> Result<Vec<MediaItem>>;
}

/// Graph API client for the shop's Instagram account.
#[derive(Clone)]
pub struct GraphApiClient {
    http: Client,
    base_url: Url,
    access_token: String,
    user_id: String,
}

impl fmt::Debug for GraphApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphApiClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl GraphApiClient {
    pub fn new(access_token: String, user_id: String) -> Self {
        let base_url = Url::parse(GRAPH_API_BASE).expect("valid default Graph API URL");
        Self::with_base_url(access_token, user_id, base_url)
    }

    pub fn with_base_url(access_token: String, user_id: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("optica-cms/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            access_token,
            user_id,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self::new(
            cfg.instagram.access_token.clone(),
            cfg.instagram.user_id.clone(),
        )
    }

    pub fn build_media_url(&self, limit: u32) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("{}/media", self.user_id))
            .context("invalid Graph API base URL")?;
        url.query_pairs_mut()
            .append_pair("fields", "id,caption,media_url,permalink,timestamp")
            .append_pair("limit", &limit.to_string())
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }
}

#[async_trait]
impl InstagramApi for GraphApiClient {
    async fn fetch_recent_media(&self, limit: u32) -> Result<Vec<MediaItem>> {
        let url = self.build_media_url(limit)?;
        debug!(user_id = %self.user_id, limit, "fetching instagram media");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to reach Instagram")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("received 429 from Instagram: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("instagram error {}: {}", status, body));
        }

        let payload: MediaResponse = res.json().await.context("invalid Instagram response")?;
        Ok(payload.data)
    }
}

/// Mirror the feed into the local table: upsert every fetched item by its
/// media id, then prune rows beyond `limit`. Idempotent, so a failed cycle
/// is simply retried on the next poll.
pub async fn mirror_feed(pool: &Pool, api: &dyn InstagramApi, limit: u32) -> Result<usize> {
    let items = api.fetch_recent_media(limit).await?;
    let count = items.len();
    for item in &items {
        db::upsert_instagram_post(
            pool,
            &item.id,
            item.caption.as_deref(),
            &item.media_url,
            &item.permalink,
            item.timestamp,
        )
        .await?;
    }
    let pruned = db::prune_instagram_posts(pool, limit as i64).await?;
    info!(fetched = count, pruned, "mirrored instagram feed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_carries_fields_and_token() {
        let client = GraphApiClient::new("tok".into(), "178414".into());
        let url = client.build_media_url(12).unwrap();
        assert_eq!(url.path(), "/178414/media");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("limit".into(), "12".into())));
        assert!(query.contains(&("access_token".into(), "tok".into())));
        assert!(query
            .iter()
            .any(|(k, v)| k == "fields" && v.contains("permalink")));
    }

    #[test]
    fn media_response_parses_optional_fields() {
        let raw = r#"{
            "data": [
                {"id": "1", "media_url": "https://cdn/1.jpg", "permalink": "https://ig/1"},
                {"id": "2", "caption": "new frames", "media_url": "https://cdn/2.jpg",
                 "permalink": "https://ig/2", "timestamp": "2026-08-01T10:00:00+00:00"}
            ]
        }"#;
        let parsed: MediaResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert!(parsed.data[0].caption.is_none());
        assert!(parsed.data[1].timestamp.is_some());
    }
}
