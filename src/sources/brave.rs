//! Brave news search adapter (primary source).
//!
//! `GET {endpoint}?q=..&count=..&freshness=week` with the key in the
//! `X-Subscription-Token` header. Results live under `results[]`.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::api::{JsonGet, RetryPolicy, get_json_with_backoff};
use crate::error::Result;
use crate::models::{Article, ArticleStatus};

pub const SOURCE_NAME: &str = "Brave Search";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BraveResponse {
    results: Vec<BraveResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BraveResult {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source: Option<String>,
    meta_url: Option<MetaUrl>,
    published_date: Option<String>,
    page_age: Option<String>,
    image: Option<ImageRef>,
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetaUrl {
    hostname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageRef {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    src: Option<String>,
}

impl BraveResult {
    fn into_article(self, topic: &str) -> Article {
        Article {
            id: 0,
            title: self.title.unwrap_or_default(),
            source: self
                .source
                .or(self.meta_url.and_then(|m| m.hostname))
                .unwrap_or_else(|| SOURCE_NAME.to_string()),
            url: self.url.unwrap_or_default(),
            published_date: self
                .published_date
                .or(self.page_age)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            content: self.description.unwrap_or_default(),
            topic: topic.to_string(),
            image_url: self
                .image
                .and_then(|i| i.url)
                .or(self.thumbnail.and_then(|t| t.src))
                .filter(|u| !u.is_empty()),
            local_image_path: None,
            status: ArticleStatus::New,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BraveSource {
    pub endpoint: String,
    pub api_key: String,
}

impl BraveSource {
    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME, %topic, limit))]
    pub async fn search(
        &self,
        client: &Client,
        policy: RetryPolicy,
        query: &str,
        topic: &str,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let value = get_json_with_backoff(
            JsonGet {
                client,
                source_name: SOURCE_NAME,
                url: &self.endpoint,
                headers: vec![
                    ("X-Subscription-Token", self.api_key.clone()),
                    ("Accept", "application/json".to_string()),
                ],
                query: vec![
                    ("q", query.to_string()),
                    ("count", limit.to_string()),
                    ("freshness", "week".to_string()),
                ],
            },
            policy,
        )
        .await?;

        let response: BraveResponse = serde_json::from_value(value)?;
        let articles: Vec<Article> = response
            .results
            .into_iter()
            .map(|r| r.into_article(topic))
            .collect();
        info!(count = articles.len(), "Fetched Brave results");
        Ok(articles)
    }
}
