//! NewsAPI `everything` adapter (secondary source).
//!
//! The key is sent as a bearer token; results live under `articles[]`.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::api::{JsonGet, RetryPolicy, get_json_with_backoff};
use crate::error::Result;
use crate::models::{Article, ArticleStatus};

pub const SOURCE_NAME: &str = "NewsAPI";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsApiResponse {
    articles: Vec<NewsApiArticle>,
}

#[allow(non_snake_case)]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source: Option<NewsApiSourceRef>,
    publishedAt: Option<String>,
    urlToImage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsApiSourceRef {
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewsApiSource {
    pub endpoint: String,
    pub api_key: String,
}

impl NewsApiSource {
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
                headers: vec![("Authorization", format!("Bearer {}", self.api_key))],
                query: vec![
                    ("q", query.to_string()),
                    ("pageSize", limit.to_string()),
                    ("language", "en".to_string()),
                ],
            },
            policy,
        )
        .await?;

        let response: NewsApiResponse = serde_json::from_value(value)?;
        let articles: Vec<Article> = response
            .articles
            .into_iter()
            .map(|a| Article {
                id: 0,
                title: a.title.unwrap_or_default(),
                source: a
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| SOURCE_NAME.to_string()),
                url: a.url.unwrap_or_default(),
                published_date: a.publishedAt.unwrap_or_else(|| Utc::now().to_rfc3339()),
                content: a.description.unwrap_or_default(),
                topic: topic.to_string(),
                image_url: a.urlToImage.filter(|u| !u.is_empty()),
                local_image_path: None,
                status: ArticleStatus::New,
            })
            .collect();
        info!(count = articles.len(), "Fetched NewsAPI results");
        Ok(articles)
    }
}
