//! TheNewsAPI `top` adapter, used only by the batch region updater.
//!
//! Authenticates with an `api_token` query parameter. Results live under
//! `data[]` and map straight to [`FeedItem`]s, keeping the source's
//! categories (or keywords) as tags.

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::api::{JsonGet, RetryPolicy, get_json_with_backoff};
use crate::error::Result;
use crate::models::FeedItem;

pub const SOURCE_NAME: &str = "TheNewsAPI";

const NO_TITLE: &str = "No Title Available";
const NO_DESCRIPTION: &str = "No Description Available";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopResponse {
    data: Vec<TopItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopItem {
    title: Option<String>,
    description: Option<String>,
    snippet: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    published_at: Option<String>,
    source: Option<String>,
    categories: Vec<String>,
    keywords: Option<String>,
}

impl TopItem {
    fn into_feed_item(self) -> FeedItem {
        let tags = if self.categories.is_empty() {
            self.keywords
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .take(3)
                .map(String::from)
                .collect()
        } else {
            self.categories
        };

        FeedItem {
            title: non_empty(self.title).unwrap_or_else(|| NO_TITLE.to_string()),
            description: non_empty(self.description)
                .or(non_empty(self.snippet))
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            url: non_empty(self.url),
            image_url: non_empty(self.image_url),
            published_at: self.published_at.unwrap_or_default(),
            source: non_empty(self.source).unwrap_or_else(|| SOURCE_NAME.to_string()),
            tags,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Filters for a `top` request.
#[derive(Debug, Clone, Default)]
pub struct TopQuery {
    pub search: Option<String>,
    pub categories: Option<String>,
    pub locale: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct TheNewsApiSource {
    pub endpoint: String,
    pub api_token: String,
}

impl TheNewsApiSource {
    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME, limit = query.limit))]
    pub async fn top(
        &self,
        client: &Client,
        policy: RetryPolicy,
        query: &TopQuery,
    ) -> Result<Vec<FeedItem>> {
        let mut params = vec![
            ("api_token", self.api_token.clone()),
            ("language", "en".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(locale) = &query.locale {
            params.push(("locale", locale.clone()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(categories) = &query.categories {
            params.push(("categories", categories.clone()));
        }

        let value = get_json_with_backoff(
            JsonGet {
                client,
                source_name: SOURCE_NAME,
                url: &self.endpoint,
                headers: vec![],
                query: params,
            },
            policy,
        )
        .await?;

        let response: TopResponse = serde_json::from_value(value)?;
        let items: Vec<FeedItem> = response
            .data
            .into_iter()
            .map(TopItem::into_feed_item)
            .collect();
        info!(count = items.len(), "Fetched TheNewsAPI results");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_tags_prefer_categories_then_keywords() {
        let with_categories = TopItem {
            categories: vec!["politics".into()],
            keywords: Some("a, b".into()),
            ..Default::default()
        }
        .into_feed_item();
        assert_eq!(with_categories.tags, vec!["politics"]);

        let with_keywords = TopItem {
            keywords: Some("vote, senate , , bill, extra".into()),
            ..Default::default()
        }
        .into_feed_item();
        assert_eq!(with_keywords.tags, vec!["vote", "senate", "bill"]);
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let item = TopItem {
            snippet: Some("snippet text".into()),
            url: Some("".into()),
            ..Default::default()
        }
        .into_feed_item();
        assert_eq!(item.title, NO_TITLE);
        assert_eq!(item.description, "snippet text");
        assert_eq!(item.url, None);
        assert_eq!(item.source, SOURCE_NAME);
    }

    #[tokio::test]
    async fn test_top_sends_token_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("api_token", "tok"))
            .and(query_param("locale", "us"))
            .and(query_param("categories", "politics"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"found": 1},
                "data": [{
                    "title": "Senate vote",
                    "description": "The vote passed.",
                    "url": "https://n.example/vote",
                    "image_url": "https://img.example/vote.jpg",
                    "published_at": "2025-05-20T10:30:00.000000Z",
                    "source": "n.example",
                    "categories": ["politics"]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = TheNewsApiSource {
            endpoint: server.uri(),
            api_token: "tok".into(),
        };
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
        };
        let items = source
            .top(
                &Client::new(),
                policy,
                &TopQuery {
                    categories: Some("politics".into()),
                    locale: Some("us".into()),
                    limit: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url.as_deref(), Some("https://n.example/vote"));
        assert_eq!(items[0].tags, vec!["politics"]);
    }
}
