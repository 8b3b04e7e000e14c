//! News sources and the fallback chain that combines them.
//!
//! # Supported Sources
//!
//! | Source | Module | Auth | Used by |
//! |--------|--------|------|---------|
//! | Brave news search | [`brave`] | `X-Subscription-Token` header | topic fetch, batch |
//! | NewsAPI `everything` | [`newsapi`] | bearer token | topic fetch, batch |
//! | TheNewsAPI `top` | [`thenewsapi`] | `api_token` query param | batch only |
//! | Built-in samples | [`sample`] | none | topic fetch |
//!
//! # Failure handling
//!
//! A source without a key is skipped. A source that errors (transport,
//! status, or unparsable body) is logged and counts as zero results; it
//! never fails the overall fetch.

pub mod brave;
pub mod newsapi;
pub mod sample;
pub mod thenewsapi;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{error, info, instrument, warn};

use crate::api::RetryPolicy;
use crate::config::{Config, present};
use crate::models::{Article, FeedItem, Topic};

use brave::BraveSource;
use newsapi::NewsApiSource;
use thenewsapi::{TheNewsApiSource, TopQuery};

/// Topics fetched at the same time by [`NewsFetcher::fetch_all`].
const CONCURRENT_TOPICS: usize = 3;

/// Parameters for a batch feed pull.
#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub search: Option<String>,
    pub categories: Option<String>,
    pub locale: Option<String>,
    pub limit: usize,
}

impl FeedRequest {
    /// Query string for the keyword-search sources.
    fn keyword_query(&self) -> Option<String> {
        self.search
            .clone()
            .or_else(|| self.categories.as_ref().map(|c| c.replace(',', " OR ")))
            .filter(|q| !q.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewsFetcher {
    client: Client,
    policy: RetryPolicy,
    brave: Option<BraveSource>,
    newsapi: Option<NewsApiSource>,
    thenewsapi: Option<TheNewsApiSource>,
    image_prefix: String,
}

impl NewsFetcher {
    pub fn new(config: &Config, client: Client) -> Self {
        let brave = present(&config.brave_api_key).map(|key| BraveSource {
            endpoint: config.brave_endpoint.clone(),
            api_key: key.to_string(),
        });
        if brave.is_none() {
            warn!("Brave API key not provided; Brave search will be skipped");
        }
        let newsapi = present(&config.newsapi_key).map(|key| NewsApiSource {
            endpoint: config.newsapi_endpoint.clone(),
            api_key: key.to_string(),
        });
        if newsapi.is_none() {
            warn!("NewsAPI key not provided; NewsAPI will be skipped");
        }
        let thenewsapi = present(&config.thenewsapi_token).map(|token| TheNewsApiSource {
            endpoint: config.thenewsapi_endpoint.clone(),
            api_token: token.to_string(),
        });

        Self {
            client,
            policy: RetryPolicy::from_config(config),
            brave,
            newsapi,
            thenewsapi,
            image_prefix: config.image_url_prefix.clone(),
        }
    }

    /// Up to `limit` articles for `topic`: Brave first, NewsAPI for the
    /// shortfall, then built-in samples.
    #[instrument(level = "info", skip_all, fields(topic = %topic.name, limit))]
    pub async fn fetch_for_topic(&self, topic: &Topic, limit: usize) -> Vec<Article> {
        let query = topic.search_query();
        let mut articles = Vec::with_capacity(limit);

        if let Some(brave) = &self.brave {
            match brave
                .search(&self.client, self.policy, &query, &topic.name, limit)
                .await
            {
                Ok(found) => articles.extend(found),
                Err(e) => error!(source = brave::SOURCE_NAME, error = %e, "Source failed; treating as empty"),
            }
        }

        if articles.len() < limit
            && let Some(newsapi) = &self.newsapi
        {
            let remaining = limit - articles.len();
            match newsapi
                .search(&self.client, self.policy, &query, &topic.name, remaining)
                .await
            {
                Ok(found) => articles.extend(found),
                Err(e) => error!(source = newsapi::SOURCE_NAME, error = %e, "Source failed; treating as empty"),
            }
        }

        if articles.len() < limit {
            let remaining = limit - articles.len();
            let samples = sample::articles_for(&topic.name, remaining, &self.image_prefix);
            if !samples.is_empty() {
                info!(count = samples.len(), "Topping up with sample articles");
            }
            articles.extend(samples);
        }

        articles.truncate(limit);
        info!(count = articles.len(), "Fetched articles for topic");
        articles
    }

    /// Fetch every topic with an equal share of `limit` (at least one each)
    /// and concatenate in topic order.
    #[instrument(level = "info", skip_all, fields(topics = topics.len(), limit))]
    pub async fn fetch_all(&self, topics: &[Topic], limit: usize) -> Vec<Article> {
        if topics.is_empty() {
            return Vec::new();
        }
        let per_topic = (limit / topics.len()).max(1);
        let batches: Vec<Vec<Article>> = stream::iter(topics)
            .map(|topic| self.fetch_for_topic(topic, per_topic))
            .buffered(CONCURRENT_TOPICS)
            .collect()
            .await;
        batches.into_iter().flatten().collect()
    }

    /// Pull feed items for the batch region updater, in source priority
    /// order: TheNewsAPI, Brave, NewsAPI. No deduplication happens here.
    #[instrument(level = "info", skip_all, fields(limit = request.limit))]
    pub async fn fetch_feed(&self, request: &FeedRequest) -> Vec<FeedItem> {
        let mut items = Vec::new();

        match &self.thenewsapi {
            Some(source) => {
                let query = TopQuery {
                    search: request.search.clone(),
                    categories: request.categories.clone(),
                    locale: request.locale.clone(),
                    limit: request.limit,
                };
                match source.top(&self.client, self.policy, &query).await {
                    Ok(found) => items.extend(found),
                    Err(e) => error!(source = thenewsapi::SOURCE_NAME, error = %e, "Source failed; treating as empty"),
                }
            }
            None => error!(source = thenewsapi::SOURCE_NAME, "API token not configured; skipping source"),
        }

        let Some(query) = request.keyword_query() else {
            info!(count = items.len(), "No keyword query; skipping search sources");
            return items;
        };

        match &self.brave {
            Some(source) => match source
                .search(&self.client, self.policy, &query, "", request.limit)
                .await
            {
                Ok(found) => items.extend(found.into_iter().map(FeedItem::from)),
                Err(e) => error!(source = brave::SOURCE_NAME, error = %e, "Source failed; treating as empty"),
            },
            None => error!(source = brave::SOURCE_NAME, "API key not configured; skipping source"),
        }

        match &self.newsapi {
            Some(source) => match source
                .search(&self.client, self.policy, &query, "", request.limit)
                .await
            {
                Ok(found) => items.extend(found.into_iter().map(FeedItem::from)),
                Err(e) => error!(source = newsapi::SOURCE_NAME, error = %e, "Source failed; treating as empty"),
            },
            None => error!(source = newsapi::SOURCE_NAME, "API key not configured; skipping source"),
        }

        info!(count = items.len(), "Fetched feed items");
        items
    }
}
