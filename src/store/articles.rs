//! Article store: fetched articles keyed by URL.

use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use super::JsonCollection;
use crate::error::Result;
use crate::models::{Article, ArticleStatus};

/// Filters for [`ArticleStore::query`]. `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub topic: Option<String>,
    pub status: Option<ArticleStatus>,
    /// Case-insensitive substring of the source name.
    pub source: Option<String>,
    /// Case-insensitive substring of the title or content.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

#[derive(Debug)]
pub struct ArticleStore {
    inner: JsonCollection<Article>,
}

impl ArticleStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: JsonCollection::open(path).await,
        }
    }

    pub async fn list(&self) -> Vec<Article> {
        self.inner.snapshot().await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn get(&self, id: u64) -> Option<Article> {
        self.inner.get(id).await
    }

    /// Insert `article` unless one with the same `url` exists.
    ///
    /// Returns `Ok(false)` for a duplicate; the store is left untouched.
    pub async fn add(&self, article: Article) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        if guard.items().iter().any(|a| a.url == article.url) {
            debug!(url = %article.url, "Skipping duplicate article");
            return Ok(false);
        }
        let id = guard.insert(article).id;
        guard.commit().await?;
        debug!(id, "Added article");
        Ok(true)
    }

    /// Add each article in turn; returns how many were new.
    #[instrument(level = "info", skip_all, fields(candidates = articles.len()))]
    pub async fn add_many(&self, articles: Vec<Article>) -> Result<usize> {
        let mut added = 0;
        for article in articles {
            if self.add(article).await? {
                added += 1;
            }
        }
        info!(added, "Stored new articles");
        Ok(added)
    }

    /// Articles whose `topic` equals `name` exactly.
    pub async fn query_by_topic(&self, name: &str) -> Vec<Article> {
        self.inner
            .snapshot()
            .await
            .into_iter()
            .filter(|a| a.topic == name)
            .collect()
    }

    /// Filtered, newest-first, paginated listing.
    pub async fn query(&self, q: &ArticleQuery) -> ArticlePage {
        let source = q.source.as_ref().map(|s| s.to_lowercase());
        let search = q.search.as_ref().map(|s| s.to_lowercase());

        let matched: Vec<Article> = self
            .inner
            .snapshot()
            .await
            .into_iter()
            .filter(|a| q.topic.as_ref().is_none_or(|t| &a.topic == t))
            .filter(|a| q.status.is_none_or(|s| a.status == s))
            .filter(|a| {
                source
                    .as_ref()
                    .is_none_or(|s| a.source.to_lowercase().contains(s))
            })
            .filter(|a| {
                search.as_ref().is_none_or(|s| {
                    a.title.to_lowercase().contains(s) || a.content.to_lowercase().contains(s)
                })
            })
            .sorted_by(|a, b| b.published_date.cmp(&a.published_date))
            .collect();

        let limit = q.limit.max(1);
        let page = q.page.max(1);
        let total = matched.len();
        let articles = matched
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        ArticlePage {
            articles,
            total,
            page,
            limit,
            pages: total.div_ceil(limit),
        }
    }

    /// Returns `Ok(false)` if no article has `id`.
    pub async fn update_status(&self, id: u64, status: ArticleStatus) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let Some(article) = guard.get_mut(id) else {
            return Ok(false);
        };
        article.status = status;
        guard.commit().await?;
        Ok(true)
    }

    pub async fn set_local_image(&self, id: u64, path: String) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let Some(article) = guard.get_mut(id) else {
            return Ok(false);
        };
        article.local_image_path = Some(path);
        guard.commit().await?;
        Ok(true)
    }

    pub async fn delete(&self, id: u64) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        if guard.remove(id).is_none() {
            return Ok(false);
        }
        guard.commit().await?;
        Ok(true)
    }

    /// Number of stored articles per topic name.
    pub async fn topic_distribution(&self) -> BTreeMap<String, usize> {
        self.inner
            .snapshot()
            .await
            .into_iter()
            .map(|a| a.topic)
            .counts()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn article(url: &str, topic: &str, date: &str) -> Article {
        Article {
            id: 0,
            title: format!("Title for {url}"),
            source: "Energy Today".to_string(),
            url: url.to_string(),
            published_date: date.to_string(),
            content: "Solar and wind power now account for a quarter of generation.".to_string(),
            topic: topic.to_string(),
            image_url: None,
            local_image_path: None,
            status: ArticleStatus::New,
        }
    }

    async fn store() -> (tempfile::TempDir, ArticleStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::open(tmp.path().join("news_database.json")).await;
        (tmp, store)
    }

    #[tokio::test]
    async fn test_duplicate_url_is_noop() {
        let (_tmp, store) = store().await;
        assert!(store.add(article("https://a", "AI News", "2025-05-01")).await.unwrap());
        assert!(!store.add(article("https://a", "Healthcare", "2025-05-02")).await.unwrap());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.list().await[0].topic, "AI News");
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let (_tmp, store) = store().await;
        let added = store
            .add_many(vec![
                article("https://a", "t", "1"),
                article("https://b", "t", "2"),
                article("https://a", "t", "3"),
                article("https://c", "t", "4"),
            ])
            .await
            .unwrap();
        assert_eq!(added, 3);
        let ids: Vec<u64> = store.list().await.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_deleted_max_id_is_not_reused() {
        let (_tmp, store) = store().await;
        store.add(article("https://a", "t", "1")).await.unwrap();
        store.add(article("https://b", "t", "2")).await.unwrap();
        assert!(store.delete(2).await.unwrap());

        store.add(article("https://c", "t", "3")).await.unwrap();
        let ids: Vec<u64> = store.list().await.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_round_trip_reload_is_equal() {
        let (tmp, store) = store().await;
        let mut with_image = article("https://a", "AI News", "2025-05-01");
        with_image.image_url = Some("https://img/a.png".into());
        store.add(with_image).await.unwrap();
        store.add(article("https://b", "Healthcare", "2025-05-02")).await.unwrap();
        store.update_status(2, ArticleStatus::Archived).await.unwrap();
        let before = store.list().await;

        let reloaded = ArticleStore::open(tmp.path().join("news_database.json")).await;
        assert_eq!(reloaded.list().await, before);
    }

    #[tokio::test]
    async fn test_not_found_is_a_value() {
        let (_tmp, store) = store().await;
        assert!(!store.update_status(42, ArticleStatus::Used).await.unwrap());
        assert!(!store.delete(42).await.unwrap());
        assert!(!store.set_local_image(42, "/x.jpg".into()).await.unwrap());
        assert!(store.get(42).await.is_none());
    }

    #[tokio::test]
    async fn test_query_by_topic_is_exact() {
        let (_tmp, store) = store().await;
        store.add(article("https://a", "AI News", "1")).await.unwrap();
        store.add(article("https://b", "ai news", "2")).await.unwrap();
        assert_eq!(store.query_by_topic("AI News").await.len(), 1);
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_paginates() {
        let (_tmp, store) = store().await;
        for (i, day) in ["01", "03", "02", "05", "04"].iter().enumerate() {
            let mut a = article(&format!("https://x/{i}"), "AI News", &format!("2025-05-{day}"));
            if i == 0 {
                a.source = "Tech Policy Today".into();
            }
            store.add(a).await.unwrap();
        }

        let page = store
            .query(&ArticleQuery {
                topic: Some("AI News".into()),
                page: 2,
                limit: 2,
                ..Default::default()
            })
            .await;
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        let dates: Vec<&str> = page.articles.iter().map(|a| a.published_date.as_str()).collect();
        assert_eq!(dates, vec!["2025-05-03", "2025-05-02"]);

        let by_source = store
            .query(&ArticleQuery {
                source: Some("policy".into()),
                limit: 10,
                ..Default::default()
            })
            .await;
        assert_eq!(by_source.total, 1);
    }

    #[tokio::test]
    async fn test_topic_distribution() {
        let (_tmp, store) = store().await;
        store.add(article("https://a", "AI News", "1")).await.unwrap();
        store.add(article("https://b", "AI News", "2")).await.unwrap();
        store.add(article("https://c", "Healthcare", "3")).await.unwrap();
        let dist = store.topic_distribution().await;
        assert_eq!(dist.get("AI News"), Some(&2));
        assert_eq!(dist.get("Healthcare"), Some(&1));
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let (tmp, store) = store().await;
        let store = Arc::new(store);
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .add(article(&format!("https://c/{i}"), "t", "d"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            assert!(h.await.unwrap());
        }

        let reloaded = ArticleStore::open(tmp.path().join("news_database.json")).await;
        assert_eq!(reloaded.len().await, 20);
        let mut ids: Vec<u64> = reloaded.list().await.iter().map(|a| a.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
    }
}
