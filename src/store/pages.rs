//! Page store: HTML pages indexed in JSON and mirrored to flat files.
//!
//! Every create/update rewrites the JSON index and then writes
//! `{pages_dir}/{filename}`. The two writes are not atomic together; if the
//! second one fails the error is returned and the index already holds the
//! new content.

use itertools::Itertools;
use scraper::{Html, Selector};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use super::JsonCollection;
use crate::error::{NewsdeskError, Result};
use crate::models::{HtmlPage, PageStatus};
use crate::utils::{now_iso, validate_file_name};

#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub status: Option<PageStatus>,
    /// Case-insensitive substring of the title or filename.
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct PageStore {
    pages_dir: PathBuf,
    inner: JsonCollection<HtmlPage>,
}

impl PageStore {
    pub async fn open(pages_dir: impl Into<PathBuf>, index: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            inner: JsonCollection::open(index).await,
        }
    }

    pub fn page_path(&self, filename: &str) -> PathBuf {
        self.pages_dir.join(filename)
    }

    pub async fn get(&self, id: u64) -> Option<HtmlPage> {
        self.inner.get(id).await
    }

    pub async fn get_by_filename(&self, filename: &str) -> Option<HtmlPage> {
        self.inner
            .snapshot()
            .await
            .into_iter()
            .find(|p| p.filename == filename)
    }

    /// Pages matching `filter`, most recently updated first.
    pub async fn list(&self, filter: &PageFilter) -> Vec<HtmlPage> {
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        self.inner
            .snapshot()
            .await
            .into_iter()
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                search.as_ref().is_none_or(|s| {
                    p.title.to_lowercase().contains(s) || p.filename.to_lowercase().contains(s)
                })
            })
            .sorted_by(|a, b| b.updated_at.cmp(&a.updated_at))
            .collect()
    }

    /// Create a draft page. Fails if `filename` is already taken.
    #[instrument(level = "info", skip(self, content))]
    pub async fn create(&self, filename: &str, title: &str, content: &str) -> Result<HtmlPage> {
        validate_file_name(filename)?;
        let mut guard = self.inner.lock().await;
        if guard.items().iter().any(|p| p.filename == filename) {
            return Err(NewsdeskError::DuplicatePage(filename.to_string()));
        }
        let now = now_iso();
        let page = guard
            .insert(HtmlPage {
                id: 0,
                filename: filename.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                status: PageStatus::Draft,
                created_at: now.clone(),
                updated_at: now,
            })
            .clone();
        guard.commit().await?;
        self.write_flat_file(&page).await?;
        info!(id = page.id, "Created page");
        Ok(page)
    }

    /// Replace title and content. `Ok(None)` if no page has `id`.
    #[instrument(level = "info", skip(self, title, content))]
    pub async fn update(&self, id: u64, title: &str, content: &str) -> Result<Option<HtmlPage>> {
        let mut guard = self.inner.lock().await;
        let Some(page) = guard.get_mut(id) else {
            return Ok(None);
        };
        page.title = title.to_string();
        page.content = content.to_string();
        page.updated_at = now_iso();
        let page = page.clone();
        guard.commit().await?;
        self.write_flat_file(&page).await?;
        Ok(Some(page))
    }

    /// Mark a page published. Content and flat file are left alone.
    pub async fn publish(&self, id: u64) -> Result<Option<HtmlPage>> {
        let mut guard = self.inner.lock().await;
        let Some(page) = guard.get_mut(id) else {
            return Ok(None);
        };
        page.status = PageStatus::Published;
        page.updated_at = now_iso();
        let page = page.clone();
        guard.commit().await?;
        Ok(Some(page))
    }

    /// Remove the index entry and the flat file.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let Some(page) = guard.remove(id) else {
            return Ok(false);
        };
        guard.commit().await?;
        let path = self.page_path(&page.filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Page file already gone");
            }
            Err(e) => return Err(NewsdeskError::io(path, e)),
        }
        Ok(true)
    }

    async fn write_flat_file(&self, page: &HtmlPage) -> Result<()> {
        tokio::fs::create_dir_all(&self.pages_dir)
            .await
            .map_err(|e| NewsdeskError::io(&self.pages_dir, e))?;
        let path = self.page_path(&page.filename);
        tokio::fs::write(&path, &page.content)
            .await
            .map_err(|e| NewsdeskError::io(path, e))
    }
}

/// Text of the document's `<title>` element, if any.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, PageStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = PageStore::open(
            tmp.path().join("pages"),
            tmp.path().join("data").join("pages_database.json"),
        )
        .await;
        (tmp, store)
    }

    #[tokio::test]
    async fn test_create_writes_index_and_flat_file() {
        let (tmp, store) = store().await;
        let page = store.create("ai_news.html", "AI News", "<html>v1</html>").await.unwrap();
        assert_eq!(page.id, 1);
        assert_eq!(page.status, PageStatus::Draft);
        assert_eq!(page.created_at, page.updated_at);

        let on_disk = std::fs::read_to_string(tmp.path().join("pages/ai_news.html")).unwrap();
        assert_eq!(on_disk, "<html>v1</html>");
        assert!(tmp.path().join("data/pages_database.json").exists());
    }

    #[tokio::test]
    async fn test_duplicate_filename_rejected() {
        let (_tmp, store) = store().await;
        store.create("a.html", "A", "x").await.unwrap();
        assert!(matches!(
            store.create("a.html", "A2", "y").await,
            Err(NewsdeskError::DuplicatePage(_))
        ));
    }

    #[tokio::test]
    async fn test_unsafe_filename_rejected() {
        let (_tmp, store) = store().await;
        assert!(matches!(
            store.create("../escape.html", "A", "x").await,
            Err(NewsdeskError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_update_refreshes_file_and_timestamp() {
        let (tmp, store) = store().await;
        let page = store.create("a.html", "A", "v1").await.unwrap();
        let updated = store.update(page.id, "A2", "v2").await.unwrap().unwrap();
        assert_eq!(updated.title, "A2");
        assert!(updated.updated_at >= page.updated_at);
        assert_eq!(updated.created_at, page.created_at);
        assert_eq!(std::fs::read_to_string(tmp.path().join("pages/a.html")).unwrap(), "v2");

        assert_eq!(store.update(99, "x", "y").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_keeps_content() {
        let (_tmp, store) = store().await;
        let page = store.create("a.html", "A", "v1").await.unwrap();
        let published = store.publish(page.id).await.unwrap().unwrap();
        assert_eq!(published.status, PageStatus::Published);
        assert_eq!(published.content, "v1");
        assert_eq!(store.publish(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_flat_file() {
        let (tmp, store) = store().await;
        let page = store.create("a.html", "A", "v1").await.unwrap();
        assert!(store.delete(page.id).await.unwrap());
        assert!(!tmp.path().join("pages/a.html").exists());
        assert!(!store.delete(page.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (_tmp, store) = store().await;
        store.create("recent_news.html", "Recent News", "x").await.unwrap();
        let ai = store.create("ai_news.html", "AI News", "x").await.unwrap();
        store.publish(ai.id).await.unwrap();

        let published = store
            .list(&PageFilter {
                status: Some(PageStatus::Published),
                ..Default::default()
            })
            .await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].filename, "ai_news.html");

        let all = store.list(&PageFilter::default()).await;
        assert_eq!(all[0].filename, "ai_news.html");

        let search = store
            .list(&PageFilter {
                search: Some("RECENT".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(search.len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_reload_is_equal() {
        let (tmp, store) = store().await;
        store.create("a.html", "A", "v1").await.unwrap();
        store.create("b.html", "B", "v2").await.unwrap();
        let before = store.list(&PageFilter::default()).await;

        let reloaded = PageStore::open(
            tmp.path().join("pages"),
            tmp.path().join("data").join("pages_database.json"),
        )
        .await;
        assert_eq!(reloaded.list(&PageFilter::default()).await, before);
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> Recent News </title></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Recent News"));
        assert_eq!(extract_title("<p>no title</p>"), None);
    }
}
