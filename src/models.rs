//! Data models for articles, topics, pages, and batch feed items.
//!
//! This module defines the records persisted by the JSON stores:
//! - [`Article`]: a fetched news article, keyed by its `url`
//! - [`Topic`]: a keyword set used to build search queries and group articles
//! - [`HtmlPage`]: a rendered HTML page mirrored to a flat file
//! - [`FeedItem`]: an article-like record used only by the batch region updater
//!
//! Optional fields serialize as `null` rather than being skipped, so the
//! on-disk index files always carry the same set of keys.

use crate::error::{NewsdeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle marker on a stored article. Freely settable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    New,
    Used,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::New => "new",
            ArticleStatus::Used => "used",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(ArticleStatus::New),
            "used" => Ok(ArticleStatus::Used),
            "archived" => Ok(ArticleStatus::Archived),
            _ => Err(NewsdeskError::InvalidStatus(s.to_string())),
        }
    }
}

/// A news article as stored in the article index.
///
/// The `url` is the dedup key: the store never holds two articles with the
/// same `url`. The `topic` is a soft reference to [`Topic::name`].
///
/// # JSON shape
///
/// ```text
/// {"id": 1, "title": "...", "source": "...", "url": "...",
///  "published_date": "2025-05-20T10:30:00", "content": "...",
///  "topic": "Climate Action", "image_url": null,
///  "local_image_path": null, "status": "new"}
/// ```
///
/// `title`, `source`, `url`, `published_date`, `content` and `topic` are
/// required; deserializing a record without them fails with a missing-field
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Assigned by the store on insert; `0` means "not stored yet".
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub source: String,
    pub url: String,
    /// ISO-8601 publication timestamp as reported by the source.
    pub published_date: String,
    pub content: String,
    pub topic: String,
    pub image_url: Option<String>,
    /// Path under the static assets prefix once the image was downloaded.
    pub local_image_path: Option<String>,
    #[serde(default)]
    pub status: ArticleStatus,
}

impl Article {
    /// Parse one article, or an array of articles, from JSON text.
    ///
    /// Missing required keys surface as [`NewsdeskError::Json`].
    pub fn parse_many(json: &str) -> Result<Vec<Article>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let articles = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };
        Ok(articles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(NewsdeskError::InvalidStatus(s.to_string())),
        }
    }
}

/// A tracked news topic.
///
/// `name` is unique across the registry and is what articles refer to.
/// `keywords` are joined with `" OR "` to build search queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl Topic {
    pub fn new(name: &str, description: &str, keywords: &[&str]) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            description: description.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority: Priority::Medium,
        }
    }

    /// Search query for the external news APIs.
    pub fn search_query(&self) -> String {
        self.keywords.join(" OR ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
        })
    }
}

impl FromStr for PageStatus {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(PageStatus::Draft),
            "published" => Ok(PageStatus::Published),
            _ => Err(NewsdeskError::InvalidStatus(s.to_string())),
        }
    }
}

/// An HTML page owned by the page store.
///
/// The page's `content` is mirrored verbatim to `{pages_dir}/{filename}`
/// on every create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlPage {
    #[serde(default)]
    pub id: u64,
    pub filename: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: PageStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// An article-like record pulled by the batch region updater.
///
/// These are never stored; they are rendered straight into an existing
/// static page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub published_at: String,
    pub source: String,
    pub tags: Vec<String>,
}

impl From<Article> for FeedItem {
    /// Stored-article shaped results carry no tags and may lack a URL.
    fn from(article: Article) -> Self {
        FeedItem {
            title: article.title,
            description: article.content,
            url: Some(article.url).filter(|u| !u.is_empty()),
            image_url: article.image_url,
            published_at: article.published_date,
            source: article.source,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "title": "Renewable Energy Surpasses Coal",
            "source": "Energy Today",
            "url": "https://example.com/renewable-energy",
            "published_date": "2025-05-19T14:45:00",
            "content": "In a historic milestone...",
            "topic": "Climate Action"
        }"#
    }

    #[test]
    fn test_article_defaults_on_deserialize() {
        let article: Article = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(article.id, 0);
        assert_eq!(article.status, ArticleStatus::New);
        assert_eq!(article.image_url, None);
        assert_eq!(article.local_image_path, None);
    }

    #[test]
    fn test_article_missing_url_fails() {
        let json = r#"{"title": "t", "source": "s", "published_date": "d", "content": "c", "topic": "x"}"#;
        let err = serde_json::from_str::<Article>(json).unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_article_optional_fields_serialize_as_null() {
        let article: Article = serde_json::from_str(sample_json()).unwrap();
        let json = serde_json::to_value(&article).unwrap();
        assert!(json.get("image_url").unwrap().is_null());
        assert!(json.get("local_image_path").unwrap().is_null());
        assert_eq!(json["status"], "new");
    }

    #[test]
    fn test_parse_many_accepts_object_or_array() {
        let one = Article::parse_many(sample_json()).unwrap();
        assert_eq!(one.len(), 1);

        let many = Article::parse_many(&format!("[{},{}]", sample_json(), sample_json())).unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("USED".parse::<ArticleStatus>().unwrap(), ArticleStatus::Used);
        assert_eq!(" archived ".parse::<ArticleStatus>().unwrap(), ArticleStatus::Archived);
        assert!(matches!(
            "deleted".parse::<ArticleStatus>(),
            Err(NewsdeskError::InvalidStatus(_))
        ));
        assert_eq!("published".parse::<PageStatus>().unwrap(), PageStatus::Published);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
    }

    #[test]
    fn test_feed_item_from_article_drops_empty_url() {
        let mut article: Article = serde_json::from_str(sample_json()).unwrap();
        article.url.clear();
        let item = FeedItem::from(article);
        assert_eq!(item.url, None);
        assert_eq!(item.description, "In a historic milestone...");
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_topic_search_query() {
        let topic = Topic::new("AI News", "", &["artificial intelligence", "AI ethics"]);
        assert_eq!(topic.search_query(), "artificial intelligence OR AI ethics");
        assert_eq!(topic.priority, Priority::Medium);
    }
}
