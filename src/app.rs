//! Wiring: one struct holding every store and service, plus the workflows
//! that span more than one of them (fetch pipeline, quick actions, stats,
//! page import).

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::api::build_client;
use crate::config::Config;
use crate::error::{NewsdeskError, Result};
use crate::images::ImageDownloader;
use crate::models::{HtmlPage, PageStatus};
use crate::render::{NewsPageRenderer, RenderRequest, TemplateDir};
use crate::sources::NewsFetcher;
use crate::store::{ArticleStore, PageFilter, PageStore, TopicRegistry, extract_title};
use crate::utils::ensure_writable_dir;

const QUICK_HEADER_IMAGE: &str = "/static/images/usa_flag.png";

/// The standard pages rebuilt by `quick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardPage {
    Recent,
    International,
    Ai,
}

impl StandardPage {
    pub const ALL: [StandardPage; 3] = [
        StandardPage::Recent,
        StandardPage::International,
        StandardPage::Ai,
    ];

    pub fn request(self) -> RenderRequest {
        let (topic, filename, header, subheader) = match self {
            StandardPage::Recent => (
                None,
                "recent_news.html",
                "Recent News",
                "The latest updates on progressive policies and initiatives",
            ),
            StandardPage::International => (
                Some("International News"),
                "international_news.html",
                "International News",
                "Global perspectives on progressive policies and initiatives",
            ),
            StandardPage::Ai => (
                Some("AI News"),
                "ai_news.html",
                "AI News",
                "The latest developments in artificial intelligence and its impacts",
            ),
        };
        RenderRequest {
            topic: topic.map(str::to_string),
            filename: filename.to_string(),
            header_text: header.to_string(),
            subheader_text: subheader.to_string(),
            header_image: QUICK_HEADER_IMAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub articles: usize,
    pub topics: usize,
    pub pages: usize,
    pub published_pages: usize,
    pub topic_distribution: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub articles: ArticleStore,
    pub pages: PageStore,
    pub topics: TopicRegistry,
    pub templates: TemplateDir,
    pub fetcher: NewsFetcher,
    pub images: ImageDownloader,
}

impl App {
    /// Open every store under the configured directories and make sure the
    /// default templates exist.
    #[instrument(level = "info", skip_all, fields(data_dir = %config.data_dir.display()))]
    pub async fn open(config: Config) -> Result<Self> {
        ensure_writable_dir(&config.data_dir).await?;
        let client = build_client(&config)?;

        let templates = TemplateDir::new(&config.templates_dir);
        templates.ensure_defaults().await?;

        let app = Self {
            articles: ArticleStore::open(config.articles_db()).await,
            pages: PageStore::open(&config.pages_dir, config.pages_db()).await,
            topics: TopicRegistry::open(config.topics_db()).await?,
            templates,
            fetcher: NewsFetcher::new(&config, client.clone()),
            images: ImageDownloader::new(&config, client),
            config,
        };
        Ok(app)
    }

    pub fn renderer(&self) -> NewsPageRenderer<'_> {
        NewsPageRenderer {
            templates: &self.templates,
            pages: &self.pages,
            articles: &self.articles,
        }
    }

    /// Fetch articles for one topic (or all), download images for the ones
    /// not already stored, and store them. Returns how many new articles were added.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, topic_id: Option<u64>, limit: usize) -> Result<usize> {
        let mut articles = match topic_id {
            Some(id) => {
                let topic = self
                    .topics
                    .get(id)
                    .await
                    .ok_or_else(|| NewsdeskError::not_found("topic", id))?;
                self.fetcher.fetch_for_topic(&topic, limit).await
            }
            None => {
                let topics = self.topics.list().await;
                self.fetcher.fetch_all(&topics, limit).await
            }
        };

        // Only articles the store will accept get an image; duplicates would
        // leave files nothing points at.
        let mut known: HashSet<String> =
            self.articles.list().await.into_iter().map(|a| a.url).collect();
        for article in &mut articles {
            if known.insert(article.url.clone()) && article.local_image_path.is_none() {
                article.local_image_path = self.images.download(article).await;
            }
        }

        let fetched = articles.len();
        let added = self.articles.add_many(articles).await?;
        info!(fetched, added, "Fetch complete");
        Ok(added)
    }

    /// Rebuild a standard page and return its file path.
    pub async fn quick(&self, page: StandardPage) -> Result<PathBuf> {
        self.renderer().render_news_page(&page.request()).await
    }

    pub async fn quick_all(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(StandardPage::ALL.len());
        for page in StandardPage::ALL {
            paths.push(self.quick(page).await?);
        }
        Ok(paths)
    }

    pub async fn stats(&self) -> Stats {
        let pages = self.pages.list(&PageFilter::default()).await;
        Stats {
            articles: self.articles.len().await,
            topics: self.topics.list().await.len(),
            published_pages: pages
                .iter()
                .filter(|p| p.status == PageStatus::Published)
                .count(),
            pages: pages.len(),
            topic_distribution: self.articles.topic_distribution().await,
        }
    }

    /// Create a draft page from an HTML file on disk. The filename defaults
    /// to the file's own name and the title to the document's `<title>`.
    pub async fn import_page(
        &self,
        path: &Path,
        filename: Option<String>,
        title: Option<String>,
    ) -> Result<HtmlPage> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NewsdeskError::io(path, e))?;
        let filename = match filename {
            Some(name) => name,
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| NewsdeskError::InvalidName(path.display().to_string()))?,
        };
        let title = title
            .or_else(|| extract_title(&content))
            .unwrap_or_else(|| {
                warn!(file = %filename, "No <title> in document; using filename");
                filename.clone()
            });
        self.pages.create(&filename, &title, &content).await
    }
}
