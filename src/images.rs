//! Article image downloads and the local images directory.
//!
//! Downloaded files are named `{topic_slug}_{unix_seconds}{ext}` and the
//! returned path is rooted at the configured URL prefix, ready to drop into
//! an `<img src>`. Download failures are logged and yield `None`; they never
//! fail the operation that asked for the image.

use chrono::Utc;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{NewsdeskError, Result};
use crate::models::Article;
use crate::store::ArticleStore;
use crate::utils::{slugify, validate_file_name};

const DEFAULT_EXTENSION: &str = ".jpg";

/// A file in the images directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub size: u64,
    /// Path under the URL prefix, as used in rendered pages.
    pub url_path: String,
}

#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    dir: PathBuf,
    url_prefix: String,
}

impl ImageDownloader {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            dir: config.images_dir.clone(),
            url_prefix: config.image_url_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn url_path(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, name)
    }

    /// Fetch the article's remote image into the images directory.
    ///
    /// Returns the prefixed path of the saved file, or `None` when the
    /// article has no usable image URL or the download failed.
    #[instrument(level = "info", skip_all, fields(article_id = article.id, topic = %article.topic))]
    pub async fn download(&self, article: &Article) -> Option<String> {
        let raw = article.image_url.as_deref()?;
        let url = match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                debug!(image_url = raw, "Image URL is not an absolute http(s) URL; skipping");
                return None;
            }
        };
        match self.fetch_to_file(&url, &article.topic).await {
            Ok(name) => {
                info!(file = %name, "Downloaded image");
                Some(self.url_path(&name))
            }
            Err(e) => {
                error!(image_url = %url, error = %e, "Error downloading image");
                None
            }
        }
    }

    async fn fetch_to_file(&self, url: &Url, topic: &str) -> Result<String> {
        let mut response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(NewsdeskError::HttpStatus {
                source_name: "image",
                status,
            });
        }

        let (mut file, name) = self.create_unique(topic, &extension_of(url)).await?;
        let path = self.dir.join(&name);
        let written: Result<()> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| NewsdeskError::io(&path, e))?;
            }
            file.flush().await.map_err(|e| NewsdeskError::io(&path, e))
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(rm) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %rm, "Failed to remove partial image");
            }
            return Err(e);
        }
        Ok(name)
    }

    /// Claim a new file named `{slug}_{unix}{ext}`, adding `_{n}` when the
    /// name is already taken.
    async fn create_unique(&self, topic: &str, ext: &str) -> Result<(File, String)> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| NewsdeskError::io(&self.dir, e))?;
        let stem = format!("{}_{}", slugify(topic), Utc::now().timestamp());
        claim_file(&self.dir, &stem, ext).await
    }

    /// Download images for stored articles that have a remote image but no
    /// local copy. Returns how many were saved.
    #[instrument(level = "info", skip_all)]
    pub async fn backfill(&self, store: &ArticleStore) -> Result<usize> {
        let pending: Vec<Article> = store
            .list()
            .await
            .into_iter()
            .filter(|a| a.image_url.is_some() && a.local_image_path.is_none())
            .collect();
        info!(pending = pending.len(), "Backfilling article images");

        let mut saved = 0;
        for article in &pending {
            if let Some(path) = self.download(article).await
                && store.set_local_image(article.id, path).await?
            {
                saved += 1;
            }
        }
        info!(saved, "Image backfill finished");
        Ok(saved)
    }

    /// Files in the images directory, sorted by name. A missing directory
    /// lists as empty.
    pub async fn list(&self) -> Result<Vec<ImageFile>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(NewsdeskError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| NewsdeskError::io(&self.dir, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| NewsdeskError::io(entry.path(), e))?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(ImageFile {
                url_path: self.url_path(&name),
                name,
                size: meta.len(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Delete `name` from the images directory. `false` if it was not there.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        validate_file_name(name)?;
        let path = self.dir.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(file = name, "Deleted image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(NewsdeskError::io(path, e)),
        }
    }

    /// Copy a local file into the images directory under the download
    /// naming scheme. Returns the prefixed path.
    pub async fn import(&self, source: &Path, topic: &str) -> Result<String> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .and_then(clean_extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let bytes = fs::read(source)
            .await
            .map_err(|e| NewsdeskError::io(source, e))?;
        let (mut file, name) = self.create_unique(topic, &ext).await?;
        let path = self.dir.join(&name);
        file.write_all(&bytes)
            .await
            .map_err(|e| NewsdeskError::io(&path, e))?;
        file.flush().await.map_err(|e| NewsdeskError::io(&path, e))?;
        info!(from = %source.display(), file = %name, "Imported image");
        Ok(self.url_path(&name))
    }
}

/// Extension of the URL's path (query and fragment ignored), with the dot.
fn extension_of(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .and_then(clean_extension)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn clean_extension(ext: &str) -> Option<String> {
    let ok = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| format!(".{}", ext.to_ascii_lowercase()))
}

async fn claim_file(dir: &Path, stem: &str, ext: &str) -> Result<(File, String)> {
    let mut n = 0u32;
    loop {
        let name = if n == 0 {
            format!("{stem}{ext}")
        } else {
            format!("{stem}_{n}{ext}")
        };
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((file, name)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(NewsdeskError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(dir: &Path) -> ImageDownloader {
        let mut config = Config::default();
        config.images_dir = dir.to_path_buf();
        ImageDownloader::new(&config, Client::new())
    }

    fn article(image_url: Option<String>) -> Article {
        Article {
            id: 1,
            title: "t".into(),
            source: "s".into(),
            url: "https://n.example/a".into(),
            published_date: "2025-05-20T10:30:00".into(),
            content: "c".into(),
            topic: "Climate Action".into(),
            image_url,
            local_image_path: None,
            status: ArticleStatus::New,
        }
    }

    #[test]
    fn test_extension_from_url_path() {
        let url = Url::parse("https://img.example/a/photo.PNG?w=400").unwrap();
        assert_eq!(extension_of(&url), ".png");
        let url = Url::parse("https://img.example/a/photo").unwrap();
        assert_eq!(extension_of(&url), ".jpg");
        let url = Url::parse("https://img.example/a/photo.jpg-large-format").unwrap();
        assert_eq!(extension_of(&url), ".jpg");
    }

    #[tokio::test]
    async fn test_download_saves_file_and_returns_prefixed_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/photo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let images = downloader(tmp.path());
        let got = images
            .download(&article(Some(format!("{}/img/photo.png?x=1", server.uri()))))
            .await
            .unwrap();

        assert!(got.starts_with("/static/images/news/climate_action_"));
        assert!(got.ends_with(".png"));
        let name = got.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(tmp.path().join(name)).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_non_200_yields_none_and_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let images = downloader(tmp.path());
        assert_eq!(images.download(&article(Some(server.uri()))).await, None);
        assert!(images.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_relative_url_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let images = downloader(tmp.path());
        assert_eq!(images.download(&article(None)).await, None);
        assert_eq!(
            images
                .download(&article(Some("/static/images/news/x.jpg".into())))
                .await,
            None
        );
    }

    #[tokio::test]
    async fn test_claim_file_appends_suffix_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("ai_news_100.jpg"), b"x").unwrap();
        std::fs::write(tmp.path().join("ai_news_100_1.jpg"), b"x").unwrap();
        let (_file, name) = claim_file(tmp.path(), "ai_news_100", ".jpg").await.unwrap();
        assert_eq!(name, "ai_news_100_2.jpg");
    }

    #[tokio::test]
    async fn test_import_list_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("upload.webp");
        std::fs::write(&src, b"abc").unwrap();
        let images = downloader(&tmp.path().join("images"));

        let path = images.import(&src, "AI News").await.unwrap();
        assert!(path.starts_with("/static/images/news/ai_news_"));
        assert!(path.ends_with(".webp"));

        let listed = images.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, 3);
        assert_eq!(listed[0].url_path, path);

        assert!(matches!(
            images.remove("../upload.webp").await,
            Err(NewsdeskError::InvalidName(_))
        ));
        assert!(images.remove(&listed[0].name).await.unwrap());
        assert!(!images.remove(&listed[0].name).await.unwrap());
    }

    #[tokio::test]
    async fn test_backfill_sets_local_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::open(tmp.path().join("db.json")).await;
        let mut with_image = article(Some(format!("{}/a.gif", server.uri())));
        with_image.url = "https://n.example/with".into();
        let mut without = article(None);
        without.url = "https://n.example/without".into();
        store.add(with_image).await.unwrap();
        store.add(without).await.unwrap();

        let images = downloader(&tmp.path().join("images"));
        assert_eq!(images.backfill(&store).await.unwrap(), 1);

        let stored = store.get(1).await.unwrap();
        assert!(stored.local_image_path.unwrap().ends_with(".gif"));
        assert_eq!(store.get(2).await.unwrap().local_image_path, None);
        assert_eq!(images.backfill(&store).await.unwrap(), 0);
    }
}
