//! YAML configuration: directories, outbound endpoints, and API keys.
//!
//! Every field has a default, so a missing file or a partial file both
//! work. API keys can also come from the environment through the CLI
//! (see [`crate::cli::Cli`]), which takes precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{NewsdeskError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub images_dir: PathBuf,
    /// URL prefix returned for downloaded images, e.g. `/static/images/news`.
    pub image_url_prefix: String,
    pub export_dir: PathBuf,

    pub request_timeout_secs: u64,
    pub max_retries: usize,

    pub brave_endpoint: String,
    pub newsapi_endpoint: String,
    pub thenewsapi_endpoint: String,

    pub brave_api_key: Option<String>,
    pub newsapi_key: Option<String>,
    pub thenewsapi_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            pages_dir: PathBuf::from("pages"),
            templates_dir: PathBuf::from("templates/html"),
            static_dir: PathBuf::from("static"),
            images_dir: PathBuf::from("static/images/news"),
            image_url_prefix: "/static/images/news".to_string(),
            export_dir: PathBuf::from("output"),
            request_timeout_secs: 10,
            max_retries: 2,
            brave_endpoint: "https://api.search.brave.com/res/v1/news/search".to_string(),
            newsapi_endpoint: "https://newsapi.org/v2/everything".to_string(),
            thenewsapi_endpoint: "https://api.thenewsapi.com/v1/news/top".to_string(),
            brave_api_key: None,
            newsapi_key: None,
            thenewsapi_token: None,
        }
    }
}

impl Config {
    /// Load the config file at `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| NewsdeskError::io(path, e))?;
        let config: Config = serde_yaml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn articles_db(&self) -> PathBuf {
        self.data_dir.join("news_database.json")
    }

    pub fn pages_db(&self) -> PathBuf {
        self.data_dir.join("pages_database.json")
    }

    pub fn topics_db(&self) -> PathBuf {
        self.data_dir.join("topics.json")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Override API keys with values supplied on the command line or env.
    pub fn with_keys(
        mut self,
        brave: Option<String>,
        newsapi: Option<String>,
        thenewsapi: Option<String>,
    ) -> Self {
        if brave.is_some() {
            self.brave_api_key = brave;
        }
        if newsapi.is_some() {
            self.newsapi_key = newsapi;
        }
        if thenewsapi.is_some() {
            self.thenewsapi_token = thenewsapi;
        }
        self
    }
}

/// Treat empty or whitespace-only keys as absent.
pub fn present(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}
