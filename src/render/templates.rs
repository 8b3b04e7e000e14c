//! The templates directory: named HTML files read and written straight
//! through to disk.

use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{NewsdeskError, Result};
use crate::utils::validate_file_name;

pub const NEWS_TEMPLATE: &str = "news_template.html";
pub const ARTICLE_SNIPPET: &str = "article_snippet.html";

const DEFAULTS: [(&str, &str); 2] = [
    (NEWS_TEMPLATE, include_str!("assets/news_template.html")),
    (ARTICLE_SNIPPET, include_str!("assets/article_snippet.html")),
];

/// Template names are plain file names ending in `.html`.
fn validate_template_name(name: &str) -> Result<()> {
    validate_file_name(name)?;
    if !name.ends_with(".html") {
        return Err(NewsdeskError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TemplateDir {
    dir: PathBuf,
}

impl TemplateDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_template_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Write the built-in templates if the directory holds no `.html` files.
    /// Returns how many files were written.
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    pub async fn ensure_defaults(&self) -> Result<usize> {
        if !self.list().await?.is_empty() {
            return Ok(0);
        }
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| NewsdeskError::io(&self.dir, e))?;
        for (name, content) in DEFAULTS {
            let path = self.dir.join(name);
            fs::write(&path, content)
                .await
                .map_err(|e| NewsdeskError::io(path, e))?;
        }
        info!(count = DEFAULTS.len(), "Wrote default templates");
        Ok(DEFAULTS.len())
    }

    /// Names of the `.html` files in the directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(NewsdeskError::io(&self.dir, e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| NewsdeskError::io(&self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".html") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let path = self.path(name)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NewsdeskError::io(path, e)),
        }
    }

    /// Like [`TemplateDir::get`], but a missing template is an error.
    pub async fn load(&self, name: &str) -> Result<String> {
        self.get(name)
            .await?
            .ok_or_else(|| NewsdeskError::TemplateNotFound(name.to_string()))
    }

    /// Write `content` under `name`, replacing any existing template.
    pub async fn create(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| NewsdeskError::io(&self.dir, e))?;
        fs::write(&path, content)
            .await
            .map_err(|e| NewsdeskError::io(path, e))?;
        info!(template = name, "Saved template");
        Ok(())
    }

    /// Overwrite an existing template. `false` if there is none.
    pub async fn update(&self, name: &str, content: &str) -> Result<bool> {
        let path = self.path(name)?;
        if !fs::try_exists(&path)
            .await
            .map_err(|e| NewsdeskError::io(&path, e))?
        {
            return Ok(false);
        }
        fs::write(&path, content)
            .await
            .map_err(|e| NewsdeskError::io(path, e))?;
        Ok(true)
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(NewsdeskError::io(path, e)),
        }
    }
}
