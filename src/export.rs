//! Export selected pages (and optionally static assets) into a deployable
//! directory, optionally packed into a gzip tarball.
//!
//! Layout under `{export_dir}`:
//!
//! ```text
//! export/
//!   recent_news.html
//!   static/css/...
//!   static/js/...
//!   static/images/news/...
//! export_20250520_103000.tar.gz
//! ```

use chrono::Local;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{NewsdeskError, Result};
use crate::store::PageStore;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub page_ids: Vec<u64>,
    pub include_css: bool,
    pub include_js: bool,
    pub include_images: bool,
    /// Pack the export directory into a `.tar.gz` next to it.
    pub archive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub dir: PathBuf,
    pub pages: usize,
    pub assets: usize,
    pub archive: Option<PathBuf>,
}

impl ExportOutcome {
    /// The path to hand to the operator: the archive if one was built.
    pub fn path(&self) -> &Path {
        self.archive.as_deref().unwrap_or(&self.dir)
    }
}

/// Copy every regular file directly inside `from` into `to`.
/// A missing source directory copies nothing.
async fn copy_files(from: &Path, to: &Path) -> Result<usize> {
    let mut entries = match fs::read_dir(from).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %from.display(), "Asset directory missing; skipping");
            return Ok(0);
        }
        Err(e) => return Err(NewsdeskError::io(from, e)),
    };
    fs::create_dir_all(to)
        .await
        .map_err(|e| NewsdeskError::io(to, e))?;

    let mut copied = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| NewsdeskError::io(from, e))?
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let target = to.join(entry.file_name());
        fs::copy(&path, &target)
            .await
            .map_err(|e| NewsdeskError::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}

fn write_archive(dir: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive).map_err(|e| NewsdeskError::io(archive, e))?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(enc);
    tar.append_dir_all(".", dir)
        .map_err(|e| NewsdeskError::io(dir, e))?;
    tar.into_inner()
        .and_then(|enc| enc.finish())
        .map_err(|e| NewsdeskError::io(archive, e))?;
    Ok(())
}

/// Write the selected pages and assets under `{export_dir}/export/`.
///
/// Unknown page ids are skipped; if none of them resolve the export fails.
#[instrument(level = "info", skip_all, fields(pages = options.page_ids.len(), archive = options.archive))]
pub async fn export(config: &Config, pages: &PageStore, options: &ExportOptions) -> Result<ExportOutcome> {
    let mut selected = Vec::new();
    for id in &options.page_ids {
        match pages.get(*id).await {
            Some(page) => selected.push(page),
            None => warn!(id, "Page not found; not exported"),
        }
    }
    if selected.is_empty() {
        return Err(NewsdeskError::not_found("page", "no valid pages to export"));
    }

    let dir = config.export_dir.join("export");
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| NewsdeskError::io(&dir, e))?;

    for page in &selected {
        let path = dir.join(&page.filename);
        fs::write(&path, &page.content)
            .await
            .map_err(|e| NewsdeskError::io(path, e))?;
    }

    let static_dir = &config.static_dir;
    let mut assets = 0;
    if options.include_css {
        assets += copy_files(&static_dir.join("css"), &dir.join("static/css")).await?;
    }
    if options.include_js {
        assets += copy_files(&static_dir.join("js"), &dir.join("static/js")).await?;
    }
    if options.include_images {
        assets += copy_files(&config.images_dir, &dir.join("static/images/news")).await?;
    }

    let archive = if options.archive {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = config.export_dir.join(format!("export_{stamp}.tar.gz"));
        let (src, dst) = (dir.clone(), path.clone());
        tokio::task::spawn_blocking(move || write_archive(&src, &dst))
            .await
            .map_err(|e| NewsdeskError::io(&path, std::io::Error::other(e)))??;
        Some(path)
    } else {
        None
    };

    info!(pages = selected.len(), assets, dir = %dir.display(), "Export complete");
    Ok(ExportOutcome {
        dir,
        pages: selected.len(),
        assets,
        archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    async fn fixture() -> (tempfile::TempDir, Config, PageStore) {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: tmp.path().join("data"),
            pages_dir: tmp.path().join("pages"),
            static_dir: tmp.path().join("static"),
            images_dir: tmp.path().join("static/images/news"),
            export_dir: tmp.path().join("output"),
            ..Config::default()
        };
        std::fs::create_dir_all(config.static_dir.join("css")).unwrap();
        std::fs::write(config.static_dir.join("css/site.css"), "body{}").unwrap();
        std::fs::create_dir_all(&config.images_dir).unwrap();
        std::fs::write(config.images_dir.join("a.jpg"), b"jpg").unwrap();

        let pages = PageStore::open(&config.pages_dir, config.pages_db()).await;
        pages.create("one.html", "One", "<p>1</p>").await.unwrap();
        pages.create("two.html", "Two", "<p>2</p>").await.unwrap();
        (tmp, config, pages)
    }

    #[tokio::test]
    async fn test_export_directory() {
        let (_tmp, config, pages) = fixture().await;
        let outcome = export(
            &config,
            &pages,
            &ExportOptions {
                page_ids: vec![1, 99],
                include_css: true,
                include_js: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.assets, 1);
        assert_eq!(outcome.archive, None);
        assert_eq!(outcome.path(), outcome.dir);
        assert_eq!(std::fs::read_to_string(outcome.dir.join("one.html")).unwrap(), "<p>1</p>");
        assert!(!outcome.dir.join("two.html").exists());
        assert!(outcome.dir.join("static/css/site.css").exists());
        assert!(!outcome.dir.join("static/images/news").exists());
    }

    #[tokio::test]
    async fn test_export_archive_contains_pages_and_images() {
        let (_tmp, config, pages) = fixture().await;
        let outcome = export(
            &config,
            &pages,
            &ExportOptions {
                page_ids: vec![1, 2],
                include_images: true,
                archive: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let archive = outcome.archive.clone().unwrap();
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("export_") && name.ends_with(".tar.gz"));

        let mut tar = tar::Archive::new(GzDecoder::new(File::open(&archive).unwrap()));
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        for expected in ["one.html", "two.html", "static/images/news/a.jpg"] {
            assert!(names.iter().any(|n| n.ends_with(expected)), "{expected} in {names:?}");
        }
    }

    #[tokio::test]
    async fn test_export_without_valid_pages_fails() {
        let (_tmp, config, pages) = fixture().await;
        let err = export(
            &config,
            &pages,
            &ExportOptions {
                page_ids: vec![42],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NewsdeskError::NotFound { kind: "page", .. }));
        assert!(!config.export_dir.join("export").exists());
    }
}
