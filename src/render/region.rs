//! Batch region updater: rewrite the inner content of two named `<div>`s
//! in an existing static HTML file.
//!
//! A region is selected by `#id` or `.class`. The opening tag is found with
//! a regex; the matching `</div>` is found by counting nested `<div>`s (skipping
//! comments, scripts and styles), so a region that already holds generated
//! cards is replaced whole. Everything outside the two regions is left
//! byte-for-byte untouched.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info, instrument, warn};

use super::ImagePolicy;
use super::cards::{NO_FEATURED, featured_html, grid_html};
use crate::error::{NewsdeskError, Result};
use crate::models::FeedItem;
use crate::sources::{FeedRequest, NewsFetcher};

pub const DEFAULT_MAX_ARTICLES: usize = 10;

// Comments, scripts and styles are matched whole so div text inside them is
// never counted.
static DIV_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<div\b[^>]*>|</div\s*>",
    )
    .expect("div regex is valid")
});

static CLASS_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div(?:\s[^>]*?)?\sclass\s*=\s*["']([^"']*)["'][^>]*>"#)
        .expect("class regex is valid")
});

/// A `#id` or `.class` region selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelector {
    Id(String),
    Class(String),
}

impl FromStr for RegionSelector {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let valid = |name: &str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        match s.split_at_checked(1) {
            Some(("#", name)) if valid(name) => Ok(RegionSelector::Id(name.to_string())),
            Some((".", name)) if valid(name) => Ok(RegionSelector::Class(name.to_string())),
            _ => Err(NewsdeskError::InvalidSelector(s.to_string())),
        }
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelector::Id(id) => write!(f, "#{id}"),
            RegionSelector::Class(class) => write!(f, ".{class}"),
        }
    }
}

impl RegionSelector {
    /// Byte offset just past the first matching opening `<div ...>` tag.
    fn find_open(&self, html: &str) -> Option<usize> {
        match self {
            RegionSelector::Id(id) => {
                let pattern = format!(
                    r#"(?i)<div(?:\s[^>]*?)?\sid\s*=\s*["']{}["'][^>]*>"#,
                    regex::escape(id)
                );
                let re = Regex::new(&pattern).ok()?;
                re.find(html).map(|m| m.end())
            }
            RegionSelector::Class(class) => CLASS_DIV
                .captures_iter(html)
                .find(|caps| caps[1].split_whitespace().any(|c| c == class))
                .and_then(|caps| caps.get(0))
                .map(|m| m.end()),
        }
    }

    /// Byte range of the region's inner content.
    fn find_inner(&self, html: &str) -> Option<(usize, usize)> {
        let start = self.find_open(html)?;
        let mut depth = 1usize;
        for tag in DIV_TAG.find_iter(&html[start..]) {
            let text = tag.as_str();
            let head = |prefix: &str| {
                text.as_bytes()
                    .get(..prefix.len())
                    .is_some_and(|h| h.eq_ignore_ascii_case(prefix.as_bytes()))
            };
            if head("</div") {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + tag.start()));
                }
            } else if head("<div") && !text.ends_with("/>") {
                depth += 1;
            }
        }
        None
    }
}

/// Replace the inner content of the region `selector` selects.
/// `None` if there is no such region (or it is never closed).
pub fn replace_region(html: &str, selector: &RegionSelector, content: &str) -> Option<String> {
    let (start, end) = selector.find_inner(html)?;
    let mut out = String::with_capacity(html.len() - (end - start) + content.len() + 2);
    out.push_str(&html[..start]);
    out.push('\n');
    out.push_str(content.trim());
    out.push('\n');
    out.push_str(&html[end..]);
    Some(out)
}

/// Deduplicate by URL (first wins), drop items without both a URL and an
/// image, and keep at most `max` items.
pub fn select_items(items: Vec<FeedItem>, max: usize) -> Vec<FeedItem> {
    let policy = ImagePolicy::RequireUrlAndImage;
    items
        .into_iter()
        .unique_by(|item| item.url.clone())
        .filter(|item| {
            let keep = policy.admits(item.url.as_deref(), item.image_url.as_deref());
            if !keep {
                warn!(title = %item.title, "Skipping item without URL or image");
            }
            keep
        })
        .take(max)
        .collect()
}

/// Result of applying items to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub html: String,
    pub missing: Vec<RegionSelector>,
}

/// Write `items` into the two regions: the first item into `featured`, the
/// rest as cards into `grid`.
pub fn apply(html: &str, featured: &RegionSelector, grid: &RegionSelector, items: &[FeedItem]) -> Applied {
    let (featured_markup, grid_markup) = match items.split_first() {
        Some((first, rest)) => (featured_html(first), grid_html(rest)),
        None => (NO_FEATURED.to_string(), grid_html(&[])),
    };

    let mut doc = html.to_string();
    let mut missing = Vec::new();
    for (selector, markup) in [(featured, &featured_markup), (grid, &grid_markup)] {
        match replace_region(&doc, selector, markup) {
            Some(updated) => doc = updated,
            None => missing.push(selector.clone()),
        }
    }
    Applied { html: doc, missing }
}

/// One batch update of a static file.
#[derive(Debug, Clone)]
pub struct RegionUpdate {
    pub file: PathBuf,
    pub featured: RegionSelector,
    pub grid: RegionSelector,
    pub request: FeedRequest,
    pub max_articles: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOutcome {
    pub file: PathBuf,
    pub html: String,
    pub items: usize,
    pub missing: Vec<RegionSelector>,
    pub written: bool,
}

impl RegionOutcome {
    /// `Err` naming the first region that was not found.
    pub fn check(&self) -> Result<()> {
        match self.missing.first() {
            Some(selector) => Err(NewsdeskError::RegionNotFound {
                selector: selector.to_string(),
                file: self.file.display().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegionUpdater<'a> {
    pub fetcher: &'a NewsFetcher,
}

impl RegionUpdater<'_> {
    /// Fetch, select, and rewrite the file. The file is written when at
    /// least one region matched and this is not a dry run; missing regions
    /// are logged and reported in the outcome.
    #[instrument(level = "info", skip_all, fields(file = %update.file.display(), featured = %update.featured, grid = %update.grid))]
    pub async fn run(&self, update: &RegionUpdate) -> Result<RegionOutcome> {
        let original = tokio::fs::read_to_string(&update.file)
            .await
            .map_err(|e| NewsdeskError::io(&update.file, e))?;

        let items = select_items(
            self.fetcher.fetch_feed(&update.request).await,
            update.max_articles,
        );
        info!(count = items.len(), "Selected feed items");

        let applied = apply(&original, &update.featured, &update.grid, &items);
        for selector in &applied.missing {
            error!(selector = %selector, file = %update.file.display(), "Region not found; left unmodified");
        }

        let matched = applied.missing.len() < 2;
        let written = matched && !update.dry_run;
        if written {
            tokio::fs::write(&update.file, &applied.html)
                .await
                .map_err(|e| NewsdeskError::io(&update.file, e))?;
            info!("Updated file");
        }

        Ok(RegionOutcome {
            file: update.file.clone(),
            html: applied.html,
            items: items.len(),
            missing: applied.missing,
            written,
        })
    }
}
