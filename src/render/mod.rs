//! Turning articles into HTML.
//!
//! Two renderers share this module:
//!
//! | Renderer | Module | Input | Output |
//! |----------|--------|-------|--------|
//! | Interactive page | [`page`] | stored articles + a named template | a page in the page store |
//! | Batch region | [`region`] | feed items + an existing static file | the same file, two `<div>`s replaced |
//!
//! [`cards`] holds the markup for the batch renderer and [`templates`] the
//! template directory used by the interactive one.
//!
//! The two renderers treat image-less articles differently; see
//! [`ImagePolicy`].

pub mod cards;
pub mod page;
pub mod region;
pub mod templates;

pub use page::{NewsPageRenderer, RenderRequest};
pub use region::{RegionUpdate, RegionUpdater};
pub use templates::TemplateDir;

/// Image shown by the interactive renderer when an article has none.
pub const DEFAULT_IMAGE: &str = "/static/images/news/default.jpg";

/// Image used by batch cards when an item has none.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300/00a8ff/ffffff?text=News";

/// How a renderer treats an article that lacks a link or an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    /// Keep every article; the image falls back to a local copy, then the
    /// remote URL, then [`DEFAULT_IMAGE`].
    FallbackToDefault,
    /// Drop the article unless it has both a URL and an image; markup that
    /// still lacks one shows [`PLACEHOLDER_IMAGE`].
    RequireUrlAndImage,
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

impl ImagePolicy {
    /// The `src` to render for an item with the given local and remote images.
    pub fn image_src<'a>(self, local: Option<&'a str>, remote: Option<&'a str>) -> &'a str {
        match self {
            ImagePolicy::FallbackToDefault => non_empty(local)
                .or_else(|| non_empty(remote))
                .unwrap_or(DEFAULT_IMAGE),
            ImagePolicy::RequireUrlAndImage => non_empty(remote).unwrap_or(PLACEHOLDER_IMAGE),
        }
    }

    pub fn admits(self, url: Option<&str>, image: Option<&str>) -> bool {
        match self {
            ImagePolicy::FallbackToDefault => true,
            ImagePolicy::RequireUrlAndImage => non_empty(url).is_some() && non_empty(image).is_some(),
        }
    }
}
