//! Markup for the batch region updater: one featured block and a card per
//! remaining item.

use super::ImagePolicy;
use crate::models::FeedItem;
use crate::utils::{escape_html, format_date};

pub const NO_FEATURED: &str = "<!-- No featured article available -->";
pub const NO_ARTICLES: &str = "<!-- No news articles available -->";

/// Escaped display fields shared by both layouts.
struct Fields {
    title: String,
    description: String,
    url: String,
    image: String,
    date: String,
    source: String,
    tags: String,
}

impl Fields {
    fn of(item: &FeedItem) -> Self {
        let tags = item
            .tags
            .iter()
            .map(|t| format!(r#"<span class="news-tag-item">{}</span>"#, escape_html(t)))
            .collect::<Vec<_>>()
            .join("");
        Self {
            title: escape_html(&item.title),
            description: escape_html(&item.description),
            url: escape_html(item.url.as_deref().unwrap_or("#")),
            image: escape_html(
                ImagePolicy::RequireUrlAndImage.image_src(None, item.image_url.as_deref()),
            ),
            date: format_date(&item.published_at),
            source: escape_html(&item.source),
            tags,
        }
    }
}

pub fn featured_html(item: &FeedItem) -> String {
    let f = Fields::of(item);
    format!(
        r#"<div class="featured-news-card">
    <div class="featured-news-image">
        <div class="news-tag">Featured</div>
        <img src="{image}" alt="{title}">
    </div>
    <div class="featured-news-content">
        <div class="news-date">{date} &middot; <span class="news-source">{source}</span></div>
        <h2>{title}</h2>
        <p class="news-excerpt">{description}</p>
        <div class="news-tags">{tags}</div>
        <a href="{url}" class="btn btn-primary news-more" target="_blank" rel="noopener noreferrer">Read Full Story</a>
    </div>
</div>"#,
        image = f.image,
        title = f.title,
        date = f.date,
        source = f.source,
        description = f.description,
        tags = f.tags,
        url = f.url,
    )
}

pub fn card_html(item: &FeedItem) -> String {
    let f = Fields::of(item);
    format!(
        r#"<div class="news-card">
    <div class="news-image">
        <img src="{image}" alt="{title}">
    </div>
    <div class="news-info">
        <div class="news-date">{date} &middot; <span class="news-source">{source}</span></div>
        <h3>{title}</h3>
        <p>{description}</p>
        <div class="news-tags">{tags}</div>
        <a href="{url}" class="news-more" target="_blank" rel="noopener noreferrer">Read Full Article</a>
    </div>
</div>"#,
        image = f.image,
        title = f.title,
        date = f.date,
        source = f.source,
        description = f.description,
        tags = f.tags,
        url = f.url,
    )
}

/// Markup for the grid region: one card per item, or a marker comment.
pub fn grid_html(items: &[FeedItem]) -> String {
    if items.is_empty() {
        return NO_ARTICLES.to_string();
    }
    items.iter().map(card_html).collect::<Vec<_>>().join("\n")
}
