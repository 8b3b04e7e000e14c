//! Interactive news page renderer.
//!
//! Templates use a fixed vocabulary:
//!
//! ```text
//! {{ page_title }} {{ page_description }} {{ header_text }}
//! {{ subheader_text }} {{ header_image }}
//!
//! {% if featured_article %}
//!   {{ featured_article.title|date|excerpt|image|url|topic|source }}
//!   {% for tag in featured_article.tags %} {{ tag }} {% endfor %}
//! {% endif %}
//!
//! {% for article in articles %}
//!   {{ article.title|date|excerpt|image|url|topic|source }}
//! {% endfor %}
//! ```
//!
//! The template is parsed once into nodes; loop bodies are rendered once
//! per item, so inserted values are never rescanned for tokens. The first
//! article is featured and the rest fill the articles loop. Every value is
//! HTML-escaped. An unknown or unbalanced token is an
//! [`NewsdeskError::UnresolvedPlaceholder`] error.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::mem;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use super::templates::{NEWS_TEMPLATE, TemplateDir};
use super::ImagePolicy;
use crate::error::{NewsdeskError, Result};
use crate::models::Article;
use crate::store::{ArticleStore, PageStore};
use crate::utils::{escape_html, excerpt, format_date};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}|\{%\s*([^{}]*?)\s*%\}").expect("token regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Featured,
    Tags,
    Articles,
}

impl Block {
    fn open_marker(self) -> &'static str {
        match self {
            Block::Featured => "{% if featured_article %}",
            Block::Tags => "{% for tag in featured_article.tags %}",
            Block::Articles => "{% for article in articles %}",
        }
    }

    fn close_statement(self) -> &'static str {
        match self {
            Block::Featured => "endif",
            Block::Tags | Block::Articles => "endfor",
        }
    }
}

#[derive(Debug)]
enum Node<'t> {
    Text(&'t str),
    /// Variable name and the raw token it came from.
    Var(&'t str, &'t str),
    Block(Block, Vec<Node<'t>>),
}

fn unresolved(token: &str) -> NewsdeskError {
    NewsdeskError::UnresolvedPlaceholder(token.to_string())
}

fn push_text<'t>(nodes: &mut Vec<Node<'t>>, text: &'t str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    // Braces that did not form a complete token.
    for marker in ["{{", "{%"] {
        if let Some(at) = text.find(marker) {
            let snippet: String = text[at..].chars().take(40).collect();
            return Err(unresolved(&snippet));
        }
    }
    nodes.push(Node::Text(text));
    Ok(())
}

fn parse(template: &str) -> Result<Vec<Node<'_>>> {
    let mut stack: Vec<(Block, Vec<Node<'_>>)> = Vec::new();
    let mut current = Vec::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut current, &template[last..whole.start()])?;
        last = whole.end();

        if let Some(var) = caps.get(1) {
            current.push(Node::Var(var.as_str(), whole.as_str()));
            continue;
        }

        let statement = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .split_whitespace()
            .join(" ");
        let opened = match statement.as_str() {
            "if featured_article" => Some(Block::Featured),
            "for tag in featured_article.tags" => Some(Block::Tags),
            "for article in articles" => Some(Block::Articles),
            "endif" | "endfor" => None,
            _ => return Err(unresolved(whole.as_str())),
        };
        match opened {
            Some(block) => stack.push((block, mem::take(&mut current))),
            None => match stack.pop() {
                Some((block, parent)) if block.close_statement() == statement => {
                    let body = mem::replace(&mut current, parent);
                    current.push(Node::Block(block, body));
                }
                _ => return Err(unresolved(whole.as_str())),
            },
        }
    }

    if let Some((block, _)) = stack.pop() {
        return Err(unresolved(block.open_marker()));
    }
    push_text(&mut current, &template[last..])?;
    Ok(current)
}

/// Page-level values, inserted escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub page_title: String,
    pub page_description: String,
    pub header_text: String,
    pub subheader_text: String,
    pub header_image: String,
}

/// Image for an article: local copy, then remote URL, then the default.
pub fn image_for(article: &Article) -> &str {
    ImagePolicy::FallbackToDefault.image_src(
        article.local_image_path.as_deref(),
        article.image_url.as_deref(),
    )
}

/// An article's display fields, already escaped.
#[derive(Debug)]
struct Card {
    title: String,
    date: String,
    excerpt: String,
    image: String,
    url: String,
    topic: String,
    source: String,
}

impl Card {
    fn from_article(article: &Article) -> Self {
        Self {
            title: escape_html(&article.title),
            date: escape_html(&format_date(&article.published_date)),
            excerpt: escape_html(&excerpt(&article.content)),
            image: escape_html(image_for(article)),
            url: escape_html(&article.url),
            topic: escape_html(&article.topic),
            source: escape_html(&article.source),
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "title" => &self.title,
            "date" => &self.date,
            "excerpt" => &self.excerpt,
            "image" => &self.image,
            "url" => &self.url,
            "topic" => &self.topic,
            "source" => &self.source,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Clone, Copy)]
struct Scope<'a> {
    page: &'a PageContext,
    featured: Option<&'a Card>,
    tags: &'a [String],
    rest: &'a [Card],
    tag: Option<&'a str>,
    article: Option<&'a Card>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        let page: Option<&String> = match name {
            "page_title" => Some(&self.page.page_title),
            "page_description" => Some(&self.page.page_description),
            "header_text" => Some(&self.page.header_text),
            "subheader_text" => Some(&self.page.subheader_text),
            "header_image" => Some(&self.page.header_image),
            _ => None,
        };
        if let Some(value) = page {
            return Some(escape_html(value));
        }
        if name == "tag" {
            return self.tag.map(str::to_string);
        }
        if let Some(field) = name.strip_prefix("featured_article.") {
            return self.featured?.field(field).map(str::to_string);
        }
        if let Some(field) = name.strip_prefix("article.") {
            return self.article?.field(field).map(str::to_string);
        }
        None
    }
}

fn render_nodes(nodes: &[Node<'_>], scope: Scope<'_>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name, raw) => out.push_str(&scope.lookup(name).ok_or_else(|| unresolved(raw))?),
            Node::Block(Block::Featured, body) => {
                if scope.featured.is_some() {
                    render_nodes(body, scope, out)?;
                }
            }
            Node::Block(Block::Tags, body) => {
                if scope.featured.is_some() {
                    for tag in scope.tags {
                        render_nodes(body, Scope { tag: Some(tag.as_str()), ..scope }, out)?;
                    }
                }
            }
            Node::Block(Block::Articles, body) => {
                for card in scope.rest {
                    render_nodes(body, Scope { article: Some(card), ..scope }, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Render `template` with `articles`: the first is featured (tagged with
/// its topic), the rest fill the articles loop in order.
pub fn render_news(template: &str, ctx: &PageContext, articles: &[Article]) -> Result<String> {
    let nodes = parse(template)?;
    let cards: Vec<Card> = articles.iter().map(Card::from_article).collect();
    let (featured, rest) = match cards.split_first() {
        Some((first, rest)) => (Some(first), rest),
        None => (None, &cards[..]),
    };
    let tags: Vec<String> = featured.map(|f| vec![f.topic.clone()]).unwrap_or_default();

    let scope = Scope {
        page: ctx,
        featured,
        tags: &tags,
        rest,
        tag: None,
        article: None,
    };
    let mut out = String::with_capacity(template.len() + articles.len() * 1024);
    render_nodes(&nodes, scope, &mut out)?;
    debug!(articles = articles.len(), bytes = out.len(), "Rendered template");
    Ok(out)
}

/// A request to (re)build one news page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Restrict to one topic; `None` renders every stored article.
    pub topic: Option<String>,
    pub filename: String,
    pub header_text: String,
    pub subheader_text: String,
    pub header_image: String,
}

impl RenderRequest {
    fn context(&self) -> PageContext {
        PageContext {
            page_title: self.header_text.clone(),
            page_description: self.subheader_text.clone(),
            header_text: self.header_text.clone(),
            subheader_text: self.subheader_text.clone(),
            header_image: self.header_image.clone(),
        }
    }
}

/// Renders stored articles through the news template into the page store.
#[derive(Debug, Clone, Copy)]
pub struct NewsPageRenderer<'a> {
    pub templates: &'a TemplateDir,
    pub pages: &'a PageStore,
    pub articles: &'a ArticleStore,
}

impl NewsPageRenderer<'_> {
    /// Render, create-or-update the page, publish it, and return its path.
    #[instrument(level = "info", skip_all, fields(filename = %request.filename, topic = ?request.topic))]
    pub async fn render_news_page(&self, request: &RenderRequest) -> Result<PathBuf> {
        let template = self.templates.load(NEWS_TEMPLATE).await?;

        let mut articles = match &request.topic {
            Some(topic) => self.articles.query_by_topic(topic).await,
            None => self.articles.list().await,
        };
        articles.sort_by(|a, b| b.published_date.cmp(&a.published_date));

        let html = render_news(&template, &request.context(), &articles)?;

        let page = match self.pages.get_by_filename(&request.filename).await {
            Some(existing) => self
                .pages
                .update(existing.id, &request.header_text, &html)
                .await?
                .ok_or_else(|| NewsdeskError::not_found("page", existing.id))?,
            None => {
                self.pages
                    .create(&request.filename, &request.header_text, &html)
                    .await?
            }
        };
        self.pages.publish(page.id).await?;

        info!(page_id = page.id, count = articles.len(), "Rendered news page");
        Ok(self.pages.page_path(&request.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleStatus, PageStatus};
    use crate::render::DEFAULT_IMAGE;
    use scraper::{Html, Selector};

    const TEMPLATE: &str = include_str!("assets/news_template.html");

    fn article(n: usize, topic: &str, date: &str) -> Article {
        Article {
            id: n as u64,
            title: format!("Title {n}"),
            source: format!("Source {n}"),
            url: format!("https://n.example/{n}"),
            published_date: date.to_string(),
            content: format!("Content {n}"),
            topic: topic.to_string(),
            image_url: Some(format!("https://img.example/{n}.jpg")),
            local_image_path: None,
            status: ArticleStatus::New,
        }
    }

    fn ctx() -> PageContext {
        PageContext {
            page_title: "AI News".into(),
            page_description: "Latest in AI".into(),
            header_text: "AI News".into(),
            subheader_text: "Latest in AI".into(),
            header_image: "/static/images/flag.png".into(),
        }
    }

    fn select_texts(html: &str, selector: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let sel = Selector::parse(selector).unwrap();
        doc.select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect()
    }

    #[test]
    fn test_featured_and_grid() {
        let articles = vec![
            article(1, "AI News", "2025-05-20T11:45:00"),
            article(2, "AI News", "2025-05-19T11:45:00"),
            article(3, "Healthcare", "2025-05-18T11:45:00"),
        ];
        let out = render_news(TEMPLATE, &ctx(), &articles).unwrap();

        assert_eq!(select_texts(&out, ".featured-article h2"), vec!["Title 1"]);
        assert_eq!(select_texts(&out, ".featured-article .tag"), vec!["AI News"]);
        assert_eq!(select_texts(&out, ".article-card h3"), vec!["Title 2", "Title 3"]);
        assert!(out.contains("May 20, 2025"));
        assert!(out.contains("<title>AI News</title>"));
        assert!(!out.contains("{{") && !out.contains("{%"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let articles = vec![article(1, "AI News", "2025-05-20T11:45:00"), article(2, "AI News", "x")];
        let a = render_news(TEMPLATE, &ctx(), &articles).unwrap();
        let b = render_news(TEMPLATE, &ctx(), &articles).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_list_suppresses_featured_and_grid() {
        let out = render_news(TEMPLATE, &ctx(), &[]).unwrap();
        assert!(select_texts(&out, ".featured-article").is_empty());
        assert!(select_texts(&out, ".article-card").is_empty());
        assert_eq!(select_texts(&out, ".articles-grid"), vec![""]);
        assert!(!out.contains("{{") && !out.contains("{%"));
    }

    #[test]
    fn test_values_are_escaped_and_not_rescanned() {
        let mut a = article(1, "AI <News>", "2025-05-20T11:45:00");
        a.title = "<script>alert(1)</script>".into();
        a.content = "Mentions {{ page_title }} literally".into();
        let out = render_news(TEMPLATE, &ctx(), &[a]).unwrap();
        assert!(out.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!out.contains("<script>"));
        assert!(out.contains("AI &lt;News&gt;"));
        assert!(out.contains("Mentions {{ page_title }} literally"));
    }

    #[test]
    fn test_excerpt_in_cards() {
        let mut a = article(1, "AI News", "2025-05-20T11:45:00");
        a.content = "x".repeat(151);
        let out = render_news("{% for article in articles %}{% endfor %}{% if featured_article %}[{{ featured_article.excerpt }}]{% endif %}", &ctx(), &[a]).unwrap();
        assert_eq!(out, format!("[{}...]", "x".repeat(150)));
    }

    #[test]
    fn test_image_fallback_order() {
        let mut a = article(1, "AI News", "d");
        a.local_image_path = Some("/static/images/news/ai_news_1.jpg".into());
        assert_eq!(image_for(&a), "/static/images/news/ai_news_1.jpg");
        a.local_image_path = None;
        assert_eq!(image_for(&a), "https://img.example/1.jpg");
        a.image_url = None;
        assert_eq!(image_for(&a), DEFAULT_IMAGE);

        // An article with no image still renders, with the default asset.
        let out = render_news(TEMPLATE, &ctx(), &[a]).unwrap();
        assert_eq!(select_texts(&out, ".featured-article h2"), vec!["Title 1"]);
        assert!(out.contains(DEFAULT_IMAGE));
    }

    #[test]
    fn test_unknown_or_unbalanced_tokens_fail() {
        let cases = [
            "{{ nope }}",
            "{% for x in y %}{% endfor %}",
            "{% if featured_article %}never closed",
            "{% endif %}",
            "{% for article in articles %}{% endif %}",
            "broken {{ token",
        ];
        for template in cases {
            assert!(
                matches!(
                    render_news(template, &ctx(), &[article(1, "t", "d")]),
                    Err(NewsdeskError::UnresolvedPlaceholder(_))
                ),
                "{template}"
            );
        }
    }

    #[test]
    fn test_article_fields_outside_loop_fail() {
        let err = render_news("{{ article.title }}", &ctx(), &[article(1, "t", "d")]).unwrap_err();
        assert!(matches!(err, NewsdeskError::UnresolvedPlaceholder(t) if t == "{{ article.title }}"));
    }

    #[tokio::test]
    async fn test_render_news_page_creates_then_updates() {
        let tmp = tempfile::tempdir().unwrap();
        let templates = TemplateDir::new(tmp.path().join("templates"));
        templates.ensure_defaults().await.unwrap();
        let pages = PageStore::open(tmp.path().join("pages"), tmp.path().join("pages.json")).await;
        let articles = ArticleStore::open(tmp.path().join("news.json")).await;
        articles.add(article(0, "AI News", "2025-05-14T09:30:00")).await.unwrap();
        articles.add(article(1, "AI News", "2025-05-20T11:45:00")).await.unwrap();
        articles.add(article(2, "Healthcare", "2025-05-21T11:45:00")).await.unwrap();

        let renderer = NewsPageRenderer {
            templates: &templates,
            pages: &pages,
            articles: &articles,
        };
        let request = RenderRequest {
            topic: Some("AI News".into()),
            filename: "ai_news.html".into(),
            header_text: "AI News".into(),
            subheader_text: "Latest".into(),
            header_image: "/static/images/flag.png".into(),
        };

        let path = renderer.render_news_page(&request).await.unwrap();
        assert_eq!(path, tmp.path().join("pages").join("ai_news.html"));
        let html = std::fs::read_to_string(&path).unwrap();
        // Newest AI article is featured; the Healthcare one is excluded.
        assert_eq!(select_texts(&html, ".featured-article h2"), vec!["Title 1"]);
        assert_eq!(select_texts(&html, ".article-card h3"), vec!["Title 0"]);

        renderer.render_news_page(&request).await.unwrap();
        let listed = pages.list(&Default::default()).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, PageStatus::Published);
    }

    #[tokio::test]
    async fn test_missing_template_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let templates = TemplateDir::new(tmp.path().join("templates"));
        let pages = PageStore::open(tmp.path().join("pages"), tmp.path().join("pages.json")).await;
        let articles = ArticleStore::open(tmp.path().join("news.json")).await;
        let renderer = NewsPageRenderer {
            templates: &templates,
            pages: &pages,
            articles: &articles,
        };
        let request = RenderRequest {
            topic: None,
            filename: "recent_news.html".into(),
            header_text: "Recent".into(),
            subheader_text: "".into(),
            header_image: "".into(),
        };
        assert!(matches!(
            renderer.render_news_page(&request).await,
            Err(NewsdeskError::TemplateNotFound(_))
        ));
    }
}
