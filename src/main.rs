//! # newsdesk
//!
//! A small news desk: fetch articles for tracked topics from news search
//! APIs, keep them in flat JSON stores, and bake them into static HTML
//! pages.
//!
//! ## Usage
//!
//! ```sh
//! newsdesk fetch --limit 30
//! newsdesk quick all
//! newsdesk update-region site/recent-news.html --query "climate" --featured '#smart-grid'
//! ```
//!
//! ## Architecture
//!
//! 1. **Sources**: Brave Search, NewsAPI and TheNewsAPI adapters, with
//!    built-in samples as the last fallback
//! 2. **Stores**: articles, topics and pages, each a JSON array on disk
//!    guarded by a mutex
//! 3. **Rendering**: the news template turned into pages, or two regions of
//!    an existing static file replaced in place
//! 4. **Export**: pages and assets copied out, optionally as a `.tar.gz`
//!
//! Command results go to stdout; logs go to stderr.

use clap::Parser;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod app;
mod cli;
mod config;
mod error;
mod export;
mod images;
mod models;
mod render;
mod sources;
mod store;
mod utils;

use app::{App, StandardPage};
use cli::{
    ArticlesCmd, Cli, Command, ExportArgs, ImagesCmd, PagesCmd, QuickAction, RenderArgs,
    TemplatesCmd, TopicArgs, TopicsCmd, UpdateRegionArgs,
};
use config::Config;
use error::{NewsdeskError, Result};
use export::{ExportOptions, export};
use models::Article;
use render::region::RegionSelector;
use render::{RegionUpdate, RegionUpdater, RenderRequest};
use sources::{FeedRequest, NewsFetcher};
use store::{ArticleQuery, PageFilter, TopicInput};

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let cli = Cli::parse();
    debug!(config = %cli.config.display(), command = ?cli.command, "Parsed CLI arguments");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?.with_keys(
        cli.brave_api_key,
        cli.newsapi_key,
        cli.news_api_token,
    );

    // The batch updater touches neither the stores nor the templates.
    match cli.command {
        Command::UpdateRegion(args) => update_region(&config, args).await,
        Command::Articles(cmd) => articles(&App::open(config).await?, cmd).await,
        Command::Topics(cmd) => topics(&App::open(config).await?, cmd).await,
        Command::Pages(cmd) => pages(&App::open(config).await?, cmd).await,
        Command::Templates(cmd) => templates(&App::open(config).await?, cmd).await,
        Command::Images(cmd) => images(&App::open(config).await?, cmd).await,
        Command::Fetch { topic, limit } => {
            let added = App::open(config).await?.fetch(topic, limit).await?;
            println!("Added {added} new article(s)");
            Ok(())
        }
        Command::Render(args) => render(&App::open(config).await?, args).await,
        Command::Quick { action } => quick(&App::open(config).await?, action).await,
        Command::Export(args) => export_pages(&App::open(config).await?, args).await,
        Command::Stats => print_json(&App::open(config).await?.stats().await),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| NewsdeskError::io(path, e))
}

fn found(ok: bool, kind: &'static str, key: impl ToString) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(NewsdeskError::not_found(kind, key))
    }
}

async fn articles(app: &App, cmd: ArticlesCmd) -> Result<()> {
    match cmd {
        ArticlesCmd::List {
            topic,
            status,
            source,
            search,
            page,
            limit,
        } => {
            let result = app
                .articles
                .query(&ArticleQuery {
                    topic,
                    status,
                    source,
                    search,
                    page,
                    limit,
                })
                .await;
            print_json(&serde_json::json!({
                "articles": result.articles,
                "total": result.total,
                "page": result.page,
                "limit": result.limit,
                "pages": result.pages,
            }))
        }
        ArticlesCmd::Show { id } => {
            let article = app
                .articles
                .get(id)
                .await
                .ok_or_else(|| NewsdeskError::not_found("article", id))?;
            print_json(&article)
        }
        ArticlesCmd::Add { file } => {
            let parsed = Article::parse_many(&read_file(&file).await?)?;
            let total = parsed.len();
            let added = app.articles.add_many(parsed).await?;
            println!("Added {added} of {total} article(s)");
            Ok(())
        }
        ArticlesCmd::Status { id, status } => {
            found(app.articles.update_status(id, status).await?, "article", id)
        }
        ArticlesCmd::Delete { id } => found(app.articles.delete(id).await?, "article", id),
    }
}

fn topic_input(args: TopicArgs) -> TopicInput {
    TopicInput {
        name: args.name,
        description: args.description,
        keywords: args
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        priority: args.priority,
    }
}

async fn topics(app: &App, cmd: TopicsCmd) -> Result<()> {
    match cmd {
        TopicsCmd::List => print_json(&app.topics.list().await),
        TopicsCmd::Add(args) => print_json(&app.topics.create(topic_input(args)).await?),
        TopicsCmd::Update { id, topic } => {
            let updated = app
                .topics
                .update(id, topic_input(topic))
                .await?
                .ok_or_else(|| NewsdeskError::not_found("topic", id))?;
            print_json(&updated)
        }
        TopicsCmd::Delete { id } => found(app.topics.delete(id).await?, "topic", id),
    }
}

async fn pages(app: &App, cmd: PagesCmd) -> Result<()> {
    match cmd {
        PagesCmd::List { status, search } => {
            for page in app.pages.list(&PageFilter { status, search }).await {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    page.id, page.status, page.filename, page.title, page.updated_at
                );
            }
            Ok(())
        }
        PagesCmd::Show { id } => {
            let page = app
                .pages
                .get(id)
                .await
                .ok_or_else(|| NewsdeskError::not_found("page", id))?;
            print!("{}", page.content);
            Ok(())
        }
        PagesCmd::Create {
            filename,
            title,
            content,
        } => {
            let html = read_file(&content).await?;
            let page = app.pages.create(&filename, &title, &html).await?;
            println!("Created page {} ({})", page.id, page.filename);
            Ok(())
        }
        PagesCmd::Import {
            path,
            filename,
            title,
        } => {
            let page = app.import_page(&path, filename, title).await?;
            println!("Imported page {} ({}): {}", page.id, page.filename, page.title);
            Ok(())
        }
        PagesCmd::Update { id, title, content } => {
            let existing = app
                .pages
                .get(id)
                .await
                .ok_or_else(|| NewsdeskError::not_found("page", id))?;
            let html = match content {
                Some(path) => read_file(&path).await?,
                None => existing.content,
            };
            let title = title.unwrap_or(existing.title);
            found(app.pages.update(id, &title, &html).await?.is_some(), "page", id)
        }
        PagesCmd::Publish { id } => found(app.pages.publish(id).await?.is_some(), "page", id),
        PagesCmd::Delete { id } => found(app.pages.delete(id).await?, "page", id),
    }
}

async fn templates(app: &App, cmd: TemplatesCmd) -> Result<()> {
    let templates = &app.templates;
    match cmd {
        TemplatesCmd::List => {
            for name in templates.list().await? {
                println!("{name}");
            }
            Ok(())
        }
        TemplatesCmd::Show { name } => {
            print!("{}", templates.load(&name).await?);
            Ok(())
        }
        TemplatesCmd::Create { name, file } => {
            templates.create(&name, &read_file(&file).await?).await
        }
        TemplatesCmd::Update { name, file } => {
            if templates.update(&name, &read_file(&file).await?).await? {
                Ok(())
            } else {
                Err(NewsdeskError::TemplateNotFound(name))
            }
        }
        TemplatesCmd::Delete { name } => {
            if templates.delete(&name).await? {
                Ok(())
            } else {
                Err(NewsdeskError::TemplateNotFound(name))
            }
        }
    }
}

async fn images(app: &App, cmd: ImagesCmd) -> Result<()> {
    match cmd {
        ImagesCmd::List => {
            for image in app.images.list().await? {
                println!("{}\t{}\t{}", image.name, image.size, image.url_path);
            }
            Ok(())
        }
        ImagesCmd::DownloadAll => {
            let saved = app.images.backfill(&app.articles).await?;
            println!("Downloaded {saved} image(s)");
            Ok(())
        }
        ImagesCmd::Import { path, topic } => {
            println!("{}", app.images.import(&path, &topic).await?);
            Ok(())
        }
        ImagesCmd::Delete { name } => {
            let removed = app.images.remove(&name).await?;
            found(removed, "image", name)
        }
    }
}

async fn render(app: &App, args: RenderArgs) -> Result<()> {
    let request = RenderRequest {
        topic: args.topic,
        filename: args.filename,
        header_text: args.header,
        subheader_text: args.subheader,
        header_image: args.header_image,
    };
    let path = app.renderer().render_news_page(&request).await?;
    println!("{}", path.display());
    Ok(())
}

async fn quick(app: &App, action: QuickAction) -> Result<()> {
    let paths = match action {
        QuickAction::Recent => vec![app.quick(StandardPage::Recent).await?],
        QuickAction::International => vec![app.quick(StandardPage::International).await?],
        QuickAction::Ai => vec![app.quick(StandardPage::Ai).await?],
        QuickAction::All => app.quick_all().await?,
    };
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}

async fn export_pages(app: &App, args: ExportArgs) -> Result<()> {
    let options = ExportOptions {
        page_ids: args.pages,
        include_css: args.css,
        include_js: args.js,
        include_images: args.images,
        archive: args.archive,
    };
    let outcome = export(&app.config, &app.pages, &options).await?;
    println!("{}", outcome.path().display());
    Ok(())
}

async fn update_region(config: &Config, args: UpdateRegionArgs) -> Result<()> {
    let fetcher = NewsFetcher::new(config, api::build_client(config)?);
    let update = RegionUpdate {
        file: args.file,
        featured: args.featured,
        grid: args.grid,
        request: FeedRequest {
            search: args.query,
            categories: args.categories,
            locale: Some(args.locale),
            limit: args.max_articles,
        },
        max_articles: args.max_articles,
        dry_run: args.dry_run,
    };

    let outcome = RegionUpdater { fetcher: &fetcher }.run(&update).await?;
    if update.dry_run {
        print!("{}", outcome.html);
    } else if outcome.written {
        let regions: Vec<&RegionSelector> = [&update.featured, &update.grid]
            .into_iter()
            .filter(|s| !outcome.missing.contains(s))
            .collect();
        info!(items = outcome.items, ?regions, "Regions updated");
        println!(
            "Updated {} with {} article(s)",
            outcome.file.display(),
            outcome.items
        );
    }
    outcome.check()
}
