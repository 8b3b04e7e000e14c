//! Command-line interface definitions for newsdesk.
//!
//! Each subcommand group stands in for one group of the editor's HTTP
//! endpoints. API keys can be given as flags or environment variables and
//! override the values in the config file.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::models::{ArticleStatus, PageStatus, Priority};
use crate::render::region::{DEFAULT_MAX_ARTICLES, RegionSelector};

/// Fetch news for tracked topics and bake it into static HTML pages.
///
/// # Examples
///
/// ```sh
/// # Pull articles for every topic and rebuild the three standard pages
/// newsdesk fetch --limit 30
/// newsdesk quick all
///
/// # Patch two regions of an existing page from TheNewsAPI
/// newsdesk update-region site/recent-news.html --categories politics \
///     --featured '#smart-grid' --grid .news-grid
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, env = "NEWSDESK_CONFIG", default_value = "newsdesk.yaml")]
    pub config: PathBuf,

    /// Brave Search subscription token
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: Option<String>,

    /// NewsAPI key
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// TheNewsAPI token (used by update-region)
    #[arg(long, env = "NEWS_API_TOKEN", hide_env_values = true)]
    pub news_api_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and edit stored articles
    #[command(subcommand)]
    Articles(ArticlesCmd),

    /// Manage tracked topics
    #[command(subcommand)]
    Topics(TopicsCmd),

    /// Manage HTML pages
    #[command(subcommand)]
    Pages(PagesCmd),

    /// Manage page templates
    #[command(subcommand)]
    Templates(TemplatesCmd),

    /// Fetch articles for one topic or all of them
    Fetch {
        /// Topic id; all topics when omitted
        #[arg(long)]
        topic: Option<u64>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Manage downloaded article images
    #[command(subcommand)]
    Images(ImagesCmd),

    /// Render stored articles into a page
    Render(RenderArgs),

    /// Rebuild one of the standard pages
    Quick {
        #[arg(value_enum)]
        action: QuickAction,
    },

    /// Export pages for deployment
    Export(ExportArgs),

    /// Print totals and the per-topic article distribution
    Stats,

    /// Replace the featured and grid regions of an existing HTML file
    UpdateRegion(UpdateRegionArgs),
}

#[derive(Subcommand, Debug)]
pub enum ArticlesCmd {
    List {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        status: Option<ArticleStatus>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Show {
        id: u64,
    },
    /// Add articles from a JSON file holding one article or an array
    Add {
        file: PathBuf,
    },
    Status {
        id: u64,
        status: ArticleStatus,
    },
    Delete {
        id: u64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TopicArgs {
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Comma-separated search keywords
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    #[arg(long, default_value = "medium")]
    pub priority: Priority,
}

#[derive(Subcommand, Debug)]
pub enum TopicsCmd {
    List,
    Add(TopicArgs),
    /// Replace a topic's fields
    Update {
        id: u64,
        #[command(flatten)]
        topic: TopicArgs,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum PagesCmd {
    List {
        #[arg(long)]
        status: Option<PageStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Print a page's HTML
    Show {
        id: u64,
    },
    /// Create a draft page from an HTML file
    Create {
        filename: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: PathBuf,
    },
    /// Create a page from an existing HTML file, titled from its <title>
    Import {
        path: PathBuf,
        /// Page filename; defaults to the file's name
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<PathBuf>,
    },
    Publish {
        id: u64,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCmd {
    List,
    Show { name: String },
    Create { name: String, file: PathBuf },
    Update { name: String, file: PathBuf },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ImagesCmd {
    List,
    /// Download images for stored articles that lack a local copy
    DownloadAll,
    /// Copy a local image into the images directory
    Import {
        path: PathBuf,
        #[arg(long, default_value = "upload")]
        topic: String,
    },
    Delete {
        name: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Topic name; every stored article when omitted
    #[arg(long)]
    pub topic: Option<String>,

    #[arg(long)]
    pub filename: String,

    #[arg(long)]
    pub header: String,

    #[arg(long, default_value = "")]
    pub subheader: String,

    #[arg(long, default_value = "/static/images/usa_flag.png")]
    pub header_image: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Recent,
    International,
    Ai,
    All,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Page ids to export
    #[arg(long = "page", required = true, num_args = 1..)]
    pub pages: Vec<u64>,

    #[arg(long)]
    pub css: bool,

    #[arg(long)]
    pub js: bool,

    #[arg(long)]
    pub images: bool,

    /// Pack the export into a .tar.gz
    #[arg(long)]
    pub archive: bool,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("filter").required(true).multiple(true).args(["query", "categories"])))]
pub struct UpdateRegionArgs {
    /// HTML file to update in place
    pub file: PathBuf,

    /// Free-text search
    #[arg(long)]
    pub query: Option<String>,

    /// Comma-separated categories
    #[arg(long)]
    pub categories: Option<String>,

    /// Featured region, `#id` or `.class`
    #[arg(long)]
    pub featured: RegionSelector,

    /// Grid region, `#id` or `.class`
    #[arg(long, default_value = ".news-grid")]
    pub grid: RegionSelector,

    #[arg(long, default_value = "us")]
    pub locale: String,

    #[arg(long, default_value_t = DEFAULT_MAX_ARTICLES)]
    pub max_articles: usize,

    /// Print the updated document instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}
