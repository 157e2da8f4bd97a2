//! Crucible CLI entry point

use clap::{Parser, Subcommand};
use crucible_engine::EngineSpec;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "Crafting-recipe graph server with live search visualization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./crucible.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Search engine as kind:argument (process:<cmd>, http:<url>, scripted:<file>)
        #[arg(short, long)]
        engine: Option<EngineSpec>,

        /// Element data file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory of static client files
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Load and validate the element data, then print a summary
    Check {
        /// Element data file
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Print one page of the element catalog
    List {
        /// Element data file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// all, basic, advanced or tier-N
        #[arg(long, default_value = "all")]
        category: String,

        /// name or tier
        #[arg(long, default_value = "name")]
        sort: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,

        /// Comma-separated names the viewer has visited
        #[arg(long)]
        visited: Option<String>,

        /// Fuzzy name filter
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Run a search against a server and print frames as they arrive
    Search {
        /// Element to build
        target: String,

        /// Session endpoint
        #[arg(long, default_value = "ws://127.0.0.1:4000/ws")]
        url: String,

        /// bfs, dfs or bidirectional
        #[arg(short, long, default_value = "bfs")]
        mode: String,

        /// Number of trees to return
        #[arg(long, default_value_t = 1)]
        max_trees: i64,

        /// Ask for the single best tree instead
        #[arg(long)]
        best: bool,

        /// Pause between exploring frames
        #[arg(long, default_value_t = 0)]
        delay_ms: i64,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env must be in place before any environment lookup
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "crucible={0},crucible_core={0},crucible_engine={0},crucible_server={0}",
            log_level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            engine,
            data,
            static_dir,
        } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(data) = data {
                config.data.elements = data;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = Some(dir);
            }
            tracing::info!("Crucible v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(config, engine).await
        }
        Commands::Check { data } => {
            let config = Config::load(cli.config.as_deref())?;
            commands::check(&data.unwrap_or(config.data.elements))
        }
        Commands::List {
            data,
            category,
            sort,
            page,
            page_size,
            visited,
            query,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let options = commands::ListOptions {
                category,
                sort,
                page,
                page_size: page_size.unwrap_or(config.catalog.page_size),
                visited,
                query,
            };
            commands::list(&data.unwrap_or(config.data.elements), &options)
        }
        Commands::Search {
            target,
            url,
            mode,
            max_trees,
            best,
            delay_ms,
        } => {
            let request = crucible_server::RawSearchRequest {
                target,
                mode,
                find_best_tree: best,
                max_tree_count: max_trees,
                delay_ms,
            };
            commands::search(&url, &request).await
        }
        Commands::Version => {
            println!("Crucible v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
