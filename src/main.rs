// File: src/main.rs
// Magic mint inspector: 21e8 block catalog, mint verification and wallet attribution

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod attribution;
mod catalog;
mod cli_interface;
mod data_models;
mod error;
mod fallback;
mod indexers;
mod lookup;
mod pattern;
mod price;
mod reconcile;
mod source;
mod web_server;

use crate::data_models::{ApiCredentials, AppConfig, Endpoints};
use crate::lookup::DEFAULT_SEARCH_PACING;
use crate::web_server::WebOptions;

/// Command-line interface definition for the magic mint inspector
#[derive(Parser)]
#[command(name = "magic-mint-inspector")]
#[command(about = "Locate, verify and attribute $magic mints for 21e8 blocks")]
#[command(version)]
pub struct Cli {
    /// Block catalog (blocks whose hash contains 21e8)
    #[arg(long, value_name = "FILE", default_value = "public/blocks_with_21e8.json", global = true)]
    pub blocks: PathBuf,

    /// Precomputed first-mint table
    #[arg(long, value_name = "FILE", default_value = "public/first_mints_per_index.json", global = true)]
    pub mints: PathBuf,

    /// OrdinalsBot API key for content search
    #[arg(long, env = "ORDINALS_API_KEY", hide_env_values = true, global = true)]
    pub ordinals_api_key: Option<String>,

    /// Ordiscan API key for inscription detail
    #[arg(long, env = "ORDISCAN_API_KEY", hide_env_values = true, global = true)]
    pub ordiscan_api_key: Option<String>,

    /// UniSat API key for wallet listings
    #[arg(long, env = "UNISAT_API_KEY", hide_env_values = true, global = true)]
    pub unisat_api_key: Option<String>,

    /// Delay between the two search-pattern queries, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SEARCH_PACING.as_millis() as u64, global = true)]
    pub search_pacing_ms: u64,

    /// Interface mode selection
    #[command(subcommand)]
    pub mode: InterfaceMode,
}

/// Available interface modes
#[derive(Subcommand)]
pub enum InterfaceMode {
    /// One-shot commands printed to the terminal
    Cli {
        #[command(subcommand)]
        command: CliCommand,
    },

    /// JSON API server, optionally serving the static front-end
    Web {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,

        /// Enable CORS for development
        #[arg(short, long)]
        cors: bool,

        /// Directory of static files served for unmatched paths
        #[arg(long, value_name = "DIR")]
        public: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Show the newest catalog blocks with their cached mint
    Blocks {
        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Live search for the mints of one catalog index
    Search {
        /// Catalog index of the block
        index: u64,
    },

    /// Magic mints held by a wallet address
    Wallet { address: String },

    /// Check a payload against the mint pattern for a height
    Check {
        /// Raw inscription content
        content: String,
        /// Block height the mint should name
        height: u64,
    },

    /// BTC price and $magic market cap
    Price,
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = AppConfig {
        blocks_path: cli.blocks,
        mints_path: cli.mints,
        credentials: ApiCredentials {
            ordinals_api_key: cli.ordinals_api_key,
            ordiscan_api_key: cli.ordiscan_api_key,
            unisat_api_key: cli.unisat_api_key,
        },
        endpoints: Endpoints::default(),
        search_pacing: Duration::from_millis(cli.search_pacing_ms),
    };

    match cli.mode {
        InterfaceMode::Cli { command } => {
            println!("🔍 Magic Mint Inspector - CLI Mode");
            cli_interface::run_cli_mode(&config, command).await
        }

        InterfaceMode::Web { port, bind, cors, public } => {
            println!("🌐 Magic Mint Inspector - Web Server");
            println!("🚀 Starting server on {}:{}", bind, port);
            if cors {
                println!("🔓 CORS enabled for development");
            }
            let options = WebOptions {
                bind,
                port,
                enable_cors: cors,
                public_dir: public,
            };
            web_server::run_web_mode(config, options).await
        }
    }
}
