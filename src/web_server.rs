// File: src/web_server.rs
// Web server exposing mint lookup, wallet attribution, catalog and price APIs

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    routing::{get, Router},
    Json,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::attribution::{fetch_holdings, WalletHoldings};
use crate::catalog::{join_blocks, BlockCatalog, MintTable};
use crate::data_models::{AppConfig, BlockWithMint, Holdings, MarketSnapshot, MintSearch};
use crate::error::LookupError;
use crate::lookup::LookupEngine;
use crate::price::PriceFeed;
use crate::source::HttpAdapter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub adapter: HttpAdapter,
    pub started_at: i64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            adapter: HttpAdapter::new()?,
            started_at: chrono::Utc::now().timestamp(),
        })
    }
}

/// Web server options from the command line
#[derive(Debug, Clone)]
pub struct WebOptions {
    pub bind: String,
    pub port: u16,
    pub enable_cors: bool,
    pub public_dir: Option<PathBuf>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

/// Wallet attribution response
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub address: String,
    #[serde(flatten)]
    pub holdings: Holdings,
}

/// Build the router with every API route
pub fn build_router(state: AppState, enable_cors: bool, public_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/search-mint/:index", get(search_mint))
        .route("/api/wallet/:address", get(wallet_holdings))
        .route("/api/blocks", get(list_blocks))
        .route("/api/blocks/:index", get(block_detail))
        .route("/api/market", get(market))
        .with_state(state);

    // Static front-end and the catalog files it reads
    if let Some(dir) = public_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    if enable_cors {
        app = app.layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods(tower_http::cors::Any)
                    .allow_headers(tower_http::cors::Any),
            ),
        );
    }

    app
}

/// Run the web server
pub async fn run_web_mode(config: AppConfig, options: WebOptions) -> Result<()> {
    let state = AppState::new(config)?;
    let app = build_router(state, options.enable_cors, options.public_dir.clone());

    let addr: SocketAddr = format!("{}:{}", options.bind, options.port).parse()?;

    println!("🌐 Magic mint API available at: http://{}", addr);
    println!("📊 API endpoints:");
    println!("   GET /api/search-mint/:index - Verified mints for a catalog block");
    println!("   GET /api/wallet/:address    - Magic mints held by an address");
    println!("   GET /api/blocks             - Catalog with cached mint records");
    println!("   GET /api/blocks/:index      - One catalog block");
    println!("   GET /api/market             - BTC price and market cap");
    if let Some(dir) = &options.public_dir {
        println!("📁 Serving static files from {}", dir.display());
    }

    tracing::info!(target: "magic_mint::web", %addr, cors = options.enable_cors, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn parse_index(raw: &str) -> Result<u64, LookupError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| LookupError::InvalidIndex(raw.to_string()))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: chrono::Utc::now().timestamp() - state.started_at,
    })
}

/// Lookup entry point: verified mints for one catalog index
async fn search_mint(
    Path(index): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MintSearch>, LookupError> {
    let index = parse_index(&index)?;
    let catalog = BlockCatalog::load(&state.config.blocks_path).await?;
    let engine = LookupEngine::from_config(&state.config, state.adapter.clone());
    let result = engine.find_mints_for_block(&catalog, index).await?;
    Ok(Json(result))
}

/// Attribution never fails; failures degrade to empty holdings
async fn wallet_holdings(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Json<WalletResponse> {
    let source = WalletHoldings::from_config(&state.config, state.adapter.clone());
    let holdings = fetch_holdings(&source, &address).await;
    Json(WalletResponse { address, holdings })
}

async fn list_blocks(State(state): State<AppState>) -> Result<Json<Vec<BlockWithMint>>, LookupError> {
    let (catalog, table) = load_catalogs(&state.config).await?;
    Ok(Json(join_blocks(&catalog, &table)))
}

async fn block_detail(
    Path(index): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BlockWithMint>, LookupError> {
    let index = parse_index(&index)?;
    let (catalog, table) = load_catalogs(&state.config).await?;
    let block = catalog.get(index).cloned().ok_or(LookupError::NotFound(index))?;
    Ok(Json(BlockWithMint {
        mint: table.get(index).cloned(),
        block,
    }))
}

async fn market(State(state): State<AppState>) -> Json<MarketSnapshot> {
    Json(PriceFeed::new(state.adapter.clone()).market().await)
}

async fn load_catalogs(config: &AppConfig) -> Result<(BlockCatalog, MintTable), LookupError> {
    let (catalog, table) = tokio::try_join!(
        BlockCatalog::load(&config.blocks_path),
        MintTable::load(&config.mints_path),
    )?;
    Ok((catalog, table))
}
