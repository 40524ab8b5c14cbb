mod auth;
mod config;
mod errors;
mod ids;
mod llm_client;
mod models;
mod raster;
mod review;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::raster::pdfium::PdfiumRasterizer;
use crate::review::inference::ClaudeFeedbackModel;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::redis_kv::RedisKvStore;
use crate::storage::s3::S3BlobStore;
use crate::storage::BlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATSly API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Redis (record store)
    let kv = Arc::new(RedisKvStore::connect(&config.redis_url).await?);

    // Initialize S3 / MinIO (artifact store)
    let blobs: Arc<dyn BlobStore> = Arc::new(S3BlobStore::from_config(&config).await);
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize PDFium (fails fast when the library is missing)
    let rasterizer = Arc::new(PdfiumRasterizer::new()?);
    info!("PDFium rasterizer initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let model = Arc::new(ClaudeFeedbackModel::new(llm, blobs.clone()));

    let state = AppState {
        blobs,
        kv,
        rasterizer,
        model,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the web front-end origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
