//! RAG Server binary
//!
//! Run with: cargo run -p docs-rag --bin docs-rag-server -- --config docs-rag.toml

use clap::Parser;
use docs_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "docs-rag-server", version, about = "Question answering over ingested documents")]
struct Args {
    /// TOML configuration file; environment variables override its values
    #[arg(short, long, env = "DOCS_RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docs_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Embeddings: {:?} {} ({} dims)",
        config.embeddings.backend,
        config.embeddings.model(),
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM: {:?} {}", config.llm.backend, config.llm.model());
    tracing::info!(
        "  - Vector index: {:?} collection '{}'",
        config.vector_db.backend,
        config.vector_db.collection
    );
    tracing::info!("  - Cache: {:?} (ttl {}s)", config.cache.backend, config.cache.ttl_secs);
    tracing::info!(
        "  - Chunking: {} tokens, {} overlap",
        config.chunking.max_tokens,
        config.chunking.overlap_tokens
    );
    tracing::info!("  - Query mode: {:?}", config.query.mode);

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/rag/info", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/rag/ingest-text - Index raw text");
    println!("  POST   /api/rag/ingest-pdf  - Index a PDF (field 'pdf')");
    println!("  POST   /api/rag/query       - Ask questions");
    println!("  DELETE /api/rag/cache       - Drop cached answers");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
