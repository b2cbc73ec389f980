//! `bookd` binary: wires a storage backend and the development collaborator
//! stand-ins into the engine and serves the HTTP API.

use std::process;
use std::sync::Arc;

use bookd_engine::external::{FixedCatalog, LocalGateway, LogNotifier};
use bookd_engine::{Engine, EngineConfig};
use bookd_server::serve::state::AppState;
use bookd_storage::MemoryStore;
use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Booking and payment settlement service.
#[derive(Parser)]
#[command(name = "bookd", version, about = "Booking and payment settlement service")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Currency code passed to the payment gateway
    #[arg(long, default_value = "INR")]
    currency: String,

    /// Price quoted for every service offering by the built-in catalog
    #[arg(long, default_value = "500")]
    default_price: Decimal,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let gateway_secret = match std::env::var("BOOKD_GATEWAY_SECRET") {
        Ok(s) if !s.is_empty() => s,
        _ => {
            eprintln!("BOOKD_GATEWAY_SECRET must be set");
            process::exit(1);
        }
    };
    let webhook_secret = match std::env::var("BOOKD_WEBHOOK_SECRET") {
        Ok(s) if !s.is_empty() => s,
        _ => {
            eprintln!("BOOKD_WEBHOOK_SECRET must be set");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            process::exit(1);
        }
    };

    let engine = Engine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LocalGateway),
        Arc::new(LogNotifier),
        Arc::new(FixedCatalog::with_default_price(cli.default_price)),
        EngineConfig {
            gateway_secret,
            webhook_secret,
            currency: cli.currency,
        },
    );
    let router = bookd_server::serve::build_router(AppState::new(Arc::new(engine)));

    runtime.block_on(async {
        let addr = format!("0.0.0.0:{}", cli.port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("failed to bind {addr}: {e}");
                process::exit(1);
            }
        };
        tracing::info!(%addr, "bookd listening");
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("server error: {e}");
            process::exit(1);
        }
    });
}
