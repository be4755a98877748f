use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast;

mod api;
mod cli;
mod metrics;
mod models;
mod services;
mod state;

use api::routes;
use cli::CommandArgs;
use services::{run_refresh_loop, ProcessBackend, StatsCollector};
use state::{new_state, StoreEvent};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let settings = args.settings();
    settings.validate().context("invalid table settings")?;
    let bind_address = format!("{}:{}", args.address, args.port);

    log::info!("🔄 Sampling processes...");
    let backend: Arc<dyn ProcessBackend> = Arc::new(StatsCollector::new());
    let state = new_state(backend, settings);

    actix_rt::spawn(run_refresh_loop(state.clone(), state.refresh_rate_updates()));
    actix_rt::spawn(log_events(state.subscribe()));

    print_banner(&args);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .run()
    .await?;

    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log::debug!("store event: {:?}", event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("store event log skipped {} events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_banner(args: &CommandArgs) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Process Table v{:<38}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}:{}", args.address, args.port);
    println!("   refresh every {} ms, {} rows per page, status filter '{}'",
             args.refresh_rate_ms, args.items_per_page, args.default_status_filter);
    println!();
    println!("📋 Available endpoints:");
    println!("  GET    /api/table                    - Current page of the process table");
    println!("  GET    /api/state                    - Search, sort, pins, selection, kill state");
    println!("  GET    /api/system                   - System statistics");
    println!("  POST   /api/refresh                  - Refresh now");
    println!("  PUT    /api/search                   - Set search terms (comma separated)");
    println!("  PUT    /api/status-filter            - Set status filter");
    println!("  PUT    /api/page                     - Go to page");
    println!("  POST   /api/sort/{{field}}             - Toggle sort column");
    println!("  POST   /api/pins                     - Toggle pin for a command");
    println!("  PUT    /api/freeze                   - Freeze or resume refreshing");
    println!("  POST   /api/processes/{{pid}}/details  - Open process details");
    println!("  GET    /api/details                  - Selected process details");
    println!("  DELETE /api/details                  - Close process details");
    println!("  POST   /api/processes/{{pid}}/kill     - Request kill (needs confirmation)");
    println!("  POST   /api/kill/confirm             - Confirm pending kill");
    println!("  DELETE /api/kill                     - Cancel pending kill");
    println!("  GET    /api/settings                 - Show settings");
    println!("  PUT    /api/settings                 - Update settings");
    println!("  GET    /metrics                      - Prometheus metrics");
    println!("  GET    /health                       - Health check");
    println!("═══════════════════════════════════════════════════════════");
}
