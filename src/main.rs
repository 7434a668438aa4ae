use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use ssp_rs::analytics::AnalyticsSink;
use ssp_rs::catalog::{Catalog, FileCatalogAdapter};
use ssp_rs::config::Settings;
use ssp_rs::{api, AppState};

#[derive(Parser, Debug)]
#[command(version = "1.0", about = "An OpenRTB-based SSP ad server")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8081)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "ssp_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set global tracing subscriber");

    let settings = Settings::from_env(args.port);
    info!(
        port = settings.port,
        ssp_id = %settings.ssp_id,
        partners = settings.partners.len(),
        "SSP server starting"
    );

    // 目录不可用是致命的启动错误，非零退出
    let adapter = FileCatalogAdapter::new(&settings.database_url);
    let catalog = match Catalog::load(Box::new(adapter)) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "Failed to initialize catalog");
            std::process::exit(1);
        }
    };
    catalog.spawn_refresher(settings.catalog_refresh_secs);

    // 遥测汇不可用只降级为 no-op，不拦启动
    let analytics = if settings.analytics_enabled {
        AnalyticsSink::open(&settings.analytics_url, 1000, 100, 1000)
    } else {
        info!("Analytics disabled, telemetry is a no-op");
        AnalyticsSink::disabled()
    };

    let state = AppState::new(settings, catalog, analytics);
    let app = api::router(state.clone());

    let addr = format!("0.0.0.0:{}", state.settings.port);
    info!("SSP server running at http://{}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind ingress port");
    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Ingress server failed");
    info!("SSP server shut down.");
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    info!("Shutting down gracefully...");
}
