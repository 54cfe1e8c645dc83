use anyhow::Context;
use tokio::net::TcpListener;

use booking_assist::config::AssistantConfig;
use booking_assist::server::build_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistantConfig::from_env().context("reading configuration")?;
    let app = build_app(&config)
        .await
        .with_context(|| format!("loading {}", config.business_file.display()))?;

    eprintln!("📅 Booking Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Health:   http://0.0.0.0:{}/health", config.port);
    eprintln!("   Business: http://0.0.0.0:{}/api/business", config.port);
    eprintln!("   Workflow: http://0.0.0.0:{}/api/workflow", config.port);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
