use anyhow::{Context, Result};
use clap::Parser;
use jambo_chat::{create_router, AppState, Config, Relay};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jambo-chat")]
#[command(about = "Swahili chat service with streamed replies and English translations")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/jambo-chat")]
    config: String,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may hold OPENAI_API_KEY / ANTHROPIC_API_KEY
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Default model: {}", cfg.session.default_model);

    let fallback = cfg.fallback_credentials()?;
    let presence = fallback.presence();
    info!(
        "Fallback keys: openai={}, anthropic={}",
        presence.openai, presence.anthropic
    );

    let relay = Relay::from_config(&cfg.providers).context("Failed to build provider clients")?;
    let state = AppState::new(relay, fallback, cfg.session.default_model);

    // Sweep idle sessions
    let sessions = state.sessions.clone();
    let idle_timeout = Duration::from_secs(cfg.session.idle_timeout_secs);
    let sweep_interval = Duration::from_secs(cfg.session.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_idle(idle_timeout).await;
            if evicted > 0 {
                info!("Evicted {} idle session(s)", evicted);
            }
        }
    });

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
