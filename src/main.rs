mod apply;
mod auth;
mod browser;
mod collectors;
mod config;
mod error;
mod models;
mod outreach;
mod pacing;
mod runner;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobagent=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::parse();
    if let Err(e) = runner::run(config).await {
        tracing::error!("Run aborted: {e:#}");
        return Err(e);
    }
    Ok(())
}
