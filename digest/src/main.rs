mod auth;
mod digest_config;
mod email;
mod error;
mod model;
mod pipeline;
mod prompt;
mod rate_limiters;
mod session;
#[cfg(test)]
mod testing;
mod util;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use digest_config::{app_dir, DigestConfig};
use session::Session;

pub type HttpClient = reqwest::Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let root = app_dir();
    let config = DigestConfig::load(&root).context("Failed to load configuration")?;
    tracing::debug!("{}", config);

    let http_client = reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .build()
        .context("Failed to build HTTP client")?;

    let session = Session::connect(config, http_client, &root)
        .await
        .inspect_err(|e| tracing::error!("Could not connect to Gmail: {}", e))?;

    tracing::info!("Building digest for {}", session.email_address);
    let report = session
        .run()
        .await
        .inspect_err(|e| tracing::error!("Digest run failed: {}", e))?;

    println!("{}", report.render());

    if report.stats.mark_read_failed > 0 {
        tracing::warn!(
            "{} emails remain unread after a failed mark-read",
            report.stats.mark_read_failed
        );
    }

    Ok(())
}
