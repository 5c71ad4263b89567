use anyhow::{Context, Result};
use inference_query::{EndpointConfig, InferenceClient, QueryPayload};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RUST_LOG, so it is loaded before the filter is built.
    dotenvy::dotenv().ok();
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = EndpointConfig::from_env().context("failed to load endpoint configuration")?;
    info!(url = %config.url(), "querying inference endpoint");

    let client = InferenceClient::new(config);
    let payload = QueryPayload::new("A coffee shop with organic beans and pastries");
    let response = client
        .query_response(&payload)
        .await
        .context("inference query failed")?;

    if !response.is_success() {
        warn!(status = response.status, "endpoint answered with a non-success status");
    }
    info!(elapsed_ms = response.elapsed.as_millis() as u64, "query complete");

    let rendered = sonic_rs::to_string(&response.body).context("failed to render response")?;
    println!("{rendered}");
    Ok(())
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
