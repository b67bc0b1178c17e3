//! Standalone Handy API simulator.
//!
//! - `HANDY_SIM_PORT`: listen port, default 3000.
//! - `HANDY_SIM_SKEW_MS`: server clock skew from the host clock.
//! - `HANDY_SIM_KEYS`: comma-separated connection keys treated as connected.
//!   Without it every key is accepted and gets a device entry that lives for
//!   the life of the process, so set it for anything long-running.

use handy_sim::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handy_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = env_or("HANDY_SIM_PORT", 3000)?;
    let skew_ms: f64 = env_or("HANDY_SIM_SKEW_MS", 0.0)?;

    let keys: Vec<String> = std::env::var("HANDY_SIM_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();

    let state = if keys.is_empty() {
        AppState::new(skew_ms)
    } else {
        tracing::info!("Accepting connection keys: {:?}", keys);
        AppState::with_keys(skew_ms, keys)
    };
    tracing::info!("Server clock skew {}ms", skew_ms);

    handy_sim::run(port, state).await
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}
