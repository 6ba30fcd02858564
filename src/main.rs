use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use prestowatch::app;
use prestowatch::cli::Args;
use prestowatch::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_args(&args);

    let config = settings.validate()?;
    init_tracing(config.log_level)?;

    for warning in config.warnings() {
        warn!("{}", warning);
    }

    app::run(config).await
}

/// `RUST_LOG` wins over the configured level when set, and takes full directives.
fn init_tracing(level: LevelFilter) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {}: {:?}", EnvFilter::DEFAULT_ENV, directives))?,
        _ => EnvFilter::default().add_directive(level.into()),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
