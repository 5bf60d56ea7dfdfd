use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transformers_udf::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transformers_udf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { bucket, verbose } => {
            transformers_udf::cli::list(bucket, verbose)?;
        }
        Commands::Info { bucket, model } => {
            transformers_udf::cli::info(bucket, model)?;
        }
        Commands::Pull {
            bucket,
            token_connection,
            repo,
        } => {
            transformers_udf::cli::pull(bucket, token_connection, repo)?;
        }
    }

    Ok(())
}
