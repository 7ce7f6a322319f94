mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schemarag::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only command results
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(graph_db) = cli.graph_db {
        config.graph_db = graph_db;
    }

    match cli.command {
        cli::Commands::Seed { schema } => commands::seed::run(&config, schema.as_deref())?,
        cli::Commands::Retrieve {
            question,
            retrieval,
            format,
        } => commands::retrieve::run(&config, &question, &retrieval, format).await?,
        cli::Commands::Ask {
            question,
            retrieval,
            data_db,
            format,
        } => {
            if let Some(data_db) = data_db {
                config.data_db = data_db;
            }
            commands::ask::run(&config, &question, &retrieval, format).await?
        }
        #[cfg(feature = "http")]
        cli::Commands::Serve {
            host,
            port,
            data_db,
        } => {
            if let Some(data_db) = data_db {
                config.data_db = data_db;
            }
            commands::serve::run(&config, &host, port).await?
        }
    }

    Ok(())
}
