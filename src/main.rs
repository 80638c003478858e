mod catalog;
mod cli;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod omdb;
mod store;
#[cfg(test)]
mod test_utils;

use std::process::ExitCode;

use clap::Parser;

use crate::{catalog::Catalog, cli::Cli, config::Config, omdb::OmdbClient, store::DbStore};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movielist=debug,sqlx=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("movielist/0.1")
        .timeout(config.omdb_timeout)
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let omdb = OmdbClient::new(
        http,
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        config.omdb_rps,
    );
    let catalog = Catalog::new(DbStore::new(db), omdb);

    match cli::run(&catalog, args.command).await {
        Ok(output) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{output}");
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{}", cli::failure_message(&err));
            Ok(ExitCode::FAILURE)
        },
    }
}
