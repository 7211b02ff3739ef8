//! Migration CLI tool. Reads `DATABASE_URL`; run with `--help` for commands.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,sea_orm_migration=info")
            }),
        )
        .init();

    tracing::info!("Running Quill schema migrations");
    cli::run_cli(migration::Migrator).await;
}
