//! Serves the items API.

use items_api::{
    infra::{config, database, logging},
    server,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = config::load_config()?;
    let _guard = logging::init_logging(&config.logging);
    let db = database::init_db(&config.database);

    let listener = TcpListener::bind(format!(
        "{}:{}",
        config.server.http_address, config.server.http_port
    ))
    .await?;
    server::run_app(listener, db, config).await?;

    Ok(())
}
