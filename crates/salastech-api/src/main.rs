//! SalasTech Server Entry Point

use salastech_api::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    println!("SalasTech reservation server starting on {}", config.bind_address);

    salastech_api::start_server(config).await?;

    Ok(())
}
