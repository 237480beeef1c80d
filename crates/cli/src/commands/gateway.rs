//! `bravomind gateway`: Start the HTTP API server.

use bravomind_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Bravo Mind Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Generator: {}",
        if config.has_api_key() {
            config.provider.name.as_str()
        } else {
            "offline (no API key)"
        }
    );
    println!(
        "   Rate limit: {} requests / {} ms ({:?})",
        config.rate_limit.max_requests, config.rate_limit.time_window, config.rate_limit.scope
    );

    bravomind_gateway::start(config).await?;

    Ok(())
}
