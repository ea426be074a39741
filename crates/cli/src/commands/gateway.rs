//! `clerk gateway`: start the HTTP API server.

use clerk_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Clerk Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:      {}", config.model);
    println!("   Transcript: {}", config.transcript.path.display());

    clerk_gateway::start(config).await?;

    Ok(())
}
