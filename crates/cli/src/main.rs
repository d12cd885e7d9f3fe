use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use veil_dns_domain::{CliOverrides, Config};
use veil_dns_proxy::Proxy;

mod bootstrap;

#[derive(Parser)]
#[command(name = "veil-dns")]
#[command(version)]
#[command(about = "Veil DNS - local DNS-to-DoH forwarding proxy")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// UDP port to listen on
    #[arg(short = 'p', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = Config::load(cli.config.as_deref(), cli_overrides)?;
    config.validate()?;

    bootstrap::init_logging(&config.logging)?;

    info!("Starting Veil DNS v{}", env!("CARGO_PKG_VERSION"));

    // Failure to bind the listener is the one fatal error.
    let proxy = Proxy::bind(&config).await?;

    let shutdown = CancellationToken::new();
    bootstrap::spawn_signal_handler(shutdown.clone());

    proxy.run(shutdown).await;

    info!("Shutdown complete");
    Ok(())
}
