use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "iperf3-remote",
    about = "Remote test-automation keywords for iperf3 bandwidth measurement",
    version,
    long_about = None
)]
struct Cli {
    /// Keyword server listen address
    #[arg(short, long, default_value = "0.0.0.0")]
    address: String,

    /// Keyword server listen port
    #[arg(short, long, default_value_t = 8270)]
    port: u16,

    /// iperf3 executable to invoke
    #[arg(long, default_value = "iperf3")]
    iperf3: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(address = %cli.address, port = cli.port, "Starting iperf3 keyword server");
    iperf3_remote::serve(&cli.address, cli.port, &cli.iperf3).await?;

    Ok(())
}
