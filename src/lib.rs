//! iperf3-remote -- bandwidth-measurement keywords for test automation.
//!
//! This crate wraps the external `iperf3` command-line tool behind three
//! keywords -- start a measurement server, stop it and collect statistics,
//! run a measurement client -- callable in-process through [`Iperf3`] or
//! over a network keyword bridge started with [`serve`]. The measurement
//! itself is done entirely by iperf3; this crate builds its command line,
//! manages its process lifecycle, and translates its JSON output.
//!
//! iperf3 must be installed and resolvable through `PATH` (or pointed at
//! explicitly with [`Iperf3::with_binary`] / `--iperf3`).

pub mod command;
pub mod keywords;
pub mod process;
pub mod rpc;
pub mod translate;

pub use keywords::Iperf3;

use anyhow::Result;
use thiserror::Error;

/// Errors surfaced by the bandwidth keywords.
#[derive(Debug, Error)]
pub enum KeywordError {
    /// A keyword argument failed validation before anything was spawned.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The iperf3 client exited non-zero. The message is the tool's own
    /// `error` field when its output carries one, raw stderr otherwise.
    #[error("{message}")]
    ClientFailed { message: String },

    /// The iperf3 executable could not be launched.
    #[error("failed to spawn iperf3: {source}")]
    Spawn {
        #[from]
        source: std::io::Error,
    },

    /// The client printed something that is not a JSON report.
    #[error("malformed iperf3 report: {source}")]
    MalformedReport {
        #[from]
        source: serde_json::Error,
    },
}

/// Start the keyword bridge: bind the listener and serve keywords forever.
pub async fn serve(address: &str, port: u16, binary: &str) -> Result<()> {
    let ip: std::net::IpAddr = address.parse()?;
    let addr = std::net::SocketAddr::from((ip, port));

    let state = rpc::AppState::new(Iperf3::with_binary(binary));
    let app = rpc::router(state);

    tracing::info!(%addr, %binary, "iperf3 keyword server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
