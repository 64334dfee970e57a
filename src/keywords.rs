//! The bandwidth-measurement keywords.

use serde_json::Value;
use tokio::process::Child;

use crate::command::{self, ClientOptions, ServerOptions};
use crate::{process, translate, KeywordError};

/// Bandwidth-measurement keywords backed by the external `iperf3` tool.
///
/// One instance tracks at most one background server process. The keywords
/// take `&mut self` and are not designed for concurrent callers; the
/// network bridge serializes calls to a single instance.
///
/// Dropping an instance kills any tracked server, discarding its
/// statistics. The OS-level process a previous run left behind is not an
/// error: `start_server` reuses it by simply not starting another one.
pub struct Iperf3 {
    binary: String,
    server: Option<Child>,
}

impl Iperf3 {
    /// Keywords backed by `iperf3` resolved through `PATH`.
    pub fn new() -> Self {
        Self::with_binary("iperf3")
    }

    /// Keywords backed by a specific iperf3 executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            server: None,
        }
    }

    /// Whether a server process is currently tracked by this instance.
    pub fn server_running(&self) -> bool {
        self.server.is_some()
    }

    /// OS pid of the tracked server process, if any.
    pub fn server_pid(&self) -> Option<u32> {
        self.server.as_ref().and_then(Child::id)
    }

    /// Start the iperf3 server, optionally on a given port and bound to a
    /// given address. With a server already tracked this starts nothing and
    /// leaves the existing one untouched.
    ///
    /// Whether the server actually bound its port is not checked here; a
    /// failed start surfaces through the first client run against it.
    pub fn start_server(&mut self, options: ServerOptions) -> Result<(), KeywordError> {
        if self.server.is_some() {
            tracing::info!("iperf3 server already running, not starting another one");
            return Ok(());
        }

        let args = command::server_args(&options);
        let server = process::spawn_server(&self.binary, &args)?;
        tracing::info!(pid = ?server.id(), ?args, "started iperf3 server");
        self.server = Some(server);

        Ok(())
    }

    /// Stop the tracked iperf3 server and return its statistics, one
    /// document per client that connected. Without a tracked server this is
    /// a no-op returning an empty list.
    ///
    /// The handle is cleared even when killing, reaping, or parsing fails;
    /// such failures are logged and whatever statistics were successfully
    /// parsed (possibly none) are returned.
    pub async fn stop_server(&mut self) -> Vec<Value> {
        let Some(server) = self.server.take() else {
            return Vec::new();
        };

        let pid = server.id();
        match process::shutdown(server).await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stats = translate::parse_reports(&stdout);
                tracing::info!(?pid, clients = stats.len(), "stopped iperf3 server");
                stats
            }
            Err(err) => {
                tracing::warn!(?pid, %err, "error collecting iperf3 server statistics");
                Vec::new()
            }
        }
    }

    /// Run the iperf3 client against `server_address` and return the parsed
    /// report, with integers the keyword transport cannot carry widened to
    /// floats.
    ///
    /// Blocks until the configured duration (or byte count) is exhausted.
    /// A non-zero exit becomes [`KeywordError::ClientFailed`] carrying the
    /// tool's own `error` message when its output contains one, the raw
    /// stderr text otherwise.
    pub async fn run_client(&self, options: ClientOptions) -> Result<Value, KeywordError> {
        let args = command::client_args(&options)?;

        tracing::info!(server = %options.server_address, ?args, "running iperf3 client");
        let output = process::run(&self.binary, &args).await?;

        if !output.status.success() {
            let message = client_error_message(&output);
            tracing::warn!(code = ?output.status.code(), %message, "iperf3 client failed");
            return Err(KeywordError::ClientFailed { message });
        }

        let mut report: Value = serde_json::from_slice(&output.stdout)?;
        translate::normalize(&mut report);
        Ok(report)
    }
}

impl Default for Iperf3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Iperf3 {
    // Teardown acts as a stop whose statistics are discarded.
    fn drop(&mut self) {
        if let Some(mut server) = self.server.take() {
            if let Err(err) = server.start_kill() {
                tracing::warn!(%err, "failed to kill iperf3 server on teardown");
            }
        }
    }
}

/// Best error detail for a failed client run: the tool reports connection
/// problems in the `error` field of its JSON output; everything earlier
/// (argv rejects, usage errors) only lands on stderr.
fn client_error_message(output: &std::process::Output) -> String {
    serde_json::from_slice::<Value>(&output.stdout)
        .ok()
        .and_then(|report| Some(report.get("error")?.as_str()?.to_owned()))
        .unwrap_or_else(|| String::from_utf8_lossy(&output.stderr).trim().to_owned())
}
