//! Subprocess control for the external iperf3 tool.

use std::process::{Output, Stdio};

use tokio::process::{Child, Command};

/// Spawn iperf3 as a tracked background process (server mode).
///
/// stdout is piped so the statistics it prints can be collected on stop;
/// stderr is discarded. The spawn is not verified beyond the OS launching
/// the executable -- a failed bind surfaces through the first client run.
pub fn spawn_server(binary: &str, args: &[String]) -> std::io::Result<Child> {
    Command::new(binary)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
}

/// Kill a tracked server process, reap it, and drain its buffered stdout.
pub async fn shutdown(mut server: Child) -> std::io::Result<Output> {
    server.start_kill()?;
    server.wait_with_output().await
}

/// Run iperf3 in the foreground (client mode), capturing both streams.
///
/// Returns once the process exits; there is no timeout beyond the duration
/// iperf3 enforces itself.
pub async fn run(binary: &str, args: &[String]) -> std::io::Result<Output> {
    Command::new(binary)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
}
