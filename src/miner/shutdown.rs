//! Process signal handling
//!
//! Signals only cancel the shutdown token. The coordinator notices the
//! cancellation, writes its checkpoint, and returns.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a task that cancels `token` on SIGINT, or SIGTERM on Unix
pub fn listen_for_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = tokio::select! {
            name = wait_for_signal() => name,
            _ = token.cancelled() => return,
        };

        tracing::warn!("Received {}, stopping after checkpoint", signal);
        token.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
