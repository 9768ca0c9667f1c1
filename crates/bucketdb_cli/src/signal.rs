//! Ctrl-C / SIGTERM handling.
//!
//! The engines are synchronous, so the listener runs on its own thread with a
//! current-thread runtime and trips a [`CancellationToken`] the engines poll.

use bucketdb_core::CancellationToken;
use std::thread;
use tokio::signal;
use tracing::{info, warn};

/// Starts the signal listener and returns the token it trips.
///
/// If the listener cannot be started the token simply never fires.
pub fn install() -> CancellationToken {
    let token = CancellationToken::new();
    let trip = token.clone();

    let spawned = thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "failed to start signal runtime");
                    return;
                }
            };
            runtime.block_on(shutdown_signal());
            trip.cancel();
        });

    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn signal listener");
    }
    token
}

/// Waits for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, stopping at the next safe point"),
        () = terminate => info!("received SIGTERM, stopping at the next safe point"),
    }
}
