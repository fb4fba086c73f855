//! Turns process signals into cooperative cancellation.
//!
//! The first SIGINT, SIGTERM or SIGHUP cancels a shared
//! [`tokio_util::sync::CancellationToken`] so sync passes and maintenance
//! workers can wind down. A second signal exits immediately with the
//! conventional interrupt code.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Installs the signal listener and returns the token it cancels.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(listen(token.clone()));
    token
}

#[cfg(unix)]
async fn listen(token: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut interrupt) = signal(SignalKind::interrupt()) else {
        warn!("Failed to register SIGINT handler; shutdown signals are disabled");
        return;
    };
    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        warn!("Failed to register SIGTERM handler; shutdown signals are disabled");
        return;
    };
    let Ok(mut hangup) = signal(SignalKind::hangup()) else {
        warn!("Failed to register SIGHUP handler; shutdown signals are disabled");
        return;
    };

    let mut seen = 0u32;
    loop {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
            _ = hangup.recv() => {}
        }
        handle_signal(&token, &mut seen);
    }
}

#[cfg(not(unix))]
async fn listen(token: CancellationToken) {
    let mut seen = 0u32;
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to listen for Ctrl+C; shutdown signals are disabled");
            return;
        }
        handle_signal(&token, &mut seen);
    }
}

fn handle_signal(token: &CancellationToken, seen: &mut u32) {
    *seen += 1;
    if *seen == 1 {
        info!("Shutdown signal received, letting the current pass finish");
        info!("Send the signal again to exit immediately");
        token.cancel();
    } else {
        warn!("Second shutdown signal, exiting now");
        std::process::exit(130);
    }
}
