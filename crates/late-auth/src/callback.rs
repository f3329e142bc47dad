//! Loopback HTTP listener that receives the OAuth redirect.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

/// First port tried for the redirect listener.
pub const CALLBACK_PORT_START: u16 = 8080;
/// Last port tried for the redirect listener.
pub const CALLBACK_PORT_END: u16 = 8089;

const SUCCESS_PAGE: &str = "<html><body><h1>Signed in to Late</h1><p>You can close this window and return to the terminal.</p></body></html>";

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// Every port in the callback range is already taken.
#[derive(Debug, thiserror::Error)]
#[error("No available port for OAuth callback in {start}-{end}")]
pub struct NoCallbackPort {
    pub start: u16,
    pub end: u16,
}

/// Find an available port in the given range
pub fn find_available_port(start: u16, end: u16) -> Option<u16> {
    (start..=end).find(|port| std::net::TcpListener::bind(("127.0.0.1", *port)).is_ok())
}

/// Serve `/callback` on `port` until the first redirect arrives, then return
/// the authorization code after checking `state`.
pub async fn wait_for_callback(port: u16, expected_state: &str) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let routes = warp::get()
        .and(warp::path("callback"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::any().map(move || tx.clone()))
        .and_then(|params: HashMap<String, String>, tx: CallbackSender| async move {
            if let Some(sender) = tx.lock().await.take() {
                let _ = sender.send(params);
            }
            Ok::<_, warp::Rejection>(warp::reply::html(SUCCESS_PAGE))
        });

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(([127, 0, 0, 1], port), async move {
            let _ = shutdown_rx.await;
        })
        .context("Failed to bind OAuth callback listener")?;
    let server = tokio::spawn(server);

    tracing::info!("Waiting for OAuth callback on {}", addr);

    let params = rx.await.context("OAuth callback listener closed early");
    let _ = shutdown_tx.send(());
    let _ = server.await;

    parse_callback(&params?, expected_state)
}

/// Extract the code from redirect query parameters.
pub fn parse_callback(params: &HashMap<String, String>, expected_state: &str) -> Result<String> {
    if let Some(error) = params.get("error") {
        anyhow::bail!("Authorization denied: {}", error);
    }

    let state = params.get("state").context("No state in callback")?;
    if state != expected_state {
        anyhow::bail!("State mismatch - possible CSRF attack");
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .context("No code in callback")
}
