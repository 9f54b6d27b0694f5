//! Process-wide graceful shutdown requests.
//!
//! Failures that must stop the process leave a [`ShutdownRequested`] marker on
//! their response. [`watch`] wraps a router, consumes the marker and sends the
//! reason through [`Shutdown`]. `main` owns the [`ShutdownListener`] and stops
//! the server when a message arrives.

use axum::{middleware::map_response, response::Response, Router};
use tokio::sync::mpsc;

#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Debug)]
pub struct ShutdownListener {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Response marker for failures that require the process to stop. The
/// nearest [`watch`] layer signals once and removes it.
#[derive(Clone, Debug)]
pub struct ShutdownRequested(pub String);

impl Shutdown {
    pub fn channel() -> (Shutdown, ShutdownListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Shutdown { tx }, ShutdownListener { rx })
    }

    /// Ask for a graceful stop. Never blocks; a closed listener is ignored.
    pub fn signal(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%reason, "shutdown requested");
        let _ = self.tx.send(reason);
    }
}

impl ShutdownListener {
    /// Wait for the next shutdown request.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Pending request, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Signal shutdown for every response carrying a [`ShutdownRequested`]
/// marker. The marker is removed, so nested watchers signal only once.
pub fn watch(router: Router, shutdown: Shutdown) -> Router {
    router.layer(map_response(move |mut resp: Response| {
        let shutdown = shutdown.clone();
        async move {
            let marker = resp.extensions_mut().remove::<ShutdownRequested>();
            if let Some(ShutdownRequested(reason)) = marker {
                shutdown.signal(reason);
            }
            resp
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body, extract::Request, http::StatusCode, response::IntoResponse, routing::get,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn signal_reaches_listener() {
        let (shutdown, mut listener) = Shutdown::channel();
        shutdown.clone().signal("request context missing");
        assert_eq!(listener.recv().await.as_deref(), Some("request context missing"));
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn signal_after_listener_dropped_is_harmless() {
        let (shutdown, listener) = Shutdown::channel();
        drop(listener);
        shutdown.signal("late");
    }

    #[tokio::test]
    async fn nested_watchers_signal_once() {
        let (shutdown, mut listener) = Shutdown::channel();
        let inner = Router::new().route(
            "/fatal",
            get(|| async {
                let mut resp = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                resp.extensions_mut().insert(ShutdownRequested("ledger mismatch".into()));
                resp
            }),
        );
        let app = watch(watch(inner, shutdown.clone()), shutdown);

        let req = Request::builder().uri("/fatal").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(listener.try_recv().as_deref(), Some("ledger mismatch"));
        assert!(listener.try_recv().is_none());
    }
}
