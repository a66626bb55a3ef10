//! Web API stubs shared by the unit tests in this crate

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bind `app` on an ephemeral loopback port and return its base URL.
pub async fn spawn_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Request counter shared between a stub handler and the test body.
#[derive(Debug, Clone, Default)]
pub struct StubCounter(Arc<AtomicUsize>);

impl StubCounter {
    /// Record one request and return the 1-based index of it.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
