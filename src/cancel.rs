use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation signal, passed explicitly to every
/// suspend-capable operation.
///
/// Clones observe the same signal. `cancelled()` is select-friendly so
/// network waits can race against it; per-operation timeouts are layered
/// on top as independent timers, not derived from this token.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal has fired; immediately if it already has.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err means every sender is gone, which cannot happen while a clone
        // of this token is alive; park forever rather than resolve falsely.
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
