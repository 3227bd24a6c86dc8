// ─── Cancellation ───
// Cooperative cancellation for a resolution run. Cancelling aborts
// in-flight HTTP requests and discards partial cache writes; the run
// reports `Cancelled` rather than `Failed`.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation flag shared between the host and a running
/// resolution. Once cancelled, stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent. `send_replace` updates the value
    /// even when no waiter is subscribed yet.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        // The sender lives inside self, so changed() cannot error while
        // this token is alive.
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_sticks_without_any_waiter() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());

        // A waiter subscribing only after the fact still observes it.
        let late = token.clone();
        tokio::time::timeout(Duration::from_secs(1), late.cancelled())
            .await
            .expect("late waiter should observe cancellation");
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("should not block");
    }
}
