//! Cancellation signalling between the Ctrl-C handler and the engine.
//!
//! The signal is a counter on a `tokio::sync::watch` channel. Each receiver
//! tracks which signals it has already seen, so a driver can consume one
//! interrupt while the engine still reacts only to the next.

use tokio::sync::watch;

/// Sending half, owned by whatever listens for interrupts.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<u64>);

/// Receiving half, cloned into the engine and the interactive driver.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<u64>);

/// Create a linked handle/token pair.
pub fn channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(0);
    (CancelHandle(tx), CancelToken(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_modify(|n| *n += 1);
    }
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self(rx)
    }

    /// Forget every signal received so far.
    pub fn reset(&mut self) {
        self.0.borrow_and_update();
    }

    /// Whether a signal arrived since the last [`reset`](Self::reset) or
    /// [`cancelled`](Self::cancelled).
    pub fn is_cancelled(&self) -> bool {
        self.0.has_changed().unwrap_or(false)
    }

    /// Resolve on the next unseen signal. Pends forever once the handle is
    /// dropped.
    pub async fn cancelled(&mut self) {
        if self.0.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_seen_once_per_receiver() {
        let (handle, mut token) = channel();
        let mut other = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
        assert!(!token.is_cancelled());
        assert!(other.is_cancelled());

        other.reset();
        assert!(!other.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut token = CancelToken::never();
        assert!(!token.is_cancelled());
        let fired = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(fired.is_err());
    }
}
