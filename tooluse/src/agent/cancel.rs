//! Cooperative cancellation for a run.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

/// Cloneable handle that stops a run.
///
/// The runner checks the signal before every completion and races the
/// in-flight completion against it, so a cancelled run ends promptly even
/// while the provider is still streaming. A tool call that has already
/// started is allowed to finish.
///
/// ```rust,ignore
/// let cancel = CancelSignal::new();
/// let config = RunConfig::default().cancel(cancel.clone());
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     cancel.cancel_with_reason("interrupted");
/// });
/// ```
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sig: Arc<watch::Sender<bool>>,
    reason: Arc<OnceLock<String>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    /// Create a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sig, _) = watch::channel(false);
        Self {
            sig: Arc::new(sig),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Cancel the run.
    pub fn cancel(&self) {
        self.sig.send_replace(true);
    }

    /// Cancel with a reason message. Only the first reason is kept.
    pub fn cancel_with_reason(&self, reason: &str) {
        let _ = self.reason.set(reason.to_owned());
        self.cancel();
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sig.borrow()
    }

    /// The reason passed to [`cancel_with_reason`](Self::cancel_with_reason).
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.sig.subscribe();
        // The sender lives as long as `self`, so this only fails if it was
        // dropped, which cannot happen while we hold a reference.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_clear() {
        let cancel = CancelSignal::new();
        assert!(!cancel.is_cancelled());
        assert_eq!(cancel.reason(), None);
    }

    #[test]
    fn clones_share_state() {
        let cancel = CancelSignal::new();
        let other = cancel.clone();
        other.cancel_with_reason("user hit ctrl-c");
        assert!(cancel.is_cancelled());
        assert_eq!(cancel.reason(), Some("user hit ctrl-c"));
    }

    #[test]
    fn first_reason_wins() {
        let cancel = CancelSignal::new();
        cancel.cancel_with_reason("first");
        cancel.cancel_with_reason("second");
        assert_eq!(cancel.reason(), Some("first"));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_fire() {
        let cancel = CancelSignal::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });
        tokio::time::timeout(Duration::from_secs(2), cancel.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_is_immediate_when_already_fired() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_millis(100), cancel.cancelled())
            .await
            .unwrap();
    }
}
