//! Single-slot coalescing signals with bounded waits.
//!
//! Each slot holds at most one pending token. Signalling a slot that already
//! holds a token does nothing, so a waiter only learns that *at least one*
//! event happened since its last successful wait, never how many. One token
//! wakes at most one waiter.

use std::time::Duration;

use tokio::sync::Notify;

/// Which notifier slot to signal or wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A health update was recorded.
    HealthChanged,
    /// A chat line was recorded.
    MessageReceived,
}

/// A pair of independent single-slot signals.
#[derive(Debug, Default)]
pub struct Notifier {
    health: Notify,
    message: Notify,
}

impl Notifier {
    /// Create a notifier with both slots empty.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: SignalKind) -> &Notify {
        match kind {
            SignalKind::HealthChanged => &self.health,
            SignalKind::MessageReceived => &self.message,
        }
    }

    /// Place a token in the `kind` slot. Never blocks.
    ///
    /// `notify_one` stores at most one permit when nobody is waiting, which
    /// is exactly the coalescing behavior of a one-element buffer.
    pub fn signal(&self, kind: SignalKind) {
        self.slot(kind).notify_one();
    }

    /// Wait until a token is available in the `kind` slot or `timeout`
    /// elapses.
    ///
    /// Returns `true` if a token was consumed. A pending token is consumed
    /// even with a zero timeout.
    ///
    /// # Example
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use std::time::Duration;
    /// use mc_loadbot::notifier::{Notifier, SignalKind};
    ///
    /// let notifier = Notifier::new();
    /// notifier.signal(SignalKind::MessageReceived);
    /// notifier.signal(SignalKind::MessageReceived);
    ///
    /// assert!(notifier.wait_for(SignalKind::MessageReceived, Duration::ZERO).await);
    /// assert!(!notifier.wait_for(SignalKind::MessageReceived, Duration::from_millis(10)).await);
    /// # }
    /// ```
    pub async fn wait_for(&self, kind: SignalKind, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.slot(kind).notified())
            .await
            .is_ok()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn repeated_signals_coalesce_into_one_token() {
        let notifier = Notifier::new();
        for _ in 0..5 {
            notifier.signal(SignalKind::MessageReceived);
        }

        assert!(notifier.wait_for(SignalKind::MessageReceived, SHORT).await);
        assert!(!notifier.wait_for(SignalKind::MessageReceived, SHORT).await);
    }

    #[tokio::test]
    async fn slots_are_independent() {
        let notifier = Notifier::new();
        notifier.signal(SignalKind::HealthChanged);

        assert!(!notifier.wait_for(SignalKind::MessageReceived, SHORT).await);
        assert!(notifier.wait_for(SignalKind::HealthChanged, SHORT).await);
    }

    #[tokio::test]
    async fn zero_timeout_consumes_pending_token() {
        let notifier = Notifier::new();
        notifier.signal(SignalKind::HealthChanged);

        assert!(notifier.wait_for(SignalKind::HealthChanged, Duration::ZERO).await);
        assert!(!notifier.wait_for(SignalKind::HealthChanged, Duration::ZERO).await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_bounded_by_timeout() {
        let notifier = Notifier::new();
        let timeout = Duration::from_millis(1000);

        let started = Instant::now();
        let woke = notifier.wait_for(SignalKind::HealthChanged, timeout).await;
        let elapsed = started.elapsed();

        assert!(!woke);
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(50), "{elapsed:?}");
    }

    #[tokio::test]
    async fn signal_wakes_a_blocked_waiter() {
        let notifier = Arc::new(Notifier::new());
        let waiter = {
            let notifier = Arc::clone(&notifier);
            tokio::spawn(async move {
                notifier
                    .wait_for(SignalKind::MessageReceived, Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        notifier.signal(SignalKind::MessageReceived);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn one_token_wakes_at_most_one_waiter() {
        let notifier = Arc::new(Notifier::new());
        let mut waiters = Vec::new();
        for _ in 0..2 {
            let notifier = Arc::clone(&notifier);
            waiters.push(tokio::spawn(async move {
                notifier
                    .wait_for(SignalKind::HealthChanged, Duration::from_millis(200))
                    .await
            }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        notifier.signal(SignalKind::HealthChanged);

        let mut woken = 0;
        for waiter in waiters {
            if waiter.await.unwrap() {
                woken += 1;
            }
        }
        assert_eq!(woken, 1);
    }
}
