//! Timeout policies
//!
//! Connections whose purpose is not yet established (version negotiation
//! and initial authentication still in flight) are bounded by a fixed
//! policy so half-open peers cannot pin resources.

use std::future::Future;
use std::time::Duration;

use crate::error::{ConnectionError, ConnectionResult};

/// A deadline applied to a connection action
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy(Duration);

/// Policy covering version negotiation and initial authentication
pub const UNKNOWN_PURPOSE_TIMEOUT: TimeoutPolicy = TimeoutPolicy(Duration::from_secs(15));

impl TimeoutPolicy {
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Run an action under this policy, mapping elapse to
    /// `ActionTimedOut`.
    pub async fn execute<T, F>(&self, action: F) -> ConnectionResult<T>
    where
        F: Future<Output = ConnectionResult<T>>,
    {
        match tokio::time::timeout(self.0, action).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::ActionTimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_action_completes() {
        let policy = TimeoutPolicy::new(Duration::from_secs(5));
        let result = policy.execute(async { Ok(42) }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_action_times_out() {
        let policy = TimeoutPolicy::new(Duration::from_secs(1));
        let result: ConnectionResult<()> = policy
            .execute(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ConnectionError::ActionTimedOut)));
    }

    #[test]
    fn unknown_purpose_timeout_is_fifteen_seconds() {
        assert_eq!(UNKNOWN_PURPOSE_TIMEOUT.duration(), Duration::from_secs(15));
    }
}
