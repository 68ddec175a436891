use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a call stopped waiting before the network step finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("call was cancelled")]
    Cancelled,

    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

/// Per-call options: deadline, one-way marker, cancellation and extra
/// side-channel meta.
///
/// The deadline is an absolute wall-clock instant so it can be propagated to
/// the server in the request meta.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    deadline: Option<DateTime<Utc>>,
    oneway: bool,
    cancellation: Option<CancellationToken>,
    extra_meta: BTreeMap<String, String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let deadline = Utc::now()
            .checked_add_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.with_deadline(deadline)
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Marks the call as fire-and-forget: the request is sent and no
    /// response is read.
    pub fn oneway(mut self) -> Self {
        self.oneway = true;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attaches an extra meta entry to the request.
    ///
    /// Reserved keys (`deadline`, `oneway`) are always overwritten by the
    /// typed options.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_meta.insert(key.into(), value.into());
        self
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn extra_meta(&self) -> &BTreeMap<String, String> {
        &self.extra_meta
    }

    /// Time left until the deadline, clamped at zero. `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Fails if the call is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(ContextError::Cancelled);
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the call is cancelled or its deadline passes.
    ///
    /// Never resolves for options with neither a deadline nor a cancellation
    /// token, so it can always sit in a `select!` branch.
    pub async fn done(&self) -> ContextError {
        let deadline = async {
            match self.remaining() {
                Some(remaining) => tokio::time::sleep(remaining).await,
                None => std::future::pending::<()>().await,
            }
        };

        match &self.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => ContextError::Cancelled,
                _ = deadline => ContextError::DeadlineExceeded,
            },
            None => {
                deadline.await;
                ContextError::DeadlineExceeded
            }
        }
    }
}
