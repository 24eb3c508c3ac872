//! Per-call cancellation and deadlines.
//!
//! A [`RequestContext`] travels with every operation. The in-flight request is
//! raced against it; whichever finishes first decides the outcome, and the
//! loser is dropped, which aborts the HTTP exchange.

use crate::shared::error::{MachinesError, MachinesResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

/// Cancels the context it was created with, and every context derived from it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A timeout too large to represent as an instant leaves the deadline as is.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// The earlier of the existing and the new deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Derives a child context plus a handle that cancels it. Cancelling
    /// this context's own parent still cancels the child.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.cancel.child_token();
        let ctx = Self {
            deadline: self.deadline,
            cancel: token.clone(),
        };
        (ctx, CancelHandle { token })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is already done, if it is.
    pub fn err(&self) -> Option<MachinesError> {
        if self.cancel.is_cancelled() {
            return Some(MachinesError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(MachinesError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `fut` to completion unless the context finishes first.
    pub async fn run<F, T>(&self, fut: F) -> MachinesResult<T>
    where
        F: Future<Output = MachinesResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(MachinesError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => Err(MachinesError::DeadlineExceeded),
                    result = fut => result,
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(MachinesError::Cancelled),
                    result = fut => result,
                }
            }
        }
    }
}
