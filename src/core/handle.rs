//! Caller-facing handles for submitted operations.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, watch};

use crate::core::scheduler::Shared;

/// Identifier assigned to each submission, unique within one scheduler.
pub type HandleId = u64;

/// Lifecycle state of a submitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Waiting in the queue for a free slot.
    Queued,
    /// Admitted and occupying a slot.
    Running,
    /// Operation finished normally.
    Completed,
    /// Operation signalled an error.
    Failed,
    /// Cancelled by the caller before finishing.
    Cancelled,
}

impl HandleState {
    /// Whether the state is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Handle to one submitted operation.
///
/// The handle is a [`Stream`] of the operation's values: `Ok` items in the
/// order the operation produced them, then the operation's error if it failed,
/// then end of stream. A queued handle yields nothing until it is admitted.
/// A cancelled handle ends immediately.
///
/// Dropping a handle that has not reached a terminal state cancels it.
pub struct Handle<T, E> {
    id: HandleId,
    shared: Arc<Shared>,
    state: watch::Receiver<HandleState>,
    values: mpsc::UnboundedReceiver<Result<T, E>>,
}

impl<T, E> Handle<T, E> {
    pub(crate) fn new(
        id: HandleId,
        shared: Arc<Shared>,
        state: watch::Receiver<HandleState>,
        values: mpsc::UnboundedReceiver<Result<T, E>>,
    ) -> Self {
        Self {
            id,
            shared,
            state,
            values,
        }
    }

    /// Submission identifier.
    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandleState {
        *self.state.borrow()
    }

    /// Cancel the operation.
    ///
    /// A queued operation is removed without ever starting. A running one is
    /// told to stop; its slot is released once the operation has wound down.
    /// Has no effect once the handle is terminal, and calling it again has no
    /// further effect.
    pub fn cancel(&self) {
        self.shared.cancel(self.id);
    }

    /// Wait until the operation has left the queue.
    ///
    /// Resolves with `Running` or with a terminal state if it was cancelled
    /// while waiting.
    pub async fn admitted(&mut self) -> HandleState {
        self.wait_for(|state| state != HandleState::Queued).await
    }

    /// Wait for the terminal state.
    pub async fn settled(&mut self) -> HandleState {
        self.wait_for(HandleState::is_terminal).await
    }

    async fn wait_for(&mut self, predicate: impl Fn(HandleState) -> bool) -> HandleState {
        let waited = self
            .state
            .wait_for(|state| predicate(*state))
            .await
            .map(|state| *state);
        waited.unwrap_or_else(|_| *self.state.borrow())
    }
}

impl<T, E> Unpin for Handle<T, E> {}

impl<T, E> Stream for Handle<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let state = *this.state.borrow();
        if state == HandleState::Cancelled {
            return Poll::Ready(None);
        }
        this.values.poll_recv(cx)
    }
}

impl<T, E> std::fmt::Debug for Handle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T, E> Drop for Handle<T, E> {
    fn drop(&mut self) {
        let state = *self.state.borrow();
        if !state.is_terminal() {
            self.shared.cancel(self.id);
        }
    }
}
