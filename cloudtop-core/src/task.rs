//! Deferred tasks for async operations
//!
//! A [`Task`] is the system's concurrency primitive: a command that needs the
//! backend returns a task instead of calling the API synchronously. The
//! runtime executes it off the render path and the resulting message re-enters
//! the event stream as [`Event::Message`](crate::event::Event::Message).
//!
//! Tasks are fire-and-forget: one spawn per submission, no queue, no retries
//! and no cancellation. Screens guard against duplicate in-flight work by
//! rejecting re-entry while `loading` is set.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

/// A zero-argument unit of deferred work resolving to exactly one message.
///
/// The future must capture only owned copies of its inputs, never a live
/// reference to mutable screen state.
pub struct Task<M> {
    fut: Pin<Box<dyn Future<Output = M> + Send + 'static>>,
}

impl<M> Task<M> {
    /// Wrap a future into a task.
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = M> + Send + 'static,
    {
        Self { fut: Box::pin(fut) }
    }

    /// Lift the task's message into another message type.
    ///
    /// Used by the app router to wrap screen-local messages into the
    /// app-level message sum.
    pub fn map<N, F>(self, f: F) -> Task<N>
    where
        M: Send + 'static,
        N: Send + 'static,
        F: FnOnce(M) -> N + Send + 'static,
    {
        let fut = self.fut;
        Task::new(async move { f(fut.await) })
    }

    /// Run the task to completion, returning its message.
    pub async fn run(self) -> M {
        self.fut.await
    }
}

impl<M> std::fmt::Debug for Task<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Spawn a task on the tokio runtime, delivering its message through `tx`.
///
/// If the receiving side has gone away the message is dropped; the loop is
/// shutting down at that point.
pub fn spawn_task<M: Send + 'static>(tx: mpsc::UnboundedSender<M>, task: Task<M>) {
    tokio::spawn(async move {
        let msg = task.run().await;
        let _ = tx.send(msg);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestMsg {
        Done(u32),
        Wrapped(String),
    }

    #[tokio::test]
    async fn test_task_runs_to_message() {
        let task = Task::new(async { TestMsg::Done(42) });
        assert_eq!(task.run().await, TestMsg::Done(42));
    }

    #[tokio::test]
    async fn test_task_map() {
        let task = Task::new(async { TestMsg::Done(7) });
        let mapped = task.map(|m| match m {
            TestMsg::Done(n) => TestMsg::Wrapped(n.to_string()),
            other => other,
        });
        assert_eq!(mapped.run().await, TestMsg::Wrapped("7".into()));
    }

    #[tokio::test]
    async fn test_spawn_task_delivers_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_task(tx, Task::new(async { TestMsg::Done(1) }));

        let msg = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert_eq!(msg, TestMsg::Done(1));
    }
}
