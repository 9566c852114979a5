use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::component::error::ComponentError;

type Outcome = Result<(), ComponentError>;

/// Completion of an asynchronous enable or disable.
///
/// Wait for it synchronously with [`wait`](Self::wait) or `.await` it.
#[derive(Debug)]
pub struct CompletionHandle {
    component: String,
    receiver: oneshot::Receiver<Outcome>,
}

/// Sending half kept by the worker.
#[derive(Debug)]
pub(crate) struct Completer {
    sender: oneshot::Sender<Outcome>,
}

impl Completer {
    pub(crate) fn complete(self, outcome: Outcome) {
        // The handle may have been dropped without waiting.
        let _ = self.sender.send(outcome);
    }
}

impl CompletionHandle {
    pub(crate) fn channel(component: impl Into<String>) -> (Completer, CompletionHandle) {
        let (sender, receiver) = oneshot::channel();
        (Completer { sender }, CompletionHandle { component: component.into(), receiver })
    }

    /// A handle that is already complete.
    pub(crate) fn ready(component: impl Into<String>, outcome: Outcome) -> CompletionHandle {
        let (completer, handle) = Self::channel(component);
        completer.complete(outcome);
        handle
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    fn resolve(&self, received: Result<Outcome, oneshot::error::RecvError>) -> Outcome {
        received.unwrap_or_else(|_| {
            Err(ComponentError::TaskAborted {
                component: self.component.clone(),
                reason: "worker exited without reporting".to_string(),
            })
        })
    }

    /// Block the current thread until the work completes.
    ///
    /// Safe to call from inside an async runtime; the calling thread is parked
    /// rather than driving the runtime.
    pub fn wait(self) -> Outcome {
        futures::executor::block_on(self)
    }
}

impl Future for CompletionHandle {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(received) => Poll::Ready(self.resolve(received)),
            Poll::Pending => Poll::Pending,
        }
    }
}
