//! FIFO serializer: one actor owns a resource and runs submitted tasks
//! against it strictly one at a time, in submission order.
//!
//! Tasks are enqueued on an unbounded channel at call time, so the order in
//! which callers invoke [`SerializerHandle::submit`] is the order in which the
//! tasks run, regardless of when their tickets are awaited. Each task runs on
//! the blocking pool with the resource moved in and back out, so a slow host
//! call never stalls the async workers.

use std::{
    any::Any,
    convert::Infallible,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Why a submitted task did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E: std::error::Error + 'static> {
    /// The task ran and returned an error.
    #[error("task failed: {0}")]
    Failed(#[source] E),
    /// The task panicked; the resource stays usable.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The serializer is gone.
    #[error("serializer shut down")]
    Closed,
}

type Job<R> = Box<dyn FnOnce(&mut R) + Send>;

enum Command<R> {
    Run { label: &'static str, job: Job<R> },
    Shutdown { resp: oneshot::Sender<R> },
}

/// Completion handle for one submitted task.
#[must_use = "a ticket does nothing unless awaited"]
pub struct Ticket<T, E: std::error::Error + 'static> {
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E: std::error::Error + 'static> Ticket<T, E> {
    /// Waits for the task to finish.
    pub async fn wait(self) -> Result<T, TaskError<E>> {
        match self.rx.await {
            Ok(res) => res,
            Err(_) => Err(TaskError::Closed),
        }
    }
}

/// Cloneable handle to a serializer actor owning an `R`.
pub struct SerializerHandle<R> {
    cmd_tx: mpsc::UnboundedSender<Command<R>>,
}

impl<R> Clone for SerializerHandle<R> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

/// Spawns the actor on the current tokio runtime.
pub fn spawn_serializer<R: Send + 'static>(resource: R) -> SerializerHandle<R> {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command<R>>();

    tokio::spawn(async move {
        let mut resource = resource;
        let mut completed: u64 = 0;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Run { label, job } => {
                    // Host calls may block on disk; keep them off the async workers.
                    let joined = tokio::task::spawn_blocking(move || {
                        let mut resource = resource;
                        job(&mut resource);
                        resource
                    })
                    .await;
                    resource = match joined {
                        Ok(resource) => resource,
                        Err(err) => {
                            error!(task = label, error = %err, "serializer worker lost, stopping");
                            return;
                        }
                    };
                    completed += 1;
                    debug!(task = label, completed, "serializer task done");
                }
                Command::Shutdown { resp } => {
                    let _ = resp.send(resource);
                    return;
                }
            }
        }
    });

    SerializerHandle { cmd_tx }
}

impl<R: Send + 'static> SerializerHandle<R> {
    /// Enqueues `task` behind everything submitted so far.
    ///
    /// A task that fails or panics is logged here and does not affect the
    /// tasks queued after it.
    pub fn submit<T, E, F>(&self, label: &'static str, task: F) -> Ticket<T, E>
    where
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
        F: FnOnce(&mut R) -> Result<T, E> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<R> = Box::new(move |resource: &mut R| {
            let out = match catch_unwind(AssertUnwindSafe(|| task(resource))) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => {
                    warn!(task = label, error = %err, "serializer task failed");
                    Err(TaskError::Failed(err))
                }
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    error!(task = label, panic = %msg, "serializer task panicked");
                    Err(TaskError::Panicked(msg))
                }
            };
            let _ = tx.send(out);
        });

        if self.cmd_tx.send(Command::Run { label, job }).is_err() {
            warn!(task = label, "serializer closed, task dropped");
        }
        Ticket { rx }
    }

    /// Enqueues an infallible read or write.
    pub fn submit_with<T, F>(&self, label: &'static str, task: F) -> Ticket<T, Infallible>
    where
        T: Send + 'static,
        F: FnOnce(&mut R) -> T + Send + 'static,
    {
        self.submit(label, move |resource| Ok::<T, Infallible>(task(resource)))
    }

    /// Resolves once every task submitted before this call has finished.
    pub fn barrier(&self) -> Ticket<(), Infallible> {
        self.submit_with("barrier", |_| ())
    }

    /// Stops the actor after the queued tasks and hands the resource back.
    pub async fn shutdown(&self) -> Result<R, TaskError<Infallible>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .map_err(|_| TaskError::Closed)?;
        rx.await.map_err(|_| TaskError::Closed)
    }

    /// True once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
