// Bounded worker pool that runs submitted jobs concurrently

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// A zero-argument unit of work.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Errors returned when a job cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The submission queue is full and the submitter asked not to wait.
    Rejected { capacity: usize },

    /// The service has been shut down.
    Shutdown,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { capacity } => {
                write!(f, "Execution queue is full ({} pending jobs)", capacity)
            }
            Self::Shutdown => write!(f, "Execution service is shut down"),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Future returned by [`Executor::execute`].
pub type ExecuteFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExecutionError>> + Send + 'a>>;

/// Accepts jobs and eventually runs each of them on some worker, in no particular order.
pub trait Executor: Send + Sync {
    /// Queue a job. Resolves once the job is accepted, which may mean waiting
    /// for room in the queue; it does not wait for the job to run.
    fn execute(&self, job: Job) -> ExecuteFuture<'_>;

    /// Stop accepting jobs and wait for the queued ones.
    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

/// Fixed set of workers draining a bounded job queue.
///
/// At most `worker_count` jobs run at the same time. Must be created inside a
/// tokio runtime.
pub struct ExecutionService {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    queue_capacity: usize,
}

impl ExecutionService {
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let receiver_clone = receiver.clone();

            let worker = tokio::spawn(async move {
                Self::worker_loop(worker_id, receiver_clone).await;
            });

            workers.push(worker);
        }

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count,
            queue_capacity,
        }
    }

    /// Queue a job, waiting for room while the queue is full.
    ///
    /// Only fails once the service is shut down.
    pub async fn execute(&self, job: Job) -> Result<(), ExecutionError> {
        let sender = self.sender()?;
        sender.send(job).await.map_err(|_| ExecutionError::Shutdown)
    }

    /// Queue a job without waiting. Fails if the queue is full or the service is shut down.
    pub fn try_execute(&self, job: Job) -> Result<(), ExecutionError> {
        self.sender()?.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ExecutionError::Rejected {
                capacity: self.queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => ExecutionError::Shutdown,
        })
    }

    /// Queue a future as a job, waiting for room while the queue is full.
    pub async fn spawn<F>(&self, future: F) -> Result<(), ExecutionError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.execute(Box::pin(future)).await
    }

    /// Queue a future as a job without waiting.
    pub fn try_spawn<F>(&self, future: F) -> Result<(), ExecutionError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.try_execute(Box::pin(future))
    }

    fn sender(&self) -> Result<mpsc::Sender<Job>, ExecutionError> {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .cloned()
            .ok_or(ExecutionError::Shutdown)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Stop accepting jobs and wait until the workers have drained the queue.
    pub async fn shutdown(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take(),
        );

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!("Worker terminated abnormally: {}", e);
            }
        }
    }

    async fn worker_loop(worker_id: usize, receiver: Arc<AsyncMutex<mpsc::Receiver<Job>>>) {
        tracing::debug!("Worker {} started", worker_id);

        loop {
            // Get next job
            let job = {
                let mut rx = receiver.lock().await;
                rx.recv().await
            };

            let Some(job) = job else {
                break;
            };

            // A panicking job must not take the worker down with it.
            if let Err(e) = tokio::spawn(job).await {
                tracing::error!("Worker {} job panicked: {}", worker_id, e);
            }
        }

        tracing::debug!("Worker {} stopped", worker_id);
    }
}

impl Executor for ExecutionService {
    fn execute(&self, job: Job) -> ExecuteFuture<'_> {
        Box::pin(ExecutionService::execute(self, job))
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(ExecutionService::shutdown(self))
    }
}

impl fmt::Debug for ExecutionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionService")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}
