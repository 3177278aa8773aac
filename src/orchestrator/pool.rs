//! Bounded async worker pool draining a FIFO submission queue.
//!
//! A single dispatcher task drains the queue in order and hands each job to
//! a bounded `Semaphore`-limited execution task, so queue order and
//! concurrency are decoupled: jobs *start* in FIFO order but may *finish*
//! out of order. Cancellation is honored only pre-dequeue.

use super::types::{RequestStatus, SynthesisRequest, SynthesisResult};
use super::Core;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Job {
    request: SynthesisRequest,
    cancel: CancellationToken,
    respond_to: oneshot::Sender<SynthesisResult>,
    completed: Arc<AtomicBool>,
}

fn cancelled_result() -> SynthesisResult {
    SynthesisResult::failure(RequestStatus::Cancelled, "cancelled before execution".to_owned())
}

pub struct WorkerPool {
    sender: mpsc::UnboundedSender<Job>,
    queue_depth: Arc<AtomicUsize>,
    active_count: Arc<AtomicUsize>,
    shutting_down: Arc<AtomicBool>,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl WorkerPool {
    pub fn new(size: usize, core: Arc<Core>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let active_count = Arc::new(AtomicUsize::new(0));
        let shutting_down = Arc::new(AtomicBool::new(false));
        let semaphore = Arc::new(Semaphore::new(size.max(1)));

        let dispatcher = {
            let queue_depth = Arc::clone(&queue_depth);
            let active_count = Arc::clone(&active_count);
            let shutting_down = Arc::clone(&shutting_down);
            tokio::spawn(async move {
                while let Some(job) = receiver.recv().await {
                    queue_depth.fetch_sub(1, Ordering::SeqCst);

                    if job.cancel.is_cancelled() || shutting_down.load(Ordering::SeqCst) {
                        job.completed.store(true, Ordering::SeqCst);
                        let _ = job.respond_to.send(cancelled_result());
                        continue;
                    }

                    let permit = Arc::clone(&semaphore)
                        .acquire_owned()
                        .await
                        .expect("worker pool semaphore closed unexpectedly");
                    let core = Arc::clone(&core);
                    let active_count = Arc::clone(&active_count);
                    active_count.fetch_add(1, Ordering::SeqCst);

                    tokio::spawn(async move {
                        let _permit = permit;
                        // `Core::synthesize` itself blocks the OS thread (single-flight's
                        // condvar join, the acoustic session's mutex, inference). Wrapping
                        // it keeps those waits from starving the runtime's worker threads.
                        let result =
                            tokio::task::block_in_place(|| core.synthesize(&job.request));
                        active_count.fetch_sub(1, Ordering::SeqCst);
                        job.completed.store(true, Ordering::SeqCst);
                        let _ = job.respond_to.send(result);
                    });
                }
                debug!("worker pool dispatcher drained and exiting");
            })
        };

        Self {
            sender,
            queue_depth,
            active_count,
            shutting_down,
            dispatcher,
        }
    }

    /// Enqueue a request. Returns a receiver that resolves to the result,
    /// the token governing pre-dequeue cancellation, and a flag that flips
    /// once the job's result has been sent.
    pub fn submit(
        &self,
        request: SynthesisRequest,
    ) -> (oneshot::Receiver<SynthesisResult>, CancellationToken, Arc<AtomicBool>) {
        let (respond_to, receiver) = oneshot::channel();
        let cancel = CancellationToken::new();
        let completed = Arc::new(AtomicBool::new(false));
        self.queue_depth.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(Job {
            request,
            cancel: cancel.clone(),
            respond_to,
            completed: Arc::clone(&completed),
        });
        (receiver, cancel, completed)
    }

    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Stop accepting new work, complete every job still sitting in the
    /// queue with `Cancelled`, and join the dispatcher. Jobs already handed
    /// to an execution task run to completion (not cancelled).
    pub async fn shutdown(self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        drop(self.sender);
        let _ = self.dispatcher.await;
    }
}
