//! Where listener callbacks run.
//!
//! The native engine calls us on threads we don't own, and it is not safe to call back into the engine from them.  A
//! [DeliveryContext] decides where a translated event goes from there: [Inline] runs it right away on the notifying
//! thread, which is fine for listeners that only record things, and [DeliveryQueue] hands it to whichever thread drains
//! the queue.
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel as chan;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait DeliveryContext: Send + Sync + 'static {
    fn deliver(&self, job: Job);
}

/// Run jobs immediately on the calling thread.
#[derive(Debug, Default)]
pub struct Inline;

impl DeliveryContext for Inline {
    fn deliver(&self, job: Job) {
        job()
    }
}

pub fn inline() -> Arc<dyn DeliveryContext> {
    Arc::new(Inline)
}

/// A queue of jobs which some other thread drains.
///
/// Jobs run in the order they were delivered.  Nothing runs until someone calls [DeliveryQueue::run_pending] or
/// [DeliveryQueue::run_one_timeout].
pub struct DeliveryQueue {
    sender: chan::Sender<Job>,
    receiver: chan::Receiver<Job>,
}

impl DeliveryQueue {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = chan::unbounded();
        Arc::new(DeliveryQueue { sender, receiver })
    }

    /// Run everything queued so far, returning how many jobs ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it.
    pub fn run_one_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl DeliveryContext for DeliveryQueue {
    fn deliver(&self, job: Job) {
        // We hold the receiver, so the channel can't be disconnected.
        if self.sender.send(job).is_err() {
            log::warn!("Delivery queue disconnected; dropping a job");
        }
    }
}
