//! Event prefetching.
//!
//! Decoding events from text is slower than applying them. A producer thread
//! can decode ahead into a bounded [`PrefetchQueue`] while the learner keeps
//! consuming on the calling thread, in the order events were produced.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::debug;

use crate::error::{Result, TrainingError};

#[derive(Debug)]
struct QueueInner<T> {
    buf: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

/// A bounded, closable FIFO queue shared between threads.
///
/// # Examples
///
/// ```
/// use hashlr_training::prefetch::PrefetchQueue;
///
/// let queue = PrefetchQueue::new(2);
/// queue.enqueue(1).unwrap();
/// queue.enqueue(2).unwrap();
/// queue.close();
/// assert_eq!(queue.dequeue().unwrap(), 1);
/// assert_eq!(queue.dequeue().unwrap(), 2);
/// assert!(queue.dequeue().is_err());
/// ```
#[derive(Debug)]
pub struct PrefetchQueue<T> {
    inner: Arc<(Mutex<QueueInner<T>>, Condvar, Condvar)>,
}

impl<T> Clone for PrefetchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PrefetchQueue<T> {
    /// Creates a queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let inner = QueueInner {
            buf: VecDeque::new(),
            capacity: capacity.max(1),
            closed: false,
        };
        Self {
            inner: Arc::new((Mutex::new(inner), Condvar::new(), Condvar::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends an item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::QueueClosed`] if the queue is closed.
    pub fn enqueue(&self, item: T) -> Result<()> {
        let (_, not_empty, not_full) = &*self.inner;
        let mut g = self.lock();
        while !g.closed && g.buf.len() >= g.capacity {
            g = not_full.wait(g).unwrap_or_else(|e| e.into_inner());
        }
        if g.closed {
            return Err(TrainingError::QueueClosed);
        }
        g.buf.push_back(item);
        not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, blocking while the queue is empty.
    ///
    /// Items enqueued before [`close`](Self::close) are still delivered.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::QueueClosed`] once the queue is closed and
    /// drained.
    pub fn dequeue(&self) -> Result<T> {
        let (_, not_empty, not_full) = &*self.inner;
        let mut g = self.lock();
        while !g.closed && g.buf.is_empty() {
            g = not_empty.wait(g).unwrap_or_else(|e| e.into_inner());
        }
        match g.buf.pop_front() {
            Some(item) => {
                not_full.notify_one();
                Ok(item)
            }
            None => Err(TrainingError::QueueClosed),
        }
    }

    /// Removes the oldest item without blocking.
    pub fn try_dequeue(&self) -> Option<T> {
        let (_, _, not_full) = &*self.inner;
        let mut g = self.lock();
        let item = g.buf.pop_front();
        if item.is_some() {
            not_full.notify_one();
        }
        item
    }

    /// Returns the number of buffered items.
    pub fn len(&self) -> usize {
        self.lock().buf.len()
    }

    /// Returns `true` if no item is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Closes the queue, waking all blocked producers and consumers.
    pub fn close(&self) {
        let (_, not_empty, not_full) = &*self.inner;
        let mut g = self.lock();
        g.closed = true;
        not_empty.notify_all();
        not_full.notify_all();
    }
}

/// Consumer end of a prefetching producer thread.
///
/// Iterates the produced items in order. Dropping it closes the queue, which
/// stops the producer at its next enqueue, and joins the thread.
#[derive(Debug)]
pub struct Prefetcher<T> {
    queue: PrefetchQueue<T>,
    handle: Option<JoinHandle<u64>>,
}

impl<T> Prefetcher<T> {
    /// Returns the underlying queue.
    pub fn queue(&self) -> &PrefetchQueue<T> {
        &self.queue
    }
}

impl<T> Iterator for Prefetcher<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.dequeue().ok()
    }
}

impl<T> Drop for Prefetcher<T> {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(produced) => debug!(produced, "Prefetch producer joined"),
                Err(_) => debug!("Prefetch producer panicked"),
            }
        }
    }
}

/// Runs `source` on a dedicated thread, buffering up to `capacity` items.
///
/// # Examples
///
/// ```
/// use hashlr_training::prefetch::spawn_prefetch;
///
/// let items: Vec<u32> = spawn_prefetch(0..100u32, 8).unwrap().collect();
/// assert_eq!(items, (0..100).collect::<Vec<_>>());
/// ```
///
/// # Errors
///
/// Returns [`TrainingError::Source`] if the thread cannot be spawned.
pub fn spawn_prefetch<I>(source: I, capacity: usize) -> Result<Prefetcher<I::Item>>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    let queue = PrefetchQueue::new(capacity);
    let producer = queue.clone();
    let handle = std::thread::Builder::new()
        .name("hashlr-prefetch".to_string())
        .spawn(move || {
            let mut produced = 0u64;
            for item in source {
                if producer.enqueue(item).is_err() {
                    break;
                }
                produced += 1;
            }
            producer.close();
            produced
        })
        .map_err(|e| TrainingError::Source(Box::new(e)))?;

    Ok(Prefetcher {
        queue,
        handle: Some(handle),
    })
}
