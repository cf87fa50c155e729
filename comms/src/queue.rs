use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

/// An insertion ordered, multi-producer single-consumer mailbox.
///
/// Producers push from any thread, the consumer either polls with `try_pop` or waits
/// with `pop`. The underlying container is never handed out.
#[derive(Debug, Default)]
pub struct MessageQueue<T> {
    items: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    notify: Notify,
}

impl<T> MessageQueue<T> {
    /// Creates a new empty `MessageQueue`.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Appends `item` at the back of the queue and wakes the consumer.
    ///
    /// # Arguments
    /// * `item` - The message to enqueue.
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.notify.notify_one();
    }

    /// Pops the oldest message without waiting.
    ///
    /// # Returns
    /// `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Waits until a message is available and pops it.
    ///
    /// # Returns
    /// `None` once the queue has been closed and fully drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Closes the queue, a waiting consumer returns `None` once the remaining messages are drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

/// A single-producer fan-out queue, every subscriber receives every published message in order.
///
/// Messages are shared as `Arc` snapshots, publishing never copies the payload.
#[derive(Debug)]
pub struct BroadcastQueue<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T> BroadcastQueue<T> {
    /// Creates a new `BroadcastQueue`.
    ///
    /// # Arguments
    /// * `capacity` - The amount of messages a slow subscriber may fall behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a shared snapshot to every current subscriber.
    ///
    /// # Arguments
    /// * `item` - The message to publish.
    ///
    /// # Returns
    /// The amount of subscribers that will receive it.
    pub fn publish(&self, item: Arc<T>) -> usize {
        self.tx.send(item).unwrap_or(0)
    }

    /// Creates a new subscriber that receives every message published from now on.
    pub fn subscribe(&self) -> BroadcastReceiver<T> {
        BroadcastReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

/// The receiving end of a `BroadcastQueue`.
#[derive(Debug)]
pub struct BroadcastReceiver<T> {
    rx: broadcast::Receiver<Arc<T>>,
}

impl<T> BroadcastReceiver<T> {
    /// Waits for the next published message.
    ///
    /// # Returns
    /// `None` once the queue was dropped and every message was received, or an
    /// `InvalidData` io error if this subscriber fell behind and missed messages.
    pub async fn recv(&mut self) -> io::Result<Option<Arc<T>>> {
        match self.rx.recv().await {
            Ok(item) => Ok(Some(item)),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("broadcast subscriber missed {n} messages"),
            )),
        }
    }
}
