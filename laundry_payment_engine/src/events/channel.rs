use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::mpsc;

/// The closure type for event hooks. Takes the event, returns a boxed future so that hooks can do
/// real async work.
pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// One event channel: a buffered queue feeding a single hook closure. Each received event is
/// handled on its own task, so a slow hook delays nothing but itself.
pub struct EventHandler<E> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
    jobs: Arc<AtomicI64>,
}

impl<E: Send + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender, handler, jobs: Arc::new(AtomicI64::new(0)) }
    }

    /// A new producer for this channel. The channel stays open as long as any producer is alive.
    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Consumes the handler, processing events until every producer has been dropped, then waits
    /// for in-flight jobs to finish before returning.
    pub async fn start_handler(mut self) {
        drop(self.sender);
        while let Some(event) = self.receiver.recv().await {
            let handler = Arc::clone(&self.handler);
            let jobs = Arc::clone(&self.jobs);
            jobs.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                handler(event).await;
                jobs.fetch_sub(1, Ordering::SeqCst);
            });
        }
        let mut remaining = self.jobs.load(Ordering::SeqCst);
        while remaining > 0 {
            debug!("📬️ Event channel is closed. Waiting for {remaining} handler jobs to wrap up");
            tokio::time::sleep(Duration::from_millis(250)).await;
            remaining = self.jobs.load(Ordering::SeqCst);
        }
        debug!("📬️ Event handler has shut down");
    }
}

pub struct EventProducer<E> {
    sender: mpsc::Sender<E>,
}

impl<E> Clone for EventProducer<E> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<E: Send + 'static> EventProducer<E> {
    /// Queues an event for the hook. Waits when the channel buffer is full; a send can only fail
    /// once the handler itself has gone away, which is logged and swallowed since event delivery
    /// is best-effort by design.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Could not publish event. {e}");
        }
    }
}
