use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::task::JoinHandle;

use crate::events::{
    channel::{EventHandler, EventProducer, Handler},
    OrderPaidEvent, UnmatchedPaymentEvent,
};

/// The closures to run when something notable happens in reconciliation. All hooks are optional.
#[derive(Default)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_unmatched_payment: Option<Handler<UnmatchedPaymentEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_unmatched_payment<F>(&mut self, f: F) -> &mut Self
    where F: Fn(UnmatchedPaymentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_unmatched_payment = Some(Arc::new(f));
        self
    }
}

/// One channel per configured hook. Build this from [`EventHooks`], extract the producers for the
/// API, then start the handlers.
pub struct EventHandlers {
    pub order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub unmatched_payment: Option<EventHandler<UnmatchedPaymentEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let order_paid = hooks.on_order_paid.map(|h| EventHandler::new(buffer_size, h));
        let unmatched_payment = hooks.on_unmatched_payment.map(|h| EventHandler::new(buffer_size, h));
        Self { order_paid, unmatched_payment }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.order_paid {
            result.order_paid_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.unmatched_payment {
            result.unmatched_payment_producers.push(handler.subscribe());
        }
        result
    }

    /// Consumes the handlers, spawning one task per configured hook. Each returned handle
    /// resolves once the last producer is dropped and all in-flight jobs are done.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(handler) = self.order_paid {
            info!("📬️ Starting the order-paid event handler");
            handles.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.unmatched_payment {
            info!("📬️ Starting the unmatched-payment event handler");
            handles.push(tokio::spawn(handler.start_handler()));
        }
        handles
    }
}

/// The sending ends of the event channels, held by [`crate::ReconciliationApi`]. Cloning clones
/// the senders; all clones feed the same handlers.
#[derive(Clone, Default)]
pub struct EventProducers {
    pub order_paid_producers: Vec<EventProducer<OrderPaidEvent>>,
    pub unmatched_payment_producers: Vec<EventProducer<UnmatchedPaymentEvent>>,
}
