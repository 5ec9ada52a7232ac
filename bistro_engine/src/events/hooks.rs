use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderReadyEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_ready_producer: Vec<EventProducer<OrderReadyEvent>>,
}

pub struct EventHandlers {
    pub on_order_ready: Option<EventHandler<OrderReadyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_ready = hooks.on_order_ready.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_ready }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_ready {
            result.order_ready_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_ready {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_ready: Option<Handler<OrderReadyEvent>>,
}

impl EventHooks {
    pub fn on_order_ready<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderReadyEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_ready = Some(Arc::new(f));
        self
    }
}
