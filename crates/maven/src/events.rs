//! Minimal typed publish/subscribe bus.
//!
//! Subscribers are registered at composition time; emission is synchronous
//! and fire-and-forget. Handlers needing async work spawn their own tasks.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker for types that can travel over the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}

impl Event for crate::api::PreResolveEvent {}
impl Event for crate::api::ResolvedFileEvent {}
impl Event for crate::api::DeployEvent {}

type Handler = Box<dyn Fn(&dyn Any) + Send + Sync>;

#[derive(Default)]
pub struct EventBusBuilder {
    subscribers: HashMap<TypeId, Vec<Handler>>,
}

impl EventBusBuilder {
    pub fn subscribe<E, F>(mut self, handler: F) -> Self
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Box::new(move |event| {
                if let Some(event) = event.downcast_ref::<E>() {
                    handler(event);
                }
            }));
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            subscribers: self.subscribers,
        }
    }
}

pub struct EventBus {
    subscribers: HashMap<TypeId, Vec<Handler>>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Delivers the event to every subscriber of its type, in registration
    /// order. Unsubscribed event types are silently dropped.
    pub fn emit<E: Event>(&self, event: &E) {
        if let Some(handlers) = self.subscribers.get(&TypeId::of::<E>()) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}
