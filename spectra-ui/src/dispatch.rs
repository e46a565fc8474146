//! Message dispatch table keyed by event name
//!
//! Handlers are registered with the payload type they expect; the table
//! decodes the raw JSON argument before invoking the handler on the
//! controller.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use spectra_common::{Error, Result};

type Handler<C> = Box<dyn Fn(&mut C, Value) -> Result<()> + Send + Sync>;

/// Event name → handler table for one controller type
pub struct Dispatcher<C> {
    handlers: HashMap<&'static str, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed handler; a later registration for the same event replaces it
    pub fn on<T, F>(mut self, event: &'static str, handler: F) -> Self
    where
        C: 'static,
        T: DeserializeOwned + 'static,
        F: Fn(&mut C, T) + Send + Sync + 'static,
    {
        self.handlers.insert(
            event,
            Box::new(move |controller: &mut C, payload: Value| {
                let message = serde_json::from_value::<T>(payload)?;
                handler(controller, message);
                Ok(())
            }),
        );
        self
    }

    /// Route one inbound event to its handler
    pub fn dispatch(&self, controller: &mut C, event: &str, payload: Value) -> Result<()> {
        let handler = self
            .handlers
            .get(event)
            .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
        handler(controller, payload)
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Registered event names, sorted
    pub fn events(&self) -> Vec<&'static str> {
        let mut events: Vec<_> = self.handlers.keys().copied().collect();
        events.sort_unstable();
        events
    }
}
