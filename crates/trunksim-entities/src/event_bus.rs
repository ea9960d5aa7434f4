use std::collections::HashMap;

use crate::messages::{Event, EventKind};
use crate::zone_controller::ZoneController;

/// A handler subscribed to one `EventKind`. Plain function pointers, not
/// `Box<dyn Fn>`, since every handler is a `ZoneController` method and there
/// is no per-subscription state to close over.
pub type Handler = fn(&mut ZoneController, &Event);

/// Maps each concrete message type to the handlers subscribed to it
/// (spec.md §4.2). `publish` on the controller looks up the handler list,
/// then calls each one synchronously and in registration order; there is no
/// concurrent dispatch within a zone.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            handlers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Returns a owned copy of the handler list for `kind`. Function
    /// pointers are `Copy`, so cloning the small `Vec` is cheap and lets the
    /// caller iterate while holding `&mut ZoneController` without aliasing
    /// `self.event_bus` at the same time.
    pub fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        self.handlers.get(&kind).cloned().unwrap_or_default()
    }
}
