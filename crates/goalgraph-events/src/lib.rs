use crossbeam_channel::{unbounded, Receiver, Sender};
use goalgraph_core::{GoalId, GoalStatus};
use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod telemetry;

pub use diagnostics::{AnomalyKind, AnomalySink, MemorySink, TracingSink};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Data lifecycle
    RefreshRequested {
        correlation_id: String,
    },
    TreeApplied {
        generation: u64,
        node_count: usize,
    },
    TreeEmpty {
        generation: u64,
    },
    FetchFailed {
        generation: u64,
        error: String,
    },

    // Structure / UI state
    CollapseToggled {
        id: GoalId,
        collapsed: bool,
    },
    GoalActivated {
        id: GoalId,
    },

    // Layout
    LayoutRecomputed {
        node_count: usize,
        link_count: usize,
    },
    LayoutUnavailable {
        reason: String,
    },
    ViewportResized {
        width: f32,
        height: f32,
    },

    // Mutations (always followed by a full refetch)
    GoalCreated {
        id: GoalId,
    },
    GoalDeleted {
        id: GoalId,
    },
    GoalStatusChanged {
        id: GoalId,
        status: GoalStatus,
    },

    // Notifications
    ShowError {
        message: String,
    },
    StatusUpdate {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        let event = Event::CollapseToggled {
            id: GoalId::from("goal-1"),
            collapsed: true,
        };

        sender.send(event).unwrap();

        match receiver.recv().unwrap() {
            Event::CollapseToggled { id, collapsed } => {
                assert_eq!(id.as_str(), "goal-1");
                assert!(collapsed);
            }
            _ => panic!("Expected CollapseToggled event"),
        }
    }

    #[test]
    fn test_data_lifecycle_events() {
        let bus = EventBus::new();
        bus.publish(Event::RefreshRequested {
            correlation_id: "c-1".to_string(),
        });
        bus.publish(Event::TreeApplied {
            generation: 3,
            node_count: 12,
        });
        bus.publish(Event::FetchFailed {
            generation: 4,
            error: "boom".to_string(),
        });

        let rx = bus.receiver();
        assert!(matches!(rx.recv().unwrap(), Event::RefreshRequested { .. }));

        if let Event::TreeApplied {
            generation,
            node_count,
        } = rx.recv().unwrap()
        {
            assert_eq!(generation, 3);
            assert_eq!(node_count, 12);
        } else {
            panic!("Expected TreeApplied");
        }

        if let Event::FetchFailed { generation, error } = rx.recv().unwrap() {
            assert_eq!(generation, 4);
            assert_eq!(error, "boom");
        } else {
            panic!("Expected FetchFailed");
        }
    }

    #[test]
    fn test_dispatch_to_drains_queue() {
        struct Counter(usize);
        impl EventListener for Counter {
            fn handle_event(&mut self, _event: &Event) {
                self.0 += 1;
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::StatusUpdate {
            message: "a".to_string(),
        });
        bus.publish(Event::StatusUpdate {
            message: "b".to_string(),
        });

        let mut counter = Counter(0);
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 2);
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 2);
    }
}
