//! Observer notifications
//!
//! State changes are published as [`SimEvent`]s on crossbeam channels. A UI
//! subscribes once and redraws from a fresh snapshot whenever an event
//! arrives. Events are always published after the state lock is released.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use crate::model::{BlockId, ProcessId, ResourceId};

/// Something observable happened to the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SimEvent {
    ProcessCreated { process: ProcessId },
    ResourceCreated { resource: ResourceId },
    MemoryAllocated { process: ProcessId, block: BlockId },
    PagesPlaced { process: ProcessId, pages: usize, faults: usize },
    ResourceGranted { process: ProcessId, resource: ResourceId },
    ResourceWaiting { process: ProcessId, resource: ResourceId, holder: ProcessId },
    ResourceRefused { process: ProcessId, resource: ResourceId },
    ProcessBlocked { process: ProcessId },
    ProcessUnblocked { process: ProcessId },
    /// One scheduler tick ran; `ran` is the process it advanced, if any.
    Tick { tick: u64, ran: Option<ProcessId> },
    ProcessFinished { process: ProcessId },
    Reset,
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<SimEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> Receiver<SimEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send `event` to every subscriber, dropping the ones that hung up.
    pub fn publish(
        &self,
        event: SimEvent,
    ) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn publish_all(
        &self,
        events: impl IntoIterator<Item = SimEvent>,
    ) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
