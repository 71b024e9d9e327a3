//! I/O-block simulation
//!
//! Blocks a uniformly random process, sleeps on a worker thread without
//! holding the state lock, then unblocks it. Workers are fire-and-forget; a
//! reset while one sleeps turns its wake-up into a no-op.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

use super::events::{EventBus, SimEvent};
use super::state::SimState;
use crate::model::ProcessId;
use crate::simulation::error::SimResult;

/// A running I/O-block worker.
#[derive(Debug)]
pub struct IoBlockHandle {
    process: ProcessId,
    name: String,
    worker: thread::JoinHandle<bool>,
}

impl IoBlockHandle {
    /// The process that was blocked.
    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the delay to pass. Returns true if this wait unblocked the process.
    pub fn join(self) -> bool {
        self.worker.join().unwrap_or(false)
    }
}

/// Block a random process now and unblock it after `delay`.
pub fn spawn_io_block(
    state: Arc<Mutex<SimState>>,
    events: Arc<EventBus>,
    delay: Duration,
) -> SimResult<IoBlockHandle> {
    let (ticket, name) = {
        let mut guard = state.lock();
        let ticket = guard.begin_io_block(&mut rand::rng())?;
        let name = guard.process(ticket.process)?.name().to_string();
        (ticket, name)
    };
    events.publish(SimEvent::ProcessBlocked {
        process: ticket.process,
    });

    let shared = state.clone();
    let bus = events.clone();
    let spawned = thread::Builder::new()
        .name(format!("ossim-io-{name}"))
        .spawn(move || {
            thread::sleep(delay);
            let unblocked = shared.lock().end_io_block(ticket);
            if unblocked {
                bus.publish(SimEvent::ProcessUnblocked {
                    process: ticket.process,
                });
            }
            unblocked
        });

    match spawned {
        Ok(worker) => Ok(IoBlockHandle {
            process: ticket.process,
            name,
            worker,
        }),
        Err(e) => {
            warn!(process = %name, error = %e, "I/O worker did not start");
            if state.lock().end_io_block(ticket) {
                events.publish(SimEvent::ProcessUnblocked {
                    process: ticket.process,
                });
            }
            Err(e.into())
        }
    }
}
