//! Priority scheduler for the paging model
//!
//! This module provides the PriorityScheduler, a single background thread
//! that advances the simulation one tick per period. Each tick:
//!
//! 1. locks the shared state
//! 2. picks the ready, unblocked process with the strictly highest priority
//!    (ties go to the earliest created)
//! 3. marks it running and decrements its remaining time
//! 4. finishes it and releases its memory when the time reaches zero,
//!    otherwise returns it to READY
//! 5. unlocks and publishes the tick to observers
//!
//! Selection is greedy and not starvation-aware: a lower-priority process
//! never runs while a higher-priority one is ready.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::events::{EventBus, SimEvent};
use super::state::SimState;
use crate::model::{ProcessId, ProcessState, ProcessTable};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between ticks.
    pub tick: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number since the last reset, starting at 1.
    pub tick: u64,
    /// The process that was advanced, if any was eligible.
    pub ran: Option<ProcessId>,
    /// Set when `ran` reached zero remaining time this tick.
    pub finished: Option<ProcessId>,
}

impl TickReport {
    /// Events an observer should see for this tick.
    pub fn events(&self) -> Vec<SimEvent> {
        let mut events = vec![SimEvent::Tick {
            tick: self.tick,
            ran: self.ran,
        }];
        if let Some(process) = self.finished {
            events.push(SimEvent::ProcessFinished { process });
        }
        events
    }
}

/// The schedulable process with the highest priority, first created on ties.
pub fn select_next(processes: &ProcessTable) -> Option<ProcessId> {
    let mut best: Option<(ProcessId, i32)> = None;
    for process in processes.iter().filter(|p| p.is_schedulable()) {
        if best.is_none_or(|(_, priority)| process.priority() > priority) {
            best = Some((process.id(), process.priority()));
        }
    }
    best.map(|(id, _)| id)
}

/// Run one tick against already-locked state.
pub fn tick(state: &mut SimState) -> TickReport {
    state.ticks += 1;
    let mut report = TickReport {
        tick: state.ticks,
        ran: None,
        finished: None,
    };

    let Some(id) = select_next(&state.processes) else {
        return report;
    };
    report.ran = Some(id);

    let done = match state.processes.get_mut(id) {
        Some(process) => {
            process.running = true;
            process.state = ProcessState::Running;
            process.remaining_time -= 1;
            debug!(process = %process.name, remaining = process.remaining_time, "tick");
            process.remaining_time == 0
        }
        None => return report,
    };

    if done {
        state.release_memory(id);
    }

    if let Some(process) = state.processes.get_mut(id) {
        process.running = false;
        process.state = if done {
            ProcessState::Finished
        } else {
            ProcessState::Ready
        };
        if done {
            info!(process = %process.name, "process finished");
            report.finished = Some(id);
        }
    }
    report
}

/// Background tick loop over shared state.
#[derive(Debug)]
pub struct PriorityScheduler {
    /// Configuration.
    config: SchedulerConfig,
    /// Running state.
    running: Arc<AtomicBool>,
    /// Dropping or sending on this stops the loop.
    stop_tx: Option<Sender<()>>,
    /// Loop thread.
    worker: Option<thread::JoinHandle<()>>,
}

impl PriorityScheduler {
    /// Start the loop.
    pub fn spawn(
        state: Arc<Mutex<SimState>>,
        events: Arc<EventBus>,
        config: SchedulerConfig,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let period = config.tick;
        let flag = running.clone();
        let worker = thread::Builder::new()
            .name("ossim-scheduler".to_string())
            .spawn(move || {
                info!(period_ms = period.as_millis() as u64, "scheduler started");
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let report = {
                        let mut guard = state.lock();
                        tick(&mut guard)
                    };
                    events.publish_all(report.events());
                }
                flag.store(false, Ordering::SeqCst);
                info!("scheduler stopped");
            })?;

        Ok(Self {
            config,
            running,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Check if the loop is still running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("scheduler thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for PriorityScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests;
