//! Simulation facade
//!
//! [`Simulation`] is the single entry point a UI or script drives. It owns the
//! shared [`SimState`] behind one `parking_lot::Mutex`, the background
//! [`PriorityScheduler`] and the [`EventBus`]. Each operation locks the state
//! once, does its whole read-modify-write, unlocks, and only then notifies
//! observers.
//!
//! # Example
//!
//! ```rust
//! use ossim::{Simulation, SimConfig, Strategy};
//!
//! let sim = Simulation::without_scheduler(SimConfig::default()).unwrap();
//! let p = sim.create_process("P1", 120).unwrap();
//! sim.allocate_memory(p, Strategy::BestFit).unwrap();
//! assert_eq!(sim.snapshot().used_kb, 150);
//! ```

pub mod error;
pub mod snapshot;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::model::{BlockId, ProcessId, ProcessSpec, ResourceId};
use crate::runtime::deadlock::RequestOutcome;
use crate::runtime::events::{EventBus, SimEvent};
use crate::runtime::io::{spawn_io_block, IoBlockHandle};
use crate::runtime::memory::Strategy;
use crate::runtime::scheduler::{self, PriorityScheduler, SchedulerConfig, TickReport};
use crate::runtime::state::SimState;
use crate::util::config::SimConfig;

pub use error::{SimError, SimResult};
pub use snapshot::Snapshot;

/// A running simulation.
#[derive(Debug)]
pub struct Simulation {
    state: Arc<Mutex<SimState>>,
    events: Arc<EventBus>,
    scheduler: Option<PriorityScheduler>,
    config: SimConfig,
}

impl Simulation {
    /// Create a simulation and start its scheduler thread.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        let mut sim = Self::without_scheduler(config)?;
        let scheduler = PriorityScheduler::spawn(
            sim.state.clone(),
            sim.events.clone(),
            SchedulerConfig {
                tick: sim.config.scheduler.tick(),
            },
        )?;
        sim.scheduler = Some(scheduler);
        Ok(sim)
    }

    /// Create a simulation whose clock only moves through [`Simulation::tick_now`].
    pub fn without_scheduler(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        info!(mode = ?config.memory.mode, "simulation created");
        Ok(Self {
            state: Arc::new(Mutex::new(SimState::new(&config))),
            events: Arc::new(EventBus::new()),
            scheduler: None,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Whether the background scheduler is alive.
    pub fn is_scheduling(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.is_running())
    }

    /// Register an observer. Events arrive after the state change is visible.
    pub fn subscribe(&self) -> Receiver<SimEvent> {
        self.events.subscribe()
    }

    /// Create a process with no priority or run time (contiguous and deadlock models).
    pub fn create_process(
        &self,
        name: &str,
        size_kb: u32,
    ) -> SimResult<ProcessId> {
        self.create_process_with(ProcessSpec::new(name).size(size_kb))
    }

    pub fn create_process_with(
        &self,
        spec: ProcessSpec,
    ) -> SimResult<ProcessId> {
        let process = self.state.lock().create_process(spec)?;
        self.events.publish(SimEvent::ProcessCreated { process });
        Ok(process)
    }

    pub fn create_resource(
        &self,
        name: &str,
    ) -> SimResult<ResourceId> {
        let resource = self.state.lock().create_resource(name)?;
        self.events.publish(SimEvent::ResourceCreated { resource });
        Ok(resource)
    }

    /// Request `resource` for `process`.
    ///
    /// A held resource records a wait. A grant made while the wait-for graph
    /// has a cycle fails with [`SimError::RefusedDeadlockPrevention`] and
    /// changes nothing.
    pub fn request_resource(
        &self,
        process: ProcessId,
        resource: ResourceId,
    ) -> SimResult<RequestOutcome> {
        let result = self.state.lock().request_resource(process, resource);
        match &result {
            Ok(RequestOutcome::Granted) => {
                self.events
                    .publish(SimEvent::ResourceGranted { process, resource });
            }
            Ok(RequestOutcome::Waiting { holder }) => {
                self.events.publish(SimEvent::ResourceWaiting {
                    process,
                    resource,
                    holder: *holder,
                });
            }
            Ok(RequestOutcome::AlreadyHeld) => {}
            Err(e) if e.is_refusal() => {
                self.events
                    .publish(SimEvent::ResourceRefused { process, resource });
            }
            Err(_) => {}
        }
        result
    }

    /// Place `process` into one block chosen by `strategy`.
    pub fn allocate_memory(
        &self,
        process: ProcessId,
        strategy: Strategy,
    ) -> SimResult<BlockId> {
        let block = self.state.lock().allocate_memory(process, strategy)?;
        self.events
            .publish(SimEvent::MemoryAllocated { process, block });
        Ok(block)
    }

    /// Page `process` into free blocks. Returns the faults incurred.
    pub fn allocate_paged(
        &self,
        process: ProcessId,
    ) -> SimResult<usize> {
        let (faults, pages) = {
            let mut state = self.state.lock();
            let faults = state.allocate_paged(process)?;
            (faults, state.process(process)?.pages().len())
        };
        self.events.publish(SimEvent::PagesPlaced {
            process,
            pages,
            faults,
        });
        Ok(faults)
    }

    /// Block a random process for the configured I/O delay.
    pub fn simulate_io_block(&self) -> SimResult<IoBlockHandle> {
        spawn_io_block(
            self.state.clone(),
            self.events.clone(),
            self.config.io.delay(),
        )
    }

    /// Run one scheduler tick now, on the caller's thread.
    pub fn tick_now(&self) -> TickReport {
        let report = scheduler::tick(&mut self.state.lock());
        self.events.publish_all(report.events());
        report
    }

    /// Clear every process, resource and block; zero the cursor and fault counter.
    pub fn reset(&self) {
        self.state.lock().reset();
        self.events.publish(SimEvent::Reset);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state.lock())
    }

    pub fn process_id(
        &self,
        name: &str,
    ) -> Option<ProcessId> {
        self.state.lock().processes().id_of(name)
    }

    pub fn resource_id(
        &self,
        name: &str,
    ) -> Option<ResourceId> {
        self.state.lock().resources().id_of(name)
    }

    /// Read the locked state directly.
    pub fn with_state<R>(
        &self,
        f: impl FnOnce(&SimState) -> R,
    ) -> R {
        f(&self.state.lock())
    }

    /// Stop the scheduler thread. Also done on drop.
    pub fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }
}
