//! ossim: operating-system mechanism simulator
//!
//! A teaching simulator for contiguous memory allocation, paging with page
//! faults, priority scheduling and deadlock prevention, driven through one
//! thread-safe [`Simulation`] facade.
//!
//! # Example
//!
//! ```rust
//! use ossim::{ProcessSpec, SimConfig, Simulation};
//!
//! let sim = Simulation::without_scheduler(SimConfig::paged()).unwrap();
//! let p = sim
//!     .create_process_with(ProcessSpec::new("P1").size(130).priority(2).remaining_time(1))
//!     .unwrap();
//! assert_eq!(sim.allocate_paged(p).unwrap(), 0);
//! sim.tick_now();
//! assert_eq!(sim.snapshot().free_blocks(), 10);
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod model;
pub mod runtime;
pub mod simulation;

// Utility modules
pub mod util;

// Re-exports
pub use model::{BlockId, PageId, ProcessId, ProcessSpec, ProcessState, ResourceId};
pub use runtime::deadlock::RequestOutcome;
pub use runtime::events::SimEvent;
pub use runtime::io::IoBlockHandle;
pub use runtime::memory::Strategy;
pub use runtime::scheduler::TickReport;
pub use simulation::{SimError, SimResult, Simulation, Snapshot};
pub use util::config::{MemoryMode, SimConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulator name
pub const NAME: &str = "ossim";
