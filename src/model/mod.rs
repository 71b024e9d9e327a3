//! Entity model
//!
//! Value records for everything the simulation mutates:
//!
//! - [`Process`](process::Process) - a simulated process and its pages
//! - [`Resource`](resource::Resource) - an exclusive resource for the deadlock model
//! - [`MemoryBlock`](block::MemoryBlock) - one fixed-size unit of the memory pool
//! - [`Page`](process::Page) - a page of a process in the paging model
//!
//! Processes and resources live in creation-ordered arenas
//! ([`ProcessTable`](process::ProcessTable), [`ResourceTable`](resource::ResourceTable));
//! all cross references are ids from [`id`].

pub mod block;
pub mod id;
pub mod process;
pub mod resource;

pub use block::{MemoryBlock, Occupant};
pub use id::{BlockId, PageId, ProcessId, ResourceId};
pub use process::{page_count, Page, Process, ProcessSpec, ProcessState, ProcessTable};
pub use resource::{Resource, ResourceTable};
