//! Runtime system
//!
//! This module contains the simulation's moving parts: memory placement,
//! deadlock-checked resource grants, the priority scheduler and the
//! I/O-block workers, all operating on the shared [`state::SimState`].

pub mod deadlock;
pub mod events;
pub mod io;
pub mod memory;
pub mod scheduler;
pub mod state;
