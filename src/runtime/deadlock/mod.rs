//! Deadlock detection for the resource model
//!
//! # Architecture
//!
//! - [`WaitForGraph`](graph::WaitForGraph) - edges from waiting processes to holders,
//!   with DFS cycle detection (visited set + recursion stack)
//! - [`Proposal`](grant::Proposal) - a resource request applied tentatively,
//!   validated against the graph, then committed or undone
//!
//! Detection runs after every grant, before it is considered committed. A
//! grant made while the graph has a cycle is refused and leaves no trace.
//! Waiting on a held resource is recorded without a check.

pub mod grant;
pub mod graph;

pub use grant::{request, GrantError, Proposal, Refusal, RequestOutcome};
pub use graph::{has_cycle, WaitForGraph};

#[cfg(test)]
mod tests;
