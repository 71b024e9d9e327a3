//! Wait-for graph
//!
//! One node per process. An edge `a -> b` means `a` waits for a resource
//! that `b` currently holds. A cycle means deadlock.

use std::collections::HashSet;

use crate::model::{ProcessId, ProcessTable, ResourceTable};

/// Directed wait-for graph over process ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitForGraph {
    edges: Vec<Vec<ProcessId>>,
}

impl WaitForGraph {
    /// Build the graph from the current `waiting_for` / `allocated_to` state.
    pub fn build(
        processes: &ProcessTable,
        resources: &ResourceTable,
    ) -> Self {
        let mut graph = Self::with_nodes(processes.len());
        for process in processes.iter() {
            let holder = process
                .waiting_for()
                .and_then(|resource| resources.holder(resource));
            if let Some(holder) = holder {
                graph.add_edge(process.id(), holder);
            }
        }
        graph
    }

    /// Empty graph with `n` nodes.
    pub fn with_nodes(n: usize) -> Self {
        Self {
            edges: vec![Vec::new(); n],
        }
    }

    /// Graph from an explicit edge list.
    pub fn from_edges(
        n: usize,
        edges: &[(usize, usize)],
    ) -> Self {
        let mut graph = Self::with_nodes(n);
        for &(from, to) in edges {
            graph.add_edge(ProcessId(from), ProcessId(to));
        }
        graph
    }

    /// Add `from -> to`. Nodes out of range are ignored.
    pub fn add_edge(
        &mut self,
        from: ProcessId,
        to: ProcessId,
    ) {
        if from.0 < self.edges.len() && to.0 < self.edges.len() {
            self.edges[from.0].push(to);
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Processes `node` waits on.
    pub fn successors(
        &self,
        node: ProcessId,
    ) -> &[ProcessId] {
        self.edges.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// The processes on the first cycle found, in wait order.
    pub fn find_cycle(&self) -> Option<Vec<ProcessId>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for start in 0..self.edges.len() {
            if let Some(cycle) =
                self.detect_cycle_dfs(ProcessId(start), &mut visited, &mut on_stack, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn detect_cycle_dfs(
        &self,
        current: ProcessId,
        visited: &mut HashSet<ProcessId>,
        on_stack: &mut HashSet<ProcessId>,
        path: &mut Vec<ProcessId>,
    ) -> Option<Vec<ProcessId>> {
        if on_stack.contains(&current) {
            // back edge: the cycle is the path suffix starting at `current`
            let start = path.iter().position(|&p| p == current).unwrap_or(0);
            return Some(path[start..].to_vec());
        }
        if !visited.insert(current) {
            return None;
        }

        on_stack.insert(current);
        path.push(current);

        for &next in self.successors(current) {
            if let Some(cycle) = self.detect_cycle_dfs(next, visited, on_stack, path) {
                return Some(cycle);
            }
        }

        path.pop();
        on_stack.remove(&current);
        None
    }
}

/// Whether the current wait state contains a deadlock.
pub fn has_cycle(
    processes: &ProcessTable,
    resources: &ResourceTable,
) -> bool {
    WaitForGraph::build(processes, resources).has_cycle()
}
