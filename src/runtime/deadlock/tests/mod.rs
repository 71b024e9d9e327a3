//! Deadlock 单元测试
//!
//! 测试等待图的构建、环检测以及两阶段资源授予

use crate::model::{ProcessId, ProcessSpec, ProcessTable, ResourceId, ResourceTable};
use crate::runtime::deadlock::{
    has_cycle, request, GrantError, Proposal, Refusal, RequestOutcome, WaitForGraph,
};

/// Tables with processes P1..Pn and resources R1..Rm.
fn tables(
    n: usize,
    m: usize,
) -> (ProcessTable, ResourceTable) {
    let mut processes = ProcessTable::new();
    let mut resources = ResourceTable::new();
    for i in 1..=n {
        processes.insert(ProcessSpec::new(format!("P{i}"))).unwrap();
    }
    for i in 1..=m {
        resources.insert(format!("R{i}")).unwrap();
    }
    (processes, resources)
}

fn hold(
    processes: &mut ProcessTable,
    resources: &mut ResourceTable,
    p: usize,
    r: usize,
) {
    resources.get_mut(ResourceId(r)).unwrap().allocated_to = Some(ProcessId(p));
    processes
        .get_mut(ProcessId(p))
        .unwrap()
        .resources_held
        .insert(ResourceId(r));
}

fn wait(
    processes: &mut ProcessTable,
    p: usize,
    r: usize,
) {
    processes.get_mut(ProcessId(p)).unwrap().waiting_for = Some(ResourceId(r));
}

#[cfg(test)]
mod graph_tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_no_cycle() {
        assert!(!WaitForGraph::with_nodes(0).has_cycle());
        assert!(!WaitForGraph::with_nodes(5).has_cycle());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let graph = WaitForGraph::from_edges(1, &[(0, 0)]);
        assert_eq!(graph.find_cycle(), Some(vec![ProcessId(0)]));
    }

    #[test]
    fn test_chain_is_not_cycle() {
        let graph = WaitForGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_diamond_is_not_cycle() {
        // shared descendants are visited once and are not back edges
        let graph = WaitForGraph::from_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_cycle_reported_in_wait_order() {
        let graph = WaitForGraph::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 1)]);
        assert_eq!(
            graph.find_cycle(),
            Some(vec![ProcessId(1), ProcessId(2), ProcessId(3)])
        );
    }

    #[test]
    fn test_cycle_found_from_later_start() {
        let graph = WaitForGraph::from_edges(4, &[(2, 3), (3, 2)]);
        assert!(graph.has_cycle());
    }

    #[test]
    fn test_out_of_range_edges_ignored() {
        let mut graph = WaitForGraph::with_nodes(2);
        graph.add_edge(ProcessId(0), ProcessId(9));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_build_two_process_deadlock() {
        let (mut processes, mut resources) = tables(2, 2);
        hold(&mut processes, &mut resources, 0, 0);
        hold(&mut processes, &mut resources, 1, 1);
        wait(&mut processes, 0, 1);
        wait(&mut processes, 1, 0);

        let graph = WaitForGraph::build(&processes, &resources);
        assert_eq!(graph.successors(ProcessId(0)), &[ProcessId(1)]);
        assert_eq!(graph.successors(ProcessId(1)), &[ProcessId(0)]);
        assert!(has_cycle(&processes, &resources));
    }

    #[test]
    fn test_build_without_second_waiter() {
        let (mut processes, mut resources) = tables(2, 2);
        hold(&mut processes, &mut resources, 0, 0);
        hold(&mut processes, &mut resources, 1, 1);
        wait(&mut processes, 0, 1);

        assert!(!has_cycle(&processes, &resources));
    }

    #[test]
    fn test_waiting_on_free_resource_adds_no_edge() {
        let (mut processes, resources) = tables(1, 1);
        wait(&mut processes, 0, 0);
        let graph = WaitForGraph::build(&processes, &resources);
        assert_eq!(graph.edge_count(), 0);
    }
}

#[cfg(test)]
mod grant_tests {
    use super::*;

    #[test]
    fn test_free_resource_is_granted() {
        let (mut processes, mut resources) = tables(1, 1);
        let outcome = request(&mut processes, &mut resources, ProcessId(0), ResourceId(0)).unwrap();
        assert_eq!(outcome, Ok(RequestOutcome::Granted));
        assert_eq!(resources.holder(ResourceId(0)), Some(ProcessId(0)));
        let p = processes.get(ProcessId(0)).unwrap();
        assert!(p.holds(ResourceId(0)));
        assert_eq!(p.waiting_for(), None);
    }

    #[test]
    fn test_grant_clears_previous_wait() {
        let (mut processes, mut resources) = tables(2, 2);
        hold(&mut processes, &mut resources, 1, 0);
        wait(&mut processes, 0, 0);

        let outcome = request(&mut processes, &mut resources, ProcessId(0), ResourceId(1)).unwrap();
        assert_eq!(outcome, Ok(RequestOutcome::Granted));
        assert_eq!(processes.get(ProcessId(0)).unwrap().waiting_for(), None);
    }

    #[test]
    fn test_already_held_is_noop() {
        let (mut processes, mut resources) = tables(1, 1);
        hold(&mut processes, &mut resources, 0, 0);
        let outcome = request(&mut processes, &mut resources, ProcessId(0), ResourceId(0)).unwrap();
        assert_eq!(outcome, Ok(RequestOutcome::AlreadyHeld));
        assert_eq!(processes.get(ProcessId(0)).unwrap().resources_held().count(), 1);
    }

    #[test]
    fn test_busy_resource_records_wait() {
        let (mut processes, mut resources) = tables(2, 1);
        hold(&mut processes, &mut resources, 1, 0);
        let outcome = request(&mut processes, &mut resources, ProcessId(0), ResourceId(0)).unwrap();
        assert_eq!(
            outcome,
            Ok(RequestOutcome::Waiting {
                holder: ProcessId(1)
            })
        );
        assert_eq!(
            processes.get(ProcessId(0)).unwrap().waiting_for(),
            Some(ResourceId(0))
        );
    }

    #[test]
    fn test_wait_closing_cycle_is_recorded() {
        let (mut processes, mut resources) = tables(3, 3);
        hold(&mut processes, &mut resources, 0, 0);
        hold(&mut processes, &mut resources, 1, 1);
        // P1 waits on R2 (held by P2)
        let first = request(&mut processes, &mut resources, ProcessId(0), ResourceId(1)).unwrap();
        assert!(matches!(first, Ok(RequestOutcome::Waiting { .. })));

        // P2 waiting on R1 closes the cycle; waits are not refused
        let second = request(&mut processes, &mut resources, ProcessId(1), ResourceId(0)).unwrap();
        assert_eq!(
            second,
            Ok(RequestOutcome::Waiting {
                holder: ProcessId(0)
            })
        );
        assert_eq!(
            processes.get(ProcessId(1)).unwrap().waiting_for(),
            Some(ResourceId(0))
        );
        assert!(has_cycle(&processes, &resources));

        // any grant is refused while the cycle stands
        let third = request(&mut processes, &mut resources, ProcessId(2), ResourceId(2)).unwrap();
        match third {
            Err(Refusal { cycle }) => {
                assert_eq!(cycle.len(), 2);
                assert!(cycle.contains(&ProcessId(0)) && cycle.contains(&ProcessId(1)));
            }
            other => panic!("expected refusal, got {other:?}"),
        }
        assert_eq!(resources.holder(ResourceId(2)), None);
    }

    #[test]
    fn test_grant_refused_while_deadlock_exists() {
        let (mut processes, mut resources) = tables(3, 3);
        hold(&mut processes, &mut resources, 0, 0);
        hold(&mut processes, &mut resources, 1, 1);
        wait(&mut processes, 0, 1);
        wait(&mut processes, 1, 0);
        let before_p = processes.get(ProcessId(2)).unwrap().clone();
        let before_r = resources.get(ResourceId(2)).unwrap().clone();

        let outcome = request(&mut processes, &mut resources, ProcessId(2), ResourceId(2)).unwrap();
        assert!(outcome.is_err());
        assert_eq!(processes.get(ProcessId(2)).unwrap(), &before_p);
        assert_eq!(resources.get(ResourceId(2)).unwrap(), &before_r);
    }

    #[test]
    fn test_proposal_phases_in_isolation() {
        let (mut processes, mut resources) = tables(1, 1);
        let proposal =
            Proposal::apply(&mut processes, &mut resources, ProcessId(0), ResourceId(0)).unwrap();
        assert_eq!(proposal.process(), ProcessId(0));
        assert_eq!(proposal.resource(), ResourceId(0));
        // tentative state is visible before commit
        assert_eq!(resources.holder(ResourceId(0)), Some(ProcessId(0)));
        assert!(proposal.validate(&processes, &resources).is_ok());

        proposal.undo(&mut processes, &mut resources);
        assert_eq!(resources.holder(ResourceId(0)), None);
        assert!(!processes.get(ProcessId(0)).unwrap().holds(ResourceId(0)));
    }

    #[test]
    fn test_undo_restores_previous_wait() {
        let (mut processes, mut resources) = tables(2, 2);
        hold(&mut processes, &mut resources, 1, 0);
        wait(&mut processes, 0, 0);

        let proposal =
            Proposal::apply(&mut processes, &mut resources, ProcessId(0), ResourceId(1)).unwrap();
        assert_eq!(processes.get(ProcessId(0)).unwrap().waiting_for(), None);
        proposal.undo(&mut processes, &mut resources);
        assert_eq!(
            processes.get(ProcessId(0)).unwrap().waiting_for(),
            Some(ResourceId(0))
        );
    }

    #[test]
    fn test_unknown_ids() {
        let (mut processes, mut resources) = tables(1, 1);
        assert_eq!(
            request(&mut processes, &mut resources, ProcessId(5), ResourceId(0)),
            Err(GrantError::UnknownProcess(ProcessId(5)))
        );
        assert_eq!(
            request(&mut processes, &mut resources, ProcessId(0), ResourceId(5)),
            Err(GrantError::UnknownResource(ResourceId(5)))
        );
    }
}
