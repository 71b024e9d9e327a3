//! Scheduler 单元测试
//!
//! 测试优先级选择、时钟推进和后台调度线程

use crate::model::{ProcessId, ProcessSpec, ProcessState};
use crate::runtime::events::{EventBus, SimEvent};
use crate::runtime::scheduler::{select_next, tick, PriorityScheduler, SchedulerConfig};
use crate::runtime::state::SimState;
use crate::util::config::SimConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Paged state with one READY process per `(priority, remaining_time)`.
fn ready_state(jobs: &[(i32, u32)]) -> SimState {
    let mut state = SimState::new(&SimConfig::paged());
    for (i, &(priority, time)) in jobs.iter().enumerate() {
        let id = state
            .create_process(
                ProcessSpec::new(format!("P{}", i + 1))
                    .size(50)
                    .priority(priority)
                    .remaining_time(time),
            )
            .unwrap();
        state.allocate_paged(id).unwrap();
    }
    state
}

#[cfg(test)]
mod selection_tests {
    use super::*;

    #[test]
    fn test_first_of_tied_highest_priority_wins() {
        let state = ready_state(&[(3, 5), (7, 5), (7, 5), (1, 5)]);
        assert_eq!(select_next(state.processes()), Some(ProcessId(1)));
    }

    #[test]
    fn test_blocked_and_new_are_skipped() {
        let mut state = ready_state(&[(9, 5), (5, 5)]);
        state.processes.get_mut(ProcessId(0)).unwrap().block_for_io();
        state
            .create_process(ProcessSpec::new("unplaced").size(50).priority(100).remaining_time(3))
            .unwrap();
        assert_eq!(select_next(state.processes()), Some(ProcessId(1)));
    }

    #[test]
    fn test_nothing_to_select() {
        let state = ready_state(&[(1, 0)]);
        assert_eq!(select_next(state.processes()), None);
    }

    #[test]
    fn test_negative_priorities() {
        let state = ready_state(&[(-5, 1), (-2, 1)]);
        assert_eq!(select_next(state.processes()), Some(ProcessId(1)));
    }
}

#[cfg(test)]
mod tick_tests {
    use super::*;

    #[test]
    fn test_priority_order_until_completion() {
        let mut state = ready_state(&[(3, 1), (7, 2), (7, 1), (1, 1)]);
        let ran: Vec<_> = (0..6).map(|_| tick(&mut state).ran).collect();
        assert_eq!(
            ran,
            vec![
                Some(ProcessId(1)),
                Some(ProcessId(1)),
                Some(ProcessId(2)),
                Some(ProcessId(0)),
                Some(ProcessId(3)),
                None,
            ]
        );
    }

    #[test]
    fn test_tick_decrements_and_returns_to_ready() {
        let mut state = ready_state(&[(1, 3)]);
        let report = tick(&mut state);
        assert_eq!(report.tick, 1);
        assert_eq!(report.ran, Some(ProcessId(0)));
        assert_eq!(report.finished, None);

        let p = state.process(ProcessId(0)).unwrap();
        assert_eq!(p.remaining_time(), 2);
        assert_eq!(p.state(), ProcessState::Ready);
        assert!(!p.is_running());
    }

    #[test]
    fn test_finishing_releases_pages() {
        let mut state = SimState::new(&SimConfig::paged());
        let id = state
            .create_process(ProcessSpec::new("P").size(130).priority(1).remaining_time(1))
            .unwrap();
        state.allocate_paged(id).unwrap();
        assert_eq!(state.pool().free_count(), 7);

        let report = tick(&mut state);
        assert_eq!(report.finished, Some(id));

        let p = state.process(id).unwrap();
        assert_eq!(p.state(), ProcessState::Finished);
        assert_eq!(p.remaining_time(), 0);
        assert!(p.pages().iter().all(|pg| !pg.is_resident() && !pg.is_on_disk()));
        assert_eq!(state.pool().free_count(), 10);
    }

    #[test]
    fn test_finished_process_is_never_selected_again() {
        let mut state = ready_state(&[(5, 1), (1, 2)]);
        tick(&mut state);
        assert_eq!(tick(&mut state).ran, Some(ProcessId(1)));
        assert_eq!(tick(&mut state).ran, Some(ProcessId(1)));
        assert_eq!(tick(&mut state).ran, None);
    }

    #[test]
    fn test_low_priority_starves_while_high_is_ready() {
        let mut state = ready_state(&[(1, 1), (10, 50)]);
        for _ in 0..20 {
            assert_eq!(tick(&mut state).ran, Some(ProcessId(1)));
        }
        assert_eq!(state.process(ProcessId(0)).unwrap().remaining_time(), 1);
    }

    #[test]
    fn test_report_events() {
        let mut state = ready_state(&[(1, 1)]);
        let events = tick(&mut state).events();
        assert_eq!(
            events,
            vec![
                SimEvent::Tick {
                    tick: 1,
                    ran: Some(ProcessId(0))
                },
                SimEvent::ProcessFinished {
                    process: ProcessId(0)
                },
            ]
        );
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick, Duration::from_secs(1));
    }

    #[test]
    fn test_background_loop_runs_to_completion() {
        let state = Arc::new(Mutex::new(ready_state(&[(2, 3), (1, 2)])));
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();

        let mut scheduler = PriorityScheduler::spawn(
            state.clone(),
            bus,
            SchedulerConfig {
                tick: Duration::from_millis(5),
            },
        )
        .unwrap();
        assert!(scheduler.is_running());

        let mut finished = Vec::new();
        while finished.len() < 2 {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                SimEvent::ProcessFinished { process } => finished.push(process),
                _ => {}
            }
        }
        assert_eq!(finished, vec![ProcessId(0), ProcessId(1)]);

        scheduler.shutdown();
        assert!(!scheduler.is_running());
        let guard = state.lock();
        assert!(guard
            .processes()
            .iter()
            .all(|p| p.state() == ProcessState::Finished));
    }

    #[test]
    fn test_shutdown_is_prompt_with_long_period() {
        let state = Arc::new(Mutex::new(ready_state(&[])));
        let mut scheduler = PriorityScheduler::spawn(
            state,
            Arc::new(EventBus::new()),
            SchedulerConfig {
                tick: Duration::from_secs(3600),
            },
        )
        .unwrap();
        let started = std::time::Instant::now();
        scheduler.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
