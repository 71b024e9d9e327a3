//! Concurrency integration tests
//!
//! Background scheduler, I/O-block workers and caller operations sharing one
//! simulation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ossim::{ProcessSpec, ProcessState, SimConfig, SimError, SimEvent, Simulation};

fn fast_config() -> SimConfig {
    let mut config = SimConfig::paged();
    config.scheduler.tick_ms = 2;
    config.io.block_ms = 10;
    config
}

#[test]
fn test_scheduler_and_io_blocks_run_everything_to_completion() {
    let sim = Simulation::new(fast_config()).unwrap();
    let rx = sim.subscribe();
    for i in 0..4 {
        let id = sim
            .create_process_with(
                ProcessSpec::new(format!("P{i}"))
                    .size(100)
                    .priority(i)
                    .remaining_time(5),
            )
            .unwrap();
        sim.allocate_paged(id).unwrap();
    }

    let handles: Vec<_> = (0..6).map(|_| sim.simulate_io_block().unwrap()).collect();
    for handle in handles {
        handle.join();
    }

    let mut finished = 0;
    while finished < 4 {
        if let SimEvent::ProcessFinished { .. } = rx.recv_timeout(Duration::from_secs(10)).unwrap()
        {
            finished += 1;
        }
    }

    let snap = sim.snapshot();
    assert!(snap
        .processes
        .iter()
        .all(|p| p.state() == ProcessState::Finished && !p.is_blocked()));
    assert_eq!(snap.free_blocks(), 10);
}

#[test]
fn test_concurrent_callers_see_consistent_snapshots() {
    let sim = Arc::new(Simulation::new(fast_config()).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let sim = Arc::clone(&sim);
            thread::spawn(move || {
                for i in 0..5 {
                    let id = sim
                        .create_process_with(
                            ProcessSpec::new(format!("T{t}-{i}"))
                                .size(50)
                                .priority(i)
                                .remaining_time(2),
                        )
                        .unwrap();
                    sim.allocate_paged(id).unwrap();
                    let snap = sim.snapshot();
                    assert_eq!(snap.used_kb + snap.free_kb, snap.total_kb);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let snap = sim.snapshot();
    assert_eq!(snap.processes.len(), 20);
    for block in &snap.blocks {
        if let Some(occupant) = block.occupant() {
            let owner = &snap.processes[occupant.process.index()];
            assert_ne!(owner.state(), ProcessState::Finished);
        }
    }
}

#[test]
fn test_reset_during_io_block() {
    let sim = Simulation::new(fast_config()).unwrap();
    let id = sim
        .create_process_with(ProcessSpec::new("P").size(50).priority(1).remaining_time(100))
        .unwrap();
    sim.allocate_paged(id).unwrap();
    let handle = sim.simulate_io_block().unwrap();

    sim.reset();
    sim.reset();
    assert!(!handle.join());

    let snap = sim.snapshot();
    assert!(snap.processes.is_empty());
    assert_eq!(snap.fault_count, 0);
    assert_eq!(snap.free_blocks(), 10);
    assert!(matches!(
        sim.simulate_io_block(),
        Err(SimError::PreconditionNotMet(_))
    ));
}

#[test]
fn test_drop_stops_scheduler() {
    let mut config = SimConfig::paged();
    config.scheduler.tick_ms = 60_000;
    let sim = Simulation::new(config).unwrap();
    assert!(sim.is_scheduling());
    drop(sim);
}
