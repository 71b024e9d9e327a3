//! Paging and priority scheduling integration tests

use ossim::{ProcessId, ProcessSpec, ProcessState, SimConfig, Simulation};

fn sim_with(config: SimConfig) -> Simulation {
    Simulation::without_scheduler(config).unwrap()
}

fn spawn(
    sim: &Simulation,
    name: &str,
    size: u32,
    priority: i32,
    time: u32,
) -> (ProcessId, usize) {
    let id = sim
        .create_process_with(
            ProcessSpec::new(name)
                .size(size)
                .priority(priority)
                .remaining_time(time),
        )
        .unwrap();
    let faults = sim.allocate_paged(id).unwrap();
    (id, faults)
}

#[test]
fn test_pages_fit_without_faults() {
    let sim = sim_with(SimConfig::paged());
    spawn(&sim, "filler", 100, 0, 1);
    let (id, faults) = spawn(&sim, "P", 130, 1, 1);
    assert_eq!(faults, 0);

    let snap = sim.snapshot();
    let p = snap.process("P").unwrap();
    assert_eq!(p.pages().len(), 3);
    assert_eq!(p.resident_pages(), 3);
    assert_eq!(snap.fault_count, 0);
    assert_eq!(snap.free_blocks(), 5);
    assert!(snap
        .blocks
        .iter()
        .filter_map(|b| b.occupant())
        .filter(|o| o.process == id)
        .all(|o| o.page.is_some()));
}

#[test]
fn test_faults_when_one_block_is_free() {
    let sim = sim_with(SimConfig::paged());
    spawn(&sim, "filler", 450, 0, 1);
    let (_, faults) = spawn(&sim, "P", 130, 1, 1);
    assert_eq!(faults, 2);

    let snap = sim.snapshot();
    let p = snap.process("P").unwrap();
    assert_eq!(p.resident_pages(), 1);
    assert_eq!(p.pages_on_disk(), 2);
    assert_eq!(snap.fault_count, 2);
    assert_eq!(snap.free_blocks(), 0);
}

#[test]
fn test_faults_accumulate_across_processes() {
    let sim = sim_with(SimConfig::paged());
    spawn(&sim, "A", 500, 1, 1);
    spawn(&sim, "B", 100, 1, 1);
    spawn(&sim, "C", 1, 1, 1);
    assert_eq!(sim.snapshot().fault_count, 3);
}

#[test]
fn test_priority_order_over_run() {
    let sim = sim_with(SimConfig::paged());
    let (p1, _) = spawn(&sim, "P1", 50, 3, 1);
    let (p2, _) = spawn(&sim, "P2", 50, 7, 2);
    let (p3, _) = spawn(&sim, "P3", 50, 7, 1);
    let (p4, _) = spawn(&sim, "P4", 50, 1, 1);

    let order: Vec<_> = std::iter::from_fn(|| sim.tick_now().ran).collect();
    assert_eq!(order, vec![p2, p2, p3, p1, p4]);

    let snap = sim.snapshot();
    assert!(snap
        .processes
        .iter()
        .all(|p| p.state() == ProcessState::Finished && p.remaining_time() == 0));
    assert_eq!(snap.free_blocks(), 10);
    assert_eq!(snap.ticks, 6);
}

#[test]
fn test_release_does_not_retry_on_disk_pages_by_default() {
    let sim = sim_with(SimConfig::paged());
    spawn(&sim, "short", 450, 9, 1);
    spawn(&sim, "P", 130, 1, 3);

    sim.tick_now();
    let snap = sim.snapshot();
    assert_eq!(snap.process("short").unwrap().state(), ProcessState::Finished);
    let p = snap.process("P").unwrap();
    assert_eq!(p.pages_on_disk(), 2);
    assert_eq!(snap.free_blocks(), 9);
}

#[test]
fn test_retry_on_release_places_on_disk_pages() {
    let mut config = SimConfig::paged();
    config.paging.retry_on_release = true;
    let sim = sim_with(config);
    spawn(&sim, "short", 450, 9, 1);
    spawn(&sim, "P", 130, 1, 3);

    sim.tick_now();
    let snap = sim.snapshot();
    let p = snap.process("P").unwrap();
    assert_eq!(p.pages_on_disk(), 0);
    assert_eq!(p.resident_pages(), 3);
    // retries are not new faults
    assert_eq!(snap.fault_count, 2);
    assert_eq!(snap.free_blocks(), 7);
}

#[test]
fn test_zero_time_process_stays_ready() {
    let sim = sim_with(SimConfig::paged());
    let (id, _) = spawn(&sim, "idle", 120, 10, 0);
    for _ in 0..3 {
        assert_eq!(sim.tick_now().ran, None);
    }
    let snap = sim.snapshot();
    let p = snap.process("idle").unwrap();
    assert_eq!(p.state(), ProcessState::Ready);
    assert_eq!(p.remaining_time(), 0);
    assert_eq!(p.resident_pages(), 3);
    // never finished, so its blocks are never released
    let held = snap
        .blocks
        .iter()
        .filter(|b| b.occupant().is_some_and(|o| o.process == id))
        .count();
    assert_eq!(held, 3);
    assert_eq!(snap.free_blocks(), 7);
}
