//! ossim - CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use ossim::util::config::{load_config, MemoryMode, SimConfig};
use ossim::util::logger;
use ossim::{ProcessSpec, RequestOutcome, SimError, Simulation, Strategy, NAME, VERSION};

/// Operating-system mechanism simulator
#[derive(Parser, Debug)]
#[command(name = "ossim")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the final snapshot as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place processes into the contiguous block pool
    Contiguous {
        /// Placement strategy (first-fit, best-fit, worst-fit, next-fit)
        #[arg(short, long, default_value = "first-fit")]
        strategy: Strategy,

        /// Process sizes in KB; processes are named P1, P2, ...
        #[arg(long = "size", value_name = "KB", num_args = 1.., required = true)]
        sizes: Vec<u32>,
    },

    /// Page processes into memory and run the priority scheduler
    Paging {
        /// Process as name:size:priority:time
        #[arg(short, long = "process", value_name = "SPEC", value_parser = parse_process, required = true)]
        processes: Vec<ProcessSpec>,

        /// Ticks to run; by default runs until nothing is schedulable
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Replay resource requests with deadlock prevention
    Deadlock {
        /// Comma-separated requests, each PROCESS>RESOURCE
        #[arg(short, long, value_name = "SCRIPT")]
        script: String,
    },
}

fn parse_process(s: &str) -> Result<ProcessSpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [name, size, priority, time] = parts.as_slice() else {
        return Err(format!("expected name:size:priority:time, got `{s}`"));
    };
    let size = size
        .parse()
        .map_err(|_| format!("invalid size `{size}`"))?;
    let priority = priority
        .parse()
        .map_err(|_| format!("invalid priority `{priority}`"))?;
    let time = time
        .parse()
        .map_err(|_| format!("invalid time `{time}`"))?;
    Ok(ProcessSpec::new(*name)
        .size(size)
        .priority(priority)
        .remaining_time(time))
}

fn parse_script(script: &str) -> Result<Vec<(&str, &str)>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(|step| match step.split_once('>') {
            Some((p, r)) if !p.trim().is_empty() && !r.trim().is_empty() => {
                Ok((p.trim(), r.trim()))
            }
            _ => bail!("invalid request `{step}`, expected PROCESS>RESOURCE"),
        })
        .collect()
}

fn load(
    path: Option<&PathBuf>,
    mode: MemoryMode,
) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => {
            let mut config = SimConfig::default();
            config.apply_env()?;
            config
        }
    };
    config.memory.mode = mode;
    config.validate()?;
    Ok(config)
}

fn run_contiguous(
    sim: &Simulation,
    strategy: Strategy,
    sizes: &[u32],
) -> Result<()> {
    for (i, &size) in sizes.iter().enumerate() {
        let name = format!("P{}", i + 1);
        let process = sim.create_process(&name, size)?;
        match sim.allocate_memory(process, strategy) {
            Ok(block) => println!("{name} ({size}KB) -> Block {}", block.index()),
            Err(e @ SimError::NoSpaceAvailable { .. }) => println!("{name}: {e}"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn run_paging(
    sim: &Simulation,
    processes: Vec<ProcessSpec>,
    ticks: Option<u64>,
) -> Result<()> {
    for spec in processes {
        let name = spec.name().to_string();
        let process = sim.create_process_with(spec)?;
        let faults = sim.allocate_paged(process)?;
        println!("{name}: {faults} page fault(s)");
    }

    let mut ran = 0;
    while ticks.is_none_or(|limit| ran < limit) {
        let report = sim.tick_now();
        ran += 1;
        match report.ran {
            Some(id) => {
                let name = sim.with_state(|s| s.process(id).map(|p| p.name().to_string()))?;
                let done = if report.finished.is_some() {
                    " (finished)"
                } else {
                    ""
                };
                println!("tick {}: {name}{done}", report.tick);
            }
            None if ticks.is_none() => break,
            None => println!("tick {}: idle", report.tick),
        }
    }
    Ok(())
}

fn run_deadlock(
    sim: &Simulation,
    script: &str,
) -> Result<()> {
    for (process, resource) in parse_script(script)? {
        let pid = match sim.process_id(process) {
            Some(id) => id,
            None => sim.create_process(process, 0)?,
        };
        let rid = match sim.resource_id(resource) {
            Some(id) => id,
            None => sim.create_resource(resource)?,
        };
        match sim.request_resource(pid, rid) {
            Ok(RequestOutcome::Granted) => println!("{process} > {resource}: granted"),
            Ok(RequestOutcome::AlreadyHeld) => println!("{process} > {resource}: already held"),
            Ok(RequestOutcome::Waiting { .. }) => println!("{process} > {resource}: waiting"),
            Err(e) if e.is_refusal() => {
                warn!("{e}");
                println!("{process} > {resource}: refused (deadlock)");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_debug();
        eprintln!("{} version: {}", NAME, VERSION);
    } else {
        logger::init();
    }

    let mode = match args.command {
        Commands::Paging { .. } => MemoryMode::Paged,
        _ => MemoryMode::Contiguous,
    };
    let config = load(args.config.as_ref(), mode)?;
    let sim = Simulation::without_scheduler(config).context("Failed to start simulation")?;

    match args.command {
        Commands::Contiguous { strategy, sizes } => run_contiguous(&sim, strategy, &sizes)?,
        Commands::Paging { processes, ticks } => run_paging(&sim, processes, ticks)?,
        Commands::Deadlock { script } => run_deadlock(&sim, &script)?,
    }

    let snapshot = sim.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{snapshot}");
    }
    Ok(())
}
