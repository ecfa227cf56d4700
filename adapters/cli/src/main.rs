#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the Campus Runner navigation core headlessly.

mod campus;
mod config;
mod simulate;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use campus_runner_core::CellCoord;
use campus_runner_system_search::Algorithm;
use campus_runner_world::{self as world, query, World};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::{campus::CampusModel, config::Settings, simulate::Simulation};

#[derive(Debug, Parser)]
#[command(name = "campus-runner", version, about = "Headless campus navigation driver")]
struct Cli {
    /// TOML file with optional [rules], [obstacles] and [patrol] sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// ASCII campus layout used instead of the built-in campus.
    #[arg(long, global = true)]
    layout: Option<PathBuf>,
    /// Raises log verbosity; repeat for debug output. Overrides `RUST_LOG`.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Lists the landmarks of the campus.
    Landmarks,
    /// Finds a route between two cells and draws it over the campus.
    Path {
        /// Search strategy.
        #[arg(long, value_enum, default_value_t = Strategy::Astar)]
        algorithm: Strategy,
        /// Landmark letter, `S`, or `column,row`; defaults to the start cell.
        #[arg(long)]
        from: Option<String>,
        /// Landmark letter, `S`, or `column,row`.
        to: String,
    },
    /// Runs BFS and A* between two cells and compares their work.
    Compare {
        /// Landmark letter, `S`, or `column,row`; defaults to the start cell.
        #[arg(long)]
        from: Option<String>,
        /// Landmark letter, `S`, or `column,row`.
        to: String,
    },
    /// Walks the player to a destination while construction and NPCs change the campus.
    Simulate {
        /// Landmark letter, `S`, or `column,row`.
        to: String,
        /// Search strategy the player plans with.
        #[arg(long, value_enum, default_value_t = Strategy::Astar)]
        algorithm: Strategy,
        /// Simulated seconds before giving up.
        #[arg(long, default_value_t = 300.0)]
        seconds: f64,
        /// Length of one simulation tick in milliseconds.
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
        /// Delay between two player steps in milliseconds.
        #[arg(long, default_value_t = 250)]
        step_ms: u64,
        /// Seed for obstacle placement, overriding the config file.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Breadth-first search: fewest steps.
    Bfs,
    /// A* over tile weights: cheapest route.
    Astar,
}

impl From<Strategy> for Algorithm {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Bfs => Self::Bfs,
            Strategy::Astar => Self::AStar,
        }
    }
}

/// Entry point for the Campus Runner command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let campus = match &cli.layout {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display()))?;
            CampusModel::parse(&text)
                .with_context(|| format!("invalid layout {}", path.display()))?
        }
        None => CampusModel::builtin().context("built-in campus is malformed")?,
    };
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.mode {
        Mode::Landmarks => list_landmarks(&campus),
        Mode::Path {
            algorithm,
            from,
            to,
        } => {
            let world = load(&campus, &settings)?;
            let (start, goal) = endpoints(&campus, from.as_deref(), &to)?;
            let algorithm = Algorithm::from(algorithm);
            let report = query::search(&world, algorithm, start, goal)?;
            if report.path.is_empty() {
                println!("{algorithm}: no route from {start} to {goal}");
            } else {
                println!(
                    "{algorithm}: {} steps, cost {}, explored {} cells",
                    report.path.edge_count(),
                    query::path_cost(&world, &report.path).unwrap_or_default(),
                    report.explored
                );
            }
            print!("{}", campus::render(&world, Some(&report.path)));
            Ok(())
        }
        Mode::Compare { from, to } => {
            let world = load(&campus, &settings)?;
            let (start, goal) = endpoints(&campus, from.as_deref(), &to)?;
            println!("{start} -> {goal}");
            for algorithm in Algorithm::ALL {
                let report = query::search(&world, algorithm, start, goal)?;
                println!(
                    "{:<4} steps {:>4}  cost {:>5}  explored {:>5}",
                    algorithm.to_string(),
                    report.path.edge_count(),
                    query::path_cost(&world, &report.path).unwrap_or_default(),
                    report.explored
                );
            }
            Ok(())
        }
        Mode::Simulate {
            to,
            algorithm,
            seconds,
            tick_ms,
            step_ms,
            seed,
        } => {
            if let Some(seed) = seed {
                settings.reseed(seed)?;
            }
            let limit = Duration::try_from_secs_f64(seconds)
                .context("--seconds must be a non-negative number")?;
            let (start, goal) = endpoints(&campus, None, &to)?;
            let simulation = Simulation::new(
                &campus,
                settings,
                algorithm.into(),
                start,
                goal,
                Duration::from_millis(step_ms),
            )?;
            let (outcome, world) = simulation.run(limit, Duration::from_millis(tick_ms))?;

            print!("{}", campus::render(&world, None));
            println!(
                "{} after {:.1}s: {} steps, {} plans, {} interruptions, {} tile effects, \
                 {:.1}s penalty",
                if outcome.arrived { "arrived" } else { "gave up" },
                outcome.elapsed.as_secs_f64(),
                outcome.steps,
                outcome.replans,
                outcome.blocked,
                outcome.effects,
                outcome.penalty.as_secs_f64()
            );
            println!(
                "construction: {} started, {} ended, {} active",
                outcome.sites_started,
                outcome.sites_ended,
                query::construction_sites(&world).len()
            );
            println!(
                "weather: {} showers, rain multiplier now x{}",
                outcome.showers,
                query::rain_multiplier(&world)
            );
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            let _ = builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            let _ = builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.init();
}

fn list_landmarks(campus: &CampusModel) -> Result<()> {
    let (columns, rows) = campus.dimensions();
    println!("campus {columns}x{rows}");
    if let Some(start) = campus.start() {
        println!("S  {:<10} start", start.to_string());
    }
    for (letter, cell) in campus.landmarks() {
        println!("{letter}  {:<10} {}", cell.to_string(), campus.name(letter));
    }
    Ok(())
}

fn load(campus: &CampusModel, settings: &Settings) -> Result<World> {
    let mut world = World::with_rules(settings.rules.clone()).context("invalid rules")?;
    let mut events = Vec::new();
    for command in campus.commands() {
        world::apply(&mut world, command, &mut events)?;
    }
    Ok(world)
}

fn endpoints(
    campus: &CampusModel,
    from: Option<&str>,
    to: &str,
) -> Result<(CellCoord, CellCoord)> {
    let start = match from {
        Some(reference) => campus.resolve(reference)?,
        None => match campus.start() {
            Some(start) => start,
            None => bail!("layout has no start cell; pass --from"),
        },
    };
    let goal = campus.resolve(to)?;
    let (columns, rows) = campus.dimensions();
    for cell in [start, goal] {
        if cell.column() >= columns || cell.row() >= rows {
            bail!("{cell} lies outside the {columns}x{rows} campus");
        }
    }
    Ok((start, goal))
}
