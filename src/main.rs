use clap::{Parser, ValueEnum};
use graphplan::{
    air_cargo::{air_cargo_p1, air_cargo_p2, air_cargo_p3, AirCargoProblem},
    planning::{MutexConfig, Problem, Result},
    search::{Heuristic, Searcher},
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "graphplan")]
#[command(about = "Solve an air cargo problem with A* guided by a planning graph heuristic")]
struct Args {
    /// Air cargo problem instance
    #[arg(value_parser = clap::value_parser!(u8).range(1..=3), default_value_t = 1)]
    problem: u8,

    /// Heuristic guiding the search
    #[arg(value_enum, default_value_t = HeuristicArg::Levelsum)]
    heuristic: HeuristicArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum HeuristicArg {
    /// Constant 1, uniform cost search
    H1,
    /// Number of unsatisfied goals
    Ignore,
    /// Planning graph level sum
    Levelsum,
    /// Planning graph level sum without mutex propagation
    LevelsumNomutex,
}

impl From<HeuristicArg> for Heuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::H1 => Heuristic::Constant,
            HeuristicArg::Ignore => Heuristic::IgnorePreconditions,
            HeuristicArg::Levelsum => Heuristic::LevelSum(MutexConfig::default()),
            HeuristicArg::LevelsumNomutex => Heuristic::LevelSum(MutexConfig::disabled()),
        }
    }
}

impl Args {
    fn problem(&self) -> Result<AirCargoProblem> {
        match self.problem {
            1 => air_cargo_p1(),
            2 => air_cargo_p2(),
            _ => air_cargo_p3(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let problem = args.problem()?;
    let heuristic = Heuristic::from(args.heuristic);
    let actions = problem.actions_list().len();
    info!(problem = args.problem, %heuristic, actions, "solving air cargo problem");

    let mut searcher = Searcher::new(&problem, heuristic);
    match searcher.astar()? {
        Some(solution) => print!("{}", solution),
        None => println!("No solution found."),
    }
    searcher.recorder().report();
    Ok(())
}
