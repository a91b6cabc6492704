use clap::{Parser, ValueEnum};
use klotski_solver::engine::{Granularity, Puzzle};
use klotski_solver::error::KlotskiError;
use klotski_solver::heuristics::Heuristic;
use klotski_solver::solver::{SolveOptions, SolveOutcome, Solver, Strategy};
use klotski_solver::utils::{format_moves, read_puzzle_file, write_solution_file};
use log::{info, warn};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    AStar,
    Dfs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HeuristicArg {
    Manhattan,
    Zero,
    Axis,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the puzzle file (grid rows, optionally followed by `target <row> <col>`)
    #[clap(short, long)]
    input: PathBuf,

    /// Where to write the solution (one board per step, separated by blank lines)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Search strategy
    #[clap(short, long, value_enum, default_value = "a-star")]
    algorithm: Algorithm,

    /// Treat a straight slide of any length as a single move
    #[clap(long)]
    slides: bool,

    /// A* heuristic; defaults to the admissible one for the chosen move granularity
    #[clap(long, value_enum)]
    heuristic: Option<HeuristicArg>,

    /// Stop after this many node expansions
    #[clap(long)]
    max_expansions: Option<usize>,

    /// Stop after this many seconds of searching
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// Do not print the boards of the solution
    #[clap(long)]
    no_playback: bool,
}

impl Args {
    fn solve_options(&self) -> SolveOptions {
        let strategy = match self.algorithm {
            Algorithm::AStar => Strategy::AStar,
            Algorithm::Dfs => Strategy::Dfs,
        };
        let granularity = if self.slides {
            Granularity::Slide
        } else {
            Granularity::Unit
        };
        let mut options = SolveOptions::default()
            .with_strategy(strategy)
            .with_granularity(granularity);
        if let Some(heuristic) = self.heuristic {
            options = options.with_heuristic(match heuristic {
                HeuristicArg::Manhattan => Heuristic::Manhattan,
                HeuristicArg::Zero => Heuristic::Zero,
                HeuristicArg::Axis => Heuristic::AxisAlignment,
            });
        }
        if let Some(limit) = self.max_expansions {
            options = options.with_max_expansions(limit);
        }
        options
    }
}

fn search(
    puzzle: &Puzzle,
    options: SolveOptions,
    timeout: Option<Duration>,
) -> Result<SolveOutcome, KlotskiError> {
    let solver = Solver::new(puzzle, options);
    let Some(timeout) = timeout else {
        return Ok(solver.solve());
    };
    let started = Instant::now();
    let outcome = solver.solve_with_observer(puzzle.initial(), |_| {
        if started.elapsed() >= timeout {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    Ok(outcome)
}

/// Returns whether a solution was found.
fn run(args: &Args) -> Result<bool, KlotskiError> {
    let puzzle = read_puzzle_file(&args.input)?;
    let board = puzzle.board();
    println!("Loaded puzzle from {}\n", args.input.display());
    println!("Initial board state:\n{}\n", board.encode(puzzle.initial()));
    println!("Target: goal piece at {}\n", puzzle.goal().target());

    let options = args.solve_options();
    info!(
        "Searching with {} ({} moves, {} heuristic)",
        options.strategy,
        match options.granularity {
            Granularity::Unit => "unit",
            Granularity::Slide => "slide",
        },
        options.effective_heuristic()
    );

    let outcome = search(&puzzle, options, args.timeout_secs.map(Duration::from_secs))?;
    let solution = match outcome {
        SolveOutcome::Solved(solution) => solution,
        SolveOutcome::Exhausted(stats) => {
            println!("No solution exists ({stats}).");
            return Ok(false);
        }
        SolveOutcome::LimitReached(stats) => {
            println!("Expansion limit reached before a solution was found ({stats}).");
            return Ok(false);
        }
        SolveOutcome::Cancelled(stats) => {
            println!("Timed out before a solution was found ({stats}).");
            return Ok(false);
        }
    };

    println!("Solution found in {} moves ({}).\n", solution.len(), solution.stats());
    print!("{}", format_moves(board, &solution));

    if !args.no_playback {
        for (i, state) in solution.states().iter().enumerate() {
            println!("\nStep {}:\n{}", i, board.encode(state));
        }
    }

    if let Some(path) = &args.output {
        write_solution_file(path, board, &solution)?;
        println!("\nSolution written to {}", path.display());
    }
    Ok(true)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            warn!("Failed to solve {}", args.input.display());
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
