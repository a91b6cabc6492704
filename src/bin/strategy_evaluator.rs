use clap::Parser;
use klotski_solver::engine::Puzzle;
use klotski_solver::error::KlotskiError;
use klotski_solver::heuristics::Heuristic;
use klotski_solver::solver::{solve, SolveOptions, SolveOutcome, Strategy};
use klotski_solver::utils::{load_puzzle, read_puzzle_file};
use log::debug;
use std::path::PathBuf;
use std::process;

const CLASSIC_PUZZLE: &str = "^11^\nv11v\n^<>^\nv22v\n2..2";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of scrambled boards to evaluate
    #[clap(short, long, default_value_t = 20)]
    boards: usize,

    /// Seed of the first board; board `i` uses `seed + i`
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Random moves applied to the puzzle's initial state to build each board
    #[clap(long, default_value_t = 60)]
    scramble_steps: usize,

    /// Puzzle file to scramble (the classic 4x5 layout if omitted)
    #[clap(short, long)]
    puzzle: Option<PathBuf>,

    /// Expansion budget per search
    #[clap(long, default_value_t = 500_000)]
    max_expansions: usize,
}

#[derive(Default)]
struct Tally {
    solved: usize,
    total_moves: usize,
    total_expanded: usize,
}

impl Tally {
    fn average(total: usize, count: usize) -> f64 {
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }
}

fn run(args: &Args) -> Result<(), KlotskiError> {
    let base = match &args.puzzle {
        Some(path) => read_puzzle_file(path)?,
        None => load_puzzle(CLASSIC_PUZZLE)?,
    };

    let configurations: Vec<(&str, SolveOptions)> = vec![
        (
            "A* manhattan",
            SolveOptions::default().with_heuristic(Heuristic::Manhattan),
        ),
        (
            "A* zero",
            SolveOptions::default().with_heuristic(Heuristic::Zero),
        ),
        ("DFS", SolveOptions::default().with_strategy(Strategy::Dfs)),
    ];
    let mut tallies: Vec<Tally> = configurations.iter().map(|_| Tally::default()).collect();

    println!("Starting strategy evaluation for {} boards...", args.boards);

    for board_idx in 0..args.boards {
        let current_seed = args.seed + board_idx as u64;
        let board = base.board();
        let start = board.scramble(base.initial(), args.scramble_steps, current_seed);
        let puzzle = Puzzle::new(board.clone(), start, *base.goal())?;
        debug!("Board {} (seed {}):\n{}", board_idx, current_seed, board.encode(puzzle.initial()));

        println!("\nEvaluating Board {} (Seed: {})", board_idx, current_seed);

        for ((name, options), tally) in configurations.iter().zip(tallies.iter_mut()) {
            let options = options.with_max_expansions(args.max_expansions);
            match solve(&puzzle, options) {
                SolveOutcome::Solved(solution) => {
                    let stats = solution.stats();
                    println!(
                        "  Strategy: {:<14} Moves: {:<6} Expanded: {}",
                        name,
                        solution.len(),
                        stats.expanded
                    );
                    tally.solved += 1;
                    tally.total_moves += solution.len();
                    tally.total_expanded += stats.expanded;
                }
                other => {
                    let reason = match other {
                        SolveOutcome::Exhausted(_) => "unsolvable",
                        _ => "budget exhausted",
                    };
                    println!(
                        "  Strategy: {:<14} {} after {} expansions",
                        name,
                        reason,
                        other.stats().expanded
                    );
                }
            }
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Number of boards evaluated: {}", args.boards);
    println!("\n--- Averages over solved boards ---");
    for ((name, _), tally) in configurations.iter().zip(&tallies) {
        println!(
            "Strategy {:<14}: solved {}/{}, average moves = {:.2}, average expanded = {:.0}",
            name,
            tally.solved,
            args.boards,
            Tally::average(tally.total_moves, tally.solved),
            Tally::average(tally.total_expanded, tally.solved)
        );
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
