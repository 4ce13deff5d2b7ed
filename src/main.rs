//! gotree: a UCT Monte Carlo Tree Search engine for Go.
//!
//! ## Usage
//!
//! - `gotree gtp` - Start the GTP server for GUI/bridge integration
//! - `gotree genmove` - Run one search from an empty board and print the move

use clap::{Parser, Subcommand};
use log::info;

use gotree::board::Board;
use gotree::gtp::GtpEngine;
use gotree::point::str_coord;
use gotree::search::{KnowledgeParams, PlayoutParams, SearchBudget, SearchParams, UctSearch};

#[derive(Parser)]
#[command(name = "gotree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Worker thread count for the search.
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Node pool capacity, summed across all worker allocators.
    #[arg(long, global = true)]
    tree_capacity: Option<usize>,

    /// Simulation budget per move.
    #[arg(long, global = true)]
    simulations: Option<u64>,

    /// Wall-clock budget per move, in seconds. Overrides `--simulations` if both are given.
    #[arg(long, global = true)]
    time: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server for use with GUI applications.
    Gtp,
    /// Run a single search from an empty board and print the chosen move.
    Genmove,
}

impl Cli {
    fn budget(&self) -> SearchBudget {
        if let Some(secs) = self.time {
            SearchBudget { max_simulations: None, max_time: Some(std::time::Duration::from_secs_f64(secs)) }
        } else {
            SearchBudget { max_simulations: Some(self.simulations.unwrap_or(gotree::constants::N_SIMS as u64)), max_time: None }
        }
    }

    fn search_params(&self) -> SearchParams {
        let mut params = SearchParams::default();
        if let Some(t) = self.threads {
            params.num_threads = t;
        }
        if let Some(c) = self.tree_capacity {
            params.tree_capacity = c;
        }
        params
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let budget = cli.budget();
    let params = cli.search_params();

    match cli.command {
        Some(Commands::Gtp) => {
            info!("starting GTP loop");
            let mut engine = GtpEngine::with_budget(budget);
            engine.run();
        }
        Some(Commands::Genmove) | None => run_genmove(params, budget),
    }
}

fn run_genmove(params: SearchParams, budget: SearchBudget) {
    let board = Board::new();
    let search = UctSearch::new(params, PlayoutParams::default(), KnowledgeParams::default());
    let cancel = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let result = search.choose_move(&board, budget, cancel);

    println!("gotree: searched {} simulations", result.simulations_run);
    if result.should_resign {
        println!("resign");
    } else {
        println!(
            "best move: {} (visits={}, mean={:.3})",
            str_coord(result.best_move),
            result.root_visits,
            result.root_mean
        );
    }
}
