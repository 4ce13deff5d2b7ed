//! gotree: a UCT Monte Carlo Tree Search engine for Go.
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry, MCTS tuning, and scoring constants
//! - [`point`] - Padded-grid coordinates, colours, and point sets
//! - [`board_like`] - The shared capability set for full and playout boards
//! - [`board`] - Full incremental board: blocks, liberties, ko, undo
//! - [`playout_board`] - The lighter board used inside simulations
//! - [`patterns`] - 3x3 pattern matching and diamond context codes
//! - [`knowledge`] - Expansion priors and additive predictor table
//! - [`policy`] - The playout move-generator cascade
//! - [`scoring`] - Terminal evaluation: mercy rule, area scoring, score modification
//! - [`tree`] - The lock-free concurrent search tree
//! - [`search`] - The UCT search driver and worker-thread pool
//! - [`gtp`] - The Go Text Protocol front end
//! - [`error`] - Crate-wide error types
//!
//! ## Example
//!
//! ```
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use gotree::board::Board;
//! use gotree::search::{KnowledgeParams, PlayoutParams, SearchBudget, SearchParams, UctSearch};
//!
//! let board = Board::new();
//! let mut params = SearchParams::default();
//! params.num_threads = 1;
//! let search = UctSearch::new(params, PlayoutParams::default(), KnowledgeParams::default());
//! let budget = SearchBudget { max_simulations: Some(50), max_time: None };
//! let cancel = Arc::new(AtomicBool::new(false));
//! let result = search.search(&board, budget, cancel);
//! assert!(result.simulations_run > 0);
//! ```

pub mod board;
pub mod board_like;
pub mod constants;
pub mod error;
pub mod gtp;
pub mod knowledge;
pub mod patterns;
pub mod playout_board;
pub mod point;
pub mod policy;
pub mod scoring;
pub mod search;
pub mod tree;
