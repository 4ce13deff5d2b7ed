//! Go Text Protocol (GTP) front end.
//!
//! GTP is a text-based protocol for driving a Go engine from a graphical
//! interface (Sabaki, GoGui, KGS's `kgsGtp` bridge...). This module covers
//! GTP version 2's core command set plus a handful of KGS/time-control
//! extensions, and a `uct_param_*` family for poking at the search's tuning
//! knobs without restarting the process.
//!
//! Grounded on `gtp.rs` for the read-eval-print loop shape
//! (optional numeric id, `=`/`?` response prefix, board redrawn to stderr
//! after every command) and on `original_source/gouct/GoUctGtpEngine`-style
//! additions for `undo`, `final_score`, and the `uct_param_*` setters.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::{format_board, Board, Undo};
use crate::constants::{N, N_SIMS};
use crate::point::{parse_coord, str_coord, Color};
use crate::scoring;
use crate::search::{KnowledgeParams, PlayoutParams, SearchBudget, SearchParams, UctSearch};

/// The list of known GTP commands, used by `known_command`/`list_commands`.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "cputime",
    "final_score",
    "genmove",
    "help",
    "kgs-game_over",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "time_left",
    "time_settings",
    "undo",
    "uct_param_player",
    "uct_param_policy",
    "uct_param_search",
    "version",
];

/// GTP engine state: the live position, the reusable search tree, and the
/// bookkeeping GTP itself requires (undo log, territory map, clocks).
pub struct GtpEngine {
    board: Board,
    search: UctSearch,
    history: Vec<Undo>,
    owner_map: Vec<i32>,
    owner_map_sims: usize,
    budget: SearchBudget,
    main_time: Duration,
    byo_time: Duration,
    byo_stones: u32,
    start_time: Instant,
}

impl GtpEngine {
    pub fn new() -> Self {
        Self::with_budget(SearchBudget { max_simulations: Some(N_SIMS as u64), max_time: None })
    }

    pub fn with_budget(budget: SearchBudget) -> Self {
        let board = Board::new();
        let search = UctSearch::new(SearchParams::default(), PlayoutParams::default(), KnowledgeParams::default());
        GtpEngine {
            board,
            search,
            history: Vec::new(),
            owner_map: vec![0i32; crate::constants::BOARDSIZE],
            owner_map_sims: 1,
            budget,
            main_time: Duration::ZERO,
            byo_time: Duration::ZERO,
            byo_stones: 0,
            start_time: Instant::now(),
        }
    }

    fn print_board(&self) {
        eprint!("{}", format_board(&self.board, Some(&self.owner_map), self.owner_map_sims));
    }

    fn turn_indicator(&self) -> &'static str {
        match self.board.to_play() {
            Color::Black => "\u{25CF}",
            _ => "\u{25CB}",
        }
    }

    /// Run the GTP command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            let command = parts[0].to_lowercase();
            let args = &parts[1..];

            let response = self.execute(&command, args);
            self.print_board();
            stderr.flush().ok();

            let (success, message) = response;
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(stdout, "{prefix}{id_str} {message}\n").unwrap();
            stdout.flush().unwrap();

            write!(stderr, "{} gotree> ", self.turn_indicator()).ok();
            stderr.flush().ok();

            if command == "quit" {
                break;
            }
        }
    }

    /// Parse an optional numeric command id from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let mut chars = trimmed.char_indices();
        if let Some((_, c)) = chars.next() {
            if c.is_ascii_digit() {
                let end = chars
                    .find(|(_, c)| !c.is_ascii_digit())
                    .map(|(i, _)| i)
                    .unwrap_or(trimmed.len());
                if let Ok(id) = trimmed[..end].parse::<u32>() {
                    return (Some(id), trimmed[end..].trim());
                }
            }
        }
        (None, trimmed)
    }

    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, "gotree".to_string()),
            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),
            "protocol_version" => (true, "2".to_string()),
            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),
            "help" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                None => (false, "missing argument".to_string()),
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
            },

            "quit" => (true, String::new()),

            "boardsize" => match args.first().and_then(|s| s.parse::<usize>().ok()) {
                Some(size) if size == N => (true, String::new()),
                Some(size) => (false, format!("unacceptable size, only {N} is supported (got {size})")),
                None => (false, "invalid size".to_string()),
            },

            "clear_board" => {
                let rules = self.board.rules;
                self.board = Board::with_rules(rules);
                self.search.reset();
                self.history.clear();
                self.owner_map.iter_mut().for_each(|x| *x = 0);
                self.owner_map_sims = 1;
                (true, String::new())
            }

            "komi" => match args.first().and_then(|s| s.parse::<f32>().ok()) {
                Some(komi) => {
                    self.board.rules.komi = komi;
                    (true, String::new())
                }
                None => (false, "invalid komi".to_string()),
            },

            "play" => self.cmd_play(args),
            "genmove" => self.cmd_genmove(args),
            "undo" => self.cmd_undo(),

            "showboard" => {
                let board_str = format_board(&self.board, Some(&self.owner_map), self.owner_map_sims);
                (true, format!("\n{}", board_str.trim_end()))
            }

            "final_score" => (true, self.final_score()),

            "kgs-game_over" => (true, String::new()),

            "cputime" => (true, format!("{:.3}", self.start_time.elapsed().as_secs_f64())),

            "time_settings" => self.cmd_time_settings(args),
            "time_left" => (true, String::new()),

            "uct_param_search" => self.cmd_uct_param_search(args),
            "uct_param_player" => self.cmd_uct_param_player(args),
            "uct_param_policy" => self.cmd_uct_param_policy(args),

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn cmd_play(&mut self, args: &[&str]) -> (bool, String) {
        if args.len() < 2 {
            return (false, "missing arguments".to_string());
        }
        let colour = match parse_colour(args[0]) {
            Some(c) => c,
            None => return (false, format!("invalid color: {}", args[0])),
        };
        let mv = match parse_coord(args[1]) {
            Some(p) => p,
            None => return (false, format!("invalid vertex: {}", args[1])),
        };
        match self.board.play(mv, colour) {
            Ok(undo) => {
                self.history.push(undo);
                self.search.advance_root(mv);
                (true, String::new())
            }
            Err(e) => (false, e.to_string()),
        }
    }

    fn cmd_genmove(&mut self, args: &[&str]) -> (bool, String) {
        let colour = match args.first().and_then(|a| parse_colour(a)) {
            Some(c) => c,
            None => return (false, "missing or invalid color".to_string()),
        };
        let _ = colour; // GTP permits a requested colour that differs from the
                        // alternating `to_play`; the search always answers for
                        // whichever colour the board says is on move next.
        let cancel = Arc::new(AtomicBool::new(false));
        let result = self.search.choose_move(&self.board, self.budget, cancel);
        self.owner_map = self.search.owner_map_snapshot();
        self.owner_map_sims = result.simulations_run.max(1) as usize;

        if result.should_resign {
            return (true, "resign".to_string());
        }
        let mover = self.board.to_play();
        match self.board.play(result.best_move, mover) {
            Ok(undo) => {
                self.history.push(undo);
                self.search.advance_root(result.best_move);
                (true, str_coord(result.best_move))
            }
            Err(e) => (false, e.to_string()),
        }
    }

    fn cmd_undo(&mut self) -> (bool, String) {
        match self.history.pop() {
            Some(undo) => {
                self.board.undo(&undo);
                self.search.reset();
                (true, String::new())
            }
            None => (false, "cannot undo".to_string()),
        }
    }

    fn cmd_time_settings(&mut self, args: &[&str]) -> (bool, String) {
        if args.len() < 3 {
            return (false, "missing arguments".to_string());
        }
        let (main, byo_time, byo_stones) = match (
            args[0].parse::<u64>(),
            args[1].parse::<u64>(),
            args[2].parse::<u32>(),
        ) {
            (Ok(a), Ok(b), Ok(c)) => (a, b, c),
            _ => return (false, "invalid time settings".to_string()),
        };
        self.main_time = Duration::from_secs(main);
        self.byo_time = Duration::from_secs(byo_time);
        self.byo_stones = byo_stones;
        if byo_stones > 0 && byo_time > 0 {
            self.budget = SearchBudget { max_simulations: None, max_time: Some(Duration::from_secs(byo_time) / byo_stones.max(1)) };
        }
        (true, String::new())
    }

    fn cmd_uct_param_search(&mut self, args: &[&str]) -> (bool, String) {
        let (key, value) = match parse_kv(args) {
            Some(kv) => kv,
            None => return (false, "usage: uct_param_search key value".to_string()),
        };
        let params = self.search.params_mut();
        let ok = match key.as_str() {
            "num_threads" => parse_into(value, &mut params.num_threads),
            "tree_capacity" => parse_into(value, &mut params.tree_capacity),
            "uct_bias_constant" => parse_into(value, &mut params.uct_bias_constant),
            "rave_equiv" => parse_into(value, &mut params.rave_equiv),
            "expand_visits" => parse_into(value, &mut params.expand_visits),
            "first_play_urgency" => parse_into(value, &mut params.first_play_urgency),
            "early_abort_after_fraction" => parse_into(value, &mut params.early_abort_after_fraction),
            "sure_win_threshold" => parse_into(value, &mut params.sure_win_threshold),
            "early_abort_min_visits" => parse_into(value, &mut params.early_abort_min_visits),
            "early_pass_enabled" => parse_into(value, &mut params.early_pass_enabled),
            _ => false,
        };
        if ok { (true, String::new()) } else { (false, format!("unknown or invalid search param: {key}")) }
    }

    fn cmd_uct_param_player(&mut self, args: &[&str]) -> (bool, String) {
        let (key, value) = match parse_kv(args) {
            Some(kv) => kv,
            None => return (false, "usage: uct_param_player key value".to_string()),
        };
        let params = self.search.params_mut();
        let ok = match key.as_str() {
            "resign_threshold" => parse_into(value, &mut params.resign_threshold),
            "fastplay20_threshold" => parse_into(value, &mut params.fastplay20_threshold),
            "fastplay5_threshold" => parse_into(value, &mut params.fastplay5_threshold),
            "subtree_reuse" => parse_into(value, &mut params.subtree_reuse),
            "pondering" => parse_into(value, &mut params.pondering),
            _ => false,
        };
        if ok { (true, String::new()) } else { (false, format!("unknown or invalid player param: {key}")) }
    }

    fn cmd_uct_param_policy(&mut self, args: &[&str]) -> (bool, String) {
        let (key, value) = match parse_kv(args) {
            Some(kv) => kv,
            None => return (false, "usage: uct_param_policy key value".to_string()),
        };
        let params = self.search.playout_params_mut();
        let ok = match key.as_str() {
            "fillboard_tries" => parse_into(value, &mut params.fillboard_tries),
            "gamma_weighted" => parse_into(value, &mut params.gamma_weighted),
            "prob_heuristic_capture" => parse_into(value, &mut params.prob_heuristic_capture),
            "prob_heuristic_pat3" => parse_into(value, &mut params.prob_heuristic_pat3),
            _ => false,
        };
        if ok { (true, String::new()) } else { (false, format!("unknown or invalid policy param: {key}")) }
    }

    /// Tromp-Taylor area score minus komi/handicap, formatted the way GTP
    /// expects ("B+3.5", "W+12", "0").
    fn final_score(&self) -> String {
        let raw = scoring::tromp_taylor_score(&self.board);
        let handicap_adjust = if self.board.rules.handicap_stones > 1 {
            self.board.rules.handicap_stones as f64 - 1.0
        } else {
            0.0
        };
        let margin = raw - self.board.rules.komi as f64 - handicap_adjust;
        if margin > 0.0 {
            format!("B+{margin:.1}")
        } else if margin < 0.0 {
            format!("W+{:.1}", -margin)
        } else {
            "0".to_string()
        }
    }
}

impl Default for GtpEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_colour(s: &str) -> Option<Color> {
    match s.to_lowercase().as_str() {
        "b" | "black" => Some(Color::Black),
        "w" | "white" => Some(Color::White),
        _ => None,
    }
}

fn parse_kv<'a>(args: &[&'a str]) -> Option<(String, &'a str)> {
    if args.len() < 2 {
        return None;
    }
    Some((args[0].to_lowercase(), args[1]))
}

/// Small helper trait so the `uct_param_*` setters can share one `match`
/// arm shape across `f64`/`u32`/`u64`/`usize`/`bool` fields.
trait ParseInto: Sized {
    fn parse_into(s: &str) -> Option<Self>;
}
impl ParseInto for f64 {
    fn parse_into(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
impl ParseInto for u32 {
    fn parse_into(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
impl ParseInto for u64 {
    fn parse_into(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
impl ParseInto for usize {
    fn parse_into(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}
impl ParseInto for bool {
    fn parse_into(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

fn parse_into<T: ParseInto>(s: &str, slot: &mut T) -> bool {
    match T::parse_into(s) {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_with_id() {
        let (id, cmd) = GtpEngine::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn parse_id_without_id() {
        let (id, cmd) = GtpEngine::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn name_and_protocol_version() {
        let mut engine = GtpEngine::new();
        assert_eq!(engine.execute("name", &[]), (true, "gotree".to_string()));
        assert_eq!(engine.execute("protocol_version", &[]), (true, "2".to_string()));
    }

    #[test]
    fn known_command_recognises_play() {
        let mut engine = GtpEngine::new();
        let (ok, resp) = engine.execute("known_command", &["play"]);
        assert!(ok);
        assert_eq!(resp, "true");
        let (ok, resp) = engine.execute("known_command", &["bogus"]);
        assert!(ok);
        assert_eq!(resp, "false");
    }

    #[test]
    fn boardsize_accepts_only_compiled_size() {
        let mut engine = GtpEngine::new();
        let (ok, _) = engine.execute("boardsize", &[&N.to_string()]);
        assert!(ok);
        let (ok, _) = engine.execute("boardsize", &["19"]);
        assert!(!ok);
    }

    #[test]
    fn play_then_undo_restores_empty_point() {
        let mut engine = GtpEngine::new();
        let (ok, _) = engine.execute("play", &["black", "D4"]);
        assert!(ok);
        assert_ne!(engine.board.color_at(parse_coord("D4").unwrap()), Color::Empty);
        let (ok, _) = engine.execute("undo", &[]);
        assert!(ok);
        assert_eq!(engine.board.color_at(parse_coord("D4").unwrap()), Color::Empty);
    }

    #[test]
    fn clear_board_resets_history() {
        let mut engine = GtpEngine::new();
        engine.execute("play", &["black", "D4"]);
        engine.execute("clear_board", &[]);
        assert!(engine.history.is_empty());
        assert_eq!(engine.board.move_number(), 0);
    }

    #[test]
    fn final_score_reports_empty_board_as_white_favoured_by_komi() {
        let engine = GtpEngine::new();
        let score = engine.final_score();
        assert!(score.starts_with("W+"));
    }

    #[test]
    fn uct_param_search_updates_a_known_field() {
        let mut engine = GtpEngine::new();
        let (ok, _) = engine.execute("uct_param_search", &["rave_equiv", "100"]);
        assert!(ok);
        assert_eq!(engine.search.params().rave_equiv, 100.0);
    }
}
