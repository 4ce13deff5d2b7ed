//! Crate-wide error taxonomy, built with `thiserror` rather than a bare
//! string or numeric error code. `Illegal` is the hot-path variant returned
//! by `Board::play`; everything else is surfaced by the search driver or the
//! command layer.

use thiserror::Error;

use crate::point::Point;

/// Why a move was rejected by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Illegal {
    #[error("point is occupied")]
    Occupied,
    #[error("move is suicide")]
    Suicide,
    #[error("simple ko recapture")]
    KoRepeat,
    #[error("position would repeat under super-ko")]
    SuperKoRepeat,
    #[error("point is off the board")]
    OffBoard,
}

/// Top-level engine error. `TreeFull` and `Cancelled` are recoverable by
/// construction (the search degrades gracefully); the rest are either
/// surfaced to the command layer as a failure response or fatal at init.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("illegal move at {point:?}: {kind}")]
    Illegal { point: Point, kind: Illegal },

    #[error("tree allocator exhausted")]
    TreeFull,

    #[error("malformed command: {0}")]
    ProtocolError(String),

    #[error("failed to load data file {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("search cancelled")]
    Cancelled,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<(Point, Illegal)> for EngineError {
    fn from((point, kind): (Point, Illegal)) -> Self {
        EngineError::Illegal { point, kind }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
