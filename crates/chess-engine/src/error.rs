//! Engine-facing error types.
//!
//! Parsing and illegal-move errors are surfaced to the caller and never
//! "corrected" internally. Configuration errors leave the previous option
//! value in place. Internal invariant violations are not a `Result` variant:
//! they are `debug_assert!`/`panic!` in debug builds, caught at the search
//! loop's outer boundary and turned into a reset to the last confirmed FEN.

use thiserror::Error;

use crate::san::SanError;
use chess_core::FenError;

/// Errors the engine can report to an external caller.
///
/// Move generation, make/unmake, and hash-table probe/store are total and
/// never produce an `EngineError` — only input parsing, move legality
/// checks, and option validation can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed FEN, SAN, or PACN input.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A move that passed format validation but is not legal in the current
    /// position.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// An invalid option value (e.g. a negative hash size).
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Malformed input that failed to parse, with the offending substring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid FEN: {0}")]
    Fen(#[from] FenError),

    #[error("invalid SAN: {0}")]
    San(#[from] SanError),

    #[error("invalid PACN move: {0}")]
    Pacn(String),
}

/// An invalid [`crate::engine::EngineOptions`] value; the previous value is
/// retained.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("hash size must be at least 1 MB, got {0}")]
    HashSizeTooSmall(usize),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value {value:?} for option {name:?}")]
    InvalidValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_move_error_displays_the_move() {
        let err = EngineError::IllegalMove("e2e5".to_string());
        assert_eq!(err.to_string(), "illegal move: e2e5");
    }

    #[test]
    fn config_error_converts_into_engine_error() {
        let err: EngineError = ConfigError::HashSizeTooSmall(0).into();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn parse_error_wraps_fen_error() {
        let fen_err = FenError::InvalidPartCount(2);
        let parse_err: ParseError = fen_err.into();
        assert!(matches!(parse_err, ParseError::Fen(_)));
    }
}
