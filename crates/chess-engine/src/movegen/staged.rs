//! Staged move generation: partitions a full legal move list into the
//! capture/quiet/tactical buckets search needs, rather than generating each
//! stage natively. Correctness over micro-optimization — the hot path
//! (ordering within a stage) is search's job, not this module's.

use super::{generate_moves, MoveList};
use crate::Position;
use chess_core::Move;

/// Captures and promotions, for quiescence search.
pub fn generate_captures(position: &Position) -> MoveList {
    let mut moves = generate_moves(position);
    moves.retain(|m| m.is_capture() || m.kind().is_promotion());
    moves
}

/// Non-capture, non-promotion moves.
pub fn generate_quiets(position: &Position) -> MoveList {
    let mut moves = generate_moves(position);
    moves.retain(|m| !m.is_capture() && !m.kind().is_promotion());
    moves
}

/// Captures, promotions, and quiet checking moves.
///
/// Used to extend quiescence search a couple of plies deep with tactically
/// forcing quiet moves instead of only captures, so mating nets one ply
/// beyond the horizon are not missed.
pub fn generate_tactical(position: &mut Position) -> MoveList {
    let all = generate_moves(position);
    let mut tactical = MoveList::new();
    for &m in all.as_slice() {
        if m.is_capture() || m.kind().is_promotion() || gives_check(position, m) {
            tactical.push(m);
        }
    }
    tactical
}

/// Whether playing `mv` would leave the opponent in check.
pub fn gives_check(position: &mut Position, mv: Move) -> bool {
    position.make(mv);
    let check = position.in_check();
    position.unmake();
    check
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_and_quiets_partition_the_full_list() {
        let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .unwrap();
        let full = generate_moves(&pos);
        let captures = generate_captures(&pos);
        let quiets = generate_quiets(&pos);
        assert_eq!(captures.len() + quiets.len(), full.len());
    }

    #[test]
    fn tactical_includes_all_captures() {
        let mut pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .unwrap();
        let captures = generate_captures(&pos);
        let tactical = generate_tactical(&mut pos);
        for m in captures.as_slice() {
            assert!(tactical.as_slice().contains(m));
        }
    }

    #[test]
    fn gives_check_restores_the_position() {
        let mut pos = Position::startpos();
        let before = pos.clone();
        let e2 = chess_core::Square::new(chess_core::File::E, chess_core::Rank::R2);
        let e4 = chess_core::Square::new(chess_core::File::E, chess_core::Rank::R4);
        let m = chess_core::Move::new(e2, e4, chess_core::Piece::Pawn, None, chess_core::MoveKind::Normal);
        assert!(!gives_check(&mut pos, m));
        assert_eq!(pos, before);
    }
}
