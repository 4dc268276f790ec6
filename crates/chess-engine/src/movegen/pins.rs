//! Pinned-piece detection.
//!
//! For each side, walks the eight rays out of its king looking for a lone
//! friendly blocker followed by an enemy slider compatible with that ray's
//! direction. A pinned piece may only move along the line between the king
//! and the pinner (including capturing the pinner); every generator applies
//! that constraint by intersecting its normal destination set with the
//! piece's entry in `pin_ray`.

use super::rays::{self, Direction};
use crate::{Bitboard, Position};
use chess_core::{Color, Piece};

pub struct PinInfo {
    pub pinned: Bitboard,
    pin_ray: [Bitboard; 64],
}

impl PinInfo {
    /// The destination squares a piece on `sq` is constrained to, if pinned.
    /// Unconstrained (not pinned) squares return `Bitboard::FULL`.
    #[inline]
    pub fn allowed_from(&self, sq: chess_core::Square) -> Bitboard {
        if self.pinned.contains(sq) {
            self.pin_ray[sq.index() as usize]
        } else {
            Bitboard::FULL
        }
    }
}

pub fn compute_pins(position: &Position, for_color: Color) -> PinInfo {
    let king_sq = position.king_square(for_color);
    let occupied = position.occupied();
    let enemy = for_color.opposite();
    let enemy_diag = position.pieces_of(Piece::Bishop, enemy) | position.pieces_of(Piece::Queen, enemy);
    let enemy_ortho = position.pieces_of(Piece::Rook, enemy) | position.pieces_of(Piece::Queen, enemy);

    let mut pinned = Bitboard::EMPTY;
    let mut pin_ray = [Bitboard::FULL; 64];

    for dir in Direction::ALL {
        let relevant_enemy = if dir.is_diagonal() { enemy_diag } else { enemy_ortho };
        if relevant_enemy.is_empty() {
            continue;
        }
        let near = match rays::nearest_along(dir, king_sq, occupied) {
            Some(sq) => sq,
            None => continue,
        };
        let (_, near_color) = match position.piece_at(near) {
            Some(pc) => pc,
            None => continue,
        };
        if near_color != for_color {
            continue;
        }
        let far = match rays::nearest_along(dir, near, occupied) {
            Some(sq) => sq,
            None => continue,
        };
        if relevant_enemy.contains(far) {
            pinned.set(near);
            pin_ray[near.index() as usize] = rays::ray(dir, king_sq) & !rays::ray(dir, far);
        }
    }

    PinInfo { pinned, pin_ray }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn pinned_rook_cannot_leave_file() {
        let pos = Position::from_fen("4k3/8/8/8/4r3/8/4R3/4K3 w - - 0 1").unwrap();
        let pins = compute_pins(&pos, Color::White);
        let e2 = chess_core::Square::new(chess_core::File::E, chess_core::Rank::R2);
        assert!(pins.pinned.contains(e2));
    }

    #[test]
    fn unpinned_piece_is_unconstrained() {
        let pos = Position::startpos();
        let pins = compute_pins(&pos, Color::White);
        assert!(pins.pinned.is_empty());
    }

    #[test]
    fn diagonally_pinned_bishop() {
        let pos = Position::from_fen("4k3/8/8/8/8/2b5/3N4/4K3 w - - 0 1").unwrap();
        let pins = compute_pins(&pos, Color::White);
        let d2 = chess_core::Square::new(chess_core::File::D, chess_core::Rank::R2);
        assert!(pins.pinned.contains(d2));
    }

    #[test]
    fn second_blocker_breaks_the_pin() {
        let pos = Position::from_fen("4k3/8/8/8/4r3/4P3/4P3/4K3 w - - 0 1").unwrap();
        let pins = compute_pins(&pos, Color::White);
        let e2 = chess_core::Square::new(chess_core::File::E, chess_core::Rank::R2);
        assert!(!pins.pinned.contains(e2));
    }
}
