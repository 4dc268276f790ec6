//! Ray masks used for pin detection, check-evasion interposition, and
//! en-passant discovered-check validation.
//!
//! Each ray table holds, for every square, the squares strictly beyond it
//! in one of the eight compass directions, stopping at the board edge
//! (unlike the magic-bitboard attack tables, these do not stop at the
//! first blocker).

use crate::Bitboard;
use chess_core::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    /// Whether this direction walks toward increasing square indices.
    #[inline]
    pub const fn is_positive(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::East | Direction::NorthEast | Direction::NorthWest
        )
    }

    #[inline]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::NorthWest | Direction::SouthEast | Direction::SouthWest
        )
    }

    const fn deltas(self) -> (i8, i8) {
        match self {
            Direction::North => (1, 0),
            Direction::South => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (1, -1),
            Direction::SouthEast => (-1, 1),
            Direction::SouthWest => (-1, -1),
        }
    }
}

const fn compute_rays() -> [[Bitboard; 64]; 8] {
    let mut tables = [[Bitboard::EMPTY; 64]; 8];
    let mut dir_idx = 0;
    while dir_idx < 8 {
        let dir = match dir_idx {
            0 => Direction::North,
            1 => Direction::South,
            2 => Direction::East,
            3 => Direction::West,
            4 => Direction::NorthEast,
            5 => Direction::NorthWest,
            6 => Direction::SouthEast,
            _ => Direction::SouthWest,
        };
        let (dr, df) = dir.deltas();

        let mut sq = 0u8;
        while sq < 64 {
            let rank = (sq / 8) as i8;
            let file = (sq % 8) as i8;
            let mut bb = 0u64;
            let mut r = rank + dr;
            let mut f = file + df;
            while r >= 0 && r < 8 && f >= 0 && f < 8 {
                bb |= 1u64 << (r * 8 + f);
                r += dr;
                f += df;
            }
            tables[dir_idx][sq as usize] = Bitboard(bb);
            sq += 1;
        }
        dir_idx += 1;
    }
    tables
}

static RAYS: [[Bitboard; 64]; 8] = compute_rays();

#[inline]
fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::North => 0,
        Direction::South => 1,
        Direction::East => 2,
        Direction::West => 3,
        Direction::NorthEast => 4,
        Direction::NorthWest => 5,
        Direction::SouthEast => 6,
        Direction::SouthWest => 7,
    }
}

/// Squares strictly beyond `sq` along `dir`, to the edge of the board.
#[inline]
pub fn ray(dir: Direction, sq: Square) -> Bitboard {
    RAYS[dir_index(dir)][sq.index() as usize]
}

/// The nearest occupied square to `sq` along `dir`, if any.
pub fn nearest_along(dir: Direction, sq: Square, occupied: Bitboard) -> Option<Square> {
    let blockers = ray(dir, sq) & occupied;
    if blockers.is_empty() {
        return None;
    }
    let idx = if dir.is_positive() {
        blockers.0.trailing_zeros() as u8
    } else {
        63 - blockers.0.leading_zeros() as u8
    };
    Some(unsafe { Square::from_index_unchecked(idx) })
}

/// The squares between `from` and `to` (exclusive of both), assuming they
/// are aligned on a rank, file, or diagonal. Empty if they are not aligned.
pub fn between(from: Square, to: Square) -> Bitboard {
    for dir in Direction::ALL {
        let line = ray(dir, from);
        if line.contains(to) {
            // Squares from `from` (exclusive) up to but excluding `to`.
            let beyond = ray(dir, to);
            return line & !beyond & !Bitboard::from_square(to);
        }
    }
    Bitboard::EMPTY
}
