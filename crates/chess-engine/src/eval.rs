//! Static position evaluation.
//!
//! Score is centipawns from the side-to-move's perspective. Positive means
//! the side to move is better. Combines material, piece-square tables
//! tapered between middlegame and endgame by remaining material, pawn
//! structure, mobility, king safety, and a handful of small bonuses.

use crate::hash::{EvalTable, PawnTable, MATE_THRESHOLD};
use crate::Position;
use chess_core::{Color, Piece, Square};

const MATERIAL: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Phase weight per piece type, used to blend middlegame/endgame tables.
/// A position with every piece on the board has phase == TOTAL_PHASE; a bare
/// king-and-pawns ending has phase == 0.
const PHASE_WEIGHT: [i32; 6] = [0, 1, 1, 2, 4, 0];
const TOTAL_PHASE: i32 = 24;

#[rustfmt::skip]
const PAWN_PST_MG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10,-20,-20, 10, 10,  5,
     5, -5,-10,  0,  0,-10, -5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5,  5, 10, 25, 25, 10,  5,  5,
    10, 10, 20, 30, 30, 20, 10, 10,
    50, 50, 50, 50, 50, 50, 50, 50,
     0,  0,  0,  0,  0,  0,  0,  0,
];

/// Endgame pawns are scored mostly by how far they've advanced: with fewer
/// defenders left on the board a passed or near-passed pawn is far more
/// dangerous, so rank dominates file in this table.
#[rustfmt::skip]
const PAWN_PST_EG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    10, 10, 10, 10, 10, 10, 10, 10,
    20, 20, 20, 20, 20, 20, 20, 20,
    30, 30, 30, 30, 30, 30, 30, 30,
    50, 50, 50, 50, 50, 50, 50, 50,
    70, 70, 70, 70, 70, 70, 70, 70,
    90, 90, 90, 90, 90, 90, 90, 90,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST_MG: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  5,  5,  0,-20,-40,
   -30,  5, 10, 15, 15, 10,  5,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  5, 15, 20, 20, 15,  5,-30,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];

/// Knights lose less value on the rim once there are fewer pawns to shelter
/// behind, so the endgame table is flatter than the middlegame one.
#[rustfmt::skip]
const KNIGHT_PST_EG: [i32; 64] = [
   -40,-30,-20,-20,-20,-20,-30,-40,
   -30,-10,  0,  0,  0,  0,-10,-30,
   -20,  0, 10, 15, 15, 10,  0,-20,
   -20,  5, 15, 20, 20, 15,  5,-20,
   -20,  5, 15, 20, 20, 15,  5,-20,
   -20,  0, 10, 15, 15, 10,  0,-20,
   -30,-10,  0,  0,  0,  0,-10,-30,
   -40,-30,-20,-20,-20,-20,-30,-40,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
   -20,-10,-10,-10,-10,-10,-10,-20,
   -10,  5,  0,  0,  0,  0,  5,-10,
   -10, 10, 10, 10, 10, 10, 10,-10,
   -10,  0, 10, 10, 10, 10,  0,-10,
   -10,  5,  5, 10, 10,  5,  5,-10,
   -10,  0,  5, 10, 10,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_PST_MG: [i32; 64] = [
     0,  0,  0,  5,  5,  0,  0,  0,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     5, 10, 10, 10, 10, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

/// Endgame rooks care about activity more than file shelter; the edge
/// penalty is dropped and the 7th-rank bonus kept, since a rook cutting off
/// the enemy king there is still strong once the board empties out.
#[rustfmt::skip]
const ROOK_PST_EG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5,  5,  5,  5,  5,  5,  5,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,
     0,  0,  0,  0,  0,  0,  0,  0,
    10, 10, 10, 10, 10, 10, 10, 10,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
   -20,-10,-10, -5, -5,-10,-10,-20,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -10,  5,  5,  5,  5,  5,  0,-10,
     0,  0,  5,  5,  5,  5,  0, -5,
    -5,  0,  5,  5,  5,  5,  0, -5,
   -10,  0,  5,  5,  5,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_PST_MG: [i32; 64] = [
    20, 30, 10,  0,  0, 10, 30, 20,
    20, 20,  0,  0,  0,  0, 20, 20,
   -10,-20,-20,-20,-20,-20,-20,-10,
   -20,-30,-30,-40,-40,-30,-30,-20,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
];

#[rustfmt::skip]
const KING_PST_EG: [i32; 64] = [
   -50,-30,-30,-30,-30,-30,-30,-50,
   -30,-30,  0,  0,  0,  0,-30,-30,
   -30,-10, 20, 30, 30, 20,-10,-30,
   -30,-10, 30, 40, 40, 30,-10,-30,
   -30,-10, 30, 40, 40, 30,-10,-30,
   -30,-10, 20, 30, 30, 20,-10,-30,
   -30,-20,-10,  0,  0,-10,-20,-30,
   -50,-40,-30,-20,-20,-30,-40,-50,
];

const BISHOP_PAIR_BONUS: i32 = 30;
const TEMPO_BONUS: i32 = 10;

/// Margin below which quiescence search's stand-pat cutoff trusts the
/// static eval without walking every capture. Disabled near mate scores
/// and while in check, where material swings don't capture the danger.
pub const LAZY_MARGIN: i32 = 200;

fn pst_index(sq: Square, color: Color) -> usize {
    match color {
        Color::White => sq.index() as usize,
        Color::Black => (sq.index() ^ 56) as usize,
    }
}

/// Blends a middlegame/endgame table pair by `phase` (`TOTAL_PHASE` = full
/// material, 0 = bare-king endgame).
fn tapered(mg: i32, eg: i32, phase: i32) -> i32 {
    (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE
}

fn pst_value(piece: Piece, sq: Square, color: Color, phase: i32) -> i32 {
    let idx = pst_index(sq, color);
    match piece {
        Piece::Pawn => tapered(PAWN_PST_MG[idx], PAWN_PST_EG[idx], phase),
        Piece::Knight => tapered(KNIGHT_PST_MG[idx], KNIGHT_PST_EG[idx], phase),
        Piece::Bishop => BISHOP_PST[idx],
        Piece::Rook => tapered(ROOK_PST_MG[idx], ROOK_PST_EG[idx], phase),
        Piece::Queen => QUEEN_PST[idx],
        Piece::King => tapered(KING_PST_MG[idx], KING_PST_EG[idx], phase),
    }
}

pub(crate) fn game_phase(position: &Position) -> i32 {
    let mut phase = 0;
    for piece in Piece::ALL {
        let count = (position.pieces_of(piece, Color::White) | position.pieces_of(piece, Color::Black)).count();
        phase += PHASE_WEIGHT[piece.index()] * count as i32;
    }
    phase.min(TOTAL_PHASE)
}

fn material_and_pst(position: &Position, phase: i32) -> i32 {
    let mut score = 0;
    for piece in Piece::ALL {
        for sq_idx in 0..64 {
            let sq = unsafe { Square::from_index_unchecked(sq_idx) };
            match position.piece_at(sq) {
                Some((p, color)) if p == piece => {
                    let sign = if color == Color::White { 1 } else { -1 };
                    score += sign * (MATERIAL[piece.index()] + pst_value(piece, sq, color, phase));
                }
                _ => {}
            }
        }
    }
    score
}

fn bishop_pair(position: &Position) -> i32 {
    let mut score = 0;
    if position.pieces_of(Piece::Bishop, Color::White).count() >= 2 {
        score += BISHOP_PAIR_BONUS;
    }
    if position.pieces_of(Piece::Bishop, Color::Black).count() >= 2 {
        score -= BISHOP_PAIR_BONUS;
    }
    score
}

/// Mobility: count of squares each side's minor/major pieces attack,
/// excluding squares occupied by their own pieces. Cheap proxy for piece
/// activity without a full legal move generation pass.
fn mobility(position: &Position) -> i32 {
    use crate::movegen::{bishop_attacks, knight_attacks, queen_attacks, rook_attacks};

    let occ = position.occupied();
    let mut score = 0;
    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        let own = position.pieces_of(Piece::Pawn, color)
            | position.pieces_of(Piece::Knight, color)
            | position.pieces_of(Piece::Bishop, color)
            | position.pieces_of(Piece::Rook, color)
            | position.pieces_of(Piece::Queen, color)
            | position.pieces_of(Piece::King, color);

        for sq in position.pieces_of(Piece::Knight, color) {
            score += sign * (knight_attacks(sq) & !own).count() as i32;
        }
        for sq in position.pieces_of(Piece::Bishop, color) {
            score += sign * (bishop_attacks(sq, occ) & !own).count() as i32;
        }
        for sq in position.pieces_of(Piece::Rook, color) {
            score += sign * 2 * (rook_attacks(sq, occ) & !own).count() as i32;
        }
        for sq in position.pieces_of(Piece::Queen, color) {
            score += sign * (queen_attacks(sq, occ) & !own).count() as i32;
        }
    }
    score
}

/// Tropism term: rewards minor/major pieces standing close to the enemy
/// king, and penalizes an exposed king (few friendly pawns on its file and
/// the two adjacent files).
fn king_safety(position: &Position) -> i32 {
    use crate::Bitboard;

    let mut score = 0;
    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        let king_sq = position.king_square(color);
        let king_file = king_sq.file().index();
        let mut shield_files = Bitboard::EMPTY;
        for f in king_file.saturating_sub(1)..=(king_file + 1).min(7) {
            shield_files |= match f {
                0 => Bitboard::FILE_A,
                1 => Bitboard::FILE_B,
                2 => Bitboard::FILE_C,
                3 => Bitboard::FILE_D,
                4 => Bitboard::FILE_E,
                5 => Bitboard::FILE_F,
                6 => Bitboard::FILE_G,
                _ => Bitboard::FILE_H,
            };
        }
        let shield = (position.pieces_of(Piece::Pawn, color) & shield_files).count() as i32;
        score += sign * (shield - 3) * 8;
    }
    score
}

/// Passed-pawn bonus by rank from the pawn's own color's perspective
/// (rank index 0 = own second rank, 6 = about to promote).
#[rustfmt::skip]
const PASSED_PAWN_BONUS: [i32; 8] = [0, 5, 10, 20, 35, 60, 100, 0];

fn pawn_structure(position: &Position) -> i32 {
    use crate::Bitboard;

    let white_pawns = position.pieces_of(Piece::Pawn, Color::White);
    let black_pawns = position.pieces_of(Piece::Pawn, Color::Black);
    let mut score = 0;

    for color in [Color::White, Color::Black] {
        let sign = if color == Color::White { 1 } else { -1 };
        let (own, enemy) = match color {
            Color::White => (white_pawns, black_pawns),
            Color::Black => (black_pawns, white_pawns),
        };

        for sq in own {
            let file = sq.file().index();
            let rank = sq.rank().index();

            // Doubled: another own pawn ahead on the same file.
            let file_mask = file_bitboard(file);
            if (own & file_mask).count() > 1 {
                score -= sign * 10;
            }

            // Isolated: no own pawn on an adjacent file.
            let mut adjacent = Bitboard::EMPTY;
            if file > 0 {
                adjacent |= file_bitboard(file - 1);
            }
            if file < 7 {
                adjacent |= file_bitboard(file + 1);
            }
            if (own & adjacent).is_empty() {
                score -= sign * 15;
            }

            // Passed: no enemy pawn on this file or an adjacent one, ahead
            // of this pawn from its own side's perspective.
            let ahead_mask = ahead_of(sq, color);
            let mut span = file_mask;
            span |= adjacent;
            if (enemy & span & ahead_mask).is_empty() {
                let progress = match color {
                    Color::White => rank,
                    Color::Black => 7 - rank,
                };
                score += sign * PASSED_PAWN_BONUS[progress as usize];
            }
        }
    }
    score
}

fn file_bitboard(file: u8) -> crate::Bitboard {
    use crate::Bitboard;
    match file {
        0 => Bitboard::FILE_A,
        1 => Bitboard::FILE_B,
        2 => Bitboard::FILE_C,
        3 => Bitboard::FILE_D,
        4 => Bitboard::FILE_E,
        5 => Bitboard::FILE_F,
        6 => Bitboard::FILE_G,
        _ => Bitboard::FILE_H,
    }
}

fn ahead_of(sq: Square, color: Color) -> crate::Bitboard {
    use crate::Bitboard;
    let rank = sq.rank().index();
    let mut mask = Bitboard::EMPTY;
    match color {
        Color::White => {
            for r in (rank + 1)..8 {
                mask |= rank_bitboard(r);
            }
        }
        Color::Black => {
            for r in 0..rank {
                mask |= rank_bitboard(r);
            }
        }
    }
    mask
}

fn rank_bitboard(rank: u8) -> crate::Bitboard {
    use crate::Bitboard;
    match rank {
        0 => Bitboard::RANK_1,
        1 => Bitboard::RANK_2,
        2 => Bitboard::RANK_3,
        3 => Bitboard::RANK_4,
        4 => Bitboard::RANK_5,
        5 => Bitboard::RANK_6,
        6 => Bitboard::RANK_7,
        _ => Bitboard::RANK_8,
    }
}

/// Evaluates `position` from the side-to-move's perspective, without
/// consulting or updating any hash table.
pub fn evaluate(position: &Position) -> i32 {
    if position.is_insufficient_material() {
        return 0;
    }

    let phase = game_phase(position);
    let mut score = material_and_pst(position, phase)
        + bishop_pair(position)
        + mobility(position)
        + king_safety(position)
        + pawn_structure(position);

    score += TEMPO_BONUS;

    if position.side_to_move == Color::Black {
        score = -score;
    }
    score
}

/// Same as [`evaluate`], but caches the pawn-structure term in `pawn_table`
/// keyed on `Position::pawn_key`.
pub fn evaluate_cached(position: &Position, pawn_table: &mut PawnTable) -> i32 {
    if position.is_insufficient_material() {
        return 0;
    }

    let pawn_score = match pawn_table.probe(position.pawn_key) {
        Some(score) => score,
        None => {
            let score = pawn_structure(position);
            pawn_table.store(position.pawn_key, score);
            score
        }
    };

    let phase = game_phase(position);
    let mut score = material_and_pst(position, phase)
        + bishop_pair(position)
        + mobility(position)
        + king_safety(position)
        + pawn_score;

    score += TEMPO_BONUS;

    if position.side_to_move == Color::Black {
        score = -score;
    }
    score
}

/// Lazy-evaluation cutoff (§4.6.4): computes material + PST only, and
/// returns that base score directly if it already lies outside
/// `(alpha - LAZY_MARGIN, beta + LAZY_MARGIN)`. Otherwise falls through to
/// the full evaluation.
///
/// Disabled inside the mate window: a pending mate can swing far more than
/// `LAZY_MARGIN` centipawns on the very next ply, so trusting the cheap base
/// score there risks missing or misreporting a forced mate.
pub fn evaluate_lazy(
    position: &Position,
    eval_table: &mut EvalTable,
    pawn_table: &mut PawnTable,
    alpha: i32,
    beta: i32,
) -> i32 {
    if position.is_insufficient_material() {
        return 0;
    }

    if alpha.abs() < MATE_THRESHOLD && beta.abs() < MATE_THRESHOLD {
        let phase = game_phase(position);
        let base = material_and_pst(position, phase) + TEMPO_BONUS;
        let base = if position.side_to_move == Color::Black { -base } else { base };
        if base <= alpha.saturating_sub(LAZY_MARGIN) || base >= beta.saturating_add(LAZY_MARGIN) {
            return base;
        }
    }

    evaluate_with_tables(position, eval_table, pawn_table)
}

/// Same as [`evaluate_cached`], but also caches the full position score in
/// `eval_table` keyed on `Position::zobrist_key`.
pub fn evaluate_with_tables(
    position: &Position,
    eval_table: &mut EvalTable,
    pawn_table: &mut PawnTable,
) -> i32 {
    if position.is_insufficient_material() {
        return 0;
    }

    if let Some(score) = eval_table.probe(position.zobrist_key) {
        return score;
    }

    let score = evaluate_cached(position, pawn_table);
    eval_table.store(position.zobrist_key, score);
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_roughly_symmetric() {
        let pos = Position::startpos();
        // Tempo bonus is the only asymmetry at the start position.
        assert_eq!(evaluate(&pos), TEMPO_BONUS);
    }

    #[test]
    fn missing_queen_is_a_large_disadvantage() {
        let with_queen = Position::startpos();
        let without_queen =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR w KQkq - 0 1").unwrap();
        assert!(evaluate(&without_queen) < evaluate(&with_queen) - 800);
    }

    #[test]
    fn insufficient_material_is_a_draw_score() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(evaluate(&pos), 0);
    }

    #[test]
    fn passed_pawn_on_seventh_outscores_blocked_pawn() {
        let passed = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let blocked = Position::from_fen("4k3/8/8/8/8/8/P3p3/4K3 w - - 0 1").unwrap();
        assert!(evaluate(&passed) > evaluate(&blocked));
    }

    #[test]
    fn evaluate_cached_matches_evaluate() {
        let pos = Position::startpos();
        let mut table = PawnTable::new(1);
        assert_eq!(evaluate_cached(&pos, &mut table), evaluate(&pos));
        // Second call hits the cache; must still agree.
        assert_eq!(evaluate_cached(&pos, &mut table), evaluate(&pos));
    }

    #[test]
    fn evaluate_lazy_matches_full_eval_inside_window() {
        let pos = Position::startpos();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        assert_eq!(
            evaluate_lazy(&pos, &mut eval_table, &mut pawn_table, -10_000, 10_000),
            evaluate(&pos)
        );
    }

    #[test]
    fn evaluate_lazy_short_circuits_far_outside_window() {
        let without_queen =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR w KQkq - 0 1").unwrap();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        // Window is entirely above the base score, so the cheap material+PST
        // term alone must already be enough to fail low.
        let lazy = evaluate_lazy(&without_queen, &mut eval_table, &mut pawn_table, 2000, 3000);
        assert!(lazy <= 2000);
    }

    #[test]
    fn evaluate_lazy_disabled_inside_mate_window() {
        use crate::hash::MATE_SCORE;
        let pos = Position::startpos();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        // Even with an absurdly narrow window, a mate-range bound must force
        // the full evaluation rather than a lazy cutoff.
        assert_eq!(
            evaluate_lazy(&pos, &mut eval_table, &mut pawn_table, MATE_SCORE - 1, MATE_SCORE),
            evaluate(&pos)
        );
    }

    #[test]
    fn evaluate_with_tables_matches_evaluate() {
        let pos = Position::startpos();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        assert_eq!(
            evaluate_with_tables(&pos, &mut eval_table, &mut pawn_table),
            evaluate(&pos)
        );
        // Second call hits the eval cache; must still agree.
        assert_eq!(
            evaluate_with_tables(&pos, &mut eval_table, &mut pawn_table),
            evaluate(&pos)
        );
    }
}
