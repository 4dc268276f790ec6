//! Quiescence search: extends the main search past the depth horizon along
//! capture lines so a side is never evaluated mid-exchange.

use crate::eval::evaluate_lazy;
use crate::hash::{EvalTable, PawnTable, MATE_SCORE};
use crate::movegen::{generate_captures, generate_moves, generate_tactical};
use crate::see::see;
use crate::Position;

use super::is_endgame;

/// Quiet checking moves are considered alongside captures for this many
/// plies into quiescence, so a mating net one ply past the horizon isn't
/// missed; beyond that only captures and promotions are searched.
const TACTICAL_PLIES: u32 = 2;

/// Margin added on top of a capture's SEE before delta-pruning it against
/// `alpha`. Disabled near mate scores, in check, and in the endgame, where
/// a raw material margin doesn't capture what's at stake.
const DELTA_MARGIN: i32 = 200;

pub struct QuiescenceState<'a> {
    pub eval_table: &'a mut EvalTable,
    pub pawn_table: &'a mut PawnTable,
    pub nodes: &'a mut u64,
}

/// Searches captures (and, for the first few plies, check-giving quiet
/// moves) until a quiet position is reached, returning a score from the
/// side-to-move's perspective.
pub fn quiescence(
    position: &mut Position,
    mut alpha: i32,
    beta: i32,
    qply: u32,
    state: &mut QuiescenceState,
) -> i32 {
    *state.nodes += 1;

    let in_check = position.in_check();
    let mut best = -MATE_SCORE + position.ply() as i32;

    if !in_check {
        let stand_pat = evaluate_lazy(position, state.eval_table, state.pawn_table, alpha, beta);
        if stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        best = stand_pat;
    }

    let endgame = is_endgame(position);
    let moves = if in_check {
        generate_moves(position)
    } else if qply < TACTICAL_PLIES {
        generate_tactical(position)
    } else {
        generate_captures(position)
    };

    if in_check && moves.is_empty() {
        return -MATE_SCORE + position.ply() as i32;
    }

    let mut ordered = moves;
    for mv in ordered.as_mut_slice() {
        mv.score = see(position, *mv);
    }
    ordered
        .as_mut_slice()
        .sort_unstable_by_key(|mv| std::cmp::Reverse(mv.score));

    for &mv in ordered.as_slice() {
        if !in_check && mv.is_capture() {
            let see_score = see(position, mv);
            if see_score < 0 {
                continue;
            }
            if !endgame && best + see_score + DELTA_MARGIN < alpha {
                continue;
            }
        }

        position.make(mv);
        let score = -quiescence(position, -beta, -alpha, qply + 1, state);
        position.unmake();

        if score > best {
            best = score;
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    return alpha;
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_position_returns_stand_pat() {
        let mut pos = Position::startpos();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        let mut nodes = 0;
        let mut state = QuiescenceState {
            eval_table: &mut eval_table,
            pawn_table: &mut pawn_table,
            nodes: &mut nodes,
        };
        let score = quiescence(&mut pos, -MATE_SCORE, MATE_SCORE, 0, &mut state);
        assert_eq!(score, crate::eval::evaluate(&pos));
    }

    #[test]
    fn hanging_queen_is_found_by_search() {
        // White queen on d1 can capture the undefended black queen on d8.
        let mut pos = Position::from_fen("3q3k/8/8/8/8/8/8/3Q3K w - - 0 1").unwrap();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        let mut nodes = 0;
        let mut state = QuiescenceState {
            eval_table: &mut eval_table,
            pawn_table: &mut pawn_table,
            nodes: &mut nodes,
        };
        let score = quiescence(&mut pos, -MATE_SCORE, MATE_SCORE, 0, &mut state);
        assert!(score > crate::eval::evaluate(&pos));
        assert_eq!(pos, Position::from_fen("3q3k/8/8/8/8/8/8/3Q3K w - - 0 1").unwrap());
    }

    #[test]
    fn restores_position_after_recursive_search() {
        let before = Position::startpos();
        let mut pos = before.clone();
        let mut eval_table = EvalTable::new(1);
        let mut pawn_table = PawnTable::new(1);
        let mut nodes = 0;
        let mut state = QuiescenceState {
            eval_table: &mut eval_table,
            pawn_table: &mut pawn_table,
            nodes: &mut nodes,
        };
        quiescence(&mut pos, -MATE_SCORE, MATE_SCORE, 0, &mut state);
        assert_eq!(pos, before);
    }
}
