//! Principal variation search with iterative deepening.
//!
//! Single-threaded: the caller (typically [`crate::engine`]) runs this on a
//! dedicated worker thread and drives cancellation through the `stop` flag
//! checked at every node entry, per the concurrency model this engine is
//! built around. Nothing in this module spawns a thread itself.

mod ordering;
mod quiescence;

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use chess_core::{Color, Move, Piece};
use ordering::{order_moves, HistoryTable, KillerTable};

use crate::hash::{
    score_from_tt, score_to_tt, Bound, EvalTable, PawnTable, TranspositionTable, MATE_SCORE,
    MATE_THRESHOLD,
};
use crate::movegen::generate_moves;
use crate::Position;

/// Internal depth unit: one full ply. Fractional extensions (recapture,
/// one-reply) add less than a full `ONE_PLY`, so depth is tracked in these
/// units rather than whole plies until it is floored for TT storage.
const ONE_PLY: i32 = 4;
const CHECK_EXTENSION: i32 = ONE_PLY;
const RECAPTURE_EXTENSION: i32 = ONE_PLY / 2;
const ONE_REPLY_EXTENSION: i32 = ONE_PLY / 2;

const NULL_MOVE_MIN_DEPTH: i32 = ONE_PLY * 3;
const NULL_MOVE_REDUCTION: i32 = ONE_PLY * 2;

const FUTILITY_MAX_PLIES: i32 = 3;
const FUTILITY_MARGIN_BASE: i32 = 100;
const FUTILITY_MARGIN_PER_PLY: i32 = 80;

const RAZOR_MAX_PLIES: i32 = 1;
const RAZOR_MARGIN_BASE: i32 = 300;
const RAZOR_MARGIN_PER_PLY: i32 = 150;

const LMR_MIN_DEPTH: i32 = ONE_PLY * 3;
const LMR_MOVE_THRESHOLD: usize = 3;
const LMR_REDUCTION: i32 = ONE_PLY;

const ENDGAME_PHASE: i32 = 6;
const ASPIRATION_INITIAL: i32 = 25;
const MAX_ASPIRATION_FAILS: u32 = 3;

/// Default cap when the controller doesn't impose one; comfortably beyond
/// any depth this engine will reach before the other limits kick in.
const MAX_SEARCH_DEPTH: u8 = 64;

/// The three hash tables plus the ordering heuristics a search consults,
/// bundled so [`crate::engine`] can own one instance across searches.
pub struct SearchTables {
    pub tt: TranspositionTable,
    pub eval_table: EvalTable,
    pub pawn_table: PawnTable,
    killers: KillerTable,
    history: HistoryTable,
}

impl SearchTables {
    pub fn new(hash_mb: usize) -> Self {
        let hash_mb = hash_mb.max(1);
        Self {
            tt: TranspositionTable::new(hash_mb),
            eval_table: EvalTable::new((hash_mb / 8).max(1)),
            pawn_table: PawnTable::new((hash_mb / 16).max(1)),
            killers: KillerTable::new(),
            history: HistoryTable::new(),
        }
    }

    /// Called once per `start_search`, per spec.md §5: the TT generation
    /// counter advances so last search's entries age out, while the
    /// relative-history table (already self-depreciating) persists.
    fn new_search(&mut self) {
        self.tt.new_generation();
        self.killers.clear();
    }

    /// Called on a `new_game` command: every table is wiped.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.eval_table.clear();
        self.pawn_table.clear();
        self.killers.clear();
        self.history.clear();
    }
}

/// Search limits as published by the controller's `go` command.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub max_depth: Option<u8>,
    pub max_nodes: Option<u64>,
    pub move_time: Option<Duration>,
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    /// Stop once a mate in this many moves (or faster) is found.
    pub mate: Option<u32>,
    pub restricted_moves: Option<Vec<Move>>,
    /// Pondering ignores `move_time`/`wtime`/`btime` and `max_nodes` becomes
    /// unbounded, per spec.md §4.8.1.
    pub ponder: bool,
}

/// A score normalized into either a centipawn value or a mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Positive: side to move mates in this many moves. Negative: side to
    /// move is mated in this many.
    Mate(i32),
}

impl Score {
    fn from_raw(score: i32) -> Self {
        if score >= MATE_THRESHOLD {
            Score::Mate((MATE_SCORE - score + 1) / 2)
        } else if score <= -MATE_THRESHOLD {
            Score::Mate(-(MATE_SCORE + score + 1) / 2)
        } else {
            Score::Centipawns(score)
        }
    }
}

/// Published after each completed iterative-deepening iteration.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u8,
    pub seldepth: u8,
    pub score: Score,
    pub time: Duration,
    pub nodes: u64,
    pub pv: Vec<Move>,
    /// The last root move examined during this iteration, and its 1-based
    /// index among the root's ordered moves.
    pub currmove: Option<Move>,
    pub currmovenumber: u32,
    pub hashfull: u32,
}

/// What `stop_search` (or a search that ran out of limits) returns.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
}

struct SearchContext<'a> {
    tables: &'a mut SearchTables,
    stop: &'a AtomicBool,
    limits: &'a SearchLimits,
    start: Instant,
    nodes: u64,
    seldepth: u8,
    null_move_allowed: bool,
    /// Root move currently being searched and its 1-based index, tracked so
    /// the completed-iteration `SearchInfo` can report `currmove`/
    /// `currmovenumber` per spec.md §6.
    current_root_move: Option<Move>,
    current_root_movenumber: u32,
}

impl<'a> SearchContext<'a> {
    fn should_stop(&self) -> bool {
        if self.stop.load(AtomicOrdering::Relaxed) {
            return true;
        }
        if let Some(max_nodes) = self.limits.max_nodes {
            if !self.limits.ponder && self.nodes >= max_nodes {
                return true;
            }
        }
        if !self.limits.ponder && self.nodes % 2048 == 0 {
            if let Some(move_time) = self.limits.move_time {
                if self.start.elapsed() >= move_time {
                    return true;
                }
            }
        }
        false
    }
}

fn has_non_pawn_material(position: &Position, color: Color) -> bool {
    let minor_major = position.colors[color.index()]
        & !(position.pieces_of(Piece::Pawn, color) | position.pieces_of(Piece::King, color));
    minor_major.is_not_empty()
}

pub(crate) fn is_endgame(position: &Position) -> bool {
    crate::eval::game_phase(position) <= ENDGAME_PHASE
}

/// Runs iterative deepening from the current position until a limit is hit
/// or `stop` is set, reporting each completed iteration through `on_info`.
///
/// `position` is left exactly as it was passed in: every node's make is
/// paired with an unmake before this function returns.
pub fn search(
    position: &mut Position,
    tables: &mut SearchTables,
    limits: &SearchLimits,
    stop: &AtomicBool,
    mut on_info: impl FnMut(SearchInfo),
) -> SearchResult {
    tables.new_search();
    log::debug!("search start: fen={}", position.to_fen());

    let start = Instant::now();
    let max_depth = limits.max_depth.unwrap_or(MAX_SEARCH_DEPTH);
    let endgame = is_endgame(position);

    let mut ctx = SearchContext {
        tables,
        stop,
        limits,
        start,
        nodes: 0,
        seldepth: 0,
        null_move_allowed: true,
        current_root_move: None,
        current_root_movenumber: 0,
    };

    let mut result = SearchResult::default();
    let mut prev_score = 0;

    for depth in 1..=max_depth {
        if ctx.should_stop() {
            break;
        }

        let full_depth = depth as i32 * ONE_PLY;
        let score = if depth < 2 || endgame {
            search_root(position, &mut ctx, full_depth, -MATE_SCORE, MATE_SCORE)
        } else {
            aspiration_search(position, &mut ctx, full_depth, prev_score)
        };

        let score = match score {
            Some(s) => s,
            None => break,
        };
        prev_score = score;

        let pv = extract_pv(position, &ctx.tables.tt, depth);
        if let Some(&first) = pv.first() {
            result.best_move = Some(first);
            result.ponder_move = pv.get(1).copied();
        }

        let normalized = Score::from_raw(score);
        log::debug!("depth {depth} complete: score={score} nodes={}", ctx.nodes);
        on_info(SearchInfo {
            depth,
            seldepth: ctx.seldepth,
            score: normalized,
            time: start.elapsed(),
            nodes: ctx.nodes,
            pv,
            currmove: ctx.current_root_move,
            currmovenumber: ctx.current_root_movenumber,
            hashfull: ctx.tables.tt.hashfull_permille(),
        });

        if let Score::Mate(plies) = normalized {
            if let Some(target) = limits.mate {
                if plies > 0 && plies as u32 <= target {
                    break;
                }
            }
        }
    }

    result
}

/// Widens the window around the previous iteration's score on fail-high or
/// fail-low, collapsing to the full window after three consecutive
/// failures, per spec.md §4.8.1.
fn aspiration_search(
    position: &mut Position,
    ctx: &mut SearchContext,
    depth: i32,
    prev_score: i32,
) -> Option<i32> {
    let mut window = ASPIRATION_INITIAL;
    let mut alpha = (prev_score - window).max(-MATE_SCORE);
    let mut beta = (prev_score + window).min(MATE_SCORE);
    let mut fails = 0;

    loop {
        let score = search_root(position, ctx, depth, alpha, beta)?;
        if score <= alpha && alpha > -MATE_SCORE {
            fails += 1;
            if fails >= MAX_ASPIRATION_FAILS {
                alpha = -MATE_SCORE;
                beta = MATE_SCORE;
            } else {
                window *= 2;
                alpha = (prev_score - window).max(-MATE_SCORE);
            }
        } else if score >= beta && beta < MATE_SCORE {
            fails += 1;
            if fails >= MAX_ASPIRATION_FAILS {
                alpha = -MATE_SCORE;
                beta = MATE_SCORE;
            } else {
                window *= 2;
                beta = (prev_score + window).min(MATE_SCORE);
            }
        } else {
            return Some(score);
        }
    }
}

fn search_root(
    position: &mut Position,
    ctx: &mut SearchContext,
    depth: i32,
    alpha: i32,
    beta: i32,
) -> Option<i32> {
    pvs(position, ctx, depth, 0, alpha, beta, true)
}

/// One node of the principal variation search, per spec.md §4.8.2. Returns
/// `None` only when the search was cancelled partway through a child call.
fn pvs(
    position: &mut Position,
    ctx: &mut SearchContext,
    mut depth: i32,
    ply: u32,
    mut alpha: i32,
    mut beta: i32,
    is_pv: bool,
) -> Option<i32> {
    if ctx.should_stop() {
        return None;
    }
    ctx.nodes += 1;
    ctx.seldepth = ctx.seldepth.max(ply.min(u8::MAX as u32) as u8);

    if ply > 0 {
        if position.is_repetition_draw()
            || position.is_fifty_move_draw()
            || position.is_insufficient_material()
        {
            return Some(0);
        }

        // Mate-distance pruning: a mate farther away than the current
        // window can't possibly be found, so clamp the window to what's
        // reachable before doing any more work at this node.
        let mate_value = MATE_SCORE - ply as i32;
        if mate_value < beta {
            beta = mate_value;
            if alpha >= beta {
                return Some(alpha);
            }
        }
        let mated_value = -MATE_SCORE + ply as i32;
        if mated_value > alpha {
            alpha = mated_value;
            if alpha >= beta {
                return Some(alpha);
            }
        }
    }

    let in_check = position.in_check();
    if in_check {
        depth += CHECK_EXTENSION;
    }

    let key = position.zobrist_key;
    let depth_plies = (depth / ONE_PLY).max(0) as u8;
    let mut hash_move = Move::NULL;
    if let Some(entry) = ctx.tables.tt.probe(key) {
        log::trace!("tt hit: key={key:#x} depth={} bound={:?}", entry.depth, entry.bound);
        if entry.best_move != Move::NULL && position.is_legal_soft(entry.best_move) {
            hash_move = entry.best_move;
        }
        if entry.depth >= depth_plies && !is_pv {
            let score = score_from_tt(entry.score, ply);
            let usable = match entry.bound {
                Bound::Exact => true,
                Bound::Lower => score >= beta,
                Bound::Upper => score <= alpha,
            };
            if usable {
                return Some(score);
            }
        }
    }

    if depth <= 0 {
        let mut qstate = quiescence::QuiescenceState {
            eval_table: &mut ctx.tables.eval_table,
            pawn_table: &mut ctx.tables.pawn_table,
            nodes: &mut ctx.nodes,
        };
        return Some(quiescence::quiescence(position, alpha, beta, 0, &mut qstate));
    }

    let static_eval = if in_check {
        0
    } else {
        crate::eval::evaluate_lazy(
            position,
            &mut ctx.tables.eval_table,
            &mut ctx.tables.pawn_table,
            alpha,
            beta,
        )
    };

    if !in_check
        && !is_pv
        && ctx.null_move_allowed
        && depth >= NULL_MOVE_MIN_DEPTH
        && static_eval >= beta
        && has_non_pawn_material(position, position.side_to_move)
    {
        position.make_null();
        ctx.null_move_allowed = false;
        let score = pvs(
            position,
            ctx,
            depth - ONE_PLY - NULL_MOVE_REDUCTION,
            ply + 1,
            -beta,
            -beta + 1,
            false,
        )
        .map(|s| -s);
        ctx.null_move_allowed = true;
        position.unmake_null();

        match score {
            None => return None,
            Some(s) if s >= beta => return Some(beta),
            _ => {}
        }
    }

    let mut moves = generate_moves(position);
    if moves.is_empty() {
        return Some(if in_check {
            -MATE_SCORE + ply as i32
        } else {
            0
        });
    }

    // `searchmoves` only constrains the root move list, per spec.md §6; the
    // mate/stalemate check above must still see every legal move.
    if ply == 0 {
        if let Some(restricted) = &ctx.limits.restricted_moves {
            moves.retain(|mv| restricted.contains(mv));
        }
    }

    order_moves(position, &mut moves, hash_move, &ctx.tables.killers, &ctx.tables.history, ply);

    let last_move_to = position.last_move().map(|m| m.to());
    let move_count = moves.len();
    let original_alpha = alpha;
    let mut best_score = -MATE_SCORE;
    let mut best_move = Move::NULL;
    let mut node_bound = Bound::Upper;

    for (idx, &mv) in moves.as_slice().iter().enumerate() {
        if ply == 0 {
            ctx.current_root_move = Some(mv);
            ctx.current_root_movenumber = idx as u32 + 1;
        }
        let is_quiet = !mv.is_capture() && !mv.kind().is_promotion();

        let mut extension = 0;
        if mv.is_capture() && Some(mv.to()) == last_move_to {
            extension += RECAPTURE_EXTENSION;
        }
        if move_count == 1 {
            extension += ONE_REPLY_EXTENSION;
        }

        if !in_check && is_quiet && idx > 0 && extension == 0 {
            let plies_left = depth / ONE_PLY;
            if plies_left <= FUTILITY_MAX_PLIES
                && static_eval + FUTILITY_MARGIN_BASE + FUTILITY_MARGIN_PER_PLY * plies_left
                    <= original_alpha
            {
                continue;
            }
            if plies_left <= RAZOR_MAX_PLIES
                && static_eval + RAZOR_MARGIN_BASE + RAZOR_MARGIN_PER_PLY * plies_left
                    <= original_alpha
            {
                extension -= ONE_PLY;
            }
        }

        position.make(mv);
        let gives_check = position.in_check();
        let child_depth = depth - ONE_PLY + extension;
        let do_lmr = is_quiet
            && !in_check
            && !gives_check
            && extension == 0
            && idx >= LMR_MOVE_THRESHOLD
            && depth >= LMR_MIN_DEPTH;

        let result = search_move(position, ctx, idx == 0, do_lmr, child_depth, ply, alpha, beta, is_pv);
        position.unmake();

        let score = match result {
            Some(s) => s,
            None => return None,
        };

        if score > best_score {
            best_score = score;
            best_move = mv;
        }
        if score > alpha {
            alpha = score;
            node_bound = Bound::Exact;
        }
        if alpha >= beta {
            node_bound = Bound::Lower;
            if is_quiet {
                ctx.tables.killers.add(ply, mv);
                ctx.tables
                    .history
                    .reward(mv.moved_piece(), mv.to(), depth_plies.max(1));
            }
            break;
        } else if is_quiet && score <= original_alpha {
            ctx.tables
                .history
                .penalize(mv.moved_piece(), mv.to(), depth_plies.max(1));
        }
    }

    ctx.tables.tt.store(
        key,
        depth_plies,
        node_bound,
        score_to_tt(best_score, ply),
        best_move,
    );

    Some(best_score)
}

/// Searches one child move with the principal-variation cascade: the first
/// move gets the full window, later moves a null window with a full-window
/// re-search if it turns out not to fail low or high, and late quiet moves
/// a reduced-depth search first (late-move reduction) with a full-depth
/// re-search if that raises alpha.
#[allow(clippy::too_many_arguments)]
fn search_move(
    position: &mut Position,
    ctx: &mut SearchContext,
    first: bool,
    do_lmr: bool,
    child_depth: i32,
    ply: u32,
    alpha: i32,
    beta: i32,
    is_pv: bool,
) -> Option<i32> {
    if first {
        return pvs(position, ctx, child_depth, ply + 1, -beta, -alpha, is_pv).map(|s| -s);
    }

    let reduced_depth = if do_lmr {
        child_depth - LMR_REDUCTION
    } else {
        child_depth
    };
    let mut score = pvs(position, ctx, reduced_depth, ply + 1, -alpha - 1, -alpha, false).map(|s| -s)?;

    if do_lmr && score > alpha {
        score = pvs(position, ctx, child_depth, ply + 1, -alpha - 1, -alpha, false).map(|s| -s)?;
    }

    if score > alpha && score < beta {
        score = pvs(position, ctx, child_depth, ply + 1, -beta, -alpha, true).map(|s| -s)?;
    }

    Some(score)
}

/// Walks the TT's best moves from the current position to reconstruct the
/// principal variation, restoring `position` to its original state before
/// returning.
fn extract_pv(position: &mut Position, tt: &TranspositionTable, max_len: u8) -> Vec<Move> {
    let mut pv = Vec::new();
    for _ in 0..max_len {
        let entry = match tt.probe(position.zobrist_key) {
            Some(e) if e.best_move != Move::NULL => e,
            _ => break,
        };
        if !position.is_legal_soft(entry.best_move) {
            break;
        }
        position.make(entry.best_move);
        pv.push(entry.best_move);
    }
    for _ in 0..pv.len() {
        position.unmake();
    }
    pv
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn search_depth(fen: &str, depth: u8) -> (SearchResult, i32) {
        let mut pos = Position::from_fen(fen).unwrap();
        let mut tables = SearchTables::new(1);
        let stop = AtomicBool::new(false);
        let limits = SearchLimits {
            max_depth: Some(depth),
            ..Default::default()
        };
        let mut last_score = 0;
        let result = search(&mut pos, &mut tables, &limits, &stop, |info| {
            if let Score::Centipawns(s) | Score::Mate(s) = info.score {
                last_score = s;
            }
        });
        (result, last_score)
    }

    #[test]
    fn restricted_moves_limits_the_root_move_choice() {
        let mut pos = Position::startpos();
        let d2 = chess_core::Square::from_algebraic("d2").unwrap();
        let d4 = chess_core::Square::from_algebraic("d4").unwrap();
        let allowed = Move::normal(d2, d4, Piece::Pawn);
        let mut tables = SearchTables::new(1);
        let stop = AtomicBool::new(false);
        let limits = SearchLimits {
            max_depth: Some(3),
            restricted_moves: Some(vec![allowed]),
            ..Default::default()
        };
        let result = search(&mut pos, &mut tables, &limits, &stop, |_| {});
        assert_eq!(result.best_move, Some(allowed));
    }

    #[test]
    fn finds_mate_in_two_with_a_lone_rook() {
        let (result, _) = search_depth("k7/8/1K6/8/8/8/8/R7 w - - 0 1", 5);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn returns_legal_move_and_finite_score_mid_game() {
        let before = Position::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
        )
        .unwrap();
        let (result, _) = search_depth(
            "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
            4,
        );
        let mv = result.best_move.expect("a legal move should be found");
        let legal = generate_moves(&before);
        assert!(legal.as_slice().contains(&mv));
    }

    #[test]
    fn search_leaves_position_unmodified() {
        let mut pos = Position::startpos();
        let before = pos.clone();
        let mut tables = SearchTables::new(1);
        let stop = AtomicBool::new(false);
        let limits = SearchLimits {
            max_depth: Some(3),
            ..Default::default()
        };
        search(&mut pos, &mut tables, &limits, &stop, |_| {});
        assert_eq!(pos, before);
    }

    #[test]
    fn cancellation_flag_stops_the_search_promptly() {
        let mut pos = Position::startpos();
        let mut tables = SearchTables::new(1);
        let stop = AtomicBool::new(true);
        let limits = SearchLimits::default();
        let result = search(&mut pos, &mut tables, &limits, &stop, |_| {});
        assert!(result.best_move.is_none());
    }

    #[test]
    fn mate_score_reports_as_score_mate_variant() {
        let mut pos = Position::from_fen("k7/8/1K6/8/8/8/8/R7 w - - 0 1").unwrap();
        let mut tables = SearchTables::new(1);
        let stop = AtomicBool::new(false);
        let limits = SearchLimits {
            max_depth: Some(5),
            ..Default::default()
        };
        let mut saw_mate = false;
        search(&mut pos, &mut tables, &limits, &stop, |info| {
            if matches!(info.score, Score::Mate(m) if m > 0) {
                saw_mate = true;
            }
        });
        assert!(saw_mate);
    }
}
