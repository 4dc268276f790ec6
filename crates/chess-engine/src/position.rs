//! Chess position representation.
//!
//! `Position` is a mutable board with an explicit make/unmake stack: playing
//! a move mutates the board in place and pushes enough state to undo it
//! exactly, rather than cloning a new position per move. This keeps search
//! allocation-free in its inner loop.

use chess_core::{Color, FenError, FenParser, Move, MoveKind, Piece, Square};

use crate::movegen::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use crate::zobrist::ZOBRIST;
use crate::Bitboard;

/// Castling rights flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 0b0001;
    pub const WHITE_QUEENSIDE: u8 = 0b0010;
    pub const BLACK_KINGSIDE: u8 = 0b0100;
    pub const BLACK_QUEENSIDE: u8 = 0b1000;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    /// Creates new castling rights from flags.
    #[inline]
    pub const fn new(flags: u8) -> Self {
        CastlingRights(flags & 0b1111)
    }

    /// Returns true if the given side can castle kingside.
    #[inline]
    pub const fn can_castle_kingside(self, color: Color) -> bool {
        let flag = match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        };
        (self.0 & flag) != 0
    }

    /// Returns true if the given side can castle queenside.
    #[inline]
    pub const fn can_castle_queenside(self, color: Color) -> bool {
        let flag = match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        };
        (self.0 & flag) != 0
    }

    /// Removes castling rights for a color.
    #[inline]
    pub fn remove_color(&mut self, color: Color) {
        let mask = match color {
            Color::White => !(Self::WHITE_KINGSIDE | Self::WHITE_QUEENSIDE),
            Color::Black => !(Self::BLACK_KINGSIDE | Self::BLACK_QUEENSIDE),
        };
        self.0 &= mask;
    }

    /// Removes kingside castling for a color.
    #[inline]
    pub fn remove_kingside(&mut self, color: Color) {
        let mask = match color {
            Color::White => !Self::WHITE_KINGSIDE,
            Color::Black => !Self::BLACK_KINGSIDE,
        };
        self.0 &= mask;
    }

    /// Removes queenside castling for a color.
    #[inline]
    pub fn remove_queenside(&mut self, color: Color) {
        let mask = match color {
            Color::White => !Self::WHITE_QUEENSIDE,
            Color::Black => !Self::BLACK_QUEENSIDE,
        };
        self.0 &= mask;
    }

    /// Returns the raw flags.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

#[inline]
fn castling_zobrist(rights: CastlingRights) -> u64 {
    let mut key = 0u64;
    if rights.can_castle_kingside(Color::White) {
        key ^= ZOBRIST.castling_key(0);
    }
    if rights.can_castle_queenside(Color::White) {
        key ^= ZOBRIST.castling_key(1);
    }
    if rights.can_castle_kingside(Color::Black) {
        key ^= ZOBRIST.castling_key(2);
    }
    if rights.can_castle_queenside(Color::Black) {
        key ^= ZOBRIST.castling_key(3);
    }
    key
}

#[inline]
fn en_passant_zobrist(ep: Option<Square>) -> u64 {
    ep.map(|sq| ZOBRIST.en_passant_key(sq.file().index() as usize))
        .unwrap_or(0)
}

/// State needed to undo a single made move.
#[derive(Debug, Clone, Copy)]
struct UnmakeEntry {
    mv: Move,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    checkers: Bitboard,
    zobrist_key: u64,
    pawn_key: u64,
}

/// Complete chess position state.
#[derive(Debug, Clone)]
pub struct Position {
    /// Bitboards for each piece type, indexed by Piece enum.
    pub pieces: [Bitboard; 6],

    /// Bitboards for each color's pieces.
    pub colors: [Bitboard; 2],

    /// Piece-index array for O(1) `piece_at` lookups.
    board: [Option<Piece>; 64],

    /// The side to move.
    pub side_to_move: Color,

    /// Castling rights.
    pub castling: CastlingRights,

    /// En passant target square (if any).
    pub en_passant: Option<Square>,

    /// Halfmove clock for the fifty-move rule.
    pub halfmove_clock: u32,

    /// Fullmove number (starts at 1, increments after Black's move).
    pub fullmove_number: u32,

    /// Half-moves played since the position was set up.
    ply: u32,

    /// Pieces currently giving check to the side to move.
    pub checkers: Bitboard,

    /// Zobrist hash of the full position.
    pub zobrist_key: u64,

    /// Zobrist hash of the pawn structure only.
    pub pawn_key: u64,

    history: Vec<UnmakeEntry>,
    key_history: Vec<u64>,
}

impl Position {
    /// Creates an empty position.
    pub fn empty() -> Self {
        Position {
            pieces: [Bitboard::EMPTY; 6],
            colors: [Bitboard::EMPTY; 2],
            board: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            ply: 0,
            checkers: Bitboard::EMPTY,
            zobrist_key: 0,
            pawn_key: 0,
            history: Vec::new(),
            key_history: Vec::new(),
        }
    }

    /// Creates the standard starting position.
    pub fn startpos() -> Self {
        Self::from_fen(FenParser::STARTPOS).expect("STARTPOS is valid")
    }

    /// Creates a position from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parsed = FenParser::parse(fen)?;
        let mut position = Position::empty();

        let ranks: Vec<&str> = parsed.piece_placement.split('/').collect();
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx;
            let mut file = 0usize;

            for c in rank_str.chars() {
                if let Some(digit) = c.to_digit(10) {
                    file += digit as usize;
                } else if let Some((piece, color)) = Piece::from_fen_char(c) {
                    let sq = unsafe { Square::from_index_unchecked((rank * 8 + file) as u8) };
                    position.place(piece, color, sq);
                    file += 1;
                }
            }
        }

        position.side_to_move = match parsed.active_color {
            'w' => Color::White,
            'b' => Color::Black,
            _ => unreachable!("FEN parser validated this"),
        };

        let mut castling = 0u8;
        for c in parsed.castling.chars() {
            match c {
                'K' => castling |= CastlingRights::WHITE_KINGSIDE,
                'Q' => castling |= CastlingRights::WHITE_QUEENSIDE,
                'k' => castling |= CastlingRights::BLACK_KINGSIDE,
                'q' => castling |= CastlingRights::BLACK_QUEENSIDE,
                _ => {}
            }
        }
        position.castling = CastlingRights::new(castling);

        position.en_passant = if parsed.en_passant == "-" {
            None
        } else {
            Square::from_algebraic(&parsed.en_passant)
        };

        position.halfmove_clock = parsed.halfmove_clock;
        position.fullmove_number = parsed.fullmove_number;

        position.recompute_keys();
        position.recompute_checkers();

        Ok(position)
    }

    /// Converts the position to a FEN string.
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                let sq = unsafe { Square::from_index_unchecked(rank * 8 + file) };
                if let Some((piece, color)) = self.piece_at(sq) {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.to_fen_char(color));
                } else {
                    empty_count += 1;
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling.raw() == 0 {
            fen.push('-');
        } else {
            if self.castling.can_castle_kingside(Color::White) {
                fen.push('K');
            }
            if self.castling.can_castle_queenside(Color::White) {
                fen.push('Q');
            }
            if self.castling.can_castle_kingside(Color::Black) {
                fen.push('k');
            }
            if self.castling.can_castle_queenside(Color::Black) {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }

        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }

    /// Returns the piece and color at the given square, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        let piece = self.board[sq.index() as usize]?;
        let color = if self.colors[Color::White.index()].contains(sq) {
            Color::White
        } else {
            Color::Black
        };
        Some((piece, color))
    }

    /// Returns a bitboard of all occupied squares.
    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    /// Returns a bitboard of all empty squares.
    #[inline]
    pub fn empty_squares(&self) -> Bitboard {
        !self.occupied()
    }

    /// Returns a bitboard of pieces of the given type and color.
    #[inline]
    pub fn pieces_of(&self, piece: Piece, color: Color) -> Bitboard {
        self.pieces[piece.index()] & self.colors[color.index()]
    }

    /// Returns the square of the given color's king.
    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        let idx = self.pieces_of(Piece::King, color).lsb().expect("king present");
        unsafe { Square::from_index_unchecked(idx) }
    }

    /// Half-moves played since the position was set up.
    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Whether the side to move is currently in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers.is_not_empty()
    }

    /// The last move played, if any.
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|e| e.mv)
    }

    /// Returns the attackers of `sq` belonging to `by_color`, using `occupied`
    /// as the blocker set (callers pass a modified occupancy to answer
    /// "would this square be attacked after X", e.g. with the king removed).
    pub fn attackers_of(&self, sq: Square, by_color: Color, occupied: Bitboard) -> Bitboard {
        let pawns = self.pieces_of(Piece::Pawn, by_color);
        let knights = self.pieces_of(Piece::Knight, by_color);
        let kings = self.pieces_of(Piece::King, by_color);
        let diag = self.pieces_of(Piece::Bishop, by_color) | self.pieces_of(Piece::Queen, by_color);
        let ortho = self.pieces_of(Piece::Rook, by_color) | self.pieces_of(Piece::Queen, by_color);

        (pawn_attacks(sq, by_color.opposite()) & pawns)
            | (knight_attacks(sq) & knights)
            | (king_attacks(sq) & kings)
            | (bishop_attacks(sq, occupied) & diag)
            | (rook_attacks(sq, occupied) & ortho)
    }

    /// Returns true if `sq` is attacked by `by_color` in the current position.
    #[inline]
    pub fn is_attacked(&self, sq: Square, by_color: Color) -> bool {
        self.attackers_of(sq, by_color, self.occupied()).is_not_empty()
    }

    /// Returns true if the position has been repeated (including the current
    /// occurrence) within the window bounded by the halfmove clock.
    pub fn repetition_count(&self) -> u32 {
        let len = self.key_history.len();
        if len == 0 {
            return 1;
        }
        let window = self.halfmove_clock as usize;
        let current = self.zobrist_key;
        let lo = len.saturating_sub(window);
        let mut count = 1;
        let mut i = len as isize - 3;
        while i >= lo as isize {
            if self.key_history[i as usize] == current {
                count += 1;
            }
            i -= 2;
        }
        count
    }

    /// Threefold (or more) repetition of the current position.
    #[inline]
    pub fn is_repetition_draw(&self) -> bool {
        self.repetition_count() >= 3
    }

    /// Fifty-move-rule draw (100 halfmoves without a pawn move or capture).
    #[inline]
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Whether neither side has enough material to force checkmate.
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = self.pieces[Piece::Pawn.index()]
            | self.pieces[Piece::Rook.index()]
            | self.pieces[Piece::Queen.index()];
        if heavy.is_not_empty() {
            return false;
        }

        let white_knights = self.pieces_of(Piece::Knight, Color::White).count();
        let black_knights = self.pieces_of(Piece::Knight, Color::Black).count();
        let white_bishops = self.pieces_of(Piece::Bishop, Color::White);
        let black_bishops = self.pieces_of(Piece::Bishop, Color::Black);
        let minors = white_knights + black_knights + white_bishops.count() + black_bishops.count();

        if minors <= 1 {
            return true;
        }

        // Any number of bishops, on either side, all confined to one color
        // complex is also an unforceable draw, as long as neither side has
        // a knight to break the complex.
        if white_knights == 0 && black_knights == 0 {
            let bishops = white_bishops | black_bishops;
            let all_light = (bishops & !Bitboard::LIGHT_SQUARES).is_empty();
            let all_dark = (bishops & !Bitboard::DARK_SQUARES).is_empty();
            if all_light || all_dark {
                return true;
            }
        }

        false
    }

    fn place(&mut self, piece: Piece, color: Color, sq: Square) {
        self.pieces[piece.index()].set(sq);
        self.colors[color.index()].set(sq);
        self.board[sq.index() as usize] = Some(piece);
    }

    fn remove(&mut self, piece: Piece, color: Color, sq: Square) {
        self.pieces[piece.index()].clear(sq);
        self.colors[color.index()].clear(sq);
        self.board[sq.index() as usize] = None;
    }

    fn recompute_keys(&mut self) {
        let mut key = 0u64;
        let mut pawn_key = 0u64;
        for idx in 0..64u8 {
            let sq = unsafe { Square::from_index_unchecked(idx) };
            if let Some((piece, color)) = self.piece_at(sq) {
                let piece_key = ZOBRIST.piece_key(piece, color, sq);
                key ^= piece_key;
                if piece == Piece::Pawn {
                    pawn_key ^= piece_key;
                }
            }
        }
        if self.side_to_move == Color::Black {
            key ^= ZOBRIST.black_to_move;
        }
        key ^= castling_zobrist(self.castling);
        key ^= en_passant_zobrist(self.en_passant);
        self.zobrist_key = key;
        self.pawn_key = pawn_key;
    }

    fn recompute_checkers(&mut self) {
        let king_sq = self.king_square(self.side_to_move);
        self.checkers = self.attackers_of(king_sq, self.side_to_move.opposite(), self.occupied());
    }

    /// Plays a move, mutating the position in place. Pairs with `unmake`.
    pub fn make(&mut self, mv: Move) {
        let us = self.side_to_move;
        let them = us.opposite();
        let from = mv.from();
        let to = mv.to();
        let moved = mv.moved_piece();
        let kind = mv.kind();

        self.history.push(UnmakeEntry {
            mv,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            checkers: self.checkers,
            zobrist_key: self.zobrist_key,
            pawn_key: self.pawn_key,
        });

        self.remove(moved, us, from);
        self.zobrist_key ^= ZOBRIST.piece_key(moved, us, from);
        if moved == Piece::Pawn {
            self.pawn_key ^= ZOBRIST.piece_key(moved, us, from);
        }

        let is_capture = mv.captured_piece().is_some();
        if is_capture {
            let victim_sq = if kind == MoveKind::EnPassant {
                unsafe {
                    Square::from_index_unchecked((to.index() as i16 - us.pawn_direction() as i16 * 8) as u8)
                }
            } else {
                to
            };
            let captured = mv.captured_piece().expect("capture flagged");
            self.remove(captured, them, victim_sq);
            self.zobrist_key ^= ZOBRIST.piece_key(captured, them, victim_sq);
            if captured == Piece::Pawn {
                self.pawn_key ^= ZOBRIST.piece_key(captured, them, victim_sq);
            }
        }

        let dest_piece = kind.promotion_piece().unwrap_or(moved);
        self.place(dest_piece, us, to);
        self.zobrist_key ^= ZOBRIST.piece_key(dest_piece, us, to);
        if dest_piece == Piece::Pawn {
            self.pawn_key ^= ZOBRIST.piece_key(dest_piece, us, to);
        }

        if kind.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(us, kind);
            self.remove(Piece::Rook, us, rook_from);
            self.zobrist_key ^= ZOBRIST.piece_key(Piece::Rook, us, rook_from);
            self.place(Piece::Rook, us, rook_to);
            self.zobrist_key ^= ZOBRIST.piece_key(Piece::Rook, us, rook_to);
        }

        let old_castling = self.castling;
        if moved == Piece::King {
            self.castling.remove_color(us);
        }
        if moved == Piece::Rook {
            remove_rook_right(&mut self.castling, us, from);
        }
        remove_rook_right_on_capture(&mut self.castling, to);
        self.zobrist_key ^= castling_zobrist(old_castling) ^ castling_zobrist(self.castling);

        let old_ep = self.en_passant;
        self.en_passant = if mv.is_double_push() {
            Some(unsafe {
                Square::from_index_unchecked((from.index() as i16 + us.pawn_direction() as i16 * 8) as u8)
            })
        } else {
            None
        };
        self.zobrist_key ^= en_passant_zobrist(old_ep) ^ en_passant_zobrist(self.en_passant);

        if moved == Piece::Pawn || is_capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if us == Color::Black {
            self.fullmove_number += 1;
        }

        self.side_to_move = them;
        self.zobrist_key ^= ZOBRIST.black_to_move;
        self.ply += 1;

        self.recompute_checkers();
        self.key_history.push(self.zobrist_key);
    }

    /// Undoes the last move played with `make`.
    pub fn unmake(&mut self) {
        let entry = self.history.pop().expect("unmake without make");
        self.key_history.pop();

        let us = self.side_to_move.opposite();
        let them = self.side_to_move;
        let mv = entry.mv;
        let from = mv.from();
        let to = mv.to();
        let moved = mv.moved_piece();
        let kind = mv.kind();

        let dest_piece = kind.promotion_piece().unwrap_or(moved);
        self.remove(dest_piece, us, to);

        if kind.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(us, kind);
            self.remove(Piece::Rook, us, rook_to);
            self.place(Piece::Rook, us, rook_from);
        }

        self.place(moved, us, from);

        if let Some(captured) = mv.captured_piece() {
            let victim_sq = if kind == MoveKind::EnPassant {
                unsafe {
                    Square::from_index_unchecked((to.index() as i16 - us.pawn_direction() as i16 * 8) as u8)
                }
            } else {
                to
            };
            self.place(captured, them, victim_sq);
        }

        self.castling = entry.castling;
        self.en_passant = entry.en_passant;
        self.halfmove_clock = entry.halfmove_clock;
        self.checkers = entry.checkers;
        self.zobrist_key = entry.zobrist_key;
        self.pawn_key = entry.pawn_key;

        if us == Color::Black {
            self.fullmove_number -= 1;
        }

        self.side_to_move = us;
        self.ply -= 1;
    }

    /// Plays a null move (passes the turn) for null-move pruning. Pairs with
    /// `unmake_null`. Only valid when not in check.
    pub fn make_null(&mut self) {
        debug_assert!(!self.in_check());
        self.history.push(UnmakeEntry {
            mv: Move::NULL,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            checkers: self.checkers,
            zobrist_key: self.zobrist_key,
            pawn_key: self.pawn_key,
        });

        let old_ep = self.en_passant;
        self.en_passant = None;
        self.zobrist_key ^= en_passant_zobrist(old_ep);
        self.zobrist_key ^= ZOBRIST.black_to_move;
        self.side_to_move = self.side_to_move.opposite();
        self.ply += 1;
        self.key_history.push(self.zobrist_key);
    }

    pub fn unmake_null(&mut self) {
        let entry = self.history.pop().expect("unmake_null without make_null");
        self.key_history.pop();
        self.en_passant = entry.en_passant;
        self.zobrist_key = entry.zobrist_key;
        self.pawn_key = entry.pawn_key;
        self.checkers = entry.checkers;
        self.halfmove_clock = entry.halfmove_clock;
        self.castling = entry.castling;
        self.side_to_move = self.side_to_move.opposite();
        self.ply -= 1;
    }

    /// Checks whether `mv` (assumed legal in *some* position, e.g. a move
    /// read back from the transposition table) is legal in this one, without
    /// requiring a full move-generation pass.
    ///
    /// Verifies the moved piece is still on `from` and belongs to the side
    /// to move, that the captured-piece field matches what is actually on
    /// the board (including the en-passant victim square), and finally that
    /// playing it does not leave the mover's own king in check.
    pub fn is_legal_soft(&mut self, mv: Move) -> bool {
        match self.piece_at(mv.from()) {
            Some((piece, color)) if piece == mv.moved_piece() && color == self.side_to_move => {}
            _ => return false,
        }

        let us = self.side_to_move;
        let expected_captured = if mv.kind() == MoveKind::EnPassant {
            if self.en_passant != Some(mv.to()) {
                return false;
            }
            let victim_sq = unsafe {
                Square::from_index_unchecked((mv.to().index() as i16 - us.pawn_direction() as i16 * 8) as u8)
            };
            self.piece_at(victim_sq).map(|(p, _)| p)
        } else {
            self.piece_at(mv.to()).map(|(p, _)| p)
        };
        if expected_captured != mv.captured_piece() {
            return false;
        }

        if mv.kind().is_castling() {
            let (rook_from, _) = castling_rook_squares(us, mv.kind());
            if self.piece_at(rook_from) != Some((Piece::Rook, us)) {
                return false;
            }
        }

        self.make(mv);
        let king_sq = self.king_square(us);
        let still_legal = !self.is_attacked(king_sq, us.opposite());
        self.unmake();
        still_legal
    }
}

fn castling_rook_squares(color: Color, kind: MoveKind) -> (Square, Square) {
    match (color, kind) {
        (Color::White, MoveKind::CastleKingside) => (Square::H1, Square::F1),
        (Color::White, MoveKind::CastleQueenside) => (Square::A1, Square::D1),
        (Color::Black, MoveKind::CastleKingside) => (Square::H8, Square::F8),
        (Color::Black, MoveKind::CastleQueenside) => (Square::A8, Square::D8),
        _ => unreachable!("not a castling move"),
    }
}

fn remove_rook_right(castling: &mut CastlingRights, color: Color, from: Square) {
    match (color, from) {
        (Color::White, sq) if sq == Square::H1 => castling.remove_kingside(color),
        (Color::White, sq) if sq == Square::A1 => castling.remove_queenside(color),
        (Color::Black, sq) if sq == Square::H8 => castling.remove_kingside(color),
        (Color::Black, sq) if sq == Square::A8 => castling.remove_queenside(color),
        _ => {}
    }
}

fn remove_rook_right_on_capture(castling: &mut CastlingRights, to: Square) {
    match to {
        sq if sq == Square::H1 => castling.remove_kingside(Color::White),
        sq if sq == Square::A1 => castling.remove_queenside(Color::White),
        sq if sq == Square::H8 => castling.remove_kingside(Color::Black),
        sq if sq == Square::A8 => castling.remove_queenside(Color::Black),
        _ => {}
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.pieces == other.pieces
            && self.colors == other.colors
            && self.side_to_move == other.side_to_move
            && self.castling == other.castling
            && self.en_passant == other.en_passant
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
    }
}

impl Eq for Position {}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_fen_roundtrip() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), FenParser::STARTPOS);
    }

    #[test]
    fn custom_fen_roundtrip() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn piece_at() {
        let pos = Position::startpos();
        assert_eq!(pos.piece_at(Square::E1), Some((Piece::King, Color::White)));
        assert_eq!(pos.piece_at(Square::E8), Some((Piece::King, Color::Black)));
        assert_eq!(
            pos.piece_at(Square::new(chess_core::File::E, chess_core::Rank::R4)),
            None
        );
    }

    #[test]
    fn castling_rights() {
        let mut rights = CastlingRights::ALL;
        assert!(rights.can_castle_kingside(Color::White));
        assert!(rights.can_castle_queenside(Color::Black));

        rights.remove_kingside(Color::White);
        assert!(!rights.can_castle_kingside(Color::White));
        assert!(rights.can_castle_queenside(Color::White));
    }

    #[test]
    fn castling_rights_remove_queenside() {
        let mut rights = CastlingRights::ALL;
        rights.remove_queenside(Color::Black);
        assert!(rights.can_castle_kingside(Color::Black));
        assert!(!rights.can_castle_queenside(Color::Black));
    }

    #[test]
    fn castling_rights_remove_color() {
        let mut rights = CastlingRights::ALL;
        rights.remove_color(Color::White);
        assert!(!rights.can_castle_kingside(Color::White));
        assert!(!rights.can_castle_queenside(Color::White));
        assert!(rights.can_castle_kingside(Color::Black));
        assert!(rights.can_castle_queenside(Color::Black));
    }

    #[test]
    fn castling_rights_none() {
        let rights = CastlingRights::NONE;
        assert!(!rights.can_castle_kingside(Color::White));
        assert!(!rights.can_castle_queenside(Color::White));
        assert!(!rights.can_castle_kingside(Color::Black));
        assert!(!rights.can_castle_queenside(Color::Black));
        assert_eq!(rights.raw(), 0);
    }

    #[test]
    fn position_empty() {
        let pos = Position::empty();
        assert_eq!(pos.side_to_move, Color::White);
        assert_eq!(pos.castling.raw(), 0);
        assert_eq!(pos.en_passant, None);
        assert_eq!(pos.halfmove_clock, 0);
        assert_eq!(pos.fullmove_number, 1);
        assert!(pos.occupied().is_empty());
    }

    #[test]
    fn position_default() {
        let pos = Position::default();
        assert_eq!(pos.to_fen(), FenParser::STARTPOS);
    }

    #[test]
    fn position_occupied_empty() {
        let pos = Position::startpos();
        assert_eq!(pos.occupied().count(), 32);
        assert_eq!(pos.empty_squares().count(), 32);
    }

    #[test]
    fn position_pieces_of() {
        let pos = Position::startpos();
        assert_eq!(pos.pieces_of(Piece::Pawn, Color::White).count(), 8);
        assert_eq!(pos.pieces_of(Piece::Pawn, Color::Black).count(), 8);
        assert_eq!(pos.pieces_of(Piece::King, Color::White).count(), 1);
        assert_eq!(pos.pieces_of(Piece::King, Color::Black).count(), 1);
    }

    #[test]
    fn position_with_en_passant() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert!(pos.en_passant.is_some());
        assert_eq!(pos.en_passant.unwrap().to_algebraic(), "e3");
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn position_no_castling() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w - - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert!(!pos.castling.can_castle_kingside(Color::White));
        assert!(!pos.castling.can_castle_queenside(Color::White));
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn position_black_to_move() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.side_to_move, Color::Black);
    }

    #[test]
    fn make_unmake_restores_fen() {
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
        let mut pos = Position::from_fen(fen).unwrap();
        let before = pos.clone();
        let mv = Move::normal(Square::F3, unsafe { Square::from_index_unchecked(44) }, Piece::Knight);
        pos.make(mv);
        assert_ne!(pos.to_fen(), fen);
        pos.unmake();
        assert_eq!(pos, before);
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn make_updates_zobrist_and_unmake_restores_it() {
        let mut pos = Position::startpos();
        let start_key = pos.zobrist_key;
        let e2 = Square::new(chess_core::File::E, chess_core::Rank::R2);
        let e4 = Square::new(chess_core::File::E, chess_core::Rank::R4);
        let mv = Move::new(e2, e4, Piece::Pawn, None, MoveKind::Normal);
        pos.make(mv);
        assert_ne!(pos.zobrist_key, start_key);
        pos.unmake();
        assert_eq!(pos.zobrist_key, start_key);
    }

    #[test]
    fn castling_move_moves_rook_too() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = Move::new(Square::E1, Square::G1, Piece::King, None, MoveKind::CastleKingside);
        pos.make(mv);
        assert_eq!(pos.piece_at(Square::F1), Some((Piece::Rook, Color::White)));
        assert_eq!(pos.piece_at(Square::H1), None);
        assert!(!pos.castling.can_castle_kingside(Color::White));
        pos.unmake();
        assert_eq!(pos.piece_at(Square::H1), Some((Piece::Rook, Color::White)));
        assert!(pos.castling.can_castle_kingside(Color::White));
    }

    #[test]
    fn checkers_after_move_into_check_by_discovery() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/4b3/4N3/4K3 w - - 0 1").unwrap();
        let mv = Move::new(Square::E2, unsafe { Square::from_index_unchecked(21) }, Piece::Knight, None, MoveKind::Normal);
        pos.make(mv);
        assert!(pos.in_check());
    }

    #[test]
    fn insufficient_material_king_vs_king() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn insufficient_material_opposite_bishops_is_sufficient_here() {
        let pos = Position::from_fen("4k3/8/8/8/8/2b5/8/3BK3 w - - 0 1").unwrap();
        assert!(!pos.is_insufficient_material());
    }

    #[test]
    fn insufficient_material_many_same_color_bishops_is_a_draw() {
        // c1 and e1 are both dark squares.
        let pos = Position::from_fen("7k/8/8/8/8/8/8/2B1B2K w - - 0 1").unwrap();
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn fifty_move_draw() {
        let mut pos = Position::startpos();
        pos.halfmove_clock = 100;
        assert!(pos.is_fifty_move_draw());
    }
}
