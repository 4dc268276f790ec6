//! Standard Algebraic Notation (SAN) parsing and generation.
//!
//! SAN is the standard way to record chess moves in human-readable form.
//! Examples: "e4", "Nf3", "Bxc6", "O-O", "e8=Q", "Nbd2", "R1e1"

use crate::movegen::{generate_moves, make_move};
use crate::Position;
use chess_core::{File, Move, MoveKind, Piece, Rank, Square};
use std::fmt;

/// Error type for SAN parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanError {
    /// The SAN string is empty.
    Empty,
    /// The SAN string has invalid format.
    InvalidFormat(String),
    /// No legal move matches the SAN.
    NoMatchingMove(String),
    /// Multiple legal moves match the SAN (ambiguous).
    AmbiguousMove(String),
}

impl fmt::Display for SanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanError::Empty => write!(f, "empty SAN string"),
            SanError::InvalidFormat(s) => write!(f, "invalid SAN format: {}", s),
            SanError::NoMatchingMove(s) => write!(f, "no legal move matches: {}", s),
            SanError::AmbiguousMove(s) => write!(f, "ambiguous move: {}", s),
        }
    }
}

impl std::error::Error for SanError {}

/// Converts a move to SAN notation given the current position.
///
/// The position must be the state BEFORE the move is made.
/// The move must be legal in the given position.
pub fn move_to_san(position: &Position, m: Move) -> String {
    if m.kind() == MoveKind::CastleKingside {
        return add_check_suffix(position, m, "O-O".to_string());
    }
    if m.kind() == MoveKind::CastleQueenside {
        return add_check_suffix(position, m, "O-O-O".to_string());
    }

    let mut san = String::new();
    let from = m.from();
    let to = m.to();
    let piece = m.moved_piece();

    if piece != Piece::Pawn {
        san.push(piece_to_san_char(piece));
        san.push_str(&get_disambiguation(position, m, piece));
    }

    if m.is_capture() {
        if piece == Piece::Pawn {
            san.push(file_to_char(from.file()));
        }
        san.push('x');
    }

    san.push(file_to_char(to.file()));
    san.push(rank_to_char(to.rank()));

    if let Some(promo) = m.kind().promotion_piece() {
        san.push('=');
        san.push(piece_to_san_char(promo));
    }

    add_check_suffix(position, m, san)
}

/// Parses a SAN string and returns the corresponding legal move.
pub fn san_to_move(position: &Position, san: &str) -> Result<Move, SanError> {
    let san = san.trim();
    if san.is_empty() {
        return Err(SanError::Empty);
    }

    let san = san.trim_end_matches('#').trim_end_matches('+');
    if san.is_empty() {
        return Err(SanError::Empty);
    }

    if san == "O-O" || san == "0-0" {
        return find_castling_move(position, true);
    }
    if san == "O-O-O" || san == "0-0-0" {
        return find_castling_move(position, false);
    }

    let parsed = parse_san_components(san)?;
    find_matching_move(position, &parsed)
}

/// Parsed components of a SAN string.
#[derive(Debug)]
struct ParsedSan {
    piece: Piece,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    to_square: Square,
    promotion: Option<Piece>,
}

fn parse_san_components(san: &str) -> Result<ParsedSan, SanError> {
    let chars: Vec<char> = san.chars().collect();
    if chars.is_empty() {
        return Err(SanError::Empty);
    }

    let mut idx = 0;

    let piece = if chars[0].is_uppercase() && chars[0] != 'O' {
        let p = san_char_to_piece(chars[0]).ok_or_else(|| {
            SanError::InvalidFormat(format!("invalid piece character: {}", chars[0]))
        })?;
        idx += 1;
        p
    } else {
        Piece::Pawn
    };

    let remaining: String = chars[idx..].iter().collect();
    let remaining = remaining.replace('x', "");

    let (remaining, promotion) = if remaining.contains('=') {
        let parts: Vec<&str> = remaining.split('=').collect();
        if parts.len() != 2 || parts[1].len() != 1 {
            return Err(SanError::InvalidFormat(format!("invalid promotion: {}", san)));
        }
        let promo_piece = san_char_to_piece(parts[1].chars().next().unwrap()).ok_or_else(|| {
            SanError::InvalidFormat(format!("invalid promotion piece: {}", parts[1]))
        })?;
        (parts[0].to_string(), Some(promo_piece))
    } else {
        (remaining, None)
    };

    let chars: Vec<char> = remaining.chars().collect();
    if chars.len() < 2 {
        return Err(SanError::InvalidFormat(format!("too short: {}", san)));
    }

    let to_file = char_to_file(chars[chars.len() - 2])
        .ok_or_else(|| SanError::InvalidFormat(format!("invalid file: {}", san)))?;
    let to_rank = char_to_rank(chars[chars.len() - 1])
        .ok_or_else(|| SanError::InvalidFormat(format!("invalid rank: {}", san)))?;
    let to_square = Square::new(to_file, to_rank);

    let disambig: String = chars[..chars.len() - 2].iter().collect();
    let (from_file, from_rank) = parse_disambiguation(&disambig)?;

    Ok(ParsedSan {
        piece,
        from_file,
        from_rank,
        to_square,
        promotion,
    })
}

fn parse_disambiguation(s: &str) -> Result<(Option<File>, Option<Rank>), SanError> {
    let chars: Vec<char> = s.chars().collect();

    match chars.len() {
        0 => Ok((None, None)),
        1 => {
            if let Some(f) = char_to_file(chars[0]) {
                Ok((Some(f), None))
            } else if let Some(r) = char_to_rank(chars[0]) {
                Ok((None, Some(r)))
            } else {
                Err(SanError::InvalidFormat(format!("invalid disambiguation: {}", s)))
            }
        }
        2 => {
            let file = char_to_file(chars[0])
                .ok_or_else(|| SanError::InvalidFormat(format!("invalid disambiguation file: {}", s)))?;
            let rank = char_to_rank(chars[1])
                .ok_or_else(|| SanError::InvalidFormat(format!("invalid disambiguation rank: {}", s)))?;
            Ok((Some(file), Some(rank)))
        }
        _ => Err(SanError::InvalidFormat(format!("disambiguation too long: {}", s))),
    }
}

fn find_castling_move(position: &Position, kingside: bool) -> Result<Move, SanError> {
    let moves = generate_moves(position);
    let kind = if kingside {
        MoveKind::CastleKingside
    } else {
        MoveKind::CastleQueenside
    };

    for m in moves.as_slice() {
        if m.kind() == kind {
            return Ok(*m);
        }
    }

    let name = if kingside { "O-O" } else { "O-O-O" };
    Err(SanError::NoMatchingMove(name.to_string()))
}

fn find_matching_move(position: &Position, parsed: &ParsedSan) -> Result<Move, SanError> {
    let moves = generate_moves(position);
    let mut matching: Vec<Move> = Vec::new();

    for m in moves.as_slice() {
        if m.to() != parsed.to_square {
            continue;
        }
        if m.moved_piece() != parsed.piece {
            continue;
        }
        if let Some(file) = parsed.from_file {
            if m.from().file() != file {
                continue;
            }
        }
        if let Some(rank) = parsed.from_rank {
            if m.from().rank() != rank {
                continue;
            }
        }
        match parsed.promotion {
            Some(promo) => {
                if m.kind().promotion_piece() != Some(promo) {
                    continue;
                }
            }
            None => {
                if m.kind().is_promotion() {
                    continue;
                }
            }
        }

        matching.push(*m);
    }

    match matching.len() {
        0 => Err(SanError::NoMatchingMove(format!("{:?}", parsed))),
        1 => Ok(matching[0]),
        _ => Err(SanError::AmbiguousMove(format!("multiple moves match: {:?}", parsed))),
    }
}

fn get_disambiguation(position: &Position, m: Move, piece: Piece) -> String {
    let moves = generate_moves(position);
    let to = m.to();
    let from = m.from();

    let same_dest: Vec<Move> = moves
        .as_slice()
        .iter()
        .filter(|other| other.to() == to && other.moved_piece() == piece)
        .copied()
        .collect();

    if same_dest.len() <= 1 {
        return String::new();
    }

    let same_file = same_dest.iter().filter(|o| o.from().file() == from.file()).count();
    if same_file == 1 {
        return file_to_char(from.file()).to_string();
    }

    let same_rank = same_dest.iter().filter(|o| o.from().rank() == from.rank()).count();
    if same_rank == 1 {
        return rank_to_char(from.rank()).to_string();
    }

    format!("{}{}", file_to_char(from.file()), rank_to_char(from.rank()))
}

fn add_check_suffix(position: &Position, m: Move, mut san: String) -> String {
    let new_pos = make_move(position, m);
    if new_pos.in_check() {
        let moves = generate_moves(&new_pos);
        if moves.is_empty() {
            san.push('#');
        } else {
            san.push('+');
        }
    }
    san
}

fn piece_to_san_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn san_char_to_piece(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        'P' => Some(Piece::Pawn),
        _ => None,
    }
}

fn file_to_char(file: File) -> char {
    (b'a' + file.index() as u8) as char
}

fn rank_to_char(rank: Rank) -> char {
    (b'1' + rank.index() as u8) as char
}

fn char_to_file(c: char) -> Option<File> {
    match c {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

fn char_to_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::R1),
        '2' => Some(Rank::R2),
        '3' => Some(Rank::R3),
        '4' => Some(Rank::R4),
        '5' => Some(Rank::R5),
        '6' => Some(Rank::R6),
        '7' => Some(Rank::R7),
        '8' => Some(Rank::R8),
        _ => None,
    }
}
