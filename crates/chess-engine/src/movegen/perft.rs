//! Perft (performance test) for move generator validation.
//!
//! Perft counts the number of leaf nodes at a given depth, which can be
//! compared against known-correct values to validate the move generator.
//! Walks the tree with make/unmake rather than cloning positions.

use super::generate_moves;
use crate::Position;

/// Counts the number of leaf nodes at the given depth.
pub fn perft(position: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = generate_moves(position);

    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for m in &moves {
        position.make(*m);
        nodes += perft(position, depth - 1);
        position.unmake();
    }
    nodes
}

/// Perft with divide - shows node count for each move at depth-1.
/// Useful for debugging to identify which moves have incorrect counts.
pub fn perft_divide(position: &mut Position, depth: u32) -> Vec<(String, u64)> {
    let moves = generate_moves(position);
    let mut results = Vec::with_capacity(moves.len());

    for m in &moves {
        position.make(*m);
        let nodes = if depth > 1 { perft(position, depth - 1) } else { 1 };
        position.unmake();
        results.push((m.to_pacn(), nodes));
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perft_startpos_depth_1() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 1), 20);
    }

    #[test]
    fn perft_startpos_depth_2() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 2), 400);
    }

    #[test]
    fn perft_startpos_depth_3() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 3), 8902);
    }

    #[test]
    fn perft_startpos_depth_4() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 4), 197281);
    }

    #[test]
    #[ignore]
    fn perft_startpos_depth_5() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 5), 4865609);
    }

    // Kiwipete - a position with lots of special moves
    #[test]
    fn perft_kiwipete_depth_1() {
        let mut position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut position, 1), 48);
    }

    #[test]
    fn perft_kiwipete_depth_2() {
        let mut position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut position, 2), 2039);
    }

    #[test]
    fn perft_kiwipete_depth_3() {
        let mut position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&mut position, 3), 97862);
    }

    // Position 3: check evasion, en passant, promotion
    #[test]
    fn perft_position3_depth_1() {
        let mut position = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&mut position, 1), 14);
    }

    #[test]
    fn perft_position3_depth_2() {
        let mut position = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&mut position, 2), 191);
    }

    #[test]
    fn perft_position3_depth_3() {
        let mut position = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
        assert_eq!(perft(&mut position, 3), 2812);
    }

    // Position 4: lots of promotions and captures
    #[test]
    fn perft_position4_depth_1() {
        let mut position =
            Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1")
                .unwrap();
        assert_eq!(perft(&mut position, 1), 6);
    }

    #[test]
    fn perft_position4_depth_2() {
        let mut position =
            Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1")
                .unwrap();
        assert_eq!(perft(&mut position, 2), 264);
    }

    #[test]
    fn perft_position4_depth_3() {
        let mut position =
            Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1")
                .unwrap();
        assert_eq!(perft(&mut position, 3), 9467);
    }

    // Position 5
    #[test]
    fn perft_position5_depth_1() {
        let mut position =
            Position::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1").unwrap();
        assert_eq!(perft(&mut position, 1), 44);
    }

    #[test]
    fn perft_position5_depth_2() {
        let mut position =
            Position::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1").unwrap();
        assert_eq!(perft(&mut position, 2), 1486);
    }

    #[test]
    fn perft_position5_depth_3() {
        let mut position =
            Position::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1").unwrap();
        assert_eq!(perft(&mut position, 3), 62379);
    }

    #[test]
    fn perft_divide_works() {
        let mut position = Position::startpos();
        let results = perft_divide(&mut position, 1);
        assert_eq!(results.len(), 20);
        let total: u64 = results.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 20);
    }
}
