use super::*;
use crate::board::START_FEN;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -";

fn fen(s: &str) -> Position {
    Position::from_fen(s).unwrap()
}

fn names(moves: &[Move]) -> BTreeSet<String> {
    moves.iter().map(|m| m.to_string()).collect()
}

fn set(moves: &[&str]) -> BTreeSet<String> {
    moves.iter().map(|m| m.to_string()).collect()
}

fn legal_names(pos: &Position) -> BTreeSet<String> {
    names(&legal_moves(pos))
}

/// Square-by-square attack detection over the mailbox, sharing no code with
/// the bitboard path.
fn naive_attacked(pos: &Position, target: u8, by: Color) -> bool {
    let (tf, tr) = (file_of(target), rank_of(target));
    for from in 0..64u8 {
        let Some(pc) = pos.piece_at(from) else { continue };
        if pc.color != by || from == target {
            continue;
        }
        let (df, dr) = (tf - file_of(from), tr - rank_of(from));
        let hit = match pc.kind {
            PieceKind::Pawn => {
                let fwd = if by == Color::White { 1 } else { -1 };
                dr == fwd && df.abs() == 1
            }
            PieceKind::Knight => {
                (df.abs() == 1 && dr.abs() == 2) || (df.abs() == 2 && dr.abs() == 1)
            }
            PieceKind::King => df.abs() <= 1 && dr.abs() <= 1,
            kind => {
                let diag = df.abs() == dr.abs();
                let ortho = df == 0 || dr == 0;
                let shape = match kind {
                    PieceKind::Bishop => diag,
                    PieceKind::Rook => ortho,
                    _ => diag || ortho,
                };
                shape && {
                    let (sf, sr) = (df.signum(), dr.signum());
                    let mut f = file_of(from) + sf;
                    let mut r = rank_of(from) + sr;
                    let mut clear = true;
                    while (f, r) != (tf, tr) {
                        if pos.piece_at(sq(f, r).unwrap()).is_some() {
                            clear = false;
                            break;
                        }
                        f += sf;
                        r += sr;
                    }
                    clear
                }
            }
        };
        if hit {
            return true;
        }
    }
    false
}

/// Positions reached by random legal playouts from a few seeds.
fn random_positions(count_per_seed: usize) -> Vec<Position> {
    let seeds = [
        START_FEN,
        KIWIPETE,
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    ];
    let mut rng = StdRng::seed_from_u64(20261019);
    let mut out = Vec::new();
    for seed in seeds {
        for _ in 0..count_per_seed {
            let mut pos = fen(seed);
            for _ in 0..40 {
                out.push(pos.clone());
                let moves = legal_moves(&pos);
                let Some(&mv) = moves.choose(&mut rng) else { break };
                pos.make_move(mv);
            }
        }
    }
    out
}

#[test]
fn test_startpos_moves() {
    let pos = Position::startpos();
    let mut list = MoveList::new();
    pseudo_legal_moves(&pos, &mut list);
    assert_eq!(list.len(), 20);
    let mut pos = pos;
    remove_illegal(&mut pos, &mut list);
    assert_eq!(list.len(), 20);
    let pawn_moves = list
        .iter()
        .filter(|m| pos.piece_at(m.from).unwrap().kind == PieceKind::Pawn)
        .count();
    assert_eq!(pawn_moves, 16);
}

#[test]
fn test_kiwipete_moves() {
    assert_eq!(legal_moves(&fen(KIWIPETE)).len(), 48);
}

#[test]
fn test_pseudo_legal_moves_deterministic() {
    for pos in random_positions(2) {
        let mut a = MoveList::new();
        let mut b = MoveList::new();
        pseudo_legal_moves(&pos, &mut a);
        pseudo_legal_moves(&pos, &mut b);
        assert_eq!(&a[..], &b[..]);
    }
}

#[test]
fn test_not_in_check_after_queen_sortie() {
    // 1.e4 e5 2.Qh5
    let pos = fen("rnbqkbnr/pppp1ppp/8/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2");
    assert!(!in_check(&pos));
    assert!(!can_take_king(&pos));
}

#[test]
fn test_single_slider_check_evasions() {
    let mut pos = fen("4k3/8/8/8/8/1N6/8/r3K3 w - - 0 1");
    assert!(in_check(&pos));

    let mut list = MoveList::new();
    check_evasions(&pos, &mut list);
    remove_illegal(&mut pos, &mut list);
    let expected = set(&["b3a1", "b3c1", "e1d2", "e1e2", "e1f2"]);
    assert_eq!(names(&list), expected);
    assert_eq!(legal_names(&pos), expected);
}

#[test]
fn test_double_check_only_king_moves() {
    let mut pos = fen("4k3/8/8/8/8/3n4/8/r3K2R w K - 0 1");
    let mut list = MoveList::new();
    check_evasions(&pos, &mut list);
    assert!(list.iter().all(|m| m.from == 4));
    remove_illegal(&mut pos, &mut list);
    assert_eq!(names(&list), set(&["e1d2", "e1e2"]));
}

#[test]
fn test_pinned_piece_cannot_move() {
    let pos = fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1");
    let legal = legal_moves(&pos);
    assert_eq!(legal.len(), 4);
    assert!(legal.iter().all(|m| m.from == 4));
}

#[test]
fn test_en_passant_discovered_check_is_illegal() {
    let pos = fen("8/8/8/KPp4r/8/8/8/4k3 w - c6 0 1");
    let mut list = MoveList::new();
    pseudo_legal_moves(&pos, &mut list);
    assert!(list.contains(Move::new(33, 42)), "b5c6 is pseudo-legal");

    assert_eq!(legal_names(&pos), set(&["a5a4", "a5a6", "a5b6", "b5b6"]));
}

#[test]
fn test_en_passant_capture_resolves_pawn_check() {
    // d7-d5 checks the white king on e4; exd6 removes the checker
    let mut pos = fen("7k/8/8/3pP3/4K3/8/8/8 w - d6 0 2");
    assert!(in_check(&pos));
    let mut list = MoveList::new();
    check_evasions(&pos, &mut list);
    remove_illegal(&mut pos, &mut list);
    assert!(list.contains(Move::new(36, 43)));
}

#[test]
fn test_checkmate_has_no_moves() {
    let pos = fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    assert!(in_check(&pos));
    assert!(legal_moves(&pos).is_empty());
}

#[test]
fn test_stalemate_has_no_moves() {
    let pos = fen("k7/8/1Q6/8/8/8/8/1K6 b - - 0 1");
    assert!(!in_check(&pos));
    assert!(legal_moves(&pos).is_empty());
}

#[test]
fn test_castling_through_attacked_square() {
    let pos = fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let legal = legal_names(&pos);
    assert!(legal.contains("e1g1") && legal.contains("e1c1"));

    let pos = fen("r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1");
    let legal = legal_names(&pos);
    assert!(!legal.contains("e1g1"), "f1 is attacked");
    assert!(legal.contains("e1c1"));
}

#[test]
fn test_promotion_policy() {
    let pos = fen("1n5k/P7/8/8/8/8/8/K7 w - - 0 1");
    let mut all = MoveList::new();
    pseudo_legal_moves(&pos, &mut all);
    let promos: BTreeSet<String> = all
        .iter()
        .filter(|m| m.promo.is_some())
        .map(|m| m.to_string())
        .collect();
    assert_eq!(promos.len(), 8, "push and capture, four pieces each");

    let mut caps = MoveList::new();
    pseudo_legal_captures(&pos, &mut caps);
    assert_eq!(names(&caps), set(&["a7a8q", "a7a8n", "a7b8q", "a7b8n"]));
}

#[test]
fn test_remove_illegal_matches_independent_check() {
    for mut pos in random_positions(6) {
        let mover = pos.side_to_move;
        let mut list = MoveList::new();
        pseudo_legal_moves(&pos, &mut list);
        let pseudo = list.to_vec();

        let mut expected = BTreeSet::new();
        for mv in &pseudo {
            let mut next = pos.clone();
            next.make_move(*mv);
            let king = next.king_sq(mover).unwrap();
            if !naive_attacked(&next, king, mover.other()) {
                expected.insert(mv.to_string());
            }
        }

        remove_illegal(&mut pos, &mut list);
        assert_eq!(names(&list), expected, "{}", pos.to_fen());
    }
}

#[test]
fn test_evasions_cover_all_legal_moves() {
    let mut checked = 0;
    for mut pos in random_positions(12) {
        if !in_check(&pos) {
            continue;
        }
        checked += 1;
        let mut pseudo = MoveList::new();
        pseudo_legal_moves(&pos, &mut pseudo);
        let mut evasions = MoveList::new();
        check_evasions(&pos, &mut evasions);
        for mv in evasions.iter() {
            assert!(pseudo.contains(*mv), "{mv} not pseudo-legal in {}", pos.to_fen());
        }

        remove_illegal(&mut pos, &mut pseudo);
        remove_illegal(&mut pos, &mut evasions);
        assert_eq!(names(&evasions), names(&pseudo), "{}", pos.to_fen());
    }
    assert!(checked > 10, "playouts should reach some checks");
}

#[test]
fn test_sq_attacked_matches_naive() {
    for pos in random_positions(3) {
        let them = pos.side_to_move.other();
        for s in 0..64u8 {
            assert_eq!(
                sq_attacked(&pos, s, pos.occupied()),
                naive_attacked(&pos, s, them),
                "square {} in {}",
                sq_to_coord(s),
                pos.to_fen()
            );
        }
    }
}

#[test]
fn test_sq_attacked_with_custom_occupancy() {
    // The a8 rook reaches g8 only once the e8 king is lifted
    let pos = fen("r3k3/8/8/8/8/8/8/4K3 w - - 0 1");
    let occ = pos.occupied();
    assert!(!sq_attacked(&pos, 62, occ));
    assert!(sq_attacked(&pos, 62, occ ^ Bitboard::from_square(60)));
}

#[test]
fn test_gives_check_matches_make_move() {
    for pos in random_positions(4) {
        let them = pos.side_to_move.other();
        for mv in legal_moves(&pos) {
            let mut next = pos.clone();
            next.make_move(mv);
            assert_eq!(gives_check(&pos, mv), next.in_check(them), "{mv} in {}", pos.to_fen());
        }
    }
}

#[test]
fn test_captures_and_checks_complete() {
    for mut pos in random_positions(4) {
        if in_check(&pos) {
            continue;
        }
        let mut list = MoveList::new();
        pseudo_legal_captures_and_checks(&pos, &mut list);
        let generated = names(&list);
        assert_eq!(generated.len(), list.len(), "duplicate moves in {}", pos.to_fen());

        let mut caps = MoveList::new();
        pseudo_legal_captures(&pos, &mut caps);
        let capture_names = names(&caps);

        let mut legal = MoveList::new();
        legal_moves_into(&mut pos, &mut legal);
        for &mv in legal.iter() {
            if matches!(mv.promo, Some(PieceKind::Rook | PieceKind::Bishop)) {
                continue;
            }
            let capture = pos.piece_at(mv.to).is_some()
                || (Some(mv.to) == pos.en_passant
                    && pos.piece_at(mv.from).unwrap().kind == PieceKind::Pawn);
            if capture || mv.promo.is_some() {
                assert!(capture_names.contains(&mv.to_string()), "{mv} missing from captures");
            }
            if capture || mv.promo.is_some() || gives_check(&pos, mv) {
                assert!(generated.contains(&mv.to_string()), "{mv} missing in {}", pos.to_fen());
            }
        }
    }
}

#[test]
fn test_is_legal_rejects_foreign_moves() {
    let mut pos = Position::startpos();
    assert!(is_legal(&mut pos, Move::new(12, 28))); // e2e4
    assert!(!is_legal(&mut pos, Move::new(12, 36))); // e2e5
    assert!(!is_legal(&mut pos, Move::new(52, 36))); // black pawn
    assert!(!is_legal(&mut pos, Move::NONE));

    let mut pinned = fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1");
    assert!(!is_legal(&mut pinned, Move::new(12, 21)));
    assert!(is_legal(&mut pinned, Move::new(4, 3)));
}

#[test]
fn test_can_take_king() {
    let mut pos = fen("3k4/8/8/8/8/8/8/3RK3 b - - 0 1");
    assert!(!can_take_king(&pos));
    // Hand the move to the side giving check
    pos.side_to_move = Color::White;
    assert!(can_take_king(&pos));
}
