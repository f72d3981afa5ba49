use super::*;

#[test]
fn test_from_square() {
    assert_eq!(Bitboard::from_square(0).0, 1); // a1
    assert_eq!(Bitboard::from_square(7).0, 128); // h1
    assert_eq!(Bitboard::from_square(63).0, 1 << 63); // h8
}

#[test]
fn test_popcount_and_masks() {
    assert_eq!(Bitboard::EMPTY.popcount(), 0);
    assert_eq!(Bitboard::FILE_A.popcount(), 8);
    assert_eq!(Bitboard::RANK_7.popcount(), 8);
    assert_eq!(Bitboard::ALL.popcount(), 64);
    assert_eq!((Bitboard::NOT_FILE_GH).popcount(), 48);
    assert_eq!(Bitboard::NOT_FILE_A & Bitboard::FILE_A, Bitboard::EMPTY);
}

#[test]
fn test_lsb_msb() {
    let bb = Bitboard::from_square(3) | Bitboard::from_square(41);
    assert_eq!(bb.lsb(), Some(3));
    assert_eq!(bb.msb(), Some(41));
    assert_eq!(Bitboard::EMPTY.lsb(), None);
    assert_eq!(Bitboard::EMPTY.msb(), None);
}

#[test]
fn test_more_than_one() {
    assert!(!Bitboard::EMPTY.more_than_one());
    assert!(!Bitboard::from_square(17).more_than_one());
    assert!((Bitboard::from_square(17) | Bitboard::from_square(18)).more_than_one());
}

#[test]
fn test_iterator() {
    let bb = Bitboard(0b1010);
    let squares: Vec<u8> = bb.collect();
    assert_eq!(squares, vec![1, 3]);
}

#[test]
fn test_shifts() {
    let a1 = Bitboard::from_square(0);
    assert_eq!(a1.north(), Bitboard::from_square(8));
    assert_eq!(a1.east(), Bitboard::from_square(1));
    assert_eq!(a1.west(), Bitboard::EMPTY);

    let h1 = Bitboard::from_square(7);
    assert_eq!(h1.east(), Bitboard::EMPTY);
    assert_eq!(h1.west(), Bitboard::from_square(6));

    let e4 = Bitboard::from_square(28);
    assert_eq!(e4.shift(8), Bitboard::from_square(36));
    assert_eq!(e4.shift(-8), Bitboard::from_square(20));
    assert_eq!(e4.shift(-9), Bitboard::from_square(19));
}

#[test]
fn test_display_diagram() {
    let text = Bitboard::from_square(0).to_string();
    let last = text.lines().last().unwrap();
    assert_eq!(last, "x.......");
}
