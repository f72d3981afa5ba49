//! Lockless transposition table shared between search threads.
//!
//! Every slot holds two words: the packed entry and the position key XOR the
//! packed entry. A probe recomputes the key from both words, so a slot torn
//! by a concurrent store fails verification and reads as a miss instead of
//! returning another position's data. Four slots share one cache line.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use chess_core::{Move, PieceKind};
use tracing::debug;

use crate::aligned::{CacheLine, alloc_cache_lines};

pub const SLOTS_PER_LINE: usize = 4;
const MIN_LOG2_ENTRIES: u32 = 2;
const MAX_LOG2_ENTRIES: u32 = 30;
const SLOT_BYTES: usize = 16;

/// Never zero for a stored entry.
const SENTINEL: u64 = 1 << 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Score is at least this value (fail high)
    Lower,
    /// Score is at most this value (fail low)
    Upper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtEntry {
    pub best_move: Move,
    pub score: i32,
    pub depth: i32,
    pub bound: Bound,
    pub generation: u8,
}

impl TtEntry {
    fn pack(&self) -> u64 {
        let promo = match self.best_move.promo {
            None => 0,
            Some(PieceKind::Knight) => 1,
            Some(PieceKind::Bishop) => 2,
            Some(PieceKind::Rook) => 3,
            Some(_) => 4,
        };
        let bound = match self.bound {
            Bound::Exact => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
        };
        let score = self.score.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16;
        (self.best_move.from as u64 & 0x3f)
            | (self.best_move.to as u64 & 0x3f) << 6
            | promo << 12
            | (score as u64) << 16
            | (self.depth.clamp(0, 255) as u64) << 32
            | bound << 40
            | (self.generation as u64) << 48
            | SENTINEL
    }

    fn unpack(data: u64) -> Self {
        let promo = match (data >> 12) & 0x7 {
            1 => Some(PieceKind::Knight),
            2 => Some(PieceKind::Bishop),
            3 => Some(PieceKind::Rook),
            4 => Some(PieceKind::Queen),
            _ => None,
        };
        let bound = match (data >> 40) & 0x3 {
            0 => Bound::Exact,
            1 => Bound::Lower,
            _ => Bound::Upper,
        };
        TtEntry {
            best_move: Move {
                from: (data & 0x3f) as u8,
                to: ((data >> 6) & 0x3f) as u8,
                promo,
            },
            score: ((data >> 16) & 0xffff) as u16 as i16 as i32,
            depth: ((data >> 32) & 0xff) as i32,
            bound,
            generation: ((data >> 48) & 0xff) as u8,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    key: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    /// Packed data if the slot holds `hash`.
    #[inline]
    fn load(&self, hash: u64) -> Option<u64> {
        let data = self.data.load(Ordering::Relaxed);
        let key = self.key.load(Ordering::Relaxed);
        (data != 0 && key ^ data == hash).then_some(data)
    }

    #[inline]
    fn store(&self, hash: u64, data: u64) {
        self.key.store(hash ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.key.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

pub struct TranspositionTable {
    lines: Box<[CacheLine<[Slot; SLOTS_PER_LINE]>]>,
    mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Table with `2^log2_entries` entries (at least one cache line).
    pub fn new(log2_entries: u32) -> Self {
        let log2 = log2_entries.clamp(MIN_LOG2_ENTRIES, MAX_LOG2_ENTRIES);
        let line_count = (1usize << log2) / SLOTS_PER_LINE;
        debug!(entries = 1usize << log2, "allocating transposition table");
        TranspositionTable {
            lines: alloc_cache_lines(line_count),
            mask: line_count - 1,
            generation: AtomicU8::new(0),
        }
    }

    /// Largest power-of-two entry count fitting in `megabytes`.
    pub fn log2_for_megabytes(megabytes: usize) -> u32 {
        let entries = (megabytes.clamp(1, 1 << 20) << 20) / SLOT_BYTES;
        (usize::BITS - 1 - entries.leading_zeros()).clamp(MIN_LOG2_ENTRIES, MAX_LOG2_ENTRIES)
    }

    pub fn entries(&self) -> usize {
        self.lines.len() * SLOTS_PER_LINE
    }

    #[inline]
    fn line(&self, hash: u64) -> &[Slot; SLOTS_PER_LINE] {
        &self.lines[(hash as usize) & self.mask]
    }

    pub fn clear(&self) {
        for line in self.lines.iter() {
            for slot in line.iter() {
                slot.clear();
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Age existing entries so the next search prefers to overwrite them.
    pub fn new_search(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn probe(&self, hash: u64) -> Option<TtEntry> {
        self.line(hash)
            .iter()
            .find_map(|slot| slot.load(hash))
            .map(TtEntry::unpack)
    }

    /// Store a search result. Overwrites the slot already holding `hash`,
    /// else an empty slot, else the shallowest entry with older entries
    /// preferred. A result without a best move keeps the stored one.
    pub fn store(&self, hash: u64, best_move: Move, score: i32, depth: i32, bound: Bound) {
        let generation = self.generation();
        let mut entry = TtEntry {
            best_move,
            score,
            depth,
            bound,
            generation,
        };
        let line = self.line(hash);

        let mut victim = 0;
        let mut victim_value = i32::MAX;
        for (i, slot) in line.iter().enumerate() {
            if let Some(old) = slot.load(hash) {
                if best_move.is_none() {
                    entry.best_move = TtEntry::unpack(old).best_move;
                }
                victim = i;
                break;
            }
            let data = slot.data.load(Ordering::Relaxed);
            let value = if data == 0 {
                i32::MIN
            } else {
                let old = TtEntry::unpack(data);
                let stale = if old.generation == generation { 0 } else { 256 };
                old.depth - stale
            };
            if value < victim_value {
                victim = i;
                victim_value = value;
            }
        }
        line[victim].store(hash, entry.pack());
    }

    /// Permille of sampled entries written during the current search.
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation();
        let sample = self.lines.iter().take(1000 / SLOTS_PER_LINE);
        let mut total = 0u32;
        let mut used = 0u32;
        for line in sample {
            for slot in line.iter() {
                total += 1;
                let data = slot.data.load(Ordering::Relaxed);
                if data != 0 && TtEntry::unpack(data).generation == generation {
                    used += 1;
                }
            }
        }
        if total == 0 { 0 } else { used * 1000 / total }
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("entries", &self.entries())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
#[path = "tt_tests.rs"]
mod tt_tests;
