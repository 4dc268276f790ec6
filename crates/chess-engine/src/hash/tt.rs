//! Transposition table: caches search results keyed by Zobrist hash.

use chess_core::Move;

/// What kind of bound a stored score represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Exact score (principal variation node).
    Exact,
    /// Score is a lower bound (search failed high, score >= beta).
    Lower,
    /// Score is an upper bound (search failed low, score <= alpha).
    Upper,
}

/// A single transposition table slot.
#[derive(Debug, Clone, Copy)]
pub struct TtEntry {
    pub key: u64,
    pub depth: u8,
    pub bound: Bound,
    /// Score relative to this node, not the search root. See
    /// [`super::score_to_tt`] / [`super::score_from_tt`].
    pub score: i32,
    pub best_move: Move,
    pub generation: u8,
}

/// Fixed-size, single-slot transposition table.
///
/// Replacement policy: a probe that collides with an occupied slot
/// overwrites it unless the existing entry is both deeper and from the
/// current search generation, in which case the deeper entry is kept. This
/// favors replacing stale entries from past searches over discarding
/// work already done in the current one.
pub struct TranspositionTable {
    slots: Vec<Option<TtEntry>>,
    generation: u8,
}

impl TranspositionTable {
    /// Builds a table sized to hold roughly `size_mb` megabytes of entries.
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TtEntry>();
        let slot_count = ((size_mb * 1024 * 1024) / entry_size).max(1);
        Self {
            slots: vec![None; slot_count],
            generation: 0,
        }
    }

    fn index(&self, key: u64) -> usize {
        (key % self.slots.len() as u64) as usize
    }

    pub fn probe(&self, key: u64) -> Option<TtEntry> {
        let entry = self.slots[self.index(key)]?;
        if entry.key == key {
            Some(entry)
        } else {
            None
        }
    }

    pub fn store(&mut self, key: u64, depth: u8, bound: Bound, score: i32, best_move: Move) {
        let idx = self.index(key);
        if let Some(existing) = self.slots[idx] {
            let same_search = existing.generation == self.generation;
            if same_search && existing.depth > depth && existing.key == key {
                return;
            }
        }
        self.slots[idx] = Some(TtEntry {
            key,
            depth,
            bound,
            score,
            best_move,
            generation: self.generation,
        });
    }

    /// Marks the start of a new search; used as a tiebreaker in the
    /// replacement policy so old searches' entries don't block new ones.
    pub fn new_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.generation = 0;
    }

    /// Approximate permille of slots filled by the current generation, for
    /// UCI `hashfull` reporting.
    pub fn hashfull_permille(&self) -> u32 {
        let sample = self.slots.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let filled = self.slots[..sample]
            .iter()
            .filter(|s| matches!(s, Some(e) if e.generation == self.generation))
            .count();
        (filled * 1000 / sample) as u32
    }
}
