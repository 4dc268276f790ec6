//! Pawn-structure cache, keyed on the pawn-only Zobrist key.
//!
//! Pawn structure changes far less often than the rest of the position, so
//! caching its evaluation term separately on `Position::pawn_key` gets a
//! much higher hit rate than folding it into the general [`super::EvalTable`].

#[derive(Debug, Clone, Copy)]
struct PawnEntry {
    pawn_key: u64,
    score: i32,
}

pub struct PawnTable {
    slots: Vec<Option<PawnEntry>>,
}

impl PawnTable {
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<PawnEntry>();
        let slot_count = ((size_mb * 1024 * 1024) / entry_size).max(1);
        Self {
            slots: vec![None; slot_count],
        }
    }

    fn index(&self, pawn_key: u64) -> usize {
        (pawn_key % self.slots.len() as u64) as usize
    }

    pub fn probe(&self, pawn_key: u64) -> Option<i32> {
        match self.slots[self.index(pawn_key)] {
            Some(entry) if entry.pawn_key == pawn_key => Some(entry.score),
            _ => None,
        }
    }

    pub fn store(&mut self, pawn_key: u64, score: i32) {
        let idx = self.index(pawn_key);
        self.slots[idx] = Some(PawnEntry { pawn_key, score });
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_probe_round_trips() {
        let mut table = PawnTable::new(1);
        table.store(17, 23);
        assert_eq!(table.probe(17), Some(23));
    }

    #[test]
    fn probe_miss_on_key_collision_returns_none() {
        let mut table = PawnTable::new(1);
        let slots = table.slots.len() as u64;
        table.store(4, 1);
        assert_eq!(table.probe(4 + slots), None);
    }
}
