//! High-frequency pair queue.
//!
//! Pairs at or above the cut-off frequency live in an arena, addressed by an
//! `ahash` map from pair to arena slot. With the cut-off at `F*`, at most
//! `n / F*` records exist at once, so the linear scan in `max` stays cheap
//! relative to the replacements each round performs.

use ahash::AHashMap as HashMap;

use crate::arena::Arena;
use crate::queue::{Entry, PairQueue, Record};
use crate::symbol::Pair;

#[derive(Debug)]
pub(crate) struct HfQueue {
    entries: Arena<Entry>,
    index: HashMap<Pair, u32>,
    min_freq: u32,
    peak: usize,
}

impl HfQueue {
    pub fn new(min_freq: u32, capacity_hint: usize) -> Self {
        debug_assert!(min_freq > 1);
        Self {
            entries: Arena::new(),
            index: HashMap::with_capacity(capacity_hint),
            min_freq,
            peak: 0,
        }
    }

    /// Largest number of records held at any point.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Re-packs the arena and refreshes every hash entry, since compaction
    /// re-assigns slot indices.
    fn compact(&mut self) {
        self.entries.compact();
        for (slot, entry) in self.entries.iter() {
            *self
                .index
                .get_mut(&entry.pair)
                .expect("hf queue: arena and hash out of sync") = slot;
        }
    }
}

impl PairQueue for HfQueue {
    fn min_frequency(&self) -> u32 {
        self.min_freq
    }

    fn contains(&self, pair: Pair) -> bool {
        self.index.contains_key(&pair)
    }

    fn get(&self, pair: Pair) -> Option<Record> {
        self.index.get(&pair).map(|&slot| self.entries[slot].rec)
    }

    fn insert(&mut self, pair: Pair, rec: Record) {
        debug_assert!(!self.contains(pair), "hf queue: duplicate insert");
        debug_assert!(rec.freq >= self.min_freq);

        let slot = self.entries.insert(Entry { pair, rec });
        self.index.insert(pair, slot);
        self.peak = self.peak.max(self.entries.len());
    }

    fn update(&mut self, pair: Pair, rec: Record) {
        let slot = *self
            .index
            .get(&pair)
            .expect("hf queue: update of an absent pair");
        self.entries[slot].rec = rec;
    }

    fn decrement(&mut self, pair: Pair) {
        let slot = *self
            .index
            .get(&pair)
            .expect("hf queue: decrement of an absent pair");
        let freq = &mut self.entries[slot].rec.freq;
        debug_assert!(*freq > 0);
        *freq = freq.saturating_sub(1);
    }

    fn remove(&mut self, pair: Pair) {
        let slot = self
            .index
            .remove(&pair)
            .expect("hf queue: remove of an absent pair");
        self.entries.remove(slot);

        if self.entries.len() < self.entries.capacity() / 2 {
            self.compact();
        }
    }

    /// Linear scan over the stored records. Ties on frequency go to the
    /// lexicographically smaller pair, making the scan order irrelevant and
    /// the result deterministic.
    fn max(&mut self) -> Option<Pair> {
        let mut best: Option<(u32, Pair)> = None;
        for (_, entry) in self.entries.iter() {
            let better = match best {
                None => true,
                Some((freq, pair)) => {
                    entry.rec.freq > freq || (entry.rec.freq == freq && entry.pair < pair)
                }
            };
            if better {
                best = Some((entry.rec.freq, entry.pair));
            }
        }
        best.map(|(_, pair)| pair)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pos: u32, len: u32, freq: u32) -> Record {
        Record { pos, len, freq }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut q = HfQueue::new(2, 8);
        let p = Pair::new(1, 2);

        assert!(!q.contains(p));
        q.insert(p, rec(0, 5, 5));
        assert!(q.contains(p));
        assert_eq!(q.get(p), Some(rec(0, 5, 5)));

        q.remove(p);
        assert!(!q.contains(p));
        assert_eq!(q.get(p), None);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_max_returns_highest_frequency() {
        let mut q = HfQueue::new(2, 8);
        q.insert(Pair::new(1, 2), rec(0, 3, 3));
        q.insert(Pair::new(3, 4), rec(3, 9, 9));
        q.insert(Pair::new(5, 6), rec(12, 4, 4));

        assert_eq!(q.max(), Some(Pair::new(3, 4)));
    }

    #[test]
    fn test_max_tie_break_is_lexicographic() {
        let mut q = HfQueue::new(2, 8);
        q.insert(Pair::new(9, 0), rec(0, 4, 4));
        q.insert(Pair::new(2, 7), rec(4, 4, 4));
        q.insert(Pair::new(2, 5), rec(8, 4, 4));

        assert_eq!(q.max(), Some(Pair::new(2, 5)));
    }

    #[test]
    fn test_max_of_empty_queue() {
        let mut q = HfQueue::new(2, 8);
        assert_eq!(q.max(), None);
    }

    #[test]
    fn test_decrement_keeps_record() {
        let mut q = HfQueue::new(2, 8);
        let p = Pair::new(1, 2);
        q.insert(p, rec(0, 3, 3));

        q.decrement(p);
        q.decrement(p);
        // Dropping below the cut-off does not auto-remove.
        assert_eq!(q.get(p), Some(rec(0, 3, 1)));
        assert!(q.contains(p));
    }

    #[test]
    fn test_update_overwrites_record() {
        let mut q = HfQueue::new(2, 8);
        let p = Pair::new(4, 4);
        q.insert(p, rec(0, 10, 8));
        q.update(p, rec(20, 6, 6));
        assert_eq!(q.get(p), Some(rec(20, 6, 6)));
    }

    #[test]
    fn test_compaction_keeps_hash_consistent() {
        let mut q = HfQueue::new(2, 32);
        let pairs: Vec<Pair> = (0..20).map(|i| Pair::new(i, i + 1)).collect();
        for (i, &p) in pairs.iter().enumerate() {
            q.insert(p, rec(i as u32 * 4, 4, 4));
        }
        // Removing most entries crosses the half-capacity threshold and
        // forces compaction; the survivors must still resolve.
        for &p in &pairs[..16] {
            q.remove(p);
        }
        for (i, &p) in pairs.iter().enumerate().skip(16) {
            assert_eq!(q.get(p), Some(rec(i as u32 * 4, 4, 4)));
        }
        assert_eq!(q.peak(), 20);
    }
}
