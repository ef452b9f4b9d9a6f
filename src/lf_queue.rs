//! Low-frequency pair queue.
//!
//! Below the cut-off, frequencies fit a dense table: one arena-backed list
//! per frequency, a hash from pair to `(frequency, slot)`, and a
//! high-watermark over the non-empty lists. `max` walks the watermark down
//! to the highest occupied list and returns its head; decrements re-home a
//! pair into the next list down and drop it once its frequency falls
//! below 2.

use ahash::AHashMap as HashMap;

use crate::arena::Arena;
use crate::queue::{Entry, PairQueue, Record};
use crate::symbol::Pair;

#[derive(Debug)]
pub(crate) struct LfQueue {
    /// `lists[f]` holds every pair whose current frequency is `f`; only
    /// indices `2..=max_freq` are ever occupied.
    lists: Vec<Arena<Entry>>,
    index: HashMap<Pair, (u32, u32)>,
    /// Upper bound on the highest non-empty list.
    watermark: u32,
    len: usize,
    peak: usize,
}

impl LfQueue {
    /// Queue for frequencies in `[2, max_freq]`.
    pub fn new(max_freq: u32) -> Self {
        debug_assert!(max_freq >= 1);
        Self {
            lists: (0..=max_freq).map(|_| Arena::new()).collect(),
            index: HashMap::new(),
            watermark: max_freq,
            len: 0,
            peak: 0,
        }
    }

    /// Largest number of records held at any point.
    pub fn peak(&self) -> usize {
        self.peak
    }

    fn compact_list(&mut self, freq: u32) {
        let list = &mut self.lists[freq as usize];
        list.compact();
        for (slot, entry) in list.iter() {
            *self
                .index
                .get_mut(&entry.pair)
                .expect("lf queue: list and hash out of sync") = (freq, slot);
        }
    }

    fn insert_at(&mut self, pair: Pair, rec: Record) {
        let freq = rec.freq;
        let slot = self.lists[freq as usize].insert(Entry { pair, rec });
        self.index.insert(pair, (freq, slot));
        if freq > self.watermark {
            self.watermark = freq;
        }
        self.len += 1;
        self.peak = self.peak.max(self.len);
    }
}

impl PairQueue for LfQueue {
    fn min_frequency(&self) -> u32 {
        2
    }

    fn contains(&self, pair: Pair) -> bool {
        self.index.contains_key(&pair)
    }

    fn get(&self, pair: Pair) -> Option<Record> {
        self.index
            .get(&pair)
            .map(|&(freq, slot)| self.lists[freq as usize][slot].rec)
    }

    /// Inserts an absent pair into the list of its frequency.
    ///
    /// A pair whose occurrences were split across Phase-1 slices can reach
    /// this queue with an aggregate frequency at or above the cut-off; the
    /// stored frequency is clamped to the top list so it is processed
    /// first. Replacement re-checks every position, so the clamp cannot
    /// corrupt the output.
    fn insert(&mut self, pair: Pair, mut rec: Record) {
        debug_assert!(!self.contains(pair), "lf queue: duplicate insert");
        debug_assert!(rec.freq >= 2);

        let top = (self.lists.len() - 1) as u32;
        if rec.freq > top {
            rec.freq = top;
        }
        self.insert_at(pair, rec);
    }

    /// Re-homes the pair when the measured frequency changed, otherwise
    /// rewrites the record in place.
    fn update(&mut self, pair: Pair, rec: Record) {
        let (freq, slot) = *self
            .index
            .get(&pair)
            .expect("lf queue: update of an absent pair");
        if rec.freq == freq {
            self.lists[freq as usize][slot].rec = rec;
        } else {
            self.remove(pair);
            let mut rec = rec;
            let top = (self.lists.len() - 1) as u32;
            if rec.freq > top {
                rec.freq = top;
            }
            self.insert_at(pair, rec);
        }
    }

    /// Moves the pair one list down; a pair reaching frequency 1 is dropped
    /// entirely.
    fn decrement(&mut self, pair: Pair) {
        let (freq, slot) = *self
            .index
            .get(&pair)
            .expect("lf queue: decrement of an absent pair");
        debug_assert!(freq >= 2);

        let mut entry = self.lists[freq as usize][slot];
        self.remove(pair);

        entry.rec.freq = freq - 1;
        if entry.rec.freq < 2 {
            return;
        }
        self.insert_at(pair, entry.rec);
    }

    fn remove(&mut self, pair: Pair) {
        let (freq, slot) = self
            .index
            .remove(&pair)
            .expect("lf queue: remove of an absent pair");
        let list = &mut self.lists[freq as usize];
        list.remove(slot);
        self.len -= 1;

        if list.len() < list.capacity() / 2 {
            self.compact_list(freq);
        }
    }

    /// Head of the highest non-empty frequency list: among equal
    /// frequencies, the most recently inserted pair. Amortized O(1); the
    /// watermark only walks down between insertions above it.
    fn max(&mut self) -> Option<Pair> {
        if self.len == 0 {
            return None;
        }
        while self.watermark > 1 && self.lists[self.watermark as usize].is_empty() {
            self.watermark -= 1;
        }
        let list = &self.lists[self.watermark as usize];
        let head = list.head().expect("lf queue: watermark missed all entries");
        Some(list[head].pair)
    }

    fn len(&self) -> usize {
        self.len
    }
}
