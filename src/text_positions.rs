//! Text-position index: a vector of text positions that can be clustered
//! (counting-sorted in place) by the pair currently starting at each
//! position.
//!
//! Construction keeps only positions whose initial byte pair reaches the
//! cut-off frequency, already grouped by pair. Later clusterings operate on
//! arbitrary subranges; positions whose pair has since died land in a tail
//! bucket.

use crate::symbol::Pair;
use crate::text::SkippableText;

#[derive(Debug)]
pub(crate) struct TextPositions {
    tp: Vec<u32>,
    /// Flat `maxd x maxd` table of `(write_begin, write_cursor)`, all zeros
    /// between clusterings.
    buckets: Vec<(u32, u32)>,
    maxd: usize,
}

impl TextPositions {
    /// Builds the index over a fresh (blank-free) text, keeping exactly the
    /// positions whose byte pair occurs at least `min_freq` times, grouped
    /// by pair.
    pub fn new(text: &SkippableText, min_freq: usize) -> Self {
        let n = text.len();
        // The sort-acceleration table covers symbols up to max(256, n^0.4);
        // beyond that, cluster() falls back to a comparison sort.
        let maxd = 256.max((n as f64).powf(0.4) as usize);

        // Initial symbols are remapped bytes, so a 256 x 256 histogram
        // suffices here regardless of maxd.
        let mut counts = vec![0u32; 256 * 256];
        for i in 0..n.saturating_sub(1) {
            let p = text.pair_at(i).expect("fresh text has no dead cells");
            counts[(p.left as usize) << 8 | p.right as usize] += 1;
        }

        // Turn qualifying counts into running offsets; u32::MAX marks pairs
        // below the cut-off.
        let mut total = 0u32;
        for c in counts.iter_mut() {
            if (*c as usize) < min_freq {
                *c = u32::MAX;
            } else {
                let freq = *c;
                *c = total;
                total += freq;
            }
        }

        let mut tp = vec![0u32; total as usize];
        for i in 0..n.saturating_sub(1) {
            let p = text.pair_at(i).expect("fresh text has no dead cells");
            let slot = &mut counts[(p.left as usize) << 8 | p.right as usize];
            if *slot != u32::MAX {
                tp[*slot as usize] = i as u32;
                *slot += 1;
            }
        }

        Self {
            tp,
            buckets: vec![(0, 0); maxd * maxd],
            maxd,
        }
    }

    /// Discards the current content and stores every text position
    /// `0..n` in order (Phase 2 setup). Does not sort.
    pub fn fill_with_text_positions(&mut self, n: usize) {
        self.tp.clear();
        self.tp.extend(0..n as u32);
    }

    pub fn len(&self) -> usize {
        self.tp.len()
    }

    /// Clusters `tp[lo..hi)` by the pair currently starting at each stored
    /// position: equal pairs become contiguous and positions with no live
    /// pair move to the tail.
    pub fn cluster(&mut self, text: &SkippableText, lo: usize, hi: usize) {
        debug_assert!(lo <= hi && hi <= self.tp.len());
        if hi - lo < 2 {
            return;
        }
        if text.max_symbol() as usize >= self.maxd {
            self.cluster_by_comparison(text, lo, hi);
            return;
        }

        let maxd = self.maxd;
        let slot = |p: Pair| p.left as usize * maxd + p.right as usize;

        // Pass 1: count, flagging the first sighting of each distinct pair.
        let mut first_seen = vec![false; hi - lo];
        for k in lo..hi {
            if let Some(p) = text.pair_at(self.tp[k] as usize) {
                let h = slot(p);
                first_seen[k - lo] = self.buckets[h].0 == 0;
                self.buckets[h].0 += 1;
            }
        }

        // Pass 2: cumulate counts into (begin, cursor) per bucket.
        let mut t = lo as u32;
        for k in lo..hi {
            if first_seen[k - lo] {
                let p = text.pair_at(self.tp[k] as usize).unwrap();
                let h = slot(p);
                let count = self.buckets[h].0;
                self.buckets[h] = (t, t);
                t += count;
            }
        }
        for f in first_seen.iter_mut() {
            *f = false;
        }

        // Dead-pair positions go after every real bucket.
        let stale_begin = t;
        let mut stale_cursor = t;

        // Pass 3: in-place permutation. Invariant: tp[lo..k) is clustered.
        let mut k = lo;
        while k < hi {
            let p = text.pair_at(self.tp[k] as usize);
            let (begin, cursor) = match p {
                Some(p) => self.buckets[slot(p)],
                None => (stale_begin, stale_cursor),
            };

            if (begin..=cursor).contains(&(k as u32)) {
                // Already inside its bucket; re-flag bucket heads for the
                // restore pass.
                if p.is_some() {
                    first_seen[k - lo] = k as u32 == begin;
                }
                k += 1;
                if cursor == k as u32 {
                    match p {
                        Some(p) => self.buckets[slot(p)].1 += 1,
                        None => stale_cursor += 1,
                    }
                }
            } else {
                self.tp.swap(k, cursor as usize);
                match p {
                    Some(p) => self.buckets[slot(p)].1 += 1,
                    None => stale_cursor += 1,
                }
            }
        }

        // Pass 4: restore the table to all-zero for the next clustering.
        for k in lo..hi {
            if first_seen[k - lo] {
                let p = text.pair_at(self.tp[k] as usize).unwrap();
                self.buckets[slot(p)] = (0, 0);
            }
        }
    }

    /// Comparison-sort fallback for symbol ranges the bucket table cannot
    /// cover. Key order still groups equal pairs and sends dead positions to
    /// the tail.
    fn cluster_by_comparison(&mut self, text: &SkippableText, lo: usize, hi: usize) {
        self.tp[lo..hi].sort_unstable_by_key(|&pos| match text.pair_at(pos as usize) {
            Some(p) => (p.left as u64) << 32 | p.right as u64,
            None => u64::MAX,
        });
    }
}

impl std::ops::Index<usize> for TextPositions {
    type Output = u32;

    fn index(&self, k: usize) -> &u32 {
        &self.tp[k]
    }
}
