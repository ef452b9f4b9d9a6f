//! Mutable symbol sequence with O(1) neighbor access across dead cells.
//!
//! Replacing a pair kills the pair's second cell. Every maximal run of dead
//! cells stores its length in its first and last cell (dead cells no longer
//! hold a symbol, so the storage is free), and liveness is a bitmap packed
//! into `u64` words. Finding the next or previous live neighbor is a
//! word-level bit scan, with the cached run length as the fallback when the
//! adjacent word is entirely dead.

use crate::symbol::{Pair, Symbol};

#[derive(Debug)]
pub(crate) struct SkippableText {
    /// Live cells hold a symbol; the first and last cell of a dead run hold
    /// the run length.
    cells: Vec<u32>,
    /// One bit per cell, set while the cell is live. LSB-first within words.
    live: Vec<u64>,
    n: usize,
    live_cells: usize,
    max_symbol: Symbol,
}

impl SkippableText {
    /// Creates a text of `n` live cells, all holding symbol 0.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "text must be non-empty");

        let words = n.div_ceil(64);
        let mut live = vec![!0u64; words];
        if n % 64 != 0 {
            live[words - 1] = (1u64 << (n % 64)) - 1;
        }

        Self {
            cells: vec![0; n],
            live,
            n,
            live_cells: n,
            max_symbol: 0,
        }
    }

    /// Total length including dead cells.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Number of cells still holding a symbol. Strictly decreasing across
    /// replacements.
    pub fn live_len(&self) -> usize {
        self.live_cells
    }

    /// Largest symbol ever written, terminals and non-terminals alike.
    pub fn max_symbol(&self) -> Symbol {
        self.max_symbol
    }

    pub fn is_live(&self, i: usize) -> bool {
        debug_assert!(i < self.n);
        self.live[i / 64] >> (i % 64) & 1 == 1
    }

    /// Writes symbol `c` into the live cell `i`.
    pub fn set(&mut self, i: usize, c: Symbol) {
        debug_assert!(self.is_live(i));
        debug_assert!(c != u32::MAX);
        self.cells[i] = c;
        if c > self.max_symbol {
            self.max_symbol = c;
        }
    }

    /// The symbol at cell `i`, or `None` if the cell is dead.
    pub fn symbol_at(&self, i: usize) -> Option<Symbol> {
        self.is_live(i).then(|| self.cells[i])
    }

    /// Least live index greater than `i`, for live `i`.
    pub fn next_live(&self, i: usize) -> Option<usize> {
        debug_assert!(self.is_live(i));
        if i + 1 == self.n {
            return None;
        }

        let j = i + 1;
        let (w, b) = (j / 64, j % 64);

        // Rest of the current word.
        let masked = self.live[w] >> b << b;
        if masked != 0 {
            return Some(w * 64 + masked.trailing_zeros() as usize);
        }
        // Adjacent word.
        if w + 1 < self.live.len() && self.live[w + 1] != 0 {
            return Some((w + 1) * 64 + self.live[w + 1].trailing_zeros() as usize);
        }
        // The run spans at least one full word: jump by its cached length.
        debug_assert!(!self.is_live(j));
        let k = i + self.cells[j] as usize + 1;
        (k < self.n).then_some(k)
    }

    /// Greatest live index smaller than `i`, for live `i`.
    pub fn prev_live(&self, i: usize) -> Option<usize> {
        debug_assert!(self.is_live(i));
        if i == 0 {
            return None;
        }

        let j = i - 1;
        let (w, b) = (j / 64, j % 64);

        let masked = self.live[w] << (63 - b) >> (63 - b);
        if masked != 0 {
            return Some(w * 64 + 63 - masked.leading_zeros() as usize);
        }
        if w > 0 && self.live[w - 1] != 0 {
            return Some((w - 1) * 64 + 63 - self.live[w - 1].leading_zeros() as usize);
        }
        // Cell 0 is never dead, so a fully dead prefix cannot occur.
        debug_assert!(!self.is_live(j));
        let len = self.cells[j] as usize;
        debug_assert!(i > len);
        Some(i - len - 1)
    }

    /// The pair starting at `i`: `(T[i], T[next_live(i)])`.
    ///
    /// `None` if `i` is dead or has no live successor.
    pub fn pair_at(&self, i: usize) -> Option<Pair> {
        if !self.is_live(i) {
            return None;
        }
        let j = self.next_live(i)?;
        Some(Pair::new(self.cells[i], self.cells[j]))
    }

    /// The pair following the pair starting at `i`.
    pub fn next_pair(&self, i: usize) -> Option<Pair> {
        debug_assert!(self.is_live(i));
        let j = self.next_live(i)?;
        self.pair_at(j)
    }

    /// The pair ending at `i`: `(T[prev_live(i)], T[i])`.
    pub fn pair_ending_at(&self, i: usize) -> Option<Pair> {
        if !self.is_live(i) {
            return None;
        }
        let j = self.prev_live(i)?;
        Some(Pair::new(self.cells[j], self.cells[i]))
    }

    /// Replaces the pair starting at live cell `i` with symbol `x`: writes
    /// `x` at `i`, kills the pair's second cell, and merges the resulting
    /// dead run with any dead neighbors by rewriting the run length at both
    /// endpoints.
    ///
    /// Panics if `i` has no live successor.
    pub fn replace(&mut self, i: usize, x: Symbol) {
        debug_assert!(self.is_live(i));
        let j = self
            .next_live(i)
            .expect("replace: pair has no second cell");

        // Dead run already sitting between i and j, plus the one after j.
        let gap = j - i - 1;
        let tail = if j + 1 < self.n && !self.is_live(j + 1) {
            self.cells[j + 1] as usize
        } else {
            0
        };

        self.live[j / 64] &= !(1u64 << (j % 64));
        debug_assert!(self.live_cells > 0);
        self.live_cells -= 1;

        let run = gap + tail + 1;
        self.cells[i + 1] = run as u32;
        self.cells[i + run] = run as u32;

        self.cells[i] = x;
        if x > self.max_symbol {
            self.max_symbol = x;
        }
    }
}
