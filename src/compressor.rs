//! The replacement driver: Re-Pair compression over the skippable text.
//!
//! Phase 1 replaces pairs whose frequency reaches the cut-off
//! `F* = max(2, floor(n^0.66))` through the high-frequency queue; Phase 2
//! refills the position index with every text position and drains the
//! remaining pairs (frequency in `[2, F*)`) through the low-frequency
//! queue. Both phases run the same substitution round: pick the max pair,
//! replace every occurrence in its TP slice, eagerly decrement the pairs
//! destroyed at each occurrence's flanks, then re-cluster and refresh the
//! records the replacements touched.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::hf_queue::HfQueue;
use crate::lf_queue::LfQueue;
use crate::queue::{PairQueue, Record};
use crate::symbol::{Pair, Symbol};
use crate::text::SkippableText;
use crate::text_positions::TextPositions;

/// Exponent of the cut-off frequency separating the two phases.
const ALPHA: f64 = 0.66;

/// Largest supported input. Indices and symbols are `u32`, and fresh
/// non-terminals need headroom below the reserved `u32::MAX`.
pub(crate) const MAX_INPUT_LEN: u64 = 1 << 31;

/// Pairs replaced at or above this frequency go through the
/// high-frequency queue.
fn cutoff(n: usize) -> u32 {
    ((n as f64).powf(ALPHA) as u32).max(2)
}

/// Compresses `input` into a straight-line grammar.
///
/// The returned grammar's alphabet lists the distinct input bytes in order
/// of first appearance; rules are emitted in creation order and reference
/// only earlier symbols; the sequence is the text that survives all
/// replacements.
pub fn compress(input: &[u8]) -> Result<Grammar> {
    if input.len() as u64 > MAX_INPUT_LEN {
        return Err(Error::TooLarge {
            size: input.len() as u64,
            max: MAX_INPUT_LEN,
        });
    }

    // Remap bytes to a dense terminal alphabet in first-appearance order.
    let mut alphabet = Vec::new();
    let mut byte_to_symbol = [u32::MAX; 256];
    for &b in input {
        if byte_to_symbol[b as usize] == u32::MAX {
            byte_to_symbol[b as usize] = alphabet.len() as Symbol;
            alphabet.push(b);
        }
    }
    let sigma = alphabet.len() as Symbol;

    if input.len() < 2 {
        return Ok(Grammar {
            alphabet,
            rules: Vec::new(),
            sequence: input.iter().map(|&b| byte_to_symbol[b as usize]).collect(),
        });
    }

    let n = input.len();
    let min_freq = cutoff(n);
    info!(
        "compressing {} bytes, alphabet size {}, cut-off frequency {}",
        n, sigma, min_freq
    );

    let mut text = SkippableText::new(n);
    for (i, &b) in input.iter().enumerate() {
        text.set(i, byte_to_symbol[b as usize]);
    }

    let tp = TextPositions::new(&text, min_freq as usize);
    debug!("{} text positions carry a high-frequency pair", tp.len());

    let mut engine = Engine {
        text,
        tp,
        rules: Vec::new(),
        next_symbol: sigma,
    };

    // Phase 1: high-frequency pairs.
    let mut hfq = HfQueue::new(min_freq, n / min_freq as usize + 1);
    engine.seed_high_frequency_queue(&mut hfq);
    debug!("{} distinct high-frequency pairs", hfq.len());

    let mut rounds = 0u64;
    while let Some(ab) = hfq.max() {
        engine.substitution_round(&mut hfq, ab);
        rounds += 1;
    }
    info!(
        "phase 1 done: {} rounds, {} live symbols, peak queue size {}",
        rounds,
        engine.text.live_len(),
        hfq.peak()
    );

    // Phase 2: every remaining position, low-frequency pairs.
    engine.tp.fill_with_text_positions(n);
    engine.tp.cluster(&engine.text, 0, n);

    let mut lfq = LfQueue::new(min_freq - 1);
    engine.seed_low_frequency_queue(&mut lfq);
    debug!("{} distinct low-frequency pairs", lfq.len());

    rounds = 0;
    while let Some(ab) = lfq.max() {
        engine.substitution_round(&mut lfq, ab);
        rounds += 1;
    }
    info!(
        "phase 2 done: {} rounds, {} live symbols, peak queue size {}",
        rounds,
        engine.text.live_len(),
        lfq.peak()
    );

    let sequence: Vec<Symbol> = (0..n).filter_map(|i| engine.text.symbol_at(i)).collect();
    info!(
        "grammar: {} rules, top text {} symbols",
        engine.rules.len(),
        sequence.len()
    );

    Ok(Grammar {
        alphabet,
        rules: engine.rules,
        sequence,
    })
}

/// Mutable state threaded through the substitution rounds. The engine owns
/// the text, the position index, and the grammar being emitted; the queues
/// are passed in because the two phases use different ones.
struct Engine {
    text: SkippableText,
    tp: TextPositions,
    rules: Vec<Pair>,
    next_symbol: Symbol,
}

impl Engine {
    /// Seeds the high-frequency queue from the freshly built position
    /// index: each maximal run of one pair becomes one record.
    fn seed_high_frequency_queue(&mut self, q: &mut HfQueue) {
        let m = self.tp.len();
        let min_freq = q.min_frequency();
        let mut j = 0;
        while j < m {
            let start = j;
            let pair = self.text.pair_at(self.tp[j] as usize);
            let mut k = 1u32;
            while j + 1 < m
                && pair.is_some()
                && pair == self.text.pair_at(self.tp[j + 1] as usize)
            {
                j += 1;
                k += 1;
            }
            if let Some(pair) = pair {
                if k >= min_freq {
                    q.insert(
                        pair,
                        Record {
                            pos: start as u32,
                            len: k,
                            freq: k,
                        },
                    );
                }
            }
            j += 1;
        }
    }

    /// Seeds the low-frequency queue after the Phase-2 global clustering:
    /// every run of length at least 2 becomes one record.
    fn seed_low_frequency_queue(&mut self, q: &mut LfQueue) {
        let m = self.tp.len();
        let mut j = 0;
        while j < m {
            let start = j;
            let pair = self.text.pair_at(self.tp[j] as usize);
            let mut k = 1u32;
            while j + 1 < m
                && pair.is_some()
                && pair == self.text.pair_at(self.tp[j + 1] as usize)
            {
                j += 1;
                k += 1;
            }
            if let Some(pair) = pair {
                if k >= 2 {
                    q.insert(
                        pair,
                        Record {
                            pos: start as u32,
                            len: k,
                            freq: k,
                        },
                    );
                }
            }
            j += 1;
        }
    }

    /// One substitution round for the queue's current max pair `ab`: emit a
    /// rule, replace every occurrence in `ab`'s TP slice, propagate
    /// frequency changes, and synchronize what the replacements disturbed.
    fn substitution_round<Q: PairQueue>(&mut self, q: &mut Q, ab: Pair) {
        let rec = q.get(ab).expect("round started for an absent pair");
        let (pos, len) = (rec.pos as usize, rec.len as usize);

        let x = self.next_symbol;
        debug_assert!(x < u32::MAX, "symbol space exhausted");
        self.rules.push(ab);

        let (a, b) = (ab.left, ab.right);

        // Replace pass. Each surviving occurrence of ab becomes x; the
        // pairs destroyed at its flanks lose one occurrence each.
        for j in pos..pos + len {
            let i = self.tp[j] as usize;
            if self.text.pair_at(i) != Some(ab) {
                continue;
            }

            let left_ctx = self.text.pair_ending_at(i); // xA
            let right_ctx = self.text.next_pair(i); // By
            self.text.replace(i, x);

            if let Some(xa) = left_ctx {
                if xa != ab && q.contains(xa) {
                    q.decrement(xa);
                }
            }
            if let Some(by) = right_ctx {
                if by != ab && q.contains(by) {
                    q.decrement(by);
                }
            }
        }

        // Repair pass. Each position now holding x names up to two
        // destroyed pairs whose records may be diluted enough to need a
        // synchronization (or to be dropped). When the neighbor is itself
        // x, the destroyed context ran ...ABAB..., so the vanished symbol
        // is the other half of ab.
        for j in pos..pos + len {
            let i = self.tp[j] as usize;
            if self.text.symbol_at(i) != Some(x) {
                continue;
            }

            let left_ctx = self.text.pair_ending_at(i); // xX
            let right_ctx = self.text.pair_at(i); // Xy

            if let Some(xy) = right_ctx {
                let y = if xy.right == x { a } else { xy.right };
                let by = Pair::new(b, y);
                if by != ab && q.contains(by) {
                    self.sync_or_drop(q, by);
                }
            }
            if let Some(xx) = left_ctx {
                let left = if xx.left == x { b } else { xx.left };
                let xa = Pair::new(left, a);
                if xa != ab && q.contains(xa) {
                    self.sync_or_drop(q, xa);
                }
            }
        }

        // ab's live frequency is now 0, so this removes it.
        self.synchronize(q, ab);
        debug_assert!(!q.contains(ab));

        self.next_symbol += 1;
    }

    /// Re-clusters `pair`'s TP slice and refreshes the records of every
    /// pair found inside it: `pair` itself is updated (or removed when its
    /// measured frequency fell below the queue minimum); other pairs
    /// meeting the minimum are inserted if absent.
    fn synchronize<Q: PairQueue>(&mut self, q: &mut Q, pair: Pair) {
        let rec = q.get(pair).expect("synchronize of an absent pair");
        let (lo, hi) = (rec.pos as usize, (rec.pos + rec.len) as usize);

        self.tp.cluster(&self.text, lo, hi);

        let mut measured = 0u32;
        let mut j = lo;
        while j < hi {
            let start = j;
            let run = self.text.pair_at(self.tp[j] as usize);
            let mut k = 1u32;
            while j + 1 < hi
                && run.is_some()
                && run == self.text.pair_at(self.tp[j + 1] as usize)
            {
                j += 1;
                k += 1;
            }

            if let Some(run) = run {
                if run == pair {
                    measured = k;
                }
                if k >= q.min_frequency() {
                    let fresh = Record {
                        pos: start as u32,
                        len: k,
                        freq: k,
                    };
                    if run == pair {
                        q.update(pair, fresh);
                    } else if !q.contains(run) {
                        q.insert(run, fresh);
                    }
                }
            }
            j += 1;
        }

        if measured < q.min_frequency() {
            q.remove(pair);
        }
    }

    /// Decides what to do with a pair whose record just lost occurrences:
    /// a record diluted to half its slice gets synchronized (new pairs may
    /// hide in the slice); an undiluted record below the queue minimum is
    /// dropped; anything else is left alone.
    fn sync_or_drop<Q: PairQueue>(&mut self, q: &mut Q, pair: Pair) {
        let rec = q.get(pair).expect("sync_or_drop of an absent pair");
        if rec.freq <= rec.len / 2 {
            self.synchronize(q, pair);
        } else if rec.freq < q.min_frequency() {
            q.remove(pair);
        }
    }
}
