//! # Re-Pair grammar compression
//!
//! Re-Pair repeatedly replaces the most frequent pair of adjacent symbols
//! with a fresh non-terminal until no pair occurs more than once, producing
//! a straight-line grammar: a terminal alphabet, a list of binary rules,
//! and a compressed top-level sequence.
//!
//! Compression runs in two phases over a shared set of structures. Pairs at
//! or above the cut-off frequency `max(2, n^0.66)` are drained through a
//! small high-frequency queue; everything still repeating afterward goes
//! through a dense low-frequency queue. Both phases rest on a skippable
//! text (constant-time neighbor access while replacements punch holes) and
//! a position index that counting-sorts slices of text positions by their
//! current pair, which keeps the whole run linear in the input.
//!
//! # Example
//!
//! ```
//! let grammar = repair_rs::compress(b"abcabcabcabc").unwrap();
//! assert!(!grammar.rules.is_empty());
//!
//! // Expansion restores the original bytes.
//! let restored = grammar.expand().unwrap();
//! assert_eq!(restored, b"abcabcabcabc");
//! ```
//!
//! The [`write_archive`]/[`read_archive`] pair stores a grammar as a
//! self-delimited packed-gamma byte stream; the `rp` binary wraps both
//! directions for files.

mod arena;
mod codec;
mod compressor;
mod error;
mod grammar;
mod hf_queue;
mod lf_queue;
mod queue;
mod symbol;
mod text;
mod text_positions;

#[cfg(test)]
mod tests;

pub use codec::{read_archive, write_archive};
pub use compressor::compress;
pub use error::{Error, Result};
pub use grammar::{Grammar, GrammarStats};
pub use symbol::{Pair, Symbol};
