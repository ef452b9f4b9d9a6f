//! Packed Elias-gamma container for `(alphabet, rules, sequence)`.
//!
//! Integers are written in fixed-width blocks of [`BLOCK_SIZE`]: each block
//! is prefixed by the gamma code of its widest member, followed by the
//! members at that width. The stream is terminated by a sentinel gamma code
//! wider than any legitimate width, a 64-bit count of residual integers,
//! the residuals at 64 bits each, and zero padding to a byte boundary.
//!
//! The archive payload is the integer sequence
//! `|A|, A.., |G|, (left,right).., |Tc|, Tc..`. The reader validates symbol
//! bounds while parsing, so a corrupt archive surfaces
//! [`Error::CorruptArchive`] with the byte offset instead of producing an
//! inconsistent grammar.

use std::io::{Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::symbol::Pair;

/// Integers per fixed-width block.
const BLOCK_SIZE: usize = 10;

/// Sentinel width terminating the stream; legitimate widths are 1..=64.
const END_WIDTH: u64 = 65;

/// Bit width of `x` (at least 1).
fn width(x: u64) -> u32 {
    (64 - x.leading_zeros()).max(1)
}

struct GammaWriter<W: Write> {
    bits: BitWriter<W, BigEndian>,
    block: Vec<u64>,
}

impl<W: Write> GammaWriter<W> {
    fn new(sink: W) -> Self {
        Self {
            bits: BitWriter::endian(sink, BigEndian),
            block: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    fn push(&mut self, x: u64) -> Result<()> {
        if self.block.len() == BLOCK_SIZE {
            self.flush_block()?;
        }
        self.block.push(x);
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        debug_assert_eq!(self.block.len(), BLOCK_SIZE);
        let w = self.block.iter().map(|&x| width(x)).max().unwrap();
        self.write_gamma(w as u64)?;
        for i in 0..self.block.len() {
            let x = self.block[i];
            self.write_fixed(x, w)?;
        }
        self.block.clear();
        Ok(())
    }

    /// Terminates the stream: sentinel, residual count, residuals, padding.
    fn finish(mut self) -> Result<()> {
        self.write_gamma(END_WIDTH)?;
        self.write_fixed(self.block.len() as u64, 64)?;
        for i in 0..self.block.len() {
            let x = self.block[i];
            self.write_fixed(x, 64)?;
        }
        self.bits.byte_align()?;
        Ok(())
    }

    fn write_gamma(&mut self, x: u64) -> Result<()> {
        debug_assert!(x > 0);
        let w = width(x);
        for _ in 1..w {
            self.bits.write_bit(false)?;
        }
        self.write_fixed(x, w)
    }

    fn write_fixed(&mut self, x: u64, w: u32) -> Result<()> {
        for k in (0..w).rev() {
            self.bits.write_bit(x >> k & 1 == 1)?;
        }
        Ok(())
    }
}

struct GammaReader<R: Read> {
    bits: BitReader<R, BigEndian>,
    block: Vec<u64>,
    cursor: usize,
    /// Bits consumed so far; `/ 8` is the byte offset reported on error.
    position: u64,
    finished: bool,
}

impl<R: Read> GammaReader<R> {
    fn new(source: R) -> Self {
        Self {
            bits: BitReader::endian(source, BigEndian),
            block: Vec::with_capacity(BLOCK_SIZE),
            cursor: 0,
            position: 0,
            finished: false,
        }
    }

    fn byte_offset(&self) -> u64 {
        self.position / 8
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::CorruptArchive {
            offset: self.byte_offset(),
            reason: reason.into(),
        }
    }

    fn next(&mut self) -> Result<u64> {
        if self.cursor == self.block.len() {
            self.refill()?;
        }
        let x = self.block[self.cursor];
        self.cursor += 1;
        Ok(x)
    }

    fn refill(&mut self) -> Result<()> {
        if self.finished {
            return Err(self.corrupt("read past end of stream"));
        }
        self.block.clear();
        self.cursor = 0;

        let w = self.read_gamma()?;
        if w == END_WIDTH {
            let count = self.read_fixed(64)? as usize;
            if count > BLOCK_SIZE {
                return Err(self.corrupt(format!("residual count {count} exceeds block size")));
            }
            for _ in 0..count {
                let x = self.read_fixed(64)?;
                self.block.push(x);
            }
            self.finished = true;
            if self.block.is_empty() {
                return Err(self.corrupt("read past end of stream"));
            }
        } else if w > 64 {
            return Err(self.corrupt(format!("invalid block width {w}")));
        } else {
            for _ in 0..BLOCK_SIZE {
                let x = self.read_fixed(w as u32)?;
                self.block.push(x);
            }
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool> {
        match self.bits.read_bit() {
            Ok(b) => {
                self.position += 1;
                Ok(b)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(self.corrupt("stream ends mid-integer"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_gamma(&mut self) -> Result<u64> {
        let mut zeros = 0u32;
        while !self.read_bit()? {
            zeros += 1;
            if zeros > 64 {
                return Err(self.corrupt("gamma code too long"));
            }
        }
        let mut x = 1u64;
        for _ in 0..zeros {
            x = x << 1 | self.read_bit()? as u64;
        }
        Ok(x)
    }

    fn read_fixed(&mut self, w: u32) -> Result<u64> {
        let mut x = 0u64;
        for _ in 0..w {
            x = x << 1 | self.read_bit()? as u64;
        }
        Ok(x)
    }
}

/// Serializes a grammar to `sink` in the packed-gamma container format.
pub fn write_archive<W: Write>(grammar: &Grammar, sink: W) -> Result<()> {
    let mut out = GammaWriter::new(sink);

    out.push(grammar.alphabet.len() as u64)?;
    for &b in &grammar.alphabet {
        out.push(b as u64)?;
    }

    out.push(grammar.rules.len() as u64)?;
    for rule in &grammar.rules {
        out.push(rule.left as u64)?;
        out.push(rule.right as u64)?;
    }

    out.push(grammar.sequence.len() as u64)?;
    for &s in &grammar.sequence {
        out.push(s as u64)?;
    }

    out.finish()
}

/// Reads a grammar back from a packed-gamma archive, validating alphabet
/// entries, rule acyclicity, and top-text symbol bounds as it parses.
pub fn read_archive<R: Read>(source: R) -> Result<Grammar> {
    let mut input = GammaReader::new(source);

    let alpha_len = input.next()?;
    if alpha_len > 256 {
        return Err(input.corrupt(format!("alphabet size {alpha_len} exceeds 256")));
    }
    let mut alphabet = Vec::with_capacity(alpha_len as usize);
    for _ in 0..alpha_len {
        let b = input.next()?;
        if b > 255 {
            return Err(input.corrupt(format!("alphabet entry {b} is not a byte")));
        }
        alphabet.push(b as u8);
    }

    let rule_count = input.next()?;
    if alpha_len + rule_count > u32::MAX as u64 {
        return Err(input.corrupt(format!("{rule_count} rules exceed the symbol space")));
    }
    let mut rules = Vec::new();
    for k in 0..rule_count {
        let limit = alpha_len + k;
        let left = input.next()?;
        let right = input.next()?;
        if left >= limit || right >= limit {
            return Err(input.corrupt(format!(
                "rule {k} references symbol at or beyond {limit}"
            )));
        }
        rules.push(Pair::new(left as u32, right as u32));
    }

    let seq_len = input.next()?;
    let limit = alpha_len + rule_count;
    let mut sequence = Vec::new();
    for i in 0..seq_len {
        let s = input.next()?;
        if s >= limit {
            return Err(input.corrupt(format!("top symbol {s} at position {i} is undefined")));
        }
        sequence.push(s as u32);
    }

    Ok(Grammar {
        alphabet,
        rules,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(g: &Grammar) -> Grammar {
        let mut bytes = Vec::new();
        write_archive(g, &mut bytes).unwrap();
        read_archive(bytes.as_slice()).unwrap()
    }

    fn sample() -> Grammar {
        Grammar {
            alphabet: vec![b'a', b'b', b'c'],
            rules: vec![Pair::new(0, 1), Pair::new(3, 2)],
            sequence: vec![4, 4, 0],
        }
    }

    #[test]
    fn test_roundtrip_sample() {
        let g = sample();
        assert_eq!(roundtrip(&g), g);
    }

    #[test]
    fn test_roundtrip_empty_grammar() {
        let g = Grammar {
            alphabet: vec![],
            rules: vec![],
            sequence: vec![],
        };
        assert_eq!(roundtrip(&g), g);
    }

    #[test]
    fn test_roundtrip_exercises_block_boundaries() {
        // 1 + 256 + 1 + 1 + 2 integers: crosses many 10-integer blocks and
        // leaves residuals in the terminator.
        let g = Grammar {
            alphabet: (0..=255).collect(),
            rules: vec![],
            sequence: vec![17, 255],
        };
        assert_eq!(roundtrip(&g), g);

        for extra in 0..=BLOCK_SIZE {
            let g = Grammar {
                alphabet: vec![b'z'],
                rules: vec![],
                sequence: vec![0; extra],
            };
            assert_eq!(roundtrip(&g), g, "residual count {extra}");
        }
    }

    #[test]
    fn test_roundtrip_wide_values() {
        let g = Grammar {
            alphabet: (0..=255).collect(),
            rules: (0..5000u32).map(|k| Pair::new(k / 2, k % 256)).collect(),
            sequence: vec![256 + 4999],
        };
        assert_eq!(roundtrip(&g), g);
    }

    #[test]
    fn test_truncated_stream_reports_offset() {
        let mut bytes = Vec::new();
        write_archive(&sample(), &mut bytes).unwrap();
        bytes.truncate(bytes.len() / 2);

        match read_archive(bytes.as_slice()) {
            Err(Error::CorruptArchive { offset, .. }) => {
                assert!(offset <= bytes.len() as u64);
            }
            other => panic!("expected CorruptArchive, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_is_corrupt() {
        assert!(matches!(
            read_archive([].as_slice()),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_forward_rule_reference_is_corrupt() {
        let bad = Grammar {
            alphabet: vec![b'a'],
            rules: vec![Pair::new(2, 0), Pair::new(0, 0)],
            sequence: vec![1],
        };
        let mut bytes = Vec::new();
        write_archive(&bad, &mut bytes).unwrap();
        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_undefined_top_symbol_is_corrupt() {
        let bad = Grammar {
            alphabet: vec![b'a'],
            rules: vec![],
            sequence: vec![7],
        };
        let mut bytes = Vec::new();
        write_archive(&bad, &mut bytes).unwrap();
        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_zero_filled_stream_is_corrupt() {
        let zeros = vec![0u8; 64];
        assert!(matches!(
            read_archive(zeros.as_slice()),
            Err(Error::CorruptArchive { .. })
        ));
    }
}
