//! The straight-line grammar a compression run emits, and its expansion
//! back into the original bytes.

use std::io::Write;

use crate::error::{Error, Result};
use crate::symbol::{Pair, Symbol};

/// Output buffer flushed to the sink in chunks during expansion.
const EXPAND_BUF: usize = 1 << 20;

/// A straight-line grammar: terminal alphabet, binary rules, and the
/// compressed top-level symbol sequence.
///
/// Rule `k` defines non-terminal `alphabet.len() + k`; its right-hand side
/// references only earlier symbols, so the grammar is a DAG and expansion
/// terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Distinct input bytes in order of first appearance; terminal `s`
    /// stands for byte `alphabet[s]`.
    pub alphabet: Vec<u8>,
    /// Binary rules in creation order.
    pub rules: Vec<Pair>,
    /// The symbols that survive all replacements, left to right.
    pub sequence: Vec<Symbol>,
}

impl Grammar {
    /// Expands the grammar into `out` with an explicit stack, one top-text
    /// symbol at a time.
    ///
    /// Validates symbol bounds and rule acyclicity up front and returns
    /// [`Error::CorruptArchive`] on violation, so a hand-built cyclic
    /// grammar cannot loop forever.
    pub fn expand_into<W: Write>(&self, out: &mut W) -> Result<()> {
        self.validate()?;

        let sigma = self.alphabet.len() as Symbol;
        let mut buffer = Vec::with_capacity(EXPAND_BUF.min(self.sequence.len() * 2 + 1));
        let mut stack: Vec<Symbol> = Vec::new();

        for &top in &self.sequence {
            stack.push(top);
            while let Some(x) = stack.pop() {
                if x < sigma {
                    buffer.push(self.alphabet[x as usize]);
                    if buffer.len() >= EXPAND_BUF {
                        out.write_all(&buffer)?;
                        buffer.clear();
                    }
                } else {
                    let rule = self.rules[(x - sigma) as usize];
                    stack.push(rule.right);
                    stack.push(rule.left);
                }
            }
        }

        if !buffer.is_empty() {
            out.write_all(&buffer)?;
        }
        Ok(())
    }

    /// Expands the grammar into a fresh byte vector.
    pub fn expand(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.expand_into(&mut out)?;
        Ok(out)
    }

    /// Checks that every rule references only earlier symbols and every top
    /// symbol is defined.
    pub fn validate(&self) -> Result<()> {
        let sigma = self.alphabet.len() as u64;
        for (k, rule) in self.rules.iter().enumerate() {
            let limit = sigma + k as u64;
            if rule.left as u64 >= limit || rule.right as u64 >= limit {
                return Err(Error::CorruptArchive {
                    offset: 0,
                    reason: format!("rule {k} references symbol at or beyond {limit}"),
                });
            }
        }
        let limit = sigma + self.rules.len() as u64;
        for (i, &s) in self.sequence.iter().enumerate() {
            if s as u64 >= limit {
                return Err(Error::CorruptArchive {
                    offset: 0,
                    reason: format!("top symbol {s} at position {i} is undefined"),
                });
            }
        }
        Ok(())
    }

    /// Size summary of the grammar.
    pub fn stats(&self) -> GrammarStats {
        GrammarStats {
            terminals: self.alphabet.len(),
            rules: self.rules.len(),
            sequence_len: self.sequence.len(),
        }
    }
}

/// Statistics about a compressed grammar.
#[derive(Debug, Clone, Copy)]
pub struct GrammarStats {
    /// Distinct terminal symbols.
    pub terminals: usize,
    /// Number of binary rules.
    pub rules: usize,
    /// Length of the top-level sequence.
    pub sequence_len: usize,
}

impl GrammarStats {
    /// Total symbols stored: two per rule plus the top sequence.
    pub fn symbol_count(&self) -> usize {
        self.rules * 2 + self.sequence_len
    }

    /// Stored symbols as a percentage of the original length. Lower is
    /// better; 100 means no compression.
    pub fn compression_ratio(&self, input_len: usize) -> f64 {
        if input_len == 0 {
            0.0
        } else {
            self.symbol_count() as f64 / input_len as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_terminals_only() {
        let g = Grammar {
            alphabet: vec![b'x', b'y'],
            rules: vec![],
            sequence: vec![0, 1, 0],
        };
        assert_eq!(g.expand().unwrap(), b"xyx");
    }

    #[test]
    fn test_expand_nested_rules() {
        // 2 -> (0,1) = "ab"; 3 -> (2,2) = "abab"
        let g = Grammar {
            alphabet: vec![b'a', b'b'],
            rules: vec![Pair::new(0, 1), Pair::new(2, 2)],
            sequence: vec![3, 2, 0],
        };
        assert_eq!(g.expand().unwrap(), b"abababa");
    }

    #[test]
    fn test_expand_empty() {
        let g = Grammar {
            alphabet: vec![],
            rules: vec![],
            sequence: vec![],
        };
        assert_eq!(g.expand().unwrap(), b"");
    }

    #[test]
    fn test_expand_rejects_forward_rule_reference() {
        // Rule 0 references symbol 3 (rule 1) before it is defined.
        let g = Grammar {
            alphabet: vec![b'a', b'b'],
            rules: vec![Pair::new(3, 0), Pair::new(0, 1)],
            sequence: vec![2],
        };
        assert!(matches!(
            g.expand(),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_expand_rejects_undefined_top_symbol() {
        let g = Grammar {
            alphabet: vec![b'a'],
            rules: vec![],
            sequence: vec![5],
        };
        assert!(matches!(
            g.expand(),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_expand_rejects_self_referential_rule() {
        let g = Grammar {
            alphabet: vec![b'a'],
            rules: vec![Pair::new(1, 1)],
            sequence: vec![1],
        };
        assert!(matches!(
            g.expand(),
            Err(Error::CorruptArchive { .. })
        ));
    }

    #[test]
    fn test_stats_and_ratio() {
        let g = Grammar {
            alphabet: vec![b'a', b'b'],
            rules: vec![Pair::new(0, 1)],
            sequence: vec![2, 2],
        };
        let s = g.stats();
        assert_eq!(s.symbol_count(), 4);
        assert_eq!(s.compression_ratio(8), 50.0);
        assert_eq!(s.compression_ratio(0), 0.0);
    }
}
