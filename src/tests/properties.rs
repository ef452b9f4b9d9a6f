use proptest::prelude::*;

use crate::compressor::compress;
use crate::text::SkippableText;
use crate::text_positions::TextPositions;
use crate::{read_archive, write_archive};

proptest! {
    /// Round trip: decompressing a compressed input restores it exactly.
    #[test]
    fn prop_roundtrip(input: Vec<u8>) {
        let grammar = compress(&input).unwrap();
        prop_assert_eq!(grammar.expand().unwrap(), input);
    }

    /// Round trip through the container codec as well.
    #[test]
    fn prop_roundtrip_through_archive(input: Vec<u8>) {
        let grammar = compress(&input).unwrap();

        let mut bytes = Vec::new();
        write_archive(&grammar, &mut bytes).unwrap();
        let restored = read_archive(bytes.as_slice()).unwrap();

        prop_assert_eq!(&restored, &grammar);
        prop_assert_eq!(restored.expand().unwrap(), input);
    }

    /// Larger repetitive inputs cross the high-frequency cut-off and still
    /// round-trip.
    #[test]
    fn prop_roundtrip_repetitive(
        pattern in prop::collection::vec(any::<u8>(), 1..6),
        reps in 1..400usize,
    ) {
        let input: Vec<u8> = pattern.iter().copied().cycle().take(pattern.len() * reps).collect();
        let grammar = compress(&input).unwrap();
        prop_assert_eq!(grammar.expand().unwrap(), input);
    }

    /// Every emitted rule references only symbols defined before it.
    #[test]
    fn prop_grammar_is_acyclic(input: Vec<u8>) {
        let grammar = compress(&input).unwrap();
        let sigma = grammar.alphabet.len() as u32;
        for (k, rule) in grammar.rules.iter().enumerate() {
            prop_assert!(rule.left < sigma + k as u32);
            prop_assert!(rule.right < sigma + k as u32);
        }
    }

    /// Skip correctness: after arbitrary replacements, next_live agrees
    /// with a linear bitmap scan.
    #[test]
    fn prop_next_live_matches_linear_scan(
        n in 2..300usize,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..80),
    ) {
        let mut text = SkippableText::new(n);
        for i in 0..n {
            text.set(i, (i % 7) as u32);
        }

        let mut fresh = 1000u32;
        for pick in picks {
            let live: Vec<usize> = (0..n)
                .filter(|&i| text.is_live(i) && text.pair_at(i).is_some())
                .collect();
            if live.is_empty() {
                break;
            }
            text.replace(live[pick.index(live.len())], fresh);
            fresh += 1;
        }

        for i in (0..n).filter(|&i| text.is_live(i)) {
            let naive = (i + 1..n).find(|&j| text.is_live(j));
            prop_assert_eq!(text.next_live(i), naive);
            let naive_prev = (0..i).rev().find(|&j| text.is_live(j));
            prop_assert_eq!(text.prev_live(i), naive_prev);
        }
    }

    /// Clustering groups equal pairs contiguously with stale positions at
    /// the tail.
    #[test]
    fn prop_cluster_groups_pairs(
        symbols in prop::collection::vec(0u32..6, 2..120),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let n = symbols.len();
        let mut text = SkippableText::new(n);
        for (i, &s) in symbols.iter().enumerate() {
            text.set(i, s);
        }
        let mut tp = TextPositions::new(&text, usize::MAX);
        tp.fill_with_text_positions(n);

        let mut fresh = 100u32;
        for pick in picks {
            let live: Vec<usize> = (0..n)
                .filter(|&i| text.is_live(i) && text.pair_at(i).is_some())
                .collect();
            if live.is_empty() {
                break;
            }
            text.replace(live[pick.index(live.len())], fresh);
            fresh += 1;
        }

        tp.cluster(&text, 0, n);

        let pairs: Vec<_> = (0..n).map(|k| text.pair_at(tp[k] as usize)).collect();
        let first_stale = pairs.iter().position(|p| p.is_none()).unwrap_or(n);
        prop_assert!(pairs[first_stale..].iter().all(|p| p.is_none()));

        let mut seen = Vec::new();
        for window in pairs[..first_stale].windows(2) {
            if window[0] != window[1] {
                prop_assert!(!seen.contains(&window[1]), "pair split across runs");
                seen.push(window[0]);
            }
        }
    }
}

/// Fuzz check: compression never panics and always round-trips.
#[test]
fn fuzz_roundtrip() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let grammar = compress(input).unwrap();
        assert_eq!(
            grammar.expand().unwrap(),
            *input,
            "roundtrip failed for {} bytes",
            input.len()
        );
    });
}

/// Fuzz check: arbitrary bytes fed to the archive reader either parse into
/// a valid grammar or fail cleanly with an error.
#[test]
fn fuzz_archive_reader_rejects_garbage() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|bytes| {
        if let Ok(grammar) = read_archive(bytes.as_slice()) {
            // Whatever parsed must at least be expandable.
            grammar.expand().unwrap();
        }
    });
}
