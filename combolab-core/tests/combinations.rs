//! Property tests for the combination generator.

use std::collections::HashSet;

use combolab_core::combos::{binomial, combination_count, combinations, combinations_bounded};
use proptest::prelude::*;

proptest! {
    #[test]
    fn count_matches_binomial_sum(n in 0usize..12, min in 1usize..14) {
        let items: Vec<usize> = (0..n).collect();
        let got = combinations(&items, min);
        let expected: usize = (min..=n).map(|k| binomial(n, k)).sum();
        prop_assert_eq!(got.len(), expected);
        prop_assert_eq!(got.len(), combination_count(n, min));
    }

    #[test]
    fn subsets_are_unique(n in 0usize..10, min in 1usize..4) {
        let items: Vec<usize> = (0..n).collect();
        let got = combinations(&items, min);
        let unique: HashSet<&Vec<usize>> = got.iter().collect();
        prop_assert_eq!(unique.len(), got.len());
        for subset in &got {
            prop_assert!(subset.len() >= min);
            prop_assert!(subset.windows(2).all(|w| w[0] < w[1]));
        }
        prop_assert!(got.windows(2).all(|w| w[0].len() <= w[1].len()));
    }

    #[test]
    fn bounded_equals_capped_full(n in 0usize..11, min in 1usize..4, extra in 0usize..5) {
        let items: Vec<usize> = (0..n).collect();
        let max = min + extra;
        let capped: Vec<Vec<usize>> = combinations(&items, min).into_iter().filter(|c| c.len() <= max).collect();
        prop_assert_eq!(combinations_bounded(&items, min, max), capped);
    }

    #[test]
    fn subsets_preserve_input_order(items in prop::collection::vec(any::<u16>(), 0..10), min in 1usize..4) {
        for subset in combinations(&items, min) {
            let mut cursor = 0;
            for value in &subset {
                let pos = items[cursor..].iter().position(|v| v == value);
                prop_assert!(pos.is_some());
                cursor += pos.unwrap_or(0) + 1;
            }
        }
    }
}

#[test]
fn strategy_names_in_generator_order() {
    let names = ["breakout", "rsi", "volume"];
    let joined: Vec<String> = combinations(&names, 2).iter().map(|c| c.join("-")).collect();
    assert_eq!(joined, vec!["breakout-rsi", "breakout-volume", "rsi-volume", "breakout-rsi-volume"]);
}
