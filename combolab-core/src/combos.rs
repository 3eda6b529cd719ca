//! Combination generator.
//!
//! Enumerates every subset of a list with at least `min_size` elements.
//! Subsets come out ordered by size, then in lexicographic index order, and
//! each subset preserves the relative order of the input. Two subsets are
//! never permutations of each other.

/// All subsets of `items` of size `min_size..=items.len()`.
///
/// `min_size == 0` is treated as 1; an empty subset is never produced.
pub fn combinations<T: Clone>(items: &[T], min_size: usize) -> Vec<Vec<T>> {
    combinations_bounded(items, min_size, items.len())
}

/// Subsets of size `min_size..=max_size`, in the same order [`combinations`]
/// yields them. Sizes above `max_size` are never enumerated.
pub fn combinations_bounded<T: Clone>(items: &[T], min_size: usize, max_size: usize) -> Vec<Vec<T>> {
    let n = items.len();
    let mut out = Vec::new();
    let mut picked: Vec<usize> = Vec::with_capacity(n);

    for k in min_size.max(1)..=max_size.min(n) {
        backtrack(items, k, 0, &mut picked, &mut out);
    }
    out
}

fn backtrack<T: Clone>(
    items: &[T],
    k: usize,
    start: usize,
    picked: &mut Vec<usize>,
    out: &mut Vec<Vec<T>>,
) {
    if picked.len() == k {
        out.push(picked.iter().map(|&i| items[i].clone()).collect());
        return;
    }
    let needed = k - picked.len();
    // Stop early once too few items remain to complete the subset.
    for i in start..=items.len() - needed {
        picked.push(i);
        backtrack(items, k, i + 1, picked, out);
        picked.pop();
    }
}

/// `C(n, k)`. Saturates instead of overflowing.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: usize = 1;
    for i in 0..k {
        acc = acc.saturating_mul(n - i) / (i + 1);
    }
    acc
}

/// Number of subsets [`combinations`] yields for `n` items.
pub fn combination_count(n: usize, min_size: usize) -> usize {
    (min_size.max(1)..=n).map(|k| binomial(n, k)).sum()
}
