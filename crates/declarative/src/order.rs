//! Order-preserving assembly of nested blocks
//!
//! Nested blocks are sets keyed by a name-like identifier but are shown to
//! the user as lists. The last written order wins: entries already known
//! keep their prior position, new entries follow in the order they arrived.

use std::collections::HashMap;
use std::hash::Hash;

/// Emit `items` in `prior` order, then the rest in their incoming order
pub fn preserve_order<T, K, F>(items: Vec<T>, prior: &[K], key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let rank: HashMap<&K, usize> = prior
        .iter()
        .enumerate()
        .rev()
        .map(|(i, k)| (k, i))
        .collect();

    let mut known: Vec<(usize, usize, T)> = Vec::new();
    let mut fresh: Vec<T> = Vec::new();
    for (seq, item) in items.into_iter().enumerate() {
        match rank.get(&key(&item)) {
            Some(&pos) => known.push((pos, seq, item)),
            None => fresh.push(item),
        }
    }
    known.sort_by_key(|(pos, seq, _)| (*pos, *seq));

    known
        .into_iter()
        .map(|(_, _, item)| item)
        .chain(fresh)
        .collect()
}

/// Collect identifiers from a prior list, in order
pub fn identifiers<T, K>(items: &[T], key: impl Fn(&T) -> K) -> Vec<K> {
    items.iter().map(key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prior_order_wins() {
        let out = preserve_order(names(&["c", "a", "b"]), &names(&["a", "b", "c"]), |s| s.clone());
        assert_eq!(out, names(&["a", "b", "c"]));
    }

    #[test]
    fn test_new_entries_append_in_incoming_order() {
        let out = preserve_order(
            names(&["z", "b", "y", "a"]),
            &names(&["a", "b"]),
            |s| s.clone(),
        );
        assert_eq!(out, names(&["a", "b", "z", "y"]));
    }

    #[test]
    fn test_removed_entries_drop_out() {
        let out = preserve_order(names(&["c", "a"]), &names(&["a", "b", "c"]), |s| s.clone());
        assert_eq!(out, names(&["a", "c"]));
    }

    #[test]
    fn test_empty_prior_keeps_incoming_order() {
        let out = preserve_order(names(&["q", "p"]), &[], |s: &String| s.clone());
        assert_eq!(out, names(&["q", "p"]));
    }

    #[test]
    fn test_duplicate_keys_stay_stable() {
        let items = vec![("a", 2), ("b", 1), ("a", 1)];
        let out = preserve_order(items, &["b", "a"], |t| t.0);
        assert_eq!(out, vec![("b", 1), ("a", 2), ("a", 1)]);
    }
}
