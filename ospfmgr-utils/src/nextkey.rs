//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

// Generic get-next composition over an ordered sequence of key levels.
//
// A key space is described as levels L1..Ln, outermost first. Each level
// enumerates its keys in sorted order, possibly depending on the keys chosen
// at the outer levels (e.g. the set of area ranges depends on the area). The
// composer turns the per-level `next_key` primitive into a single `next_tuple`
// over the whole space, with the usual get-first/get-next convention:
// a `None` key in the input tuple means "start from the first key at this
// level and everything deeper".

// One level of a composite key space.
//
// `current == None` requests the first key under the given outer prefix;
// otherwise the next key strictly after `current`. Returns `None` when the
// level is exhausted under that prefix.
pub trait KeyLevel<K> {
    fn next_key(&self, outer: &[K], current: Option<&K>) -> Option<K>;
}

impl<K, F> KeyLevel<K> for F
where
    F: Fn(&[K], Option<&K>) -> Option<K>,
{
    fn next_key(&self, outer: &[K], current: Option<&K>) -> Option<K> {
        self(outer, current)
    }
}

// Computes the next tuple in lexicographic order.
//
// The shallowest `None` in `current` is the prefix boundary: that level and
// every deeper one are recomputed with get-first semantics. Whenever an outer
// key changes, all deeper levels are recomputed rather than reused, so
// dependent levels always observe a consistent prefix.
pub fn next_tuple<K: Clone>(
    levels: &[&dyn KeyLevel<K>],
    current: &[Option<K>],
) -> Option<Vec<K>> {
    let depth = levels.len();
    if depth == 0 {
        return None;
    }
    debug_assert_eq!(current.len(), depth);

    // Keys decided so far; `keys.len()` is the number of levels with a
    // committed key.
    let boundary = current
        .iter()
        .position(|key| key.is_none())
        .unwrap_or(depth);
    let mut keys: Vec<K> = current[..boundary]
        .iter()
        .filter_map(|key| key.clone())
        .collect();

    // When the input tuple is fully specified, start by advancing the deepest
    // level; otherwise start filling at the prefix boundary.
    let mut advance = boundary == depth;
    loop {
        if advance {
            // Advance the deepest committed level, dropping its old key.
            let level = keys.len() - 1;
            let (outer, cur) = keys.split_at(level);
            match levels[level].next_key(outer, cur.first()) {
                Some(next) => {
                    keys.truncate(level);
                    keys.push(next);
                    advance = false;
                }
                None => {
                    keys.truncate(level);
                    if level == 0 {
                        return None;
                    }
                }
            }
        } else {
            // Fill the next undecided level with its first key.
            let level = keys.len();
            if level == depth {
                return Some(keys);
            }
            match levels[level].next_key(&keys, None) {
                Some(first) => keys.push(first),
                None => {
                    if level == 0 {
                        return None;
                    }
                    // No key under this prefix; advance the level above.
                    advance = true;
                }
            }
        }
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    // Builds a 3-level key space from an explicit tuple set.
    fn levels(
        tuples: &BTreeSet<(u32, u32, u32)>,
    ) -> [Box<dyn KeyLevel<u32> + '_>; 3] {
        let first = |_outer: &[u32], current: Option<&u32>| {
            tuples
                .iter()
                .map(|(a, _, _)| *a)
                .find(|a| current.is_none_or(|current| a > current))
        };
        let second = |outer: &[u32], current: Option<&u32>| {
            tuples
                .iter()
                .filter(|(a, _, _)| *a == outer[0])
                .map(|(_, b, _)| *b)
                .find(|b| current.is_none_or(|current| b > current))
        };
        let third = |outer: &[u32], current: Option<&u32>| {
            tuples
                .iter()
                .filter(|(a, b, _)| *a == outer[0] && *b == outer[1])
                .map(|(_, _, c)| *c)
                .find(|c| current.is_none_or(|current| c > current))
        };
        [Box::new(first), Box::new(second), Box::new(third)]
    }

    fn collect_all(tuples: &BTreeSet<(u32, u32, u32)>) -> Vec<(u32, u32, u32)> {
        let levels = levels(tuples);
        let levels: Vec<&dyn KeyLevel<u32>> =
            levels.iter().map(|level| level.as_ref()).collect();

        let mut found = Vec::new();
        let mut current: Vec<Option<u32>> = vec![None, None, None];
        while let Some(next) = next_tuple(&levels, &current) {
            found.push((next[0], next[1], next[2]));
            current = next.into_iter().map(Some).collect();
        }
        found
    }

    #[test]
    fn full_enumeration() {
        let tuples: BTreeSet<_> = [
            (1, 1, 1),
            (1, 1, 2),
            (1, 3, 1),
            (2, 1, 9),
            (4, 2, 2),
            (4, 2, 3),
        ]
        .into();
        // Each tuple exactly once, in sorted order, then not-found.
        assert_eq!(collect_all(&tuples), tuples.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn skips_prefixes_without_leaves() {
        // Advancing past (1, 1, 5) exhausts both inner levels under outer
        // key 1; the composer must fall back to the outermost level and then
        // cascade get-first back inward to reach (3, 1, 1).
        let tuples: BTreeSet<_> = [(1, 1, 5), (3, 1, 1)].into();
        assert_eq!(collect_all(&tuples), vec![(1, 1, 5), (3, 1, 1)]);
    }

    #[test]
    fn partial_prefix_restarts_deeper_levels() {
        let tuples: BTreeSet<_> =
            [(1, 1, 1), (1, 2, 1), (1, 2, 2), (2, 1, 1)].into();
        let levels = levels(&tuples);
        let levels: Vec<&dyn KeyLevel<u32>> =
            levels.iter().map(|level| level.as_ref()).collect();

        // (1, None, None): first tuple with outer key 1.
        let next = next_tuple(&levels, &[Some(1), None, None]).unwrap();
        assert_eq!(next, vec![1, 1, 1]);

        // (1, 2, None): first tuple under the (1, 2) prefix.
        let next = next_tuple(&levels, &[Some(1), Some(2), None]).unwrap();
        assert_eq!(next, vec![1, 2, 1]);

        // A None at an outer level restarts everything deeper, even when the
        // deeper keys are specified.
        let next = next_tuple(&levels, &[None, Some(9), Some(9)]).unwrap();
        assert_eq!(next, vec![1, 1, 1]);
    }

    #[test]
    fn exhaustion() {
        let tuples: BTreeSet<_> = [(1, 1, 1)].into();
        let levels = levels(&tuples);
        let levels: Vec<&dyn KeyLevel<u32>> =
            levels.iter().map(|level| level.as_ref()).collect();

        assert!(next_tuple(&levels, &[Some(1), Some(1), Some(1)]).is_none());
        assert!(next_tuple(&levels, &[Some(7), None, None]).is_none());
    }
}
