//! Minimum hitting sets over small label sets.
//!
//! Every matched skeleton point carries the set of labels it could be
//! explained by. The fewest labels needed to explain all points of a region
//! is the smallest set of labels intersecting every candidate set. The
//! instances are small after reduction, so an exact iterative-deepening
//! search is used, bounded by a node budget with a greedy fallback.

use std::collections::{BTreeMap, BTreeSet};

use crate::volume::Label;

/// Search nodes explored before falling back to the greedy cover.
const NODE_BUDGET: usize = 200_000;

/// A set of labels hitting every candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    /// Chosen labels, sorted.
    pub labels: Vec<Label>,
    /// False if the search ran out of budget and `labels` may not be minimal.
    pub exact: bool,
}

impl Cover {
    /// Number of chosen labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if nothing needed covering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

enum Search {
    Found,
    NotFound,
    Exhausted,
}

/// Smallest set of labels that intersects every non-empty set in `sets`.
///
/// Ties between minimum covers resolve to the lexicographically smallest
/// label sequence explored first.
#[must_use]
pub fn minimum_cover<'a>(sets: impl IntoIterator<Item = &'a BTreeSet<Label>>) -> Cover {
    minimum_cover_within(sets, NODE_BUDGET)
}

/// [`minimum_cover`] with an explicit search node budget.
fn minimum_cover_within<'a>(
    sets: impl IntoIterator<Item = &'a BTreeSet<Label>>,
    budget: usize,
) -> Cover {
    let reduced = reduce(sets);

    // Singletons must be chosen.
    let mut forced: Vec<Label> = reduced.iter().filter(|s| s.len() == 1).map(|s| s[0]).collect();
    forced.sort_unstable();
    forced.dedup();
    let rest: Vec<Vec<Label>> = reduced.into_iter().filter(|s| !hits(&forced, s)).collect();

    if rest.is_empty() {
        return Cover {
            labels: forced,
            exact: true,
        };
    }

    let greedy = greedy_cover(&rest);
    let mut nodes = 0usize;
    let mut chosen = Vec::with_capacity(greedy.len());
    let mut exact = true;
    let mut best = greedy.clone();
    for depth in 1..greedy.len() {
        match search(&rest, &mut chosen, depth, &mut nodes, budget) {
            Search::Found => {
                best.clone_from(&chosen);
                break;
            }
            Search::NotFound => {}
            Search::Exhausted => {
                log::warn!(
                    "cover search over {} sets exceeded {} nodes, using greedy cover of {}",
                    rest.len(),
                    budget,
                    greedy.len()
                );
                exact = false;
                break;
            }
        }
    }

    let mut labels = forced;
    labels.extend(best);
    labels.sort_unstable();
    labels.dedup();
    Cover { labels, exact }
}

/// Deduplicate, drop empty sets, and drop every set that contains another.
fn reduce<'a>(sets: impl IntoIterator<Item = &'a BTreeSet<Label>>) -> Vec<Vec<Label>> {
    let mut unique: Vec<Vec<Label>> = sets
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().copied().collect())
        .collect();
    unique.sort_unstable_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    unique.dedup();

    let mut kept: Vec<Vec<Label>> = Vec::with_capacity(unique.len());
    for set in unique {
        if !kept.iter().any(|smaller| is_subset(smaller, &set)) {
            kept.push(set);
        }
    }
    kept
}

/// Both slices sorted.
fn is_subset(small: &[Label], large: &[Label]) -> bool {
    small.iter().all(|l| large.binary_search(l).is_ok())
}

fn hits(chosen: &[Label], set: &[Label]) -> bool {
    chosen.iter().any(|l| set.binary_search(l).is_ok())
}

fn search(
    sets: &[Vec<Label>],
    chosen: &mut Vec<Label>,
    depth: usize,
    nodes: &mut usize,
    budget: usize,
) -> Search {
    *nodes += 1;
    if *nodes > budget {
        return Search::Exhausted;
    }

    let Some(branch) = sets.iter().filter(|s| !hits(chosen, s)).min_by_key(|s| s.len()) else {
        return Search::Found;
    };
    if chosen.len() == depth {
        return Search::NotFound;
    }

    for &label in branch {
        chosen.push(label);
        match search(sets, chosen, depth, nodes, budget) {
            Search::NotFound => {}
            outcome => return outcome,
        }
        chosen.pop();
    }
    Search::NotFound
}

/// Repeatedly take the label hitting the most uncovered sets, smaller label
/// on ties.
fn greedy_cover(sets: &[Vec<Label>]) -> Vec<Label> {
    let mut chosen: Vec<Label> = Vec::new();
    loop {
        let open: Vec<&Vec<Label>> = sets.iter().filter(|s| !hits(&chosen, s)).collect();
        if open.is_empty() {
            return chosen;
        }
        let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
        for set in &open {
            for &label in set.iter() {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        let mut best: Option<(Label, usize)> = None;
        for (label, count) in counts {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        match best {
            Some((label, _)) => chosen.push(label),
            None => return chosen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(raw: &[&[Label]]) -> Vec<BTreeSet<Label>> {
        raw.iter().map(|s| s.iter().copied().collect()).collect()
    }

    #[test]
    fn test_empty_input() {
        let cover = minimum_cover(&sets(&[]));
        assert!(cover.is_empty());
        assert!(cover.exact);
    }

    #[test]
    fn test_singletons_are_forced() {
        let cover = minimum_cover(&sets(&[&[3], &[3, 4], &[5], &[4, 5]]));
        assert_eq!(cover.labels, vec![3, 5]);
    }

    #[test]
    fn test_shared_label_beats_two() {
        let cover = minimum_cover(&sets(&[&[1, 2], &[2, 3], &[2, 4]]));
        assert_eq!(cover.labels, vec![2]);
    }

    #[test]
    fn test_exact_beats_greedy() {
        // Greedy takes 9 first (hits four sets) and then still needs two
        // more; the optimum {1, 2} hits everything with two labels.
        let raw: &[&[Label]] =
            &[&[1, 5, 9], &[1, 6, 9], &[2, 7, 9], &[2, 8, 9], &[1, 10], &[2, 11]];
        assert_eq!(greedy_cover(&reduce(&sets(raw))).len(), 3);
        let cover = minimum_cover(&sets(raw));
        assert_eq!(cover.labels, vec![1, 2]);
        assert!(cover.exact);
    }

    #[test]
    fn test_exhausted_budget_falls_back_to_greedy() {
        let raw: &[&[Label]] =
            &[&[1, 5, 9], &[1, 6, 9], &[2, 7, 9], &[2, 8, 9], &[1, 10], &[2, 11]];
        let cover = minimum_cover_within(&sets(raw), 1);
        assert!(!cover.exact);
        assert_eq!(cover.labels, vec![1, 2, 9]);
        for set in raw {
            assert!(set.iter().any(|l| cover.labels.contains(l)), "{set:?} not covered");
        }

        // The same instance is solved exactly with room to search.
        assert!(minimum_cover_within(&sets(raw), NODE_BUDGET).exact);
    }

    #[test]
    fn test_greedy_picks_most_frequent() {
        let greedy = greedy_cover(&[vec![1, 9], vec![2, 9], vec![3, 9], vec![1, 5], vec![2, 6]]);
        assert_eq!(greedy[0], 9);
        assert_eq!(greedy.len(), 3);
    }

    #[test]
    fn test_reduce_drops_supersets_and_duplicates() {
        let reduced = reduce(&sets(&[&[1, 2, 3], &[1, 2], &[1, 2], &[4], &[4, 5]]));
        assert_eq!(reduced, vec![vec![4], vec![1, 2]]);
    }

    #[test]
    fn test_empty_sets_are_ignored() {
        let cover = minimum_cover(&sets(&[&[], &[7]]));
        assert_eq!(cover.labels, vec![7]);
    }
}
