//! Maximum clique over a graph of pairwise distinct constants
//!
//! If constants `a1..ak` are pairwise asserted distinct, every model needs
//! at least `k` elements in their sort.

use std::collections::{BTreeSet, HashMap};

/// Size of the largest clique of the undirected graph given by `edges`
pub fn max_clique_size<N: Copy + Eq + std::hash::Hash + Ord>(edges: &[(N, N)]) -> usize {
    let mut adjacency: HashMap<N, BTreeSet<N>> = HashMap::new();
    for &(a, b) in edges {
        if a == b {
            continue;
        }
        adjacency.entry(a).or_default().insert(b);
        adjacency.entry(b).or_default().insert(a);
    }
    if adjacency.is_empty() {
        return 0;
    }

    let candidates: BTreeSet<N> = adjacency.keys().copied().collect();
    let mut best = 0;
    bron_kerbosch(&adjacency, 0, candidates, BTreeSet::new(), &mut best);
    best
}

fn bron_kerbosch<N: Copy + Eq + std::hash::Hash + Ord>(
    adjacency: &HashMap<N, BTreeSet<N>>,
    current: usize,
    mut candidates: BTreeSet<N>,
    mut excluded: BTreeSet<N>,
    best: &mut usize,
) {
    if candidates.is_empty() && excluded.is_empty() {
        *best = (*best).max(current);
        return;
    }
    if current + candidates.len() <= *best {
        return;
    }

    // pivot on the vertex with the most neighbours among the candidates
    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .copied()
        .max_by_key(|v| adjacency[v].intersection(&candidates).count());
    let pivot_neighbours = pivot.map(|p| adjacency[&p].clone()).unwrap_or_default();

    let branch: Vec<N> = candidates.difference(&pivot_neighbours).copied().collect();
    for v in branch {
        let neighbours = &adjacency[&v];
        let next_candidates = candidates.intersection(neighbours).copied().collect();
        let next_excluded = excluded.intersection(neighbours).copied().collect();
        bron_kerbosch(adjacency, current + 1, next_candidates, next_excluded, best);
        candidates.remove(&v);
        excluded.insert(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let edges: Vec<(u32, u32)> = Vec::new();
        assert_eq!(max_clique_size(&edges), 0);
    }

    #[test]
    fn test_single_edge() {
        assert_eq!(max_clique_size(&[(1u32, 2u32)]), 2);
    }

    #[test]
    fn test_triangle_with_tail() {
        let edges = [(1u32, 2u32), (2, 3), (1, 3), (3, 4), (4, 5)];
        assert_eq!(max_clique_size(&edges), 3);
    }

    #[test]
    fn test_complete_graph() {
        let mut edges = Vec::new();
        for a in 0u32..5 {
            for b in (a + 1)..5 {
                edges.push((a, b));
            }
        }
        assert_eq!(max_clique_size(&edges), 5);
    }

    #[test]
    fn test_self_loops_ignored() {
        assert_eq!(max_clique_size(&[(1u32, 1u32)]), 0);
    }
}
