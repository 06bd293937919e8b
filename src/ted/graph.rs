//! Bipartite matching grown one edge level at a time.
//!
//! Left vertices are ground truth points and right vertices are predicted
//! points. The edges of each level are first paired greedily in the order
//! given, then Hopcroft-Karp phases of shortest augmenting paths restore a
//! maximum matching. Augmenting never unmatches a vertex, so the matched
//! vertices of either side only grow from level to level.

use std::collections::VecDeque;

const UNREACHED: u32 = u32::MAX;

#[derive(Debug, Clone, Default)]
pub(crate) struct Augmenter {
    adjacency: Vec<Vec<usize>>,
    left_active: Vec<usize>,
    right_active: Vec<usize>,
    right_seen: Vec<bool>,
    left_mate: Vec<Option<usize>>,
    right_mate: Vec<Option<usize>>,
    layer: Vec<u32>,
    cursor: Vec<usize>,
}

impl Augmenter {
    pub(crate) fn new(left: usize, right: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); left],
            left_active: Vec::new(),
            right_active: Vec::new(),
            right_seen: vec![false; right],
            left_mate: vec![None; left],
            right_mate: vec![None; right],
            layer: vec![UNREACHED; left],
            cursor: vec![0; left],
        }
    }

    /// Add one level of edges and restore a maximum matching.
    ///
    /// Direct pairs are taken in the order given, so earlier edges win when
    /// several compete for the same vertex.
    pub(crate) fn add_level(&mut self, edges: impl Iterator<Item = (usize, usize)> + Clone) {
        for (u, v) in edges.clone() {
            if self.adjacency[u].is_empty() {
                self.left_active.push(u);
            }
            self.adjacency[u].push(v);
            if !self.right_seen[v] {
                self.right_seen[v] = true;
                self.right_active.push(v);
            }
        }
        for (u, v) in edges {
            if self.left_mate[u].is_none() && self.right_mate[v].is_none() {
                self.left_mate[u] = Some(v);
                self.right_mate[v] = Some(u);
            }
        }
        while self.has_free_pair() && self.phase() {}
    }

    /// Forget every edge. Matched pairs stay matched and can no longer be
    /// reached by augmenting paths.
    pub(crate) fn clear_edges(&mut self) {
        for u in self.left_active.drain(..) {
            self.adjacency[u].clear();
            self.layer[u] = UNREACHED;
        }
        for v in self.right_active.drain(..) {
            self.right_seen[v] = false;
        }
    }

    pub(crate) fn left_mate(&self, u: usize) -> Option<usize> {
        self.left_mate[u]
    }

    pub(crate) fn right_mate(&self, v: usize) -> Option<usize> {
        self.right_mate[v]
    }

    /// Mates of every left and every right vertex.
    pub(crate) fn into_mates(self) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        (self.left_mate, self.right_mate)
    }

    fn has_free_pair(&self) -> bool {
        self.left_active.iter().any(|&u| self.left_mate[u].is_none())
            && self.right_active.iter().any(|&v| self.right_mate[v].is_none())
    }

    /// One phase: layer the graph from the free left vertices, then augment
    /// along vertex-disjoint layered paths. False if no path exists.
    fn phase(&mut self) -> bool {
        let mut queue = VecDeque::new();
        for &u in &self.left_active {
            if self.left_mate[u].is_none() {
                self.layer[u] = 0;
                queue.push_back(u);
            } else {
                self.layer[u] = UNREACHED;
            }
        }

        let mut reachable = false;
        while let Some(u) = queue.pop_front() {
            for &v in &self.adjacency[u] {
                match self.right_mate[v] {
                    None => reachable = true,
                    Some(w) if self.layer[w] == UNREACHED => {
                        self.layer[w] = self.layer[u] + 1;
                        queue.push_back(w);
                    }
                    Some(_) => {}
                }
            }
        }
        if !reachable {
            return false;
        }

        for &u in &self.left_active {
            self.cursor[u] = 0;
        }
        let mut augmented = false;
        for i in 0..self.left_active.len() {
            let root = self.left_active[i];
            if self.left_mate[root].is_none() && self.layer[root] == 0 {
                augmented |= self.augment(root);
            }
        }
        augmented
    }

    /// Walk layered edges from the free vertex `root` to a free right vertex
    /// and flip the path. Dead ends drop out of the layering.
    fn augment(&mut self, root: usize) -> bool {
        let mut path: Vec<(usize, usize)> = Vec::new();
        let mut u = root;
        loop {
            let Some(v) = self.adjacency[u].get(self.cursor[u]).copied() else {
                self.layer[u] = UNREACHED;
                match path.pop() {
                    Some((parent, _)) => {
                        u = parent;
                        continue;
                    }
                    None => return false,
                }
            };
            self.cursor[u] += 1;
            match self.right_mate[v] {
                None => {
                    path.push((u, v));
                    for &(left, right) in &path {
                        self.left_mate[left] = Some(right);
                        self.right_mate[right] = Some(left);
                    }
                    return true;
                }
                Some(w) if self.layer[w] == self.layer[u] + 1 => {
                    path.push((u, v));
                    u = w;
                }
                Some(_) => {}
            }
        }
    }
}
