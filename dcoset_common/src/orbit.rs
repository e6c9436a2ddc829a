//! Union-find over points with minimal-class-representative lookup.

use crate::perm::Permutation;

/// A partition of `0..n-1` into disjoint classes, maintained as a
/// union-find forest. Every root carries the minimum element of its class
/// (the `mcr`), which the search core uses to restrict branching to one
/// representative per orbit.
#[derive(Clone, Debug)]
pub struct OrbitPartition {
    parent: Vec<usize>,
    rank: Vec<u32>,
    mcr: Vec<usize>,
}

impl OrbitPartition {
    /// Creates the partition of `n` points into singletons.
    #[must_use]
    pub fn new(n: usize) -> Self {
        OrbitPartition {
            parent: (0..n).collect(),
            rank: vec![0; n],
            mcr: (0..n).collect(),
        }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Tests whether the partition covers no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Resets every class back to a singleton.
    pub fn clear(&mut self) {
        for (i, p) in self.parent.iter_mut().enumerate() {
            *p = i;
        }
        for r in &mut self.rank {
            *r = 0;
        }
        for (i, m) in self.mcr.iter_mut().enumerate() {
            *m = i;
        }
    }

    /// Root of the class containing `point`, with path compression.
    pub fn find(&mut self, point: usize) -> usize {
        let mut root = point;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cursor = point;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Minimum element of the class containing `point`.
    pub fn min_cell_rep(&mut self, point: usize) -> usize {
        let root = self.find(point);
        self.mcr[root]
    }

    /// Merges the classes of `a` and `b`; returns false if they already
    /// coincided.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let min = self.mcr[ra].min(self.mcr[rb]);
        let root = if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
            rb
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
            ra
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
            ra
        };
        self.mcr[root] = min;
        true
    }

    /// Unions every point with its image under `perm`; returns whether any
    /// classes were actually merged.
    pub fn merge_perm(&mut self, perm: &Permutation) -> bool {
        debug_assert_eq!(perm.degree(), self.len());
        let mut merged = false;
        for point in 0..self.len() {
            merged |= self.union(point, perm.apply(point));
        }
        merged
    }

    /// Unions every point with its image under the raw image table `perm`.
    pub fn merge_images(&mut self, perm: &[usize]) -> bool {
        debug_assert_eq!(perm.len(), self.len());
        let mut merged = false;
        for (point, &image) in perm.iter().enumerate() {
            merged |= self.union(point, image);
        }
        merged
    }
}
