//! The discovered-automorphism cache: fixed-point and minimal-cycle-
//! representative bitsets for generators found during the search.

use dcoset_common::Bitset;

/// A bounded ring of `(fixed points, minimal cycle representatives)`
/// pairs, one per recorded automorphism.
///
/// When the engine is about to branch at a depth whose candidate set has
/// not yet been reduced, it intersects the candidates with the `mcr` set
/// of every recorded generator whose fixed points cover all points
/// individualized so far on the branch. Such a generator's action stays
/// within the branch, so restricting to minimal cycle representatives
/// loses no coset.
pub struct AutomorphismPruner {
    fp: Vec<Bitset>,
    mcr: Vec<Bitset>,
    len: usize,
}

impl AutomorphismPruner {
    /// Creates a pruner for degree `n` retaining at most `capacity`
    /// generators. All bitsets are allocated up front.
    #[must_use]
    pub fn new(n: usize, capacity: usize) -> Self {
        AutomorphismPruner {
            fp: (0..capacity).map(|_| Bitset::new(n)).collect(),
            mcr: (0..capacity).map(|_| Bitset::new(n)).collect(),
            len: 0,
        }
    }

    /// Number of generators currently retained.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Tests whether no generator has been recorded yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every recorded generator.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Records the fixed points and minimal cycle representatives of the
    /// permutation given by its image table. Once the ring is full,
    /// further automorphisms are dropped; the retained entries still
    /// describe real symmetries, so pruning stays sound.
    pub fn record_perm(&mut self, images: &[usize]) {
        if self.len == self.fp.len() {
            return;
        }
        let fp = &mut self.fp[self.len];
        let mcr = &mut self.mcr[self.len];
        fp.clear();
        mcr.clear();
        for (point, &image) in images.iter().enumerate() {
            if image == point {
                fp.insert(point);
                mcr.insert(point);
                continue;
            }
            // Walk the cycle once from its least element; every point on
            // it gets visited from its own start, so only the minimum
            // survives the check below.
            let mut cursor = image;
            let mut min = point;
            while cursor != point {
                min = min.min(cursor);
                cursor = images[cursor];
            }
            if min == point {
                mcr.insert(point);
            }
        }
        self.len += 1;
    }

    /// Records a pseudo-generator from structural predicates rather than
    /// a permutation's cycles.
    pub fn record_structural(&mut self, fp: &Bitset, mcr: &Bitset) {
        if self.len == self.fp.len() {
            return;
        }
        self.fp[self.len].clone_from(fp);
        self.mcr[self.len].clone_from(mcr);
        self.len += 1;
    }

    /// Intersects `candidates` with the `mcr` set of every retained
    /// generator whose fixed points cover `individualized`.
    pub fn reduce_candidates(&self, candidates: &mut Bitset, individualized: &Bitset) {
        for i in 0..self.len {
            if self.fp[i].is_superset_of(individualized) {
                candidates.intersect_with(&self.mcr[i]);
            }
        }
    }
}
