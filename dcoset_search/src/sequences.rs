//! Integer-sequence structures: the simplest client of the engine.
//!
//! A structure is a length-`n` sequence of integers acted on by
//! relabeling positions. A sequence has no local structure for
//! refinement to exploit, so the refiner is inert and all pruning comes
//! from the group; comparison reads both sequences through the candidate
//! tables without materializing inverses.

use std::cmp::Ordering;

use itertools::Itertools;

use dcoset_common::{CosetError, PartitionStack, Permutation, StabilizerChain};

use crate::engine::{double_coset, SearchConfig};
use crate::refine::{Refiner, Side};

/// A pair of integer sequences compared under position relabeling.
pub struct SequencePair<'a, T> {
    s1: &'a [T],
    s2: &'a [T],
}

impl<'a, T> SequencePair<'a, T> {
    /// Pairs two sequences of common length.
    #[must_use]
    pub fn new(s1: &'a [T], s2: &'a [T]) -> Self {
        debug_assert_eq!(s1.len(), s2.len());
        SequencePair { s1, s2 }
    }

    fn side(&self, side: Side) -> &'a [T] {
        match side {
            Side::Left => self.s1,
            Side::Right => self.s2,
        }
    }
}

impl<T: Ord> Refiner for SequencePair<'_, T> {
    fn refine_and_return_invariant(
        &mut self,
        _side: Side,
        _ps: &mut PartitionStack,
        _cells_to_refine_by: &mut Vec<usize>,
    ) -> u64 {
        // Every position looks alike to a bare sequence.
        0
    }

    fn compare_structures(
        &mut self,
        side_1: Side,
        side_2: Side,
        gamma_1: &[usize],
        gamma_2: &[usize],
    ) -> Ordering {
        let a = self.side(side_1);
        let b = self.side(side_2);
        gamma_1
            .iter()
            .zip_eq(gamma_2)
            .map(|(&x, &y)| a[x].cmp(&b[y]))
            .find(|&ord| ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// Decides whether some `σ` in the group generated by `gens` carries the
/// sequence `perm1` onto `perm2` (acting by `σ·S = S ∘ σ⁻¹`), returning
/// one such `σ` if so.
///
/// Repeated calls bucket a finite set of permutations into cosets of the
/// generated group.
///
/// # Errors
///
/// Fails if a generator is not a permutation of `0..n-1` or if chain
/// construction hits an allocation failure.
pub fn coset_eq(
    perm1: &[usize],
    perm2: &[usize],
    gens: &[Vec<usize>],
) -> Result<Option<Permutation>, CosetError> {
    debug_assert_eq!(perm1.len(), perm2.len());
    let n = perm1.len();
    let gens: Vec<Permutation> = gens
        .iter()
        .map(|images| Permutation::from_images(images.clone()))
        .collect::<Result<_, _>>()?;
    let group = StabilizerChain::from_generators(n, &gens)?;
    let mut client = SequencePair::new(perm1, perm2);
    let found = double_coset(
        &mut client,
        &PartitionStack::unit(n),
        None,
        Some(&group),
        None,
        &SearchConfig::default(),
    )?;
    // The engine hands back the pairing in inverse form.
    Ok(found.map(|gamma| gamma.inverse()))
}
