//! The refinement driver: client callbacks and the individualize-then-
//! refine step shared by both partition stacks.

use std::cmp::Ordering;

use dcoset_common::{OrbitPartition, PartitionStack, StabilizerChain};

/// Which of the two structures a callback is being asked about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The first structure, under the left partition stack.
    Left,
    /// The second structure, under the current partition stack.
    Right,
}

/// Client callbacks driving the search.
///
/// Implementations own the two structures being compared; the engine
/// addresses them through [`Side`].
pub trait Refiner {
    /// Canonically refines the stack's active partition, splitting cells
    /// as the structure dictates, and returns an invariant of the result.
    ///
    /// `cells_to_refine_by` holds the positions of just-changed cell
    /// fronts; the callback may consume it as a work queue and must push
    /// the front of every cell it splits off. The returned value must be
    /// invariant under the diagonal `S_n` action on structure, partition
    /// and cell list.
    fn refine_and_return_invariant(
        &mut self,
        side: Side,
        ps: &mut PartitionStack,
        cells_to_refine_by: &mut Vec<usize>,
    ) -> u64;

    /// Total order on the structure class. `gamma_1` and `gamma_2` arrive
    /// in inverse form; `Ordering::Equal` means `γ₁⁻¹·S_a = γ₂⁻¹·S_b`.
    /// Implementations should index through the given tables rather than
    /// materialize inverses.
    fn compare_structures(
        &mut self,
        side_1: Side,
        side_2: Side,
        gamma_1: &[usize],
        gamma_2: &[usize],
    ) -> Ordering;

    /// Hint that every child of the active partition's node leads to an
    /// equivalent subtree. May under-report (`false` is always sound),
    /// must never over-report.
    fn all_children_are_equivalent(&mut self, _side: Side, _ps: &PartitionStack) -> bool {
        false
    }
}

/// Pushes a new depth, individualizes `point`, runs the client
/// refinement seeded with the new singleton's cell front, and restores
/// mins-first. Returns the client's invariant.
pub(crate) fn split_point_and_refine<R: Refiner>(
    client: &mut R,
    side: Side,
    ps: &mut PartitionStack,
    point: usize,
    cells_to_refine_by: &mut Vec<usize>,
) -> u64 {
    let pos = ps.split_point(point);
    cells_to_refine_by.clear();
    cells_to_refine_by.push(pos);
    let invariant = client.refine_and_return_invariant(side, ps, cells_to_refine_by);
    ps.move_all_mins_to_front();
    invariant
}

/// As [`split_point_and_refine`], but afterwards further splits every
/// cell by the orbits of the group stabilized to the new depth, with
/// generators conjugated through the perm stack row for that depth.
///
/// The caller must have composed the perm stack row for the new depth
/// before invoking this, so the conjugation below reads valid data.
#[allow(clippy::too_many_arguments)]
pub(crate) fn split_point_and_refine_by_orbits<R: Refiner>(
    client: &mut R,
    side: Side,
    ps: &mut PartitionStack,
    point: usize,
    cells_to_refine_by: &mut Vec<usize>,
    group: &StabilizerChain,
    perm_stack: &[usize],
    orbits: &mut OrbitPartition,
) -> u64 {
    let pos = ps.split_point(point);
    cells_to_refine_by.clear();
    cells_to_refine_by.push(pos);
    let invariant = client.refine_and_return_invariant(side, ps, cells_to_refine_by);
    refine_cells_by_group_orbits(ps, cells_to_refine_by, group, perm_stack, orbits);
    ps.move_all_mins_to_front();
    invariant
}

/// Splits every cell of the active partition by the orbit classes of the
/// level-stabilizer generators, so each cell becomes a union of orbits.
///
/// Points are carried into chain coordinates by the perm stack row for
/// the active depth, pushed through each generator, and carried back.
/// Also used directly at depth 0 during setup, where the row is the
/// identity and the generators are the whole group's.
pub(crate) fn refine_cells_by_group_orbits(
    ps: &mut PartitionStack,
    cells_to_refine_by: &mut Vec<usize>,
    group: &StabilizerChain,
    perm_stack: &[usize],
    orbits: &mut OrbitPartition,
) {
    let n = ps.n();
    let level = ps.depth();
    let row = &perm_stack[level * n..(level + 1) * n];

    // Orbits live in chain coordinates; keying cells through the row
    // keeps the induced order canonical across branches.
    orbits.clear();
    for r#gen in group.generators(level) {
        for point in 0..n {
            orbits.union(point, r#gen.apply(point));
        }
    }

    let cell_starts: Vec<usize> = ps.cells().map(|(start, _)| start).collect();
    for start in cell_starts {
        ps.split_cell_by_classes(start, |p| orbits.min_cell_rep(row[p]), cells_to_refine_by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcoset_common::Permutation;

    /// A refiner that never splits and reports a constant invariant.
    struct Inert;

    impl Refiner for Inert {
        fn refine_and_return_invariant(
            &mut self,
            _side: Side,
            _ps: &mut PartitionStack,
            _cells: &mut Vec<usize>,
        ) -> u64 {
            1
        }

        fn compare_structures(
            &mut self,
            _s1: Side,
            _s2: Side,
            g1: &[usize],
            g2: &[usize],
        ) -> Ordering {
            g1.cmp(g2)
        }
    }

    #[test]
    fn split_and_refine_restores_mins_first() {
        let mut ps = PartitionStack::unit(5);
        let mut cells = Vec::new();
        let inv = split_point_and_refine(&mut Inert, Side::Left, &mut ps, 3, &mut cells);
        assert_eq!(inv, 1);
        assert_eq!(ps.depth(), 1);
        assert_eq!(ps.entry(0), 3);
        // Remainder cell leads with its minimum again.
        assert_eq!(ps.entry(1), 0);
        assert_eq!(cells, vec![0]);
    }

    #[test]
    fn orbit_refinement_cuts_cells_to_orbit_unions() {
        // <(0 1 2), (3 4)> with base (0, 3): the stabilizer of 0 still
        // swaps 3 and 4.
        let gens = [
            Permutation::from_images(vec![1, 2, 0, 3, 4]).unwrap(),
            Permutation::from_images(vec![0, 1, 2, 4, 3]).unwrap(),
        ];
        let group = StabilizerChain::from_generators_with_base(5, &gens, &[0, 3]).unwrap();
        let mut ps = PartitionStack::unit(5);
        let mut orbits = OrbitPartition::new(5);
        let mut cells = Vec::new();
        // Identity rows for every depth.
        let perm_stack: Vec<usize> = (0..5).flat_map(|_| 0..5).collect();

        let inv = split_point_and_refine_by_orbits(
            &mut Inert,
            Side::Right,
            &mut ps,
            0,
            &mut cells,
            &group,
            &perm_stack,
            &mut orbits,
        );
        assert_eq!(inv, 1);
        // {0} individualized; the remainder cut by the orbits of the
        // stabilizer of 0: singletons 1 and 2, the pair {3, 4}.
        let sizes: Vec<usize> = ps.cells().map(|(s, e)| e - s + 1).collect();
        assert_eq!(sizes, vec![1, 1, 1, 2]);
        assert_eq!(ps.entries(), &[0, 1, 2, 3, 4]);
    }
}
