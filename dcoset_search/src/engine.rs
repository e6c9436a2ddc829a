//! The double-coset backtracking engine: a lockstep
//! individualization/refinement walk over two partition stacks.

use std::cmp::Ordering;

use dcoset_common::{
    Bitset, CosetError, OrbitPartition, PartitionStack, Permutation, StabilizerChain,
};

use crate::pruner::AutomorphismPruner;
use crate::refine::{
    refine_cells_by_group_orbits, split_point_and_refine, split_point_and_refine_by_orbits,
    Refiner, Side,
};

/// Sentinel for "no point chosen yet at this depth".
const NO_CHOICE: usize = usize::MAX;

/// Tunables for the search engine.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Capacity of the discovered-automorphism ring. Once full, further
    /// automorphisms stop being recorded but retained ones keep pruning.
    pub pruner_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            pruner_capacity: 100,
        }
    }
}

/// Every buffer one engine run needs, allocated once at entry.
///
/// Callers running many searches of the same degree can allocate this
/// themselves and pass it to [`double_coset`]; the engine resets the
/// orbit partitions and flags on entry but never frees a caller-supplied
/// workspace.
pub struct Workspace {
    n: usize,
    left_ps: PartitionStack,
    current_ps: PartitionStack,
    first_ps: PartitionStack,
    /// Per-depth invariant of the left descent.
    indicators: Vec<u64>,
    /// Per-depth candidate points for individualization.
    vertices_to_split: Vec<Bitset>,
    /// Per-depth point individualized on the current branch.
    last_choice: Vec<usize>,
    /// Depths whose candidate set has been intersected with mcr sets.
    reduced: Bitset,
    orbits_of_subgroup: OrbitPartition,
    orbits_of_supergroup: OrbitPartition,
    pruner: AutomorphismPruner,
    /// Row-major `n×n`: row `d` carries search labels into chain
    /// coordinates along the branch prefix of length `d`.
    perm_stack: Vec<usize>,
    cells_to_refine_by: Vec<usize>,
    gamma: Vec<usize>,
    gamma_out: Vec<usize>,
    id_perm: Vec<usize>,
    cell_scratch: Bitset,
    fp_scratch: Bitset,
    mcr_scratch: Bitset,
}

impl Workspace {
    /// Allocates a workspace for degree `n` searches.
    #[must_use]
    pub fn new(n: usize, config: &SearchConfig) -> Self {
        Workspace {
            n,
            left_ps: PartitionStack::unit(n),
            current_ps: PartitionStack::unit(n),
            first_ps: PartitionStack::unit(n),
            indicators: vec![0; n + 1],
            vertices_to_split: (0..n + 1).map(|_| Bitset::new(n)).collect(),
            last_choice: vec![NO_CHOICE; n + 1],
            reduced: Bitset::new(n + 1),
            orbits_of_subgroup: OrbitPartition::new(n),
            orbits_of_supergroup: OrbitPartition::new(n),
            pruner: AutomorphismPruner::new(n, config.pruner_capacity),
            perm_stack: vec![0; n * n],
            cells_to_refine_by: Vec::with_capacity(n),
            gamma: vec![0; n],
            gamma_out: vec![0; n],
            id_perm: (0..n).collect(),
            cell_scratch: Bitset::new(n),
            fp_scratch: Bitset::new(n),
            mcr_scratch: Bitset::new(n),
        }
    }

    /// Degree this workspace was allocated for.
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.n
    }

    fn reset(&mut self) {
        self.orbits_of_subgroup.clear();
        self.orbits_of_supergroup.clear();
        self.pruner.clear();
        self.reduced.clear();
        for choice in &mut self.last_choice {
            *choice = NO_CHOICE;
        }
    }
}

/// Decides whether some element of the group carries the left structure
/// onto the right one, returning one such element if so.
///
/// `partition1` is the depth-0 partition over the left structure, with
/// the mins-first invariant in force. `ordering2` gives the initial
/// ordering of the right structure (identity if `None`); it composes
/// into every candidate the client sees, so a non-identity ordering
/// shifts which group elements count as matches. `group` is the
/// stabilizer chain to search within, or `None` for the full symmetric
/// group. The only error is allocation failure while extending the
/// chain's base.
///
/// Degenerate degree 0 reports no isomorphism immediately.
pub fn double_coset<R: Refiner>(
    client: &mut R,
    partition1: &PartitionStack,
    ordering2: Option<&[usize]>,
    group: Option<&StabilizerChain>,
    work_space: Option<&mut Workspace>,
    config: &SearchConfig,
) -> Result<Option<Permutation>, CosetError> {
    let n = partition1.n();
    if n == 0 {
        return Ok(None);
    }
    debug_assert!(partition1.depth() == 0, "partition1 must be at depth 0");
    debug_assert!(
        partition1.cells().all(|(start, end)| {
            let cell = &partition1.entries()[start..=end];
            cell.iter().min() == cell.first()
        }),
        "partition1 must have mins first"
    );

    let mut owned;
    let ws = match work_space {
        Some(ws) => {
            debug_assert_eq!(ws.n, n, "workspace degree mismatch");
            ws.reset();
            ws
        }
        None => {
            owned = Workspace::new(n, config);
            &mut owned
        }
    };

    let rho: Vec<usize> = ordering2.map_or_else(|| (0..n).collect(), <[usize]>::to_vec);
    debug_assert_eq!(rho.len(), n, "ordering2 degree mismatch");

    // Base-point insertion builds a fresh chain while the previous
    // handle stays valid; the old one is released only once the new one
    // is complete.
    let mut group_cur: Option<StabilizerChain> = group.cloned();

    tracing::debug!(
        degree = n,
        subgroup = group_cur.is_some(),
        "double coset search started"
    );

    // Phase 0: seed both stacks and refine at depth 0.
    ws.left_ps.copy_from(partition1);
    ws.current_ps.copy_from(&ws.left_ps);
    if let Some(g) = group_cur.as_ref() {
        g.identify(&mut ws.perm_stack[..n]);
    }

    let initial_fronts: Vec<usize> = ws.left_ps.cells().map(|(start, _)| start).collect();

    ws.cells_to_refine_by.clear();
    ws.cells_to_refine_by.extend_from_slice(&initial_fronts);
    let inv_left =
        client.refine_and_return_invariant(Side::Left, &mut ws.left_ps, &mut ws.cells_to_refine_by);
    if let Some(g) = group_cur.as_ref() {
        refine_cells_by_group_orbits(
            &mut ws.left_ps,
            &mut ws.cells_to_refine_by,
            g,
            &ws.perm_stack,
            &mut ws.orbits_of_supergroup,
        );
    }
    ws.left_ps.move_all_mins_to_front();

    ws.cells_to_refine_by.clear();
    ws.cells_to_refine_by.extend_from_slice(&initial_fronts);
    let inv_right = client.refine_and_return_invariant(
        Side::Right,
        &mut ws.current_ps,
        &mut ws.cells_to_refine_by,
    );
    if let Some(g) = group_cur.as_ref() {
        refine_cells_by_group_orbits(
            &mut ws.current_ps,
            &mut ws.cells_to_refine_by,
            g,
            &ws.perm_stack,
            &mut ws.orbits_of_supergroup,
        );
    }
    ws.current_ps.move_all_mins_to_front();

    if inv_left != inv_right || !ws.left_ps.is_equivalent(&ws.current_ps) {
        return Ok(None);
    }
    ws.indicators[0] = inv_left;

    // Phase 1: descend the left stack to a discrete partition, extending
    // the chain's base along the way in the subgroup case.
    while !ws.left_ps.is_discrete() {
        let d = ws.left_ps.depth();
        let k = ws.left_ps.first_smallest(&mut ws.cell_scratch);
        if let Some(g) = group_cur.as_ref() {
            g.orbits_at_level(d, &mut ws.orbits_of_supergroup);
            let b = ws
                .orbits_of_supergroup
                .min_cell_rep(ws.perm_stack[d * n + k]);
            let extended = g.insert_base_point(d, b)?;
            extended.update_perm_stack(d, k, &mut ws.perm_stack);
            group_cur = Some(extended);
        }
        let inv = if let Some(g) = group_cur.as_ref() {
            split_point_and_refine_by_orbits(
                client,
                Side::Left,
                &mut ws.left_ps,
                k,
                &mut ws.cells_to_refine_by,
                g,
                &ws.perm_stack,
                &mut ws.orbits_of_supergroup,
            )
        } else {
            split_point_and_refine(
                client,
                Side::Left,
                &mut ws.left_ps,
                k,
                &mut ws.cells_to_refine_by,
            )
        };
        ws.indicators[ws.left_ps.depth()] = inv;
    }
    let max_depth = ws.left_ps.depth();
    tracing::debug!(max_depth, "left stack discrete");

    // Phases 2 and 3: walk the right tree. Before the first matching
    // leaf exists this is the plain first-leaf descent; afterwards the
    // pruning machinery engages.
    let mut depth: isize = 0;
    let mut first_found = false;
    let mut first_meets_current: isize = -1;
    let mut first_kids_are_same: usize = 0;
    let mut current_kids_are_same: usize = 0;
    let mut primary_orbit_size: usize = 0;
    let mut minimal_in_primary_orbit: usize = 0;
    let mut result: Option<Permutation> = None;

    if !ws.current_ps.is_discrete() {
        init_depth(ws, 0);
    }

    while depth >= 0 {
        let d = depth as usize;

        if ws.current_ps.is_discrete() {
            // Leaf handling.
            if !first_found {
                ws.left_ps.get_perm_from(&ws.current_ps, &mut ws.gamma);
                compose_ordering(&rho, &ws.gamma, &mut ws.gamma_out);
                if client.compare_structures(Side::Left, Side::Right, &ws.gamma_out, &ws.id_perm)
                    == Ordering::Equal
                    && in_group(group_cur.as_ref(), &ws.gamma_out)
                {
                    result = Some(Permutation::from_images_unchecked(ws.gamma_out.clone()));
                    break;
                }
                ws.first_ps.copy_from(&ws.current_ps);
                first_found = true;
                first_meets_current = d as isize;
                first_kids_are_same = d;
                depth = d as isize - 1;
                if depth >= 0 {
                    ws.current_ps.set_depth(depth as usize);
                }
                continue;
            }

            // Against the first leaf: an automorphism of the right
            // structure prunes siblings along the first path.
            ws.first_ps.get_perm_from(&ws.current_ps, &mut ws.gamma);
            conjugate_by_ordering(&rho, &ws.gamma, &mut ws.gamma_out);
            if client.compare_structures(Side::Right, Side::Right, &ws.gamma_out, &ws.id_perm)
                == Ordering::Equal
                && in_group(group_cur.as_ref(), &ws.gamma_out)
            {
                tracing::trace!("automorphism recorded");
                ws.pruner.record_perm(&ws.gamma);
                ws.orbits_of_subgroup.merge_images(&ws.gamma);
                if ws.orbits_of_subgroup.min_cell_rep(minimal_in_primary_orbit)
                    != minimal_in_primary_orbit
                {
                    // The primary orbit is being absorbed into a class
                    // with a smaller minimum; its count is stale.
                    primary_orbit_size = 0;
                }
                depth = first_meets_current;
                ws.current_ps.set_depth(depth as usize);
                continue;
            }

            // Against the left leaf: a match ends the search.
            ws.left_ps.get_perm_from(&ws.current_ps, &mut ws.gamma);
            compose_ordering(&rho, &ws.gamma, &mut ws.gamma_out);
            if client.compare_structures(Side::Left, Side::Right, &ws.gamma_out, &ws.id_perm)
                == Ordering::Equal
                && in_group(group_cur.as_ref(), &ws.gamma_out)
            {
                result = Some(Permutation::from_images_unchecked(ws.gamma_out.clone()));
                break;
            }

            // Dead leaf: every sibling above the last depth whose
            // children are known distinct is equivalent to this one.
            if current_kids_are_same < d {
                ws.current_ps.set_depth(current_kids_are_same);
                ws.current_ps.fixed_points(&mut ws.fp_scratch);
                ws.current_ps.cell_minima(&mut ws.mcr_scratch);
                ws.pruner
                    .record_structural(&ws.fp_scratch, &ws.mcr_scratch);
            }
            depth = current_kids_are_same as isize - 1;
            if depth >= 0 {
                ws.current_ps.set_depth(depth as usize);
            }
            continue;
        }

        // Choose the next vertex to individualize at depth `d`.
        let candidate = if !first_found {
            next_plain(
                &ws.vertices_to_split[d],
                ws.last_choice[d],
                d,
                n,
                group_cur.as_ref(),
                &ws.perm_stack,
            )
        } else if d as isize > first_meets_current {
            // Off the first-leaf path: reduce the candidates once with
            // the recorded automorphisms, then step through what's left.
            if !ws.reduced.contains(d) {
                ws.cell_scratch.clear();
                for &chosen in &ws.last_choice[..d] {
                    ws.cell_scratch.insert(chosen);
                }
                ws.pruner
                    .reduce_candidates(&mut ws.vertices_to_split[d], &ws.cell_scratch);
                ws.reduced.insert(d);
            }
            next_plain(
                &ws.vertices_to_split[d],
                ws.last_choice[d],
                d,
                n,
                group_cur.as_ref(),
                &ws.perm_stack,
            )
        } else {
            // On the first-leaf path: primary-orbit accounting.
            if (d as isize) < first_meets_current {
                first_meets_current = d as isize;
                primary_orbit_size = 0;
                minimal_in_primary_orbit = ws.vertices_to_split[d].min().unwrap_or(0);
            }
            let visited = ws.last_choice[d];
            if visited != NO_CHOICE {
                let visited_class = ws.orbits_of_subgroup.find(visited);
                let minimal_class = ws.orbits_of_subgroup.find(minimal_in_primary_orbit);
                if visited_class == minimal_class {
                    primary_orbit_size += 1;
                }
            }
            let next = next_minimal_rep(
                &ws.vertices_to_split[d],
                ws.last_choice[d],
                d,
                n,
                group_cur.as_ref(),
                &ws.perm_stack,
                &mut ws.orbits_of_subgroup,
            );
            if next.is_none() {
                // Every candidate proven to lie in the primary orbit
                // makes the children of this node of the first leaf's
                // path mutually equivalent.
                if ws.vertices_to_split[d].len() == primary_orbit_size
                    && first_kids_are_same == d + 1
                {
                    first_kids_are_same = d;
                }
                primary_orbit_size = 0;
            }
            next
        };

        let Some(chosen) = candidate else {
            depth -= 1;
            if depth >= 0 {
                ws.current_ps.set_depth(depth as usize);
            }
            continue;
        };
        ws.last_choice[d] = chosen;

        // Try the candidate: individualize, refine, check against the
        // left descent.
        if let Some(g) = group_cur.as_ref() {
            g.update_perm_stack(d, chosen, &mut ws.perm_stack);
        }
        let inv = if let Some(g) = group_cur.as_ref() {
            split_point_and_refine_by_orbits(
                client,
                Side::Right,
                &mut ws.current_ps,
                chosen,
                &mut ws.cells_to_refine_by,
                g,
                &ws.perm_stack,
                &mut ws.orbits_of_supergroup,
            )
        } else {
            split_point_and_refine(
                client,
                Side::Right,
                &mut ws.current_ps,
                chosen,
                &mut ws.cells_to_refine_by,
            )
        };
        let new_depth = ws.current_ps.depth();
        ws.left_ps.set_depth(new_depth);
        let equivalent = ws.left_ps.is_equivalent(&ws.current_ps);
        ws.left_ps.set_depth(max_depth);
        if inv != ws.indicators[new_depth] || !equivalent {
            // Pruned: forget the split and move to the next candidate.
            ws.current_ps.set_depth(d);
            continue;
        }

        if !client.all_children_are_equivalent(Side::Right, &ws.current_ps) {
            current_kids_are_same = new_depth;
        }
        depth = new_depth as isize;
        if !ws.current_ps.is_discrete() {
            init_depth(ws, new_depth);
        }
    }

    tracing::debug!(found = result.is_some(), "double coset search finished");
    Ok(result)
}

/// Seeds the candidate state for a freshly entered depth: the earliest
/// non-singleton cell's membership, no choice made, not yet reduced.
fn init_depth(ws: &mut Workspace, depth: usize) {
    ws.current_ps.first_smallest(&mut ws.vertices_to_split[depth]);
    ws.last_choice[depth] = NO_CHOICE;
    ws.reduced.remove(depth);
}

/// Next candidate after `last` that the chain's level Schreier tree can
/// reach. Without a group every candidate passes.
fn next_plain(
    candidates: &Bitset,
    last: usize,
    depth: usize,
    n: usize,
    group: Option<&StabilizerChain>,
    perm_stack: &[usize],
) -> Option<usize> {
    let mut cursor = if last == NO_CHOICE {
        candidates.next_bit(0)
    } else {
        candidates.next_bit_after(last)
    };
    while let Some(c) = cursor {
        if group.is_none_or(|g| g.is_in_level_orbit(depth, perm_stack[depth * n + c])) {
            return Some(c);
        }
        cursor = candidates.next_bit_after(c);
    }
    None
}

/// As [`next_plain`], but additionally requires the candidate to be the
/// minimal representative of its class under the discovered subgroup.
#[allow(clippy::too_many_arguments)]
fn next_minimal_rep(
    candidates: &Bitset,
    last: usize,
    depth: usize,
    n: usize,
    group: Option<&StabilizerChain>,
    perm_stack: &[usize],
    orbits: &mut OrbitPartition,
) -> Option<usize> {
    let mut cursor = if last == NO_CHOICE {
        candidates.next_bit(0)
    } else {
        candidates.next_bit_after(last)
    };
    while let Some(c) = cursor {
        let reachable =
            group.is_none_or(|g| g.is_in_level_orbit(depth, perm_stack[depth * n + c]));
        if reachable && orbits.min_cell_rep(c) == c {
            return Some(c);
        }
        cursor = candidates.next_bit_after(c);
    }
    None
}

/// `out = ordering ∘ gamma`: carries a search-space pairing into the
/// right structure's initial ordering.
fn compose_ordering(ordering: &[usize], gamma: &[usize], out: &mut [usize]) {
    for (slot, &image) in out.iter_mut().zip(gamma) {
        *slot = ordering[image];
    }
}

/// `out = ordering ∘ gamma ∘ ordering⁻¹`: carries a search-space
/// automorphism of the right structure into its initial ordering.
fn conjugate_by_ordering(ordering: &[usize], gamma: &[usize], out: &mut [usize]) {
    for (point, &image) in gamma.iter().enumerate() {
        out[ordering[point]] = ordering[image];
    }
}

fn in_group(group: Option<&StabilizerChain>, images: &[usize]) -> bool {
    group.is_none_or(|g| g.contains(images))
}
