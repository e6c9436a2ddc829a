//! Double-coset / isomorphism search over structures with a symmetric
//! group action.
//!
//! Given two structures of common degree `n` and a subgroup `G ≤ S_n`
//! (or the full symmetric group), the engine decides whether some
//! `γ ∈ G` carries the first structure onto the second under a
//! client-supplied equality, and returns one such `γ` if so. The search
//! is an individualization/refinement tree walk in the McKay–Leon style:
//! two partition stacks descend in lockstep, client invariants prune
//! mismatched branches, and automorphisms discovered along the way prune
//! siblings of unexplored nodes.

mod engine;
mod pruner;
mod refine;

pub mod sequences;

pub use engine::{double_coset, SearchConfig, Workspace};
pub use pruner::AutomorphismPruner;
pub use refine::{Refiner, Side};
