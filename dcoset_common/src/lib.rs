//! Shared combinatorial data structures for the double-coset search engine.
//!
//! Everything here is indexed over the point set `0..n-1`: bitsets,
//! permutations, orbit partitions (union-find with minimal class
//! representatives), ordered partition stacks, and stabilizer chains.

pub mod bitset;
pub mod error;
pub mod orbit;
pub mod partition;
pub mod perm;
pub mod stabilizer;

pub use bitset::Bitset;
pub use error::CosetError;
pub use orbit::OrbitPartition;
pub use partition::PartitionStack;
pub use perm::Permutation;
pub use stabilizer::StabilizerChain;
