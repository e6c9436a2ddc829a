//! Stabilizer chains: a permutation group presented as a tower of
//! point-stabilizers with Schreier-tree transversals.
//!
//! The search engine consumes a chain through a narrow contract:
//! membership tests, per-level generators, Schreier-tree reachability,
//! base-point insertion and perm-stack composition. Construction from a
//! generator list (Schreier–Sims) is provided so callers can stand up a
//! chain without a separate group library.

use crate::error::CosetError;
use crate::orbit::OrbitPartition;
use crate::perm::Permutation;

/// One level of the chain: the stabilizer of all earlier base points,
/// with a Schreier tree rooted at this level's base point.
#[derive(Clone, Debug)]
struct Level {
    base_point: usize,
    /// Strong generators fixing every earlier base point.
    gens: Vec<Permutation>,
    /// Inverses of `gens`, index-aligned.
    gen_invs: Vec<Permutation>,
    /// `parent[p] == -1` iff `p` is not in this level's orbit; the root's
    /// parent is itself.
    parent: Vec<i64>,
    /// For non-root orbit points, the index into `gens` of the generator
    /// carrying `parent[p]` to `p`.
    label: Vec<usize>,
}

/// Allocates a point-indexed array, surfacing allocation failure
/// instead of aborting.
fn try_point_vec<T: Clone>(n: usize, fill: T, what: &str) -> Result<Vec<T>, CosetError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(n)
        .map_err(|_| CosetError::allocation(what))?;
    buf.resize(n, fill);
    Ok(buf)
}

impl Level {
    fn try_new(n: usize, base_point: usize) -> Result<Self, CosetError> {
        Ok(Level {
            base_point,
            gens: Vec::new(),
            gen_invs: Vec::new(),
            parent: try_point_vec(n, -1, "schreier tree parents")?,
            label: try_point_vec(n, 0, "schreier tree labels")?,
        })
    }

    fn in_orbit(&self, point: usize) -> bool {
        self.parent[point] != -1
    }

    /// Rebuilds the Schreier tree by breadth-first search from the root.
    fn rebuild_tree(&mut self) {
        for p in &mut self.parent {
            *p = -1;
        }
        self.parent[self.base_point] = self.base_point as i64;
        let mut queue = std::collections::VecDeque::from([self.base_point]);
        while let Some(point) = queue.pop_front() {
            for (idx, r#gen) in self.gens.iter().enumerate() {
                let image = r#gen.apply(point);
                if self.parent[image] == -1 {
                    self.parent[image] = point as i64;
                    self.label[image] = idx;
                    queue.push_back(image);
                }
            }
        }
    }

    /// The transversal element `u` with `u(base_point) = point`, composed
    /// along the tree path. Requires `point` in the orbit.
    fn transversal(&self, point: usize, n: usize) -> Permutation {
        let mut u = Permutation::identity(n);
        let mut cursor = point;
        while self.parent[cursor] as usize != cursor {
            // Undo the edge into `cursor` after everything walked so far.
            u = self.gen_invs[self.label[cursor]].compose(&u);
            cursor = self.parent[cursor] as usize;
        }
        // Accumulated u maps point back to the root; the transversal is
        // its inverse.
        u.inverse()
    }

    fn orbit_size(&self) -> usize {
        self.parent.iter().filter(|&&p| p != -1).count()
    }
}

/// A stabilizer chain for a subgroup of `S_n`.
#[derive(Clone, Debug)]
pub struct StabilizerChain {
    n: usize,
    levels: Vec<Level>,
    strong_gens: Vec<Permutation>,
}

impl StabilizerChain {
    /// Builds a chain for the group generated by `gens`, choosing base
    /// points as needed.
    pub fn from_generators(n: usize, gens: &[Permutation]) -> Result<Self, CosetError> {
        Self::from_generators_with_base(n, gens, &[])
    }

    /// Builds a chain whose base starts with `prescribed` (possibly with
    /// redundant points), extended as needed.
    ///
    /// # Errors
    ///
    /// Fails on a generator of the wrong degree, or on allocation
    /// failure while building the Schreier trees.
    pub fn from_generators_with_base(
        n: usize,
        gens: &[Permutation],
        prescribed: &[usize],
    ) -> Result<Self, CosetError> {
        for r#gen in gens {
            if r#gen.degree() != n {
                return Err(CosetError::DegreeMismatch {
                    expected: n,
                    actual: r#gen.degree(),
                });
            }
        }
        let levels = prescribed
            .iter()
            .map(|&b| Level::try_new(n, b))
            .collect::<Result<Vec<_>, _>>()?;
        let mut chain = StabilizerChain {
            n,
            levels,
            strong_gens: gens.iter().filter(|g| !g.is_identity()).cloned().collect(),
        };
        chain.close()?;
        tracing::debug!(
            degree = n,
            base_size = chain.base_size(),
            order = chain.order(),
            "stabilizer chain built"
        );
        Ok(chain)
    }

    /// Degree of the chain's point set.
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.n
    }

    /// Number of base points.
    #[must_use]
    pub fn base_size(&self) -> usize {
        self.levels.len()
    }

    /// The base point at `level`, if the chain is that deep.
    #[must_use]
    pub fn base_point(&self, level: usize) -> Option<usize> {
        self.levels.get(level).map(|l| l.base_point)
    }

    /// Order of the group, as the product of orbit sizes.
    #[must_use]
    pub fn order(&self) -> u128 {
        self.levels
            .iter()
            .map(|level| level.orbit_size() as u128)
            .product()
    }

    /// Generators of the stabilizer of the first `level` base points.
    /// Levels past the base have the trivial stabilizer.
    #[must_use]
    pub fn generators(&self, level: usize) -> &[Permutation] {
        self.levels.get(level).map_or(&[], |l| l.gens.as_slice())
    }

    /// Writes the identity permutation into `buf`.
    pub fn identify(&self, buf: &mut [usize]) {
        debug_assert_eq!(buf.len(), self.n);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = i;
        }
    }

    /// Tests whether the level-`level` Schreier tree reaches `point`.
    /// Levels past the base reject everything but pruning must stay
    /// conservative there, so they report `true`.
    #[must_use]
    pub fn is_in_level_orbit(&self, level: usize, point: usize) -> bool {
        self.levels.get(level).is_none_or(|l| l.in_orbit(point))
    }

    /// Tests membership of the permutation given by its image table.
    #[must_use]
    pub fn contains(&self, images: &[usize]) -> bool {
        debug_assert_eq!(images.len(), self.n);
        let Ok(perm) = Permutation::from_images(images.to_vec()) else {
            return false;
        };
        let (residue, _) = self.sift(0, perm);
        residue.is_identity()
    }

    /// Produces a new chain for the same group whose level-`level` base
    /// point is `point`.
    ///
    /// # Errors
    ///
    /// Surfaces allocation failure during the rebuild.
    pub fn insert_base_point(
        &self,
        level: usize,
        point: usize,
    ) -> Result<StabilizerChain, CosetError> {
        if self.base_point(level) == Some(point) {
            return Ok(self.clone());
        }
        let cut = level.min(self.levels.len());
        let mut base: Vec<usize> = self.levels[..cut].iter().map(|l| l.base_point).collect();
        base.push(point);
        base.extend(
            self.levels[cut..]
                .iter()
                .map(|l| l.base_point)
                .filter(|&b| b != point),
        );
        Self::from_generators_with_base(self.n, &self.strong_gens, &base)
    }

    /// Composes the level-`level` transversal element for `point` into the
    /// row-major `n×n` perm stack: row `level + 1` becomes
    /// `u⁻¹ ∘ row(level)` where `u` carries the level's base point to the
    /// image of `point` under row `level`.
    pub fn update_perm_stack(&self, level: usize, point: usize, perm_stack: &mut [usize]) {
        let n = self.n;
        debug_assert_eq!(perm_stack.len(), n * n);
        let target = perm_stack[level * n + point];
        let u_inv = match self.levels.get(level) {
            Some(lvl) if lvl.in_orbit(target) => lvl.transversal(target, n).inverse(),
            _ => Permutation::identity(n),
        };
        for i in 0..n {
            perm_stack[(level + 1) * n + i] = u_inv.apply(perm_stack[level * n + i]);
        }
    }

    /// Merges the orbits of all generators at levels `>= level` into `out`.
    pub fn orbits_at_level(&self, level: usize, out: &mut OrbitPartition) {
        out.clear();
        // Per-level generator lists are nested by construction, so the
        // union over deeper levels is already the level's own list.
        for r#gen in self.generators(level) {
            out.merge_perm(r#gen);
        }
    }

    /// Sifts `perm` through levels `start..`, returning the residue and
    /// the level at which stripping stopped.
    fn sift(&self, start: usize, perm: Permutation) -> (Permutation, usize) {
        let mut residue = perm;
        for (offset, level) in self.levels[start..].iter().enumerate() {
            let image = residue.apply(level.base_point);
            if image == level.base_point {
                continue;
            }
            if !level.in_orbit(image) {
                return (residue, start + offset);
            }
            let u = level.transversal(image, self.n);
            residue = u.inverse().compose(&residue);
        }
        (residue, self.levels.len())
    }

    /// Deterministic Schreier–Sims closure over `strong_gens`: distribute
    /// generators across levels, rebuild trees, and keep sifting Schreier
    /// generators until every one strips to the identity.
    fn close(&mut self) -> Result<(), CosetError> {
        loop {
            self.distribute_and_rebuild()?;
            match self.find_violation() {
                Some(residue) => self.strong_gens.push(residue),
                None => return Ok(()),
            }
        }
    }

    fn distribute_and_rebuild(&mut self) -> Result<(), CosetError> {
        loop {
            for level_idx in 0..self.levels.len() {
                let prefix: Vec<usize> = self.levels[..level_idx]
                    .iter()
                    .map(|l| l.base_point)
                    .collect();
                let gens: Vec<Permutation> = self
                    .strong_gens
                    .iter()
                    .filter(|g| prefix.iter().all(|&b| g.apply(b) == b))
                    .cloned()
                    .collect();
                let level = &mut self.levels[level_idx];
                level.gen_invs = gens.iter().map(Permutation::inverse).collect();
                level.gens = gens;
                level.rebuild_tree();
            }
            // Some strong generator may fix every base point; the base
            // must grow until none does.
            let fixed_all = |g: &Permutation| {
                self.levels.iter().all(|l| g.apply(l.base_point) == l.base_point)
            };
            match self.strong_gens.iter().find(|g| fixed_all(g)) {
                Some(r#gen) => {
                    let moved = (0..self.n)
                        .find(|&p| r#gen.apply(p) != p)
                        .unwrap_or_else(|| unreachable!("identity kept as strong generator"));
                    let level = Level::try_new(self.n, moved)?;
                    self.levels.push(level);
                }
                None => return Ok(()),
            }
        }
    }

    /// Finds one Schreier generator that does not sift to the identity,
    /// if any remain.
    fn find_violation(&self) -> Option<Permutation> {
        for (level_idx, level) in self.levels.iter().enumerate() {
            for point in (0..self.n).filter(|&p| level.in_orbit(p)) {
                let u_point = level.transversal(point, self.n);
                for r#gen in &level.gens {
                    let image = r#gen.apply(point);
                    let u_image = level.transversal(image, self.n);
                    let schreier = u_image.inverse().compose(&r#gen.compose(&u_point));
                    let (residue, _) = self.sift(level_idx + 1, schreier);
                    if !residue.is_identity() {
                        return Some(residue);
                    }
                }
            }
        }
        None
    }
}
