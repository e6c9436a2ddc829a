//! Permutations of the point set `0..n-1` in image form.

use std::fmt;

use itertools::Itertools;

use crate::error::CosetError;

/// A permutation stored as its image table: `perm[i]` is the image of `i`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Permutation {
    images: Vec<usize>,
}

impl Permutation {
    /// The identity permutation on `n` points.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Permutation {
            images: (0..n).collect(),
        }
    }

    /// Builds a permutation from an image table, checking that it really is
    /// a bijection on `0..images.len()`.
    pub fn from_images(images: Vec<usize>) -> Result<Self, CosetError> {
        let n = images.len();
        let mut seen = vec![false; n];
        for &img in &images {
            if img >= n || seen[img] {
                return Err(CosetError::DegreeMismatch {
                    expected: n,
                    actual: img + 1,
                });
            }
            seen[img] = true;
        }
        Ok(Permutation { images })
    }

    /// Builds a permutation from an image table the caller guarantees to
    /// be a bijection on `0..images.len()`.
    #[must_use]
    pub fn from_images_unchecked(images: Vec<usize>) -> Self {
        debug_assert!(Permutation::from_images(images.clone()).is_ok());
        Permutation { images }
    }

    /// Number of points the permutation acts on.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.images.len()
    }

    /// Image of a single point.
    #[must_use]
    pub fn apply(&self, point: usize) -> usize {
        self.images[point]
    }

    /// The underlying image table.
    #[must_use]
    pub fn images(&self) -> &[usize] {
        &self.images
    }

    /// Tests whether every point is fixed.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.images.iter().enumerate().all(|(i, &img)| i == img)
    }

    /// Composition `self ∘ other`: first `other`, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Permutation) -> Permutation {
        debug_assert_eq!(self.degree(), other.degree());
        Permutation {
            images: other.images.iter().map(|&i| self.images[i]).collect(),
        }
    }

    /// The inverse permutation.
    #[must_use]
    pub fn inverse(&self) -> Permutation {
        let mut images = vec![0; self.images.len()];
        for (i, &img) in self.images.iter().enumerate() {
            images[img] = i;
        }
        Permutation { images }
    }

    /// Iterates the cycles of the permutation; each cycle starts at its
    /// minimal point.
    pub fn cycles(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        let n = self.images.len();
        let mut visited = vec![false; n];
        (0..n).filter_map(move |start| {
            if visited[start] {
                return None;
            }
            let mut cycle = vec![start];
            visited[start] = true;
            let mut point = self.images[start];
            while point != start {
                visited[point] = true;
                cycle.push(point);
                point = self.images[point];
            }
            Some(cycle)
        })
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permutation({:?})", self.images)
    }
}

impl fmt::Display for Permutation {
    /// Cycle notation, fixed points omitted; the identity prints as `()`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .cycles()
            .filter(|cycle| cycle.len() > 1)
            .map(|cycle| format!("({})", cycle.iter().join(" ")))
            .join("");
        if rendered.is_empty() {
            write!(f, "()")
        } else {
            write!(f, "{rendered}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_then_invert_is_identity() {
        let a = Permutation::from_images(vec![1, 2, 3, 4, 5, 0]).unwrap();
        let b = a.inverse();
        assert!(a.compose(&b).is_identity());
        assert!(b.compose(&a).is_identity());
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let a = Permutation::from_images(vec![1, 0, 2]).unwrap();
        let b = Permutation::from_images(vec![0, 2, 1]).unwrap();
        // (a ∘ b)(1) = a(b(1)) = a(2) = 2
        assert_eq!(a.compose(&b).apply(1), 2);
    }

    #[test]
    fn from_images_rejects_non_bijections() {
        assert!(Permutation::from_images(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_images(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn cycles_start_at_minimum() {
        let p = Permutation::from_images(vec![1, 2, 0, 4, 3, 5]).unwrap();
        let cycles: Vec<_> = p.cycles().collect();
        assert_eq!(cycles, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
    }
}
