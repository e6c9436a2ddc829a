//! Fixed-capacity bitsets over the point set `0..n-1`.

/// A bitset over `0..capacity`, backed by 64-bit words.
///
/// Candidate sets, fixed-point sets and minimal-cycle-representative sets
/// in the search core are all instances of this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitset {
    words: Vec<u64>,
    capacity: usize,
}

impl Bitset {
    /// Creates an empty bitset able to hold points `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Bitset {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Creates a bitset with every point in `0..capacity` set.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Bitset::new(capacity);
        for w in &mut set.words {
            *w = u64::MAX;
        }
        set.trim_tail();
        set
    }

    /// Returns the number of points this set can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tests whether `point` is in the set.
    #[must_use]
    pub fn contains(&self, point: usize) -> bool {
        debug_assert!(point < self.capacity);
        self.words[point / 64] & (1 << (point % 64)) != 0
    }

    /// Inserts `point`.
    pub fn insert(&mut self, point: usize) {
        debug_assert!(point < self.capacity);
        self.words[point / 64] |= 1 << (point % 64);
    }

    /// Removes `point`.
    pub fn remove(&mut self, point: usize) {
        debug_assert!(point < self.capacity);
        self.words[point / 64] &= !(1 << (point % 64));
    }

    /// Removes every point.
    pub fn clear(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
    }

    /// Counts the points in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Tests whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Intersects `self` with `other` in place.
    pub fn intersect_with(&mut self, other: &Bitset) {
        debug_assert_eq!(self.capacity, other.capacity);
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= o;
        }
    }

    /// Returns the least point in the set, if any.
    #[must_use]
    pub fn min(&self) -> Option<usize> {
        self.next_bit(0)
    }

    /// Returns the least point `>= from`, if any.
    #[must_use]
    pub fn next_bit(&self, from: usize) -> Option<usize> {
        if from >= self.capacity {
            return None;
        }
        let mut idx = from / 64;
        let mut word = self.words[idx] & (u64::MAX << (from % 64));
        loop {
            if word != 0 {
                let point = idx * 64 + word.trailing_zeros() as usize;
                return (point < self.capacity).then_some(point);
            }
            idx += 1;
            if idx == self.words.len() {
                return None;
            }
            word = self.words[idx];
        }
    }

    /// Returns the least point strictly greater than `after`, if any.
    #[must_use]
    pub fn next_bit_after(&self, after: usize) -> Option<usize> {
        self.next_bit(after + 1)
    }

    /// Tests whether every point of `other` is also in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Bitset) -> bool {
        debug_assert_eq!(self.capacity, other.capacity);
        self.words
            .iter()
            .zip(&other.words)
            .all(|(w, o)| o & !w == 0)
    }

    /// Iterates the points of the set in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(idx, &w)| {
            let mut word = w;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(idx * 64 + bit)
            })
        })
    }

    // Capacity may not be a multiple of 64; bits past it must stay zero.
    fn trim_tail(&mut self) {
        let tail = self.capacity % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << tail) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_remove() {
        let mut set = Bitset::new(130);
        set.insert(0);
        set.insert(64);
        set.insert(129);
        assert!(set.contains(0));
        assert!(set.contains(64));
        assert!(set.contains(129));
        assert!(!set.contains(1));
        set.remove(64);
        assert!(!set.contains(64));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn full_respects_capacity() {
        let set = Bitset::full(70);
        assert_eq!(set.len(), 70);
        assert_eq!(set.min(), Some(0));
        assert_eq!(set.next_bit_after(68), Some(69));
        assert_eq!(set.next_bit_after(69), None);
    }

    #[test]
    fn next_bit_walks_word_boundaries() {
        let mut set = Bitset::new(200);
        set.insert(3);
        set.insert(63);
        set.insert(64);
        set.insert(199);
        assert_eq!(set.next_bit(0), Some(3));
        assert_eq!(set.next_bit_after(3), Some(63));
        assert_eq!(set.next_bit_after(63), Some(64));
        assert_eq!(set.next_bit_after(64), Some(199));
        assert_eq!(set.next_bit_after(199), None);
    }

    quickcheck::quickcheck! {
        fn iter_returns_inserted_points_in_order(raw: Vec<u8>) -> bool {
            let mut set = Bitset::new(256);
            let mut expected: Vec<usize> = raw.iter().map(|&p| p as usize).collect();
            for &p in &expected {
                set.insert(p);
            }
            expected.sort_unstable();
            expected.dedup();
            set.iter().collect::<Vec<_>>() == expected && set.len() == expected.len()
        }
    }

    #[test]
    fn intersection_and_superset() {
        let mut a = Bitset::new(100);
        let mut b = Bitset::new(100);
        for p in [1, 5, 70, 99] {
            a.insert(p);
        }
        for p in [5, 70] {
            b.insert(p);
        }
        assert!(a.is_superset_of(&b));
        assert!(!b.is_superset_of(&a));
        a.intersect_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![5, 70]);
    }
}
