//! Local orientation group used by darts.
//!
//! A dart of a `D`-simplex is a permutation of its `D + 1` local vertices:
//! position 0 is the dart's vertex, positions `0..=1` its edge, `0..=2` its
//! face. Every dart is stored as a [`Perm<4>`] whose positions beyond `D` are
//! fixed points, so one representation serves all mesh kinds.

use core::fmt::{Debug, Formatter};

/// Group operations shared by local orientation representations.
pub trait Orientation: Copy + Eq {
    fn identity() -> Self;
    /// `compose(a, b)` applies `b` first, then `a`.
    fn compose(a: Self, b: Self) -> Self;
    fn inverse(a: Self) -> Self;
}

/// Small, fixed-size permutation group S_K, represented as a mapping
/// `[0..K) -> [0..K)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Perm<const K: usize>(pub [u8; K]);

impl<const K: usize> Default for Perm<K> {
    fn default() -> Self {
        let mut id = [0u8; K];
        let mut i = 0;
        while i < K {
            id[i] = i as u8;
            i += 1;
        }
        Perm(id)
    }
}

impl<const K: usize> Debug for Perm<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Perm").field(&self.0).finish()
    }
}

impl<const K: usize> Perm<K> {
    #[inline]
    pub fn new_unchecked(p: [u8; K]) -> Self {
        Perm(p)
    }

    #[inline]
    pub fn invert(&self) -> Self {
        let mut inv = [0u8; K];
        for (i, &p) in self.0.iter().enumerate() {
            inv[p as usize] = i as u8;
        }
        Perm(inv)
    }

    /// Exchange the images at positions `i` and `i + 1`.
    #[inline]
    pub fn swap_adjacent(&self, i: usize) -> Self {
        let mut out = self.0;
        out.swap(i, i + 1);
        Perm(out)
    }

    /// True when the permutation has an even number of inversions.
    pub fn is_even(&self) -> bool {
        let mut inversions = 0usize;
        for i in 0..K {
            for j in (i + 1)..K {
                if self.0[i] > self.0[j] {
                    inversions += 1;
                }
            }
        }
        inversions % 2 == 0
    }

    /// Position of `value` in the image array.
    #[inline]
    pub fn position(&self, value: u8) -> Option<usize> {
        self.0.iter().position(|&v| v == value)
    }
}

impl<const K: usize> Orientation for Perm<K> {
    #[inline]
    fn identity() -> Self {
        Self::default()
    }

    #[inline]
    fn compose(a: Self, b: Self) -> Self {
        let mut out = [0u8; K];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = a.0[b.0[i] as usize];
        }
        Perm(out)
    }

    #[inline]
    fn inverse(a: Self) -> Self {
        a.invert()
    }
}

/// Dart permutation of a simplex of dimension at most three.
pub type DartPerm = Perm<4>;
