//! Orientation predicates and signed measures.
//!
//! The predicates are generic over any [`num_traits::Num`] scalar, so they are
//! exact when evaluated on [`Rational`](crate::attribute::Rational) positions
//! and plain floating-point otherwise.

use std::cmp::Ordering;

use num_traits::Num;

use crate::attribute::types::Rational;

#[inline]
fn sub<T: Num + Clone, const N: usize>(a: &[T; N], b: &[T; N]) -> [T; N] {
    std::array::from_fn(|i| a[i].clone() - b[i].clone())
}

#[inline]
fn sign<T: Num + PartialOrd>(x: &T) -> i8 {
    match x.partial_cmp(&T::zero()) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Less) => -1,
        _ => 0,
    }
}

/// Twice the signed area of `(a, b, c)`.
pub fn orient2d_det<T: Num + Clone>(a: &[T; 2], b: &[T; 2], c: &[T; 2]) -> T {
    let ab = sub(b, a);
    let ac = sub(c, a);
    ab[0].clone() * ac[1].clone() - ab[1].clone() * ac[0].clone()
}

/// `1` if `(a, b, c)` turns counter-clockwise, `-1` if clockwise, `0` when
/// degenerate.
pub fn orient2d<T: Num + Clone + PartialOrd>(a: &[T; 2], b: &[T; 2], c: &[T; 2]) -> i8 {
    sign(&orient2d_det(a, b, c))
}

/// Six times the signed volume of `(a, b, c, d)`.
pub fn orient3d_det<T: Num + Clone>(a: &[T; 3], b: &[T; 3], c: &[T; 3], d: &[T; 3]) -> T {
    let ab = sub(b, a);
    let ac = sub(c, a);
    let ad = sub(d, a);
    let cross = [
        ac[1].clone() * ad[2].clone() - ac[2].clone() * ad[1].clone(),
        ac[2].clone() * ad[0].clone() - ac[0].clone() * ad[2].clone(),
        ac[0].clone() * ad[1].clone() - ac[1].clone() * ad[0].clone(),
    ];
    ab[0].clone() * cross[0].clone()
        + ab[1].clone() * cross[1].clone()
        + ab[2].clone() * cross[2].clone()
}

/// `1` when `d` sees `(a, b, c)` counter-clockwise (right-handed `abcd`),
/// `-1` for the mirror image, `0` when coplanar.
pub fn orient3d<T: Num + Clone + PartialOrd>(
    a: &[T; 3],
    b: &[T; 3],
    c: &[T; 3],
    d: &[T; 3],
) -> i8 {
    sign(&orient3d_det(a, b, c, d))
}

/// Signed area of a triangle in the plane.
pub fn signed_area(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> f64 {
    0.5 * orient2d_det(a, b, c)
}

/// Signed volume of a tetrahedron.
pub fn signed_volume(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3], d: &[f64; 3]) -> f64 {
    orient3d_det(a, b, c, d) / 6.0
}

/// Orientation of a simplex given by `dim + 1` points of `dim` coordinates
/// each, for `dim` in 1..=3. Returns `None` for malformed input.
pub fn simplex_orientation<T: Num + Clone + PartialOrd>(points: &[Vec<T>]) -> Option<i8> {
    let dim = points.len().checked_sub(1)?;
    if points.iter().any(|p| p.len() != dim) {
        return None;
    }
    match dim {
        1 => Some(sign(&(points[1][0].clone() - points[0][0].clone()))),
        2 => {
            let p = |i: usize| [points[i][0].clone(), points[i][1].clone()];
            Some(orient2d(&p(0), &p(1), &p(2)))
        }
        3 => {
            let p = |i: usize| {
                [
                    points[i][0].clone(),
                    points[i][1].clone(),
                    points[i][2].clone(),
                ]
            };
            Some(orient3d(&p(0), &p(1), &p(2), &p(3)))
        }
        _ => None,
    }
}

/// Unsigned measure (length, area or volume) of a simplex whose points carry
/// `dim` coordinates.
pub fn simplex_measure(points: &[Vec<f64>]) -> f64 {
    match points.len() {
        2 => points[0]
            .iter()
            .zip(&points[1])
            .map(|(a, b)| (b - a) * (b - a))
            .sum::<f64>()
            .sqrt(),
        3 if points[0].len() == 2 => {
            let p = |i: usize| [points[i][0], points[i][1]];
            signed_area(&p(0), &p(1), &p(2)).abs()
        }
        4 if points[0].len() == 3 => {
            let p = |i: usize| [points[i][0], points[i][1], points[i][2]];
            signed_volume(&p(0), &p(1), &p(2), &p(3)).abs()
        }
        _ => 0.0,
    }
}

/// Exact orientation of float input, lifted to rationals.
pub fn orient2d_exact(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> i8 {
    let lift = |p: &[f64; 2]| p.map(crate::attribute::types::rational_from_f64);
    orient2d::<Rational>(&lift(a), &lift(b), &lift(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn unit_triangle_and_tet_are_positive() {
        assert_eq!(orient2d(&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]), 1);
        assert_eq!(orient2d(&[0.0, 0.0], &[0.0, 1.0], &[1.0, 0.0]), -1);
        assert_eq!(
            orient3d(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0]),
            1
        );
        assert!((signed_area(&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rational_collinear_points_are_exactly_degenerate() {
        let r = |n: i64, d: i64| Rational::new(BigInt::from(n), BigInt::from(d));
        let a = [r(0, 1), r(0, 1)];
        let b = [r(1, 3), r(1, 7)];
        let c = [r(2, 3), r(2, 7)];
        assert_eq!(orient2d(&a, &b, &c), 0);
        assert_eq!(orient2d_exact(&[0.1, 0.1], &[0.2, 0.2], &[0.3, 0.3 + 1e-15]), 1);
    }
}
