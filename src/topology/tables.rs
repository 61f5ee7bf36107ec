//! Precomputed connectivity tables, one set per mesh kind.
//!
//! For a `D`-simplex the tables enumerate:
//! - the local `k`-faces as sorted vertex subsets in lexicographic order,
//! - every dart (permutation of the `D + 1` local vertices) together with the
//!   local `(vertex, edge, face)` ids it selects and its parity,
//! - the result of each in-cell switch (`switch_vertex`, `switch_edge`,
//!   `switch_face` below the top dimension).
//!
//! Tables are built on first use and never mutated afterwards.

use itertools::Itertools;
use once_cell::sync::Lazy;

use super::orientation::DartPerm;
use super::primitive::MeshKind;

/// Packed `(local_vid, local_eid, local_fid)` key range: 4 vertices x 6 edges x 4 faces.
const DART_KEY_SPACE: usize = 4 * 6 * 4;

#[inline]
fn dart_key(lv: i8, le: i8, lf: i8) -> Option<usize> {
    if !(0..4).contains(&lv) || !(0..6).contains(&le) || !(0..4).contains(&lf) {
        return None;
    }
    Some((lv as usize * 6 + le as usize) * 4 + lf as usize)
}

#[inline]
fn mask(vertices: &[u8]) -> usize {
    vertices.iter().fold(0usize, |m, &v| m | (1 << v))
}

/// One dart of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dart {
    /// Local vertex order selected by the dart.
    pub perm: DartPerm,
    /// `(local_vid, local_eid, local_fid)`.
    pub local: [i8; 3],
    /// Even permutation.
    pub ccw: bool,
}

/// Lookup tables of a single simplex dimension.
#[derive(Debug)]
pub struct ConnectivityTables {
    dimension: usize,
    faces: Vec<Vec<Vec<u8>>>,
    face_lookup: Vec<[i8; 16]>,
    darts: Vec<Dart>,
    dart_lookup: [i16; DART_KEY_SPACE],
    switches: Vec<[u16; 3]>,
    opposite_facet: [u8; 4],
}

impl ConnectivityTables {
    fn build(dimension: usize) -> Self {
        let n = dimension + 1;
        let mut faces = Vec::with_capacity(n);
        let mut face_lookup = Vec::with_capacity(n);
        for k in 0..n {
            let list: Vec<Vec<u8>> = (0..n as u8).combinations(k + 1).collect();
            let mut lookup = [-1i8; 16];
            for (j, f) in list.iter().enumerate() {
                lookup[mask(f)] = j as i8;
            }
            faces.push(list);
            face_lookup.push(lookup);
        }

        let mut darts = Vec::new();
        let mut dart_lookup = [-1i16; DART_KEY_SPACE];
        for order in (0..n as u8).permutations(n) {
            let mut images = [0u8, 1, 2, 3];
            images[..n].copy_from_slice(&order);
            let perm = DartPerm::new_unchecked(images);
            let local = Self::local_ids_of(&face_lookup, dimension, &perm);
            let key = dart_key(local[0], local[1], local[2])
                .unwrap_or_else(|| unreachable!("local ids out of range"));
            dart_lookup[key] = darts.len() as i16;
            darts.push(Dart {
                perm,
                local,
                ccw: perm.is_even(),
            });
        }

        let mut switches = Vec::with_capacity(darts.len());
        for dart in &darts {
            let mut row = [u16::MAX; 3];
            for (k, slot) in row.iter_mut().enumerate().take(dimension) {
                let swapped = dart.perm.swap_adjacent(k);
                let local = Self::local_ids_of(&face_lookup, dimension, &swapped);
                let key = dart_key(local[0], local[1], local[2])
                    .unwrap_or_else(|| unreachable!("local ids out of range"));
                *slot = dart_lookup[key] as u16;
            }
            switches.push(row);
        }

        let mut opposite_facet = [0u8; 4];
        if dimension > 0 {
            for (i, slot) in opposite_facet.iter_mut().enumerate().take(n) {
                let facet: Vec<u8> = (0..n as u8).filter(|&v| v as usize != i).collect();
                *slot = face_lookup[dimension - 1][mask(&facet)] as u8;
            }
        }

        Self {
            dimension,
            faces,
            face_lookup,
            darts,
            dart_lookup,
            switches,
            opposite_facet,
        }
    }

    fn local_ids_of(face_lookup: &[[i8; 16]], dimension: usize, perm: &DartPerm) -> [i8; 3] {
        let p = &perm.0;
        let lv = p[0] as i8;
        let le = if dimension >= 1 {
            face_lookup[1][mask(&p[..2])]
        } else {
            0
        };
        let lf = if dimension >= 2 {
            face_lookup[2][mask(&p[..3])]
        } else {
            0
        };
        [lv, le, lf]
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Local vertex lists of the `k`-faces.
    #[inline]
    pub fn faces(&self, k: usize) -> &[Vec<u8>] {
        &self.faces[k]
    }

    #[inline]
    pub fn face_count(&self, k: usize) -> usize {
        self.faces[k].len()
    }

    /// Local index of the `k`-face spanned by the given local vertices.
    #[inline]
    pub fn face_index(&self, local_vertices: &[u8]) -> Option<usize> {
        let k = local_vertices.len().checked_sub(1)?;
        let idx = *self.face_lookup.get(k)?.get(mask(local_vertices))?;
        (idx >= 0).then_some(idx as usize)
    }

    /// Local index of the facet opposite local vertex `i`.
    #[inline]
    pub fn opposite_facet(&self, i: usize) -> usize {
        self.opposite_facet[i] as usize
    }

    #[inline]
    pub fn darts(&self) -> &[Dart] {
        &self.darts
    }

    /// Dart index for a triple of local ids.
    ///
    /// # Panics
    /// Panics when the triple does not name a dart of this dimension.
    #[inline]
    pub fn dart_index(&self, lv: i8, le: i8, lf: i8) -> usize {
        let idx = dart_key(lv, le, lf)
            .map(|key| self.dart_lookup[key])
            .unwrap_or(-1);
        assert!(
            idx >= 0,
            "local ids ({lv}, {le}, {lf}) do not form a dart of a {}-simplex",
            self.dimension
        );
        idx as usize
    }

    #[inline]
    pub fn dart(&self, lv: i8, le: i8, lf: i8) -> &Dart {
        &self.darts[self.dart_index(lv, le, lf)]
    }

    /// Dart whose permutation is `perm`.
    pub fn dart_of_perm(&self, perm: &DartPerm) -> &Dart {
        let local = Self::local_ids_of(&self.face_lookup, self.dimension, perm);
        self.dart(local[0], local[1], local[2])
    }

    /// In-cell switch of dimension `k < D`.
    ///
    /// # Panics
    /// Panics if `k` is not below the table dimension.
    #[inline]
    pub fn switch(&self, dart: usize, k: usize) -> &Dart {
        assert!(
            k < self.dimension,
            "switch of dimension {k} leaves a {}-simplex",
            self.dimension
        );
        &self.darts[self.switches[dart][k] as usize]
    }
}

static TABLES: Lazy<[ConnectivityTables; 4]> = Lazy::new(|| {
    [
        ConnectivityTables::build(0),
        ConnectivityTables::build(1),
        ConnectivityTables::build(2),
        ConnectivityTables::build(3),
    ]
});

/// Table set for the given mesh kind.
#[inline]
pub fn tables(kind: MeshKind) -> &'static ConnectivityTables {
    &TABLES[kind.top_dimension()]
}
