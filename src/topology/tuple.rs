//! Tuple: a pointer-free, orientation-bearing handle into a cell.

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// `(local_vid, local_eid, local_fid, global_cid, hash)`.
///
/// The three local ids select a dart of the cell `global_cid`; `hash` is the
/// connectivity version of that cell at the time the tuple was produced. A
/// tuple whose hash differs from the cell's current hash is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub(crate) local_vid: i8,
    pub(crate) local_eid: i8,
    pub(crate) local_fid: i8,
    pub(crate) global_cid: i64,
    pub(crate) hash: i64,
}

assert_eq_size!(Tuple, [u64; 3]);

impl Tuple {
    /// Null tuple (no cell).
    pub const NULL: Tuple = Tuple {
        local_vid: -1,
        local_eid: -1,
        local_fid: -1,
        global_cid: -1,
        hash: -1,
    };

    #[inline]
    pub fn new(local_vid: i8, local_eid: i8, local_fid: i8, global_cid: i64, hash: i64) -> Self {
        Self {
            local_vid,
            local_eid,
            local_fid,
            global_cid,
            hash,
        }
    }

    #[inline]
    pub fn local_vid(&self) -> i8 {
        self.local_vid
    }

    #[inline]
    pub fn local_eid(&self) -> i8 {
        self.local_eid
    }

    #[inline]
    pub fn local_fid(&self) -> i8 {
        self.local_fid
    }

    #[inline]
    pub fn global_cid(&self) -> i64 {
        self.global_cid
    }

    #[inline]
    pub fn hash(&self) -> i64 {
        self.hash
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.global_cid < 0
    }

    /// Same dart, any version.
    #[inline]
    pub fn same_dart(&self, other: &Tuple) -> bool {
        self.local_vid == other.local_vid
            && self.local_eid == other.local_eid
            && self.local_fid == other.local_fid
            && self.global_cid == other.global_cid
    }

    #[inline]
    pub(crate) fn with_hash(mut self, hash: i64) -> Self {
        self.hash = hash;
        self
    }

    /// Flattened form used by multi-mesh map attributes.
    #[inline]
    pub(crate) fn to_array(self) -> [i64; 5] {
        [
            self.local_vid as i64,
            self.local_eid as i64,
            self.local_fid as i64,
            self.global_cid,
            self.hash,
        ]
    }

    #[inline]
    pub(crate) fn from_slice(values: &[i64]) -> Self {
        Self {
            local_vid: values[0] as i8,
            local_eid: values[1] as i8,
            local_fid: values[2] as i8,
            global_cid: values[3],
            hash: values[4],
        }
    }
}

impl Default for Tuple {
    fn default() -> Self {
        Tuple::NULL
    }
}
