//! The simplicial mesh.
//!
//! A [`Mesh`] is a closed variant over [`MeshKind`]: point, edge, triangle and
//! tetrahedral meshes share every algorithm and differ only in their top
//! dimension `D` and the table set they navigate with.
//!
//! All connectivity lives in internal `Int64`/`Char` attributes, so the scope
//! machinery that checkpoints user attributes checkpoints topology too:
//!
//! | attribute            | primitive | arity          | meaning                                   |
//! |----------------------|-----------|----------------|-------------------------------------------|
//! | `m_cell_vertices`    | top       | `D + 1`        | global vertex ids in local order          |
//! | `m_cell_faces_{k}`   | top       | `C(D+1, k+1)`  | global `k`-face ids, `0 < k < D`          |
//! | `m_cell_neighbors`   | top       | `D + 1`        | cell across the facet opposite vertex `i` |
//! | `m_coface_{k}`       | `k`       | 1              | some live top cell containing the simplex |
//! | `m_flags_{k}`        | `k`       | 1              | 1 when the simplex is alive               |
//! | `m_hash`             | top       | 1              | connectivity version of the cell          |

mod builder;
mod navigation;
mod scope;
pub mod snapshot;
mod validation;

use std::sync::Arc;

use crate::attribute::{
    Accessor, AttributeManager, AttributeScalar, MeshAttributeHandle, TypedAttributeHandle,
};
use crate::mesh_error::MeshError;
use crate::multimesh::MultiMeshManager;
use crate::topology::primitive::{MeshKind, PrimitiveType};
use crate::topology::tables::{self, ConnectivityTables};

pub use builder::BuildOptions;
pub use scope::ScopeGuard;

/// Handles of the internal connectivity attributes.
#[derive(Clone, Debug)]
pub(crate) struct Connectivity {
    /// `faces[0]` is `m_cell_vertices`, `faces[k]` is `m_cell_faces_{k}`.
    pub faces: Vec<TypedAttributeHandle<i64>>,
    pub neighbors: Option<TypedAttributeHandle<i64>>,
    pub cofaces: Vec<TypedAttributeHandle<i64>>,
    pub flags: Vec<TypedAttributeHandle<i8>>,
    pub hash: TypedAttributeHandle<i64>,
}

impl Connectivity {
    fn register(kind: MeshKind, attributes: &AttributeManager) -> Result<Self, MeshError> {
        let d = kind.top_dimension();
        let top = kind.top_simplex_type();
        let t = tables::tables(kind);
        let mut faces = Vec::with_capacity(d);
        for k in 0..d {
            let name = if k == 0 {
                "m_cell_vertices".to_owned()
            } else {
                format!("m_cell_faces_{k}")
            };
            faces.push(attributes.register_attribute::<i64>(
                &name,
                top,
                &vec![-1; t.face_count(k)],
                false,
                true,
            )?);
        }
        let neighbors = if d > 0 {
            Some(attributes.register_attribute::<i64>(
                "m_cell_neighbors",
                top,
                &vec![-1; d + 1],
                false,
                true,
            )?)
        } else {
            None
        };
        let mut cofaces = Vec::with_capacity(d);
        for k in 0..d {
            cofaces.push(attributes.register_attribute::<i64>(
                &format!("m_coface_{k}"),
                PrimitiveType::from_dimension(k),
                &[-1],
                false,
                true,
            )?);
        }
        let mut flags = Vec::with_capacity(d + 1);
        for k in 0..=d {
            flags.push(attributes.register_attribute::<i8>(
                &format!("m_flags_{k}"),
                PrimitiveType::from_dimension(k),
                &[0],
                false,
                true,
            )?);
        }
        let hash = attributes.register_attribute::<i64>("m_hash", top, &[0], false, true)?;
        Ok(Self {
            faces,
            neighbors,
            cofaces,
            flags,
            hash,
        })
    }

    /// Re-bind handles by name after a restore.
    fn lookup(kind: MeshKind, attributes: &AttributeManager) -> Result<Self, MeshError> {
        let d = kind.top_dimension();
        let top = kind.top_simplex_type();
        let typed_i64 = |name: &str, p: PrimitiveType| -> Result<TypedAttributeHandle<i64>, MeshError> {
            attributes.typed::<i64>(&attributes.get_attribute_handle(name, p)?)
        };
        let mut faces = Vec::with_capacity(d);
        for k in 0..d {
            let name = if k == 0 {
                "m_cell_vertices".to_owned()
            } else {
                format!("m_cell_faces_{k}")
            };
            faces.push(typed_i64(&name, top)?);
        }
        let neighbors = if d > 0 {
            Some(typed_i64("m_cell_neighbors", top)?)
        } else {
            None
        };
        let mut cofaces = Vec::with_capacity(d);
        for k in 0..d {
            cofaces.push(typed_i64(&format!("m_coface_{k}"), PrimitiveType::from_dimension(k))?);
        }
        let mut flags = Vec::with_capacity(d + 1);
        for k in 0..=d {
            let p = PrimitiveType::from_dimension(k);
            flags.push(attributes.typed::<i8>(&attributes.get_attribute_handle(&format!("m_flags_{k}"), p)?)?);
        }
        let hash = typed_i64("m_hash", top)?;
        Ok(Self {
            faces,
            neighbors,
            cofaces,
            flags,
            hash,
        })
    }
}

/// A simplicial mesh of dimension 0 to 3 with transactional attributes.
#[derive(Debug)]
pub struct Mesh {
    kind: MeshKind,
    attributes: AttributeManager,
    conn: Connectivity,
    multi_mesh: MultiMeshManager,
}

impl Mesh {
    /// An empty mesh of the given kind.
    pub fn new(kind: MeshKind) -> Result<Self, MeshError> {
        let attributes = AttributeManager::new(kind.top_dimension());
        let conn = Connectivity::register(kind, &attributes)?;
        Ok(Self {
            kind,
            attributes,
            conn,
            multi_mesh: MultiMeshManager::default(),
        })
    }

    pub(crate) fn from_parts(kind: MeshKind, attributes: AttributeManager) -> Result<Self, MeshError> {
        let conn = Connectivity::lookup(kind, &attributes)?;
        Ok(Self {
            kind,
            attributes,
            conn,
            multi_mesh: MultiMeshManager::default(),
        })
    }

    /// A point mesh with `n` live vertices.
    pub fn point_mesh(n: usize) -> Result<Self, MeshError> {
        let cells: Vec<[i64; 1]> = (0..n as i64).map(|v| [v]).collect();
        Self::from_cells(MeshKind::Point, &cells)
    }

    /// A polyline mesh from vertex pairs.
    pub fn edge_mesh(cells: &[[i64; 2]]) -> Result<Self, MeshError> {
        Self::from_cells(MeshKind::Edge, cells)
    }

    /// A triangle mesh from vertex triples. Orientation is taken as given.
    pub fn tri_mesh(cells: &[[i64; 3]]) -> Result<Self, MeshError> {
        Self::from_cells(MeshKind::Tri, cells)
    }

    /// A tetrahedral mesh from vertex quadruples.
    pub fn tet_mesh(cells: &[[i64; 4]]) -> Result<Self, MeshError> {
        Self::from_cells(MeshKind::Tet, cells)
    }

    /// Build a mesh of `kind` from top cells given as global vertex lists.
    pub fn from_cells<C: AsRef<[i64]>>(kind: MeshKind, cells: &[C]) -> Result<Self, MeshError> {
        Self::from_cells_with(kind, cells, &BuildOptions::default())
    }

    pub fn from_cells_with<C: AsRef<[i64]>>(
        kind: MeshKind,
        cells: &[C],
        options: &BuildOptions,
    ) -> Result<Self, MeshError> {
        let mesh = Self::new(kind)?;
        builder::initialize(&mesh, cells)?;
        if options.validate {
            crate::DebugInvariants::validate_invariants(&mesh)?;
        }
        Ok(mesh)
    }

    #[inline]
    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    #[inline]
    pub fn top_dimension(&self) -> usize {
        self.kind.top_dimension()
    }

    #[inline]
    pub fn top_simplex_type(&self) -> PrimitiveType {
        self.kind.top_simplex_type()
    }

    #[inline]
    pub(crate) fn tables(&self) -> &'static ConnectivityTables {
        tables::tables(self.kind)
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeManager {
        &self.attributes
    }

    #[inline]
    pub(crate) fn conn(&self) -> &Connectivity {
        &self.conn
    }

    #[inline]
    pub fn multi_mesh(&self) -> &MultiMeshManager {
        &self.multi_mesh
    }

    // ---- attributes -----------------------------------------------------

    /// Create a user attribute; the arity is `default.len()`.
    pub fn create_attribute<T: AttributeScalar>(
        &self,
        name: &str,
        primitive: PrimitiveType,
        default: &[T],
    ) -> Result<TypedAttributeHandle<T>, MeshError> {
        self.register_attribute(name, primitive, default, false)
    }

    /// Create a user attribute, optionally resetting an existing one.
    pub fn register_attribute<T: AttributeScalar>(
        &self,
        name: &str,
        primitive: PrimitiveType,
        default: &[T],
        replace: bool,
    ) -> Result<TypedAttributeHandle<T>, MeshError> {
        if primitive.dimension() > self.top_dimension() {
            return Err(MeshError::UnsupportedOperation(
                "attribute primitive exceeds mesh dimension",
            ));
        }
        if name.starts_with("m_") || name.starts_with("multimesh::") {
            return Err(MeshError::UnsupportedOperation(
                "attribute names starting with `m_` or `multimesh::` are reserved",
            ));
        }
        self.attributes
            .register_attribute(name, primitive, default, replace, false)
    }

    pub fn get_attribute_handle(
        &self,
        name: &str,
        primitive: PrimitiveType,
    ) -> Result<MeshAttributeHandle, MeshError> {
        self.attributes.get_attribute_handle(name, primitive)
    }

    /// Read/write view bound to the calling thread's active scope.
    pub fn accessor<T: AttributeScalar>(&self, handle: &TypedAttributeHandle<T>) -> Accessor<'_, T> {
        Accessor::new(self, *handle)
    }

    /// Accessor from a type-erased handle.
    pub fn accessor_for<T: AttributeScalar>(
        &self,
        handle: &MeshAttributeHandle,
    ) -> Result<Accessor<'_, T>, MeshError> {
        Ok(Accessor::new(self, self.attributes.typed::<T>(handle)?))
    }

    /// Push a scope on this mesh and every descendant; rolled back on drop
    /// unless committed.
    pub fn create_scope(&self) -> ScopeGuard<'_> {
        ScopeGuard::new(self)
    }

    /// Evaluate `f` against the state below the innermost scope of this mesh
    /// and its descendants. Writes inside `f` panic.
    pub fn parent_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut viewing: Vec<Arc<Mesh>> = Vec::new();
        let own = self.attributes.begin_parent_view();
        for child in self.descendants() {
            if child.attributes.begin_parent_view() {
                viewing.push(child);
            }
        }
        let out = f();
        if own {
            self.attributes.end_parent_view();
        }
        for child in viewing {
            child.attributes.end_parent_view();
        }
        out
    }

    /// Every mesh below this one, depth first.
    pub fn descendants(&self) -> Vec<Arc<Mesh>> {
        let mut out = Vec::new();
        let mut stack = self.multi_mesh.children();
        stack.reverse();
        while let Some(m) = stack.pop() {
            let mut grand = m.multi_mesh.children();
            grand.reverse();
            out.push(m);
            stack.extend(grand);
        }
        out
    }

    // ---- raw connectivity ----------------------------------------------

    /// Number of ids ever reserved for `primitive`.
    #[inline]
    pub fn capacity(&self, primitive: PrimitiveType) -> usize {
        self.attributes.size(primitive)
    }

    #[inline]
    pub(crate) fn is_active_dim(&self, k: usize, id: i64) -> bool {
        id >= 0
            && (id as usize) < self.attributes.size(PrimitiveType::from_dimension(k))
            && self.attributes.component(&self.conn.flags[k], id, 0) == 1
    }

    /// True when the simplex id is alive.
    #[inline]
    pub fn is_active(&self, primitive: PrimitiveType, id: i64) -> bool {
        self.is_active_dim(primitive.dimension(), id)
    }

    #[inline]
    pub(crate) fn set_active(&self, k: usize, id: i64, alive: bool) {
        self.attributes
            .write(&self.conn.flags[k], id, &[if alive { 1 } else { 0 }]);
    }

    /// Global vertex `i` of top cell `c`.
    #[inline]
    pub(crate) fn cell_vertex(&self, c: i64, i: usize) -> i64 {
        if self.top_dimension() == 0 {
            debug_assert_eq!(i, 0);
            return c;
        }
        self.attributes.component(&self.conn.faces[0], c, i)
    }

    /// Global vertex ids of top cell `c` in local order.
    #[inline]
    pub fn cell_vertices(&self, c: i64) -> Vec<i64> {
        if self.top_dimension() == 0 {
            return vec![c];
        }
        self.attributes.vector(&self.conn.faces[0], c)
    }

    /// Global id of local `k`-face `j` of cell `c`.
    #[inline]
    pub(crate) fn face_id(&self, k: usize, c: i64, j: usize) -> i64 {
        let d = self.top_dimension();
        if k == d {
            return c;
        }
        if k == 0 {
            return self.cell_vertex(c, j);
        }
        self.attributes.component(&self.conn.faces[k], c, j)
    }

    /// All global `k`-face ids of cell `c`.
    pub(crate) fn cell_face_ids(&self, k: usize, c: i64) -> Vec<i64> {
        if k == self.top_dimension() {
            return vec![c];
        }
        if k == 0 {
            return self.cell_vertices(c);
        }
        self.attributes.vector(&self.conn.faces[k], c)
    }

    #[inline]
    fn neighbor_handle(&self) -> &TypedAttributeHandle<i64> {
        match &self.conn.neighbors {
            Some(h) => h,
            None => panic!("point meshes have no cell adjacency"),
        }
    }

    /// Cell across the facet opposite local vertex `i`, `-1` on the boundary.
    #[inline]
    pub(crate) fn neighbor(&self, c: i64, i: usize) -> i64 {
        self.attributes.component(self.neighbor_handle(), c, i)
    }

    pub(crate) fn neighbors(&self, c: i64) -> Vec<i64> {
        if self.top_dimension() == 0 {
            return Vec::new();
        }
        self.attributes.vector(self.neighbor_handle(), c)
    }

    pub(crate) fn set_neighbor(&self, c: i64, i: usize, n: i64) {
        self.attributes.write_component(self.neighbor_handle(), c, i, n);
    }

    /// Some live top cell containing `k`-simplex `id`.
    #[inline]
    pub(crate) fn coface(&self, k: usize, id: i64) -> i64 {
        if k == self.top_dimension() {
            return id;
        }
        self.attributes.component(&self.conn.cofaces[k], id, 0)
    }

    pub(crate) fn set_coface(&self, k: usize, id: i64, c: i64) {
        if k < self.top_dimension() {
            self.attributes.write(&self.conn.cofaces[k], id, &[c]);
        }
    }

    pub(crate) fn set_cell_faces(&self, k: usize, c: i64, ids: &[i64]) {
        debug_assert!(k < self.top_dimension());
        self.attributes.write(&self.conn.faces[k], c, ids);
    }

    /// Connectivity version of cell `c`.
    #[inline]
    pub fn cell_hash(&self, c: i64) -> i64 {
        self.attributes.component(&self.conn.hash, c, 0)
    }

    pub(crate) fn bump_hash(&self, c: i64) {
        let h = self.cell_hash(c);
        self.attributes.write(&self.conn.hash, c, &[h.wrapping_add(1)]);
    }

    /// Reserve `count` fresh, inactive ids.
    pub(crate) fn reserve(&self, primitive: PrimitiveType, count: usize) -> Result<Vec<i64>, MeshError> {
        Ok(self.attributes.reserve_ids(primitive, count)?.collect())
    }
}
