//! Multi-mesh hierarchies.
//!
//! A child mesh of dimension `d` is mapped injectively onto `d`-simplices of
//! its parent. Each side stores the map as an internal `Int64` attribute of
//! arity 10, `[child tuple | parent tuple]`:
//!
//! - `multimesh::map_to_parent` on the child's top cells,
//! - `multimesh::map_to_child::{n}` on the parent's `d`-simplices.
//!
//! The two tuples of an entry name corresponding flags, so the entry also
//! fixes the vertex correspondence between the child cell and its image.
//! Entries are maps of committed-or-scoped attribute state like any other
//! attribute, which keeps them consistent under rollback.

pub mod extract;
pub mod hash;
pub(crate) mod update;
pub mod validator;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use crate::attribute::TypedAttributeHandle;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::Simplex;
use crate::topology::tuple::Tuple;

pub use extract::extract_child_mesh;
pub use hash::{StructuralSnapshot, find_divergence};
pub use validator::MapValidator;

pub(crate) const MAP_ARITY: usize = 10;
pub(crate) const PARENT_MAP_NAME: &str = "multimesh::map_to_parent";

#[derive(Debug)]
struct ParentLink {
    parent: Weak<Mesh>,
    child_id: usize,
    /// `multimesh::map_to_parent` on the child's top cells.
    map: TypedAttributeHandle<i64>,
}

#[derive(Debug, Clone)]
pub(crate) struct ChildLink {
    pub mesh: Arc<Mesh>,
    /// `multimesh::map_to_child::{n}` on the parent's `d`-simplices.
    pub map: TypedAttributeHandle<i64>,
    pub map_name: String,
}

/// Per-mesh node of a hierarchy: links to parent and children plus the
/// mesh's own structural hash.
#[derive(Debug, Default)]
pub struct MultiMeshManager {
    parent: RwLock<Option<ParentLink>>,
    children: RwLock<Vec<ChildLink>>,
    own_hash: AtomicU64,
    map_serial: AtomicUsize,
}

impl MultiMeshManager {
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.read().is_none()
    }

    /// Index of this mesh among its parent's children.
    pub fn child_id(&self) -> Option<usize> {
        self.parent.read().as_ref().map(|p| p.child_id)
    }

    pub fn parent(&self) -> Option<Arc<Mesh>> {
        self.parent.read().as_ref().and_then(|p| p.parent.upgrade())
    }

    pub fn children(&self) -> Vec<Arc<Mesh>> {
        self.children.read().iter().map(|c| c.mesh.clone()).collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    pub(crate) fn child_links(&self) -> Vec<ChildLink> {
        self.children.read().clone()
    }

    pub(crate) fn child_link(&self, child: &Mesh) -> Option<ChildLink> {
        self.children
            .read()
            .iter()
            .find(|c| std::ptr::eq(c.mesh.as_ref(), child))
            .cloned()
    }

    pub(crate) fn parent_map(&self) -> Option<TypedAttributeHandle<i64>> {
        self.parent.read().as_ref().map(|p| p.map)
    }

    /// Hash of this mesh's own committed edit history.
    #[inline]
    pub fn own_hash(&self) -> u64 {
        self.own_hash.load(Ordering::Acquire)
    }

    pub(crate) fn bump_own_hash(&self, digest: u64) {
        let _ = self
            .own_hash
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| {
                Some(h.rotate_left(5).wrapping_add(digest) ^ 0x9e37_79b9_7f4a_7c15)
            });
    }

    pub(crate) fn set_own_hash(&self, value: u64) {
        self.own_hash.store(value, Ordering::Release);
    }
}

// ---- entries --------------------------------------------------------------

pub(crate) fn read_entry(mesh: &Mesh, map: &TypedAttributeHandle<i64>, id: i64) -> (Tuple, Tuple) {
    mesh.attributes().read_with(map, id, |v| {
        (Tuple::from_slice(&v[..5]), Tuple::from_slice(&v[5..MAP_ARITY]))
    })
}

pub(crate) fn write_entry(
    mesh: &Mesh,
    map: &TypedAttributeHandle<i64>,
    id: i64,
    child: &Tuple,
    parent: &Tuple,
) {
    let mut values = [0i64; MAP_ARITY];
    values[..5].copy_from_slice(&child.to_array());
    values[5..].copy_from_slice(&parent.to_array());
    mesh.attributes().write(map, id, &values);
}

pub(crate) fn clear_entry(mesh: &Mesh, map: &TypedAttributeHandle<i64>, id: i64) {
    write_entry(mesh, map, id, &Tuple::NULL, &Tuple::NULL);
}

/// Corresponding vertex lists of an entry: child flag and the first `d + 1`
/// vertices of the parent flag.
pub(crate) fn entry_vertices(
    parent: &Mesh,
    child: &Mesh,
    ct: &Tuple,
    pt: &Tuple,
) -> (Vec<i64>, Vec<i64>) {
    let cflag = child.flag_vertices(ct);
    let mut pflag = parent.flag_vertices(pt);
    pflag.truncate(cflag.len());
    (cflag, pflag)
}

fn translate(from: &[i64], to: &[i64], vertices: &[i64]) -> Option<Vec<i64>> {
    vertices
        .iter()
        .map(|v| from.iter().position(|x| x == v).map(|i| to[i]))
        .collect()
}

/// The child registry is not scoped, so it only changes outside scopes.
fn no_open_scope(parent: &Mesh, child: &Mesh) -> Result<(), MeshError> {
    if parent.attributes().scope_depth() > 0 || child.attributes().scope_depth() > 0 {
        return Err(MeshError::UnsupportedOperation(
            "child meshes cannot be registered or removed inside an open scope",
        ));
    }
    Ok(())
}

fn map_name(serial: usize) -> String {
    format!("multimesh::map_to_child::{serial}")
}

impl Mesh {
    /// Attach `child` below this mesh.
    ///
    /// `map` pairs every live top cell of the child (first tuple) with a
    /// `d`-simplex of this mesh (second tuple), `d` being the child's
    /// dimension. The two flags correspond vertex by vertex. Returns the
    /// child's id.
    ///
    /// Fails with [`MeshError::NotRoot`] when `child` already has a parent.
    pub fn register_child_mesh(
        self: &Arc<Self>,
        child: Arc<Mesh>,
        map: &[(Tuple, Tuple)],
    ) -> Result<usize, MeshError> {
        if Arc::ptr_eq(self, &child) {
            return Err(MeshError::InvalidMap("a mesh cannot be its own child".into()));
        }
        if !child.multi_mesh().is_root() {
            return Err(MeshError::NotRoot);
        }
        no_open_scope(self, &child)?;
        let mut ancestor = self.multi_mesh().parent();
        while let Some(a) = ancestor {
            if Arc::ptr_eq(&a, &child) {
                return Err(MeshError::InvalidMap("registration would create a cycle".into()));
            }
            ancestor = a.multi_mesh().parent();
        }
        let d = child.top_dimension();
        if d > self.top_dimension() {
            return Err(MeshError::InvalidMap(format!(
                "child dimension {d} exceeds parent dimension {}",
                self.top_dimension()
            )));
        }
        let simplex_type = PrimitiveType::from_dimension(d);
        let live_cells = child.count(child.top_simplex_type());
        if live_cells != map.len() {
            return Err(MeshError::InvalidMap(format!(
                "{} entries for {live_cells} child cells",
                map.len()
            )));
        }

        let mut cells = HashSet::new();
        let mut targets = HashSet::new();
        let mut correspondence: HashMap<i64, i64> = HashMap::new();
        let mut entries = Vec::with_capacity(map.len());
        for (ct, pt) in map {
            child.check_tuple(ct)?;
            self.check_tuple(pt)?;
            if !cells.insert(ct.global_cid()) {
                return Err(MeshError::InvalidMap(format!(
                    "child cell {} mapped twice",
                    ct.global_cid()
                )));
            }
            let pid = self.id(pt, simplex_type);
            if !targets.insert(pid) {
                return Err(MeshError::InvalidMap(format!(
                    "parent {simplex_type:?} {pid} is the image of two child cells"
                )));
            }
            let (cv, pv) = entry_vertices(self, &child, ct, pt);
            for (c, p) in cv.iter().zip(&pv) {
                if *correspondence.entry(*c).or_insert(*p) != *p {
                    return Err(MeshError::InvalidMap(format!(
                        "child vertex {c} maps to more than one parent vertex"
                    )));
                }
            }
            entries.push((pid, *ct, *pt));
        }

        let serial = self.multi_mesh().map_serial.fetch_add(1, Ordering::Relaxed);
        let name = map_name(serial);
        let default = [-1i64; MAP_ARITY];
        let parent_map = self
            .attributes()
            .register_attribute::<i64>(&name, simplex_type, &default, true, true)?;
        let child_map = child.attributes().register_attribute::<i64>(
            PARENT_MAP_NAME,
            child.top_simplex_type(),
            &default,
            true,
            true,
        )?;
        for (pid, ct, pt) in &entries {
            write_entry(self, &parent_map, *pid, ct, pt);
            write_entry(&child, &child_map, ct.global_cid(), ct, pt);
        }

        let mut children = self.multi_mesh().children.write();
        let id = children.len();
        *child.multi_mesh().parent.write() = Some(ParentLink {
            parent: Arc::downgrade(self),
            child_id: id,
            map: child_map,
        });
        children.push(ChildLink {
            mesh: child,
            map: parent_map,
            map_name: name,
        });
        log::debug!(
            "registered {:?} child #{id} over {} parent {simplex_type:?}s",
            children[id].mesh.kind(),
            entries.len()
        );
        Ok(id)
    }

    /// Re-link a restored child without touching map values.
    pub(crate) fn attach_child(
        self: &Arc<Self>,
        child: Arc<Mesh>,
        map_name: &str,
    ) -> Result<usize, MeshError> {
        let d = child.top_dimension();
        let parent_map = self.attributes().typed::<i64>(
            &self
                .attributes()
                .get_attribute_handle(map_name, PrimitiveType::from_dimension(d))?,
        )?;
        let child_map = child.attributes().typed::<i64>(
            &child
                .attributes()
                .get_attribute_handle(PARENT_MAP_NAME, child.top_simplex_type())?,
        )?;
        if let Some(serial) = map_name
            .rsplit("::")
            .next()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.multi_mesh()
                .map_serial
                .fetch_max(serial + 1, Ordering::Relaxed);
        }
        let mut children = self.multi_mesh().children.write();
        let id = children.len();
        *child.multi_mesh().parent.write() = Some(ParentLink {
            parent: Arc::downgrade(self),
            child_id: id,
            map: child_map,
        });
        children.push(ChildLink {
            mesh: child,
            map: parent_map,
            map_name: map_name.to_owned(),
        });
        Ok(id)
    }

    /// Detach `child`, clearing both sides of the map. Later children move
    /// down one id.
    pub fn deregister_child_mesh(&self, child: &Mesh) -> Result<(), MeshError> {
        no_open_scope(self, child)?;
        let mut children = self.multi_mesh().children.write();
        let Some(index) = children
            .iter()
            .position(|c| std::ptr::eq(c.mesh.as_ref(), child))
        else {
            return Err(MeshError::UnknownChild(
                child.multi_mesh().child_id().unwrap_or(usize::MAX),
            ));
        };
        let link = children.remove(index);
        let primitive = link.map.primitive_type();
        for id in 0..self.capacity(primitive) as i64 {
            if !read_entry(self, &link.map, id).0.is_null() {
                clear_entry(self, &link.map, id);
            }
        }
        let child_map = link.mesh.multi_mesh().parent_map();
        if let Some(child_map) = child_map {
            for id in 0..child.capacity(child.top_simplex_type()) as i64 {
                if !read_entry(child, &child_map, id).0.is_null() {
                    clear_entry(child, &child_map, id);
                }
            }
        }
        *link.mesh.multi_mesh().parent.write() = None;
        for (i, later) in children.iter().enumerate().skip(index) {
            if let Some(p) = later.mesh.multi_mesh().parent.write().as_mut() {
                p.child_id = i;
            }
        }
        log::debug!("deregistered child #{index}");
        Ok(())
    }

    pub fn get_child(&self, id: usize) -> Result<Arc<Mesh>, MeshError> {
        self.multi_mesh()
            .children
            .read()
            .get(id)
            .map(|c| c.mesh.clone())
            .ok_or(MeshError::UnknownChild(id))
    }

    /// Child ids from the root down to this mesh; empty for a root.
    pub fn absolute_id(&self) -> Vec<usize> {
        let mut path = Vec::new();
        if let Some(id) = self.multi_mesh().child_id() {
            path.push(id);
        }
        let mut up = self.multi_mesh().parent();
        while let Some(m) = up {
            if let Some(id) = m.multi_mesh().child_id() {
                path.push(id);
            }
            up = m.multi_mesh().parent();
        }
        path.reverse();
        path
    }

    /// Topmost ancestor, `None` when this mesh is a root.
    pub fn get_root(&self) -> Option<Arc<Mesh>> {
        let mut root = self.multi_mesh().parent()?;
        while let Some(up) = root.multi_mesh().parent() {
            root = up;
        }
        Some(root)
    }

    fn parent_link(&self) -> Result<(Arc<Mesh>, TypedAttributeHandle<i64>), MeshError> {
        let guard = self.multi_mesh().parent.read();
        let link = guard.as_ref().ok_or(MeshError::UnsupportedOperation(
            "mesh has no parent",
        ))?;
        let parent = link.parent.upgrade().ok_or_else(|| {
            MeshError::StructuralInconsistency("parent mesh was dropped".into())
        })?;
        Ok((parent, link.map))
    }

    /// Image of a simplex of this mesh in its parent, same flag.
    pub fn map_to_parent(&self, simplex: &Simplex) -> Result<Simplex, MeshError> {
        let (parent, map) = self.parent_link()?;
        let t = simplex.tuple();
        self.check_tuple(&t)?;
        let (ct, pt) = read_entry(self, &map, t.global_cid());
        if ct.is_null() {
            return Err(MeshError::StructuralInconsistency(format!(
                "child cell {} has no parent entry",
                t.global_cid()
            )));
        }
        let (cv, pv) = entry_vertices(&parent, self, &ct, &pt);
        let flag = self.flag_vertices(&t);
        let mapped = translate(&cv, &pv, &flag).ok_or_else(|| {
            MeshError::StructuralInconsistency(format!(
                "entry of child cell {} disagrees with its vertices",
                t.global_cid()
            ))
        })?;
        let image = parent
            .tuple_with_vertices(pt.global_cid(), &mapped)
            .ok_or_else(|| {
                MeshError::StructuralInconsistency(format!(
                    "parent cell {} no longer holds {mapped:?}",
                    pt.global_cid()
                ))
            })?;
        Ok(Simplex::new(simplex.primitive_type(), image))
    }

    /// Every simplex of `child` whose image is `simplex`; empty when the
    /// simplex lies outside the mapped region.
    pub fn map_to_child(&self, child: &Mesh, simplex: &Simplex) -> Result<Vec<Simplex>, MeshError> {
        let link = self
            .multi_mesh()
            .child_link(child)
            .ok_or(MeshError::UnknownChild(
                child.multi_mesh().child_id().unwrap_or(usize::MAX),
            ))?;
        self.check_tuple(&simplex.tuple())?;
        let d = child.top_dimension();
        if simplex.dimension() > d {
            return Ok(Vec::new());
        }
        let vertices = self.simplex_vertices(simplex);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for pid in self.faces_containing(d, &vertices, simplex.tuple().global_cid()) {
            let (ct, pt) = read_entry(self, &link.map, pid);
            if ct.is_null() || !child.is_active(child.top_simplex_type(), ct.global_cid()) {
                continue;
            }
            let (cv, pv) = entry_vertices(self, child, &ct, &pt);
            let Some(mapped) = translate(&pv, &cv, &vertices) else {
                continue;
            };
            let Some(t) = child.tuple_with_vertices(ct.global_cid(), &mapped) else {
                continue;
            };
            let image = Simplex::new(simplex.primitive_type(), t);
            if seen.insert(child.simplex_id(&image)) {
                out.push(image);
            }
        }
        Ok(out)
    }

    /// Ids of the `d`-simplices containing `vertices`, searched from `start`.
    pub(crate) fn faces_containing(&self, d: usize, vertices: &[i64], start: i64) -> Vec<i64> {
        let tables = self.tables();
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for c in self.cells_containing(vertices, start) {
            let cv = self.cell_vertices(c);
            for (j, local) in tables.faces(d).iter().enumerate() {
                let contains_all = vertices
                    .iter()
                    .all(|v| local.iter().any(|&l| cv[l as usize] == *v));
                if contains_all {
                    let id = self.face_id(d, c, j);
                    if seen.insert(id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Image of a simplex in the root of the hierarchy.
    pub fn map_to_root(&self, simplex: &Simplex) -> Result<Simplex, MeshError> {
        let Some(mut mesh) = self.multi_mesh().parent() else {
            return Ok(*simplex);
        };
        let mut current = self.map_to_parent(simplex)?;
        while let Some(up) = mesh.multi_mesh().parent() {
            current = mesh.map_to_parent(&current)?;
            mesh = up;
        }
        Ok(current)
    }

    /// Images of a simplex of this mesh in `other`, through the common root.
    pub fn map(&self, other: &Mesh, simplex: &Simplex) -> Result<Vec<Simplex>, MeshError> {
        let at_root = self.map_to_root(simplex)?;
        let mut ancestors: Vec<Arc<Mesh>> = Vec::new();
        let mut up = other.multi_mesh().parent();
        while let Some(m) = up {
            up = m.multi_mesh().parent();
            ancestors.push(m);
        }
        let same_root = match (ancestors.last(), self.get_root()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, &b),
            (Some(a), None) => std::ptr::eq(a.as_ref(), self),
            (None, Some(b)) => std::ptr::eq(b.as_ref(), other),
            (None, None) => std::ptr::eq(self, other),
        };
        if !same_root {
            return Err(MeshError::UnsupportedOperation(
                "meshes belong to different hierarchies",
            ));
        }
        let mut current = vec![at_root];
        // walk root -> other
        let mut path: Vec<&Mesh> = ancestors.iter().rev().map(|m| m.as_ref()).collect();
        path.push(other);
        for pair in path.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            let mut next = Vec::new();
            for s in &current {
                next.extend(parent.map_to_child(child, s)?);
            }
            current = next;
        }
        Ok(current)
    }

    /// True when `simplex` has at least one image in `other`.
    pub fn can_map(&self, other: &Mesh, simplex: &Simplex) -> bool {
        self.map(other, simplex)
            .map(|images| !images.is_empty())
            .unwrap_or(false)
    }

    /// The `d`-simplex of this mesh that child cell `cell` maps onto.
    pub(crate) fn child_image_id(&self, child: &Mesh, cell: i64) -> Option<i64> {
        let map = child.multi_mesh().parent_map()?;
        let (ct, pt) = read_entry(child, &map, cell);
        if ct.is_null() {
            return None;
        }
        Some(self.id(&pt, PrimitiveType::from_dimension(child.top_dimension())))
    }
}
