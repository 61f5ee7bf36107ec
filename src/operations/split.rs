//! Edge split: insert a midpoint vertex and halve every cell around the edge.

use super::executor::{FaceKey, RegionEdit, rewrite_region, sorted_key};
use super::strategy::{AttributeStrategies, SplitStrategy};
use super::{LocalEdit, Operation, OperationKind, OperationRecord, OperationSettings, SplitSettings};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::multimesh::update::{self, EditEvent};
use crate::topology::primitive::PrimitiveType;
use crate::topology::tuple::Tuple;

/// Splits the edge of the input tuple.
///
/// The return tuple sits on the new vertex, on the half-edge towards the
/// input tuple's vertex, inside the half of the input cell.
#[derive(Clone, Debug, Default)]
pub struct EdgeSplit {
    settings: OperationSettings,
}

impl EdgeSplit {
    pub fn new(settings: impl Into<OperationSettings>) -> Self {
        Self {
            settings: settings.into(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SplitSettings::default())
    }
}

impl Operation for EdgeSplit {
    fn kind(&self) -> OperationKind {
        OperationKind::Split
    }

    fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    fn apply(&self, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError> {
        Ok(split_local(mesh, t, &self.settings.strategies)?.into_record(OperationKind::Split))
    }
}

/// Split without validation, in the current scope. Mapped children follow.
pub(crate) fn split_local(
    mesh: &Mesh,
    t: &Tuple,
    strategies: &AttributeStrategies,
) -> Result<LocalEdit, MeshError> {
    if mesh.top_dimension() == 0 {
        return Err(MeshError::UnsupportedOperation("point meshes have no edges"));
    }
    let flag = mesh.flag_vertices(t);
    let (a, b) = (flag[0], flag[1]);
    let star = mesh.cells_containing(&[a, b], t.global_cid());
    let captured = update::capture(mesh, &star);

    let m = mesh.reserve(PrimitiveType::Vertex, 1)?[0];
    let mut new_cells = Vec::with_capacity(2 * star.len());
    for &c in &star {
        let cv = mesh.cell_vertices(c);
        new_cells.push(cv.iter().map(|&v| if v == b { m } else { v }).collect());
        new_cells.push(cv.iter().map(|&v| if v == a { m } else { v }).collect::<Vec<i64>>());
    }
    let region = rewrite_region(mesh, &star, &new_cells)?;
    split_attributes(mesh, &region, a, b, m, strategies)?;

    // the input cell comes first, its `b -> m` half first of all
    let mut prefix = flag;
    prefix[0] = m;
    prefix[1] = a;
    let return_tuple = mesh.tuple_with_vertices(region.new_cells[0], &prefix);

    let children = update::propagate(mesh, captured, &EditEvent::Split { a, b, m })?;
    Ok(LocalEdit {
        region,
        return_tuple,
        new_vertex: Some(m),
        children,
    })
}

/// The simplex a half came from: swap `m` back for whichever endpoint the
/// half lacks.
fn parent_key(key: &FaceKey, a: i64, b: i64, m: i64) -> Option<FaceKey> {
    let rest = key.iter().copied().filter(|&v| v != m);
    match (key.contains(&a), key.contains(&b)) {
        (true, false) => Some(sorted_key(rest.chain([b]))),
        (false, true) => Some(sorted_key(rest.chain([a]))),
        _ => None,
    }
}

fn split_attributes(
    mesh: &Mesh,
    region: &RegionEdit,
    a: i64,
    b: i64,
    m: i64,
    strategies: &AttributeStrategies,
) -> Result<(), MeshError> {
    let attributes = mesh.attributes();
    for handle in attributes.user_attributes() {
        let k = handle.primitive_type().dimension();
        let strategy = strategies.get(&handle);
        let default = attributes.default_values(&handle);
        if k == 0 {
            let name = attributes.name(&handle);
            let merged = strategy.split_vertex.merge(
                &name,
                &attributes.values(&handle, a),
                &attributes.values(&handle, b),
                &default,
            )?;
            attributes.set_values(&handle, m, &merged)?;
            continue;
        }
        for (key, &id) in &region.new_ids[k] {
            if !key.contains(&m) {
                continue;
            }
            let source = match (strategy.split_simplex, parent_key(key, a, b, m)) {
                (SplitStrategy::Copy, Some(pk)) => region.old_ids[k].get(&pk).copied(),
                _ => None,
            };
            match source {
                Some(old) => attributes.set_values(&handle, id, &attributes.values(&handle, old))?,
                None => attributes.set_values(&handle, id, &default)?,
            }
        }
    }
    Ok(())
}
