//! Child meshes built from tagged parent simplices.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::attribute::TypedAttributeHandle;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::MeshKind;
use crate::topology::simplex::IdSimplex;
use crate::topology::tuple::Tuple;

/// Build a child from every live simplex whose `tag` equals `value` and
/// register it below `parent`.
///
/// The tag's primitive fixes the child's dimension. Child vertices are
/// numbered by ascending parent vertex id.
pub fn extract_child_mesh(
    parent: &Arc<Mesh>,
    tag: &TypedAttributeHandle<i64>,
    value: i64,
) -> Result<Arc<Mesh>, MeshError> {
    let primitive = tag.primitive_type();
    let d = primitive.dimension();
    let kind = MeshKind::from_top_dimension(d).ok_or(MeshError::UnsupportedOperation(
        "tag primitive has no mesh kind",
    ))?;
    let acc = parent.accessor(tag);
    let tagged: Vec<i64> = parent
        .simplex_ids(primitive)
        .into_iter()
        .filter(|&id| acc.scalar(id) == value)
        .collect();

    let spans: Vec<Vec<i64>> = tagged
        .iter()
        .map(|&id| parent.id_simplex_vertices(IdSimplex::new(primitive, id)))
        .collect();
    let mut parent_vertices: Vec<i64> = spans.iter().flatten().copied().collect();
    parent_vertices.sort_unstable();
    parent_vertices.dedup();
    let to_child: HashMap<i64, i64> = parent_vertices
        .iter()
        .enumerate()
        .map(|(i, &v)| (v, i as i64))
        .collect();

    let cells: Vec<Vec<i64>> = spans
        .iter()
        .map(|span| span.iter().map(|v| to_child[v]).collect())
        .collect();
    let child = if d == 0 {
        Arc::new(Mesh::point_mesh(parent_vertices.len())?)
    } else {
        Arc::new(Mesh::from_cells(kind, &cells)?)
    };

    let mut map: Vec<(Tuple, Tuple)> = Vec::with_capacity(tagged.len());
    for (span, cell) in spans.iter().zip(&cells) {
        let child_cell = if d == 0 {
            Some(cell[0])
        } else {
            child.find_simplex(cell).map(|s| s.tuple().global_cid())
        };
        let ct = child_cell.and_then(|c| child.tuple_with_vertices(c, cell));
        let pt = parent.find_simplex(span).map(|s| s.tuple());
        match (ct, pt) {
            (Some(ct), Some(pt)) => map.push((ct, pt)),
            _ => {
                return Err(MeshError::StructuralInconsistency(format!(
                    "tagged simplex {span:?} could not be located"
                )));
            }
        }
    }
    parent.register_child_mesh(child.clone(), &map)?;
    log::debug!(
        "extracted {kind:?} child with {} cells from {} tagged simplices",
        child.count(child.top_simplex_type()),
        tagged.len()
    );
    Ok(child)
}
