//! Edge collapse: merge the tuple's vertex into the other endpoint.

use super::executor::{RegionEdit, rewrite_region, sorted_key};
use super::strategy::AttributeStrategies;
use super::{CollapseSettings, LocalEdit, Operation, OperationKind, OperationRecord, OperationSettings};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::multimesh::update::{self, EditEvent};
use crate::topology::tuple::Tuple;

/// Collapses the edge of the input tuple, removing the tuple's vertex.
///
/// The return tuple sits on the surviving vertex, when any cell survives
/// around it.
#[derive(Clone, Debug)]
pub struct EdgeCollapse {
    settings: OperationSettings,
}

impl Default for EdgeCollapse {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EdgeCollapse {
    pub fn new(settings: impl Into<OperationSettings>) -> Self {
        Self {
            settings: settings.into(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CollapseSettings::default())
    }
}

impl Operation for EdgeCollapse {
    fn kind(&self) -> OperationKind {
        OperationKind::Collapse
    }

    fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    fn apply(&self, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError> {
        Ok(collapse_local(mesh, t, &self.settings.strategies)?.into_record(OperationKind::Collapse))
    }
}

/// Collapse without validation, in the current scope. Mapped children follow.
pub(crate) fn collapse_local(
    mesh: &Mesh,
    t: &Tuple,
    strategies: &AttributeStrategies,
) -> Result<LocalEdit, MeshError> {
    if mesh.top_dimension() == 0 {
        return Err(MeshError::UnsupportedOperation("point meshes have no edges"));
    }
    let flag = mesh.flag_vertices(t);
    let (a, b) = (flag[0], flag[1]);
    let star = mesh.cells_containing(&[a], t.global_cid());
    let captured = update::capture(mesh, &star);

    let new_cells: Vec<Vec<i64>> = star
        .iter()
        .map(|&c| mesh.cell_vertices(c))
        .filter(|cv| !cv.contains(&b))
        .map(|cv| cv.into_iter().map(|v| if v == a { b } else { v }).collect())
        .collect();
    let region = rewrite_region(mesh, &star, &new_cells)?;
    collapse_attributes(mesh, &region, a, b, strategies)?;

    let return_tuple = region
        .new_cells
        .first()
        .and_then(|&c| mesh.tuple_with_vertices(c, &[b]))
        .or_else(|| mesh.find_simplex(&[b]).map(|s| s.tuple()));

    let children = update::propagate(mesh, captured, &EditEvent::Collapse { removed: a, kept: b })?;
    Ok(LocalEdit {
        region,
        return_tuple,
        new_vertex: None,
        children,
    })
}

fn collapse_attributes(
    mesh: &Mesh,
    region: &RegionEdit,
    a: i64,
    b: i64,
    strategies: &AttributeStrategies,
) -> Result<(), MeshError> {
    let attributes = mesh.attributes();
    for handle in attributes.user_attributes() {
        let k = handle.primitive_type().dimension();
        let strategy = strategies.get(&handle);
        let name = attributes.name(&handle);
        let default = attributes.default_values(&handle);
        for (key, &id) in &region.new_ids[k] {
            if !key.contains(&b) {
                continue;
            }
            let a_key = sorted_key(key.iter().map(|&v| if v == b { a } else { v }));
            let Some(&a_id) = region.old_ids[k].get(&a_key) else {
                continue;
            };
            let from_a = attributes.values(&handle, a_id);
            let values = if region.is_fresh(k, key) {
                from_a
            } else {
                strategy
                    .collapse
                    .merge(&name, &from_a, &attributes.values(&handle, id), &default)?
            };
            attributes.set_values(&handle, id, &values)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugInvariants;
    use crate::operations::strategy::{AttributeStrategy, MergeStrategy};
    use crate::topology::primitive::PrimitiveType;

    fn fan() -> Mesh {
        Mesh::tri_mesh(&[
            [0, 1, 2],
            [0, 2, 3],
            [0, 3, 4],
            [0, 4, 5],
            [0, 5, 6],
            [0, 6, 1],
        ])
        .unwrap()
    }

    #[test]
    fn collapse_center_of_a_fan() {
        let m = fan();
        let t = m.find_simplex(&[0, 1]).unwrap().tuple();
        let record = EdgeCollapse::with_defaults().execute(&m, &t).unwrap();
        assert!(m.validate_invariants().is_ok());
        assert_eq!(m.count(PrimitiveType::Vertex), 6);
        assert_eq!(m.count(PrimitiveType::Face), 4);
        assert_eq!(m.count(PrimitiveType::Edge), 9);
        assert!(!m.is_active(PrimitiveType::Vertex, 0));
        let r = record.return_tuple.unwrap();
        assert_eq!(m.vertex_id(&r), 1);
        assert_eq!(m.valence(1), 5);
    }

    #[test]
    fn merged_values_follow_the_strategy() {
        let m = fan();
        let h = m.create_attribute::<f64>("temperature", PrimitiveType::Vertex, &[0.0]).unwrap();
        m.accessor(&h).set_scalar(0, 10.0);
        m.accessor(&h).set_scalar(1, 2.0);
        let settings = CollapseSettings::default().with_strategy(
            m.attributes().erase(h),
            AttributeStrategy {
                collapse: MergeStrategy::Mean,
                ..AttributeStrategy::for_type(crate::attribute::AttributeType::Double)
            },
        );
        let t = m.find_simplex(&[0, 1]).unwrap().tuple();
        EdgeCollapse::new(settings).execute(&m, &t).unwrap();
        assert_eq!(m.accessor(&h).scalar(1), 6.0);
    }

    #[test]
    fn default_collapse_keeps_the_surviving_value() {
        let m = fan();
        let h = m.create_attribute::<i64>("id", PrimitiveType::Vertex, &[0]).unwrap();
        m.accessor(&h).set_scalar(0, 100);
        m.accessor(&h).set_scalar(1, 1);
        let t = m.find_simplex(&[0, 1]).unwrap().tuple();
        EdgeCollapse::with_defaults().execute(&m, &t).unwrap();
        assert_eq!(m.accessor(&h).scalar(1), 1);
    }

    #[test]
    fn throw_strategy_rolls_back() {
        let m = fan();
        let h = m.create_attribute::<i64>("region", PrimitiveType::Vertex, &[0]).unwrap();
        m.accessor(&h).set_scalar(0, 5);
        let settings = CollapseSettings::default().with_strategy(
            m.attributes().erase(h),
            AttributeStrategy {
                collapse: MergeStrategy::Throw,
                ..AttributeStrategy::for_type(crate::attribute::AttributeType::Int64)
            },
        );
        let t = m.find_simplex(&[0, 1]).unwrap().tuple();
        let err = EdgeCollapse::new(settings).execute(&m, &t).unwrap_err();
        assert_eq!(err, MeshError::AttributeConflict { attribute: "region".into() });
        assert_eq!(m.count(PrimitiveType::Face), 6);
        assert!(m.is_active(PrimitiveType::Vertex, 0));
        assert!(m.is_valid(&t));
    }
}
