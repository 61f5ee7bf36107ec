//! Full structural check of a mesh.

use hashbrown::HashMap;
use itertools::Itertools;

use super::Mesh;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;

fn broken(msg: String) -> MeshError {
    MeshError::StructuralInconsistency(msg)
}

impl DebugInvariants for Mesh {
    /// Checks, over live simplices only:
    /// - cell vertices and faces are alive and distinct,
    /// - each face id names exactly one vertex set,
    /// - neighbor links are symmetric and share the facet,
    /// - a facet is shared by at most two cells and unmatched facets are
    ///   marked as boundary,
    /// - every coface pointer reaches a live cell containing the simplex.
    fn validate_invariants(&self) -> Result<(), MeshError> {
        let d = self.top_dimension();
        if d == 0 {
            return Ok(());
        }
        let tables = self.tables();
        let cells = self.simplex_ids(self.top_simplex_type());
        let mut face_keys: Vec<HashMap<i64, Vec<i64>>> = vec![HashMap::new(); d];
        let mut facets: HashMap<Vec<i64>, Vec<(i64, usize)>> = HashMap::new();

        for &c in &cells {
            let vertices = self.cell_vertices(c);
            if !vertices.iter().all_unique() {
                return Err(broken(format!("cell {c} repeats a vertex: {vertices:?}")));
            }
            for &v in &vertices {
                if !self.is_active_dim(0, v) {
                    return Err(broken(format!("cell {c} uses dead vertex {v}")));
                }
            }
            for k in 0..d {
                for (j, local) in tables.faces(k).iter().enumerate() {
                    let id = self.face_id(k, c, j);
                    if !self.is_active_dim(k, id) {
                        return Err(broken(format!("cell {c} uses dead {k}-simplex {id}")));
                    }
                    let key: Vec<i64> = local
                        .iter()
                        .map(|&l| vertices[l as usize])
                        .sorted_unstable()
                        .collect();
                    match face_keys[k].get(&id) {
                        Some(existing) if *existing != key => {
                            return Err(broken(format!(
                                "{k}-simplex {id} spans both {existing:?} and {key:?}"
                            )));
                        }
                        Some(_) => {}
                        None => {
                            face_keys[k].insert(id, key);
                        }
                    }
                }
            }
            for i in 0..=d {
                let key: Vec<i64> = vertices
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &v)| v)
                    .sorted_unstable()
                    .collect();
                facets.entry(key).or_default().push((c, i));
            }
        }

        for k in 1..d {
            let mut seen: HashMap<&Vec<i64>, i64> = HashMap::new();
            for (id, key) in &face_keys[k] {
                if let Some(other) = seen.insert(key, *id) {
                    return Err(broken(format!(
                        "{k}-simplices {other} and {id} share vertices {key:?}"
                    )));
                }
            }
        }

        for (key, incident) in &facets {
            match incident.as_slice() {
                [(c, i)] => {
                    let n = self.neighbor(*c, *i);
                    if n >= 0 {
                        return Err(broken(format!(
                            "cell {c} links to {n} across boundary facet {key:?}"
                        )));
                    }
                }
                [(c0, i0), (c1, i1)] => {
                    if self.neighbor(*c0, *i0) != *c1 || self.neighbor(*c1, *i1) != *c0 {
                        return Err(broken(format!(
                            "cells {c0} and {c1} share facet {key:?} but are not linked"
                        )));
                    }
                }
                _ => {
                    return Err(broken(format!(
                        "facet {key:?} is shared by {} cells",
                        incident.len()
                    )));
                }
            }
        }

        for k in 0..d {
            let primitive = PrimitiveType::from_dimension(k);
            for id in self.simplex_ids(primitive) {
                let c = self.coface(k, id);
                if !self.is_active_dim(d, c) || !self.cell_face_ids(k, c).contains(&id) {
                    return Err(broken(format!(
                        "{k}-simplex {id} points at cell {c} which does not contain it"
                    )));
                }
            }
        }
        Ok(())
    }
}
