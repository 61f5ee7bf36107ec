//! Attribute update strategies for new and merged simplices.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::attribute::{AttributeScalar, AttributeType, AttributeValues, MeshAttributeHandle, Rational};
use crate::mesh_error::MeshError;

/// User merge function: `(tuple side, other side) -> merged`.
pub type MergeFn =
    Arc<dyn Fn(&AttributeValues, &AttributeValues) -> Result<AttributeValues, MeshError> + Send + Sync>;

/// How two values meeting in one simplex are combined.
///
/// The tuple side is the simplex reached through the operation's input tuple
/// (the removed vertex of a collapse, the first endpoint of a split edge);
/// the other side is its counterpart.
#[derive(Clone)]
pub enum MergeStrategy {
    CopyTuple,
    CopyOther,
    Mean,
    /// Fail with [`MeshError::AttributeConflict`] unless both values agree.
    Throw,
    Default,
    Custom(MergeFn),
}

impl Debug for MergeStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::CopyTuple => f.write_str("CopyTuple"),
            MergeStrategy::CopyOther => f.write_str("CopyOther"),
            MergeStrategy::Mean => f.write_str("Mean"),
            MergeStrategy::Throw => f.write_str("Throw"),
            MergeStrategy::Default => f.write_str("Default"),
            MergeStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What a simplex split into halves passes on to each half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitStrategy {
    Copy,
    Default,
}

fn mean_of<T: AttributeScalar>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().zip(b).map(|(x, y)| T::mean(x, y)).collect()
}

impl MergeStrategy {
    pub fn merge(
        &self,
        attribute: &str,
        tuple_side: &AttributeValues,
        other: &AttributeValues,
        default: &AttributeValues,
    ) -> Result<AttributeValues, MeshError> {
        match self {
            MergeStrategy::CopyTuple => Ok(tuple_side.clone()),
            MergeStrategy::CopyOther => Ok(other.clone()),
            MergeStrategy::Default => Ok(default.clone()),
            MergeStrategy::Throw => {
                if tuple_side == other {
                    Ok(other.clone())
                } else {
                    Err(MeshError::AttributeConflict {
                        attribute: attribute.to_owned(),
                    })
                }
            }
            MergeStrategy::Mean => match (tuple_side, other) {
                (AttributeValues::Char(a), AttributeValues::Char(b)) => Ok(AttributeValues::Char(mean_of(a, b))),
                (AttributeValues::Int64(a), AttributeValues::Int64(b)) => {
                    Ok(AttributeValues::Int64(mean_of(a, b)))
                }
                (AttributeValues::Double(a), AttributeValues::Double(b)) => {
                    Ok(AttributeValues::Double(mean_of(a, b)))
                }
                (AttributeValues::Rational(a), AttributeValues::Rational(b)) => {
                    Ok(AttributeValues::Rational(mean_of::<Rational>(a, b)))
                }
                _ => Err(MeshError::AttributeTypeMismatch {
                    name: attribute.to_owned(),
                    actual: tuple_side.attribute_type().as_str(),
                    requested: other.attribute_type().as_str(),
                }),
            },
            MergeStrategy::Custom(f) => {
                let merged = f(tuple_side, other)?;
                if merged.attribute_type() != other.attribute_type() || merged.len() != other.len() {
                    return Err(MeshError::ArityMismatch {
                        name: attribute.to_owned(),
                        expected: other.len(),
                        found: merged.len(),
                    });
                }
                Ok(merged)
            }
        }
    }
}

/// Per-attribute behaviour under split and collapse.
#[derive(Clone, Debug)]
pub struct AttributeStrategy {
    /// New vertex of a split, from the edge's two endpoints.
    pub split_vertex: MergeStrategy,
    /// Halves of a split simplex.
    pub split_simplex: SplitStrategy,
    /// Simplices merged by a collapse.
    pub collapse: MergeStrategy,
}

impl AttributeStrategy {
    /// Mean for `Double`/`Rational`, a copy of the tuple side otherwise;
    /// halves copy; collapses keep the surviving side.
    pub fn for_type(ty: AttributeType) -> Self {
        let split_vertex = match ty {
            AttributeType::Double | AttributeType::Rational => MergeStrategy::Mean,
            AttributeType::Char | AttributeType::Int64 => MergeStrategy::CopyTuple,
        };
        Self {
            split_vertex,
            split_simplex: SplitStrategy::Copy,
            collapse: MergeStrategy::CopyOther,
        }
    }
}

/// Strategy overrides keyed by attribute; anything not listed uses
/// [`AttributeStrategy::for_type`].
#[derive(Clone, Debug, Default)]
pub struct AttributeStrategies {
    overrides: HashMap<MeshAttributeHandle, AttributeStrategy>,
}

impl AttributeStrategies {
    pub fn set(&mut self, handle: MeshAttributeHandle, strategy: AttributeStrategy) {
        self.overrides.insert(handle, strategy);
    }

    pub fn get(&self, handle: &MeshAttributeHandle) -> AttributeStrategy {
        self.overrides
            .get(handle)
            .cloned()
            .unwrap_or_else(|| AttributeStrategy::for_type(handle.held_type()))
    }
}
