//! Construction of the per-route contact scaling matrix.
//!
//! Each property contributes a small `n x n` matrix (`n` = number of declared values) giving the
//! relative mixing weight from a source value to a sink value. The route matrix is the Kronecker
//! product of the matrices of every property on that route, taken in property-name order. A
//! property value's group offset is its value index times the size of the cumulative matrix
//! before that property was aggregated, so an agent's group index is the sum of its property
//! offsets.

use std::collections::BTreeMap;

use log::debug;

use super::{GroupIndex, PropertyValueList, ScalingMatrix};
use crate::error::EmodError;
use crate::{HashMap, HashMapExt};

/// Registered property matrices and, once a route has been built, the value-to-offset tables.
#[derive(Debug, Default, Clone)]
pub struct ScalingMatrixBuilder {
    property_matrices: HashMap<String, ScalingMatrix>,
    value_offsets: HashMap<String, HashMap<String, GroupIndex>>,
}

impl ScalingMatrixBuilder {
    #[must_use]
    pub fn new() -> Self {
        ScalingMatrixBuilder {
            property_matrices: HashMap::new(),
            value_offsets: HashMap::new(),
        }
    }

    /// Validates and stores the scaling matrix for `property`.
    pub fn register(
        &mut self,
        property: &str,
        values: &[String],
        scaling_matrix: &ScalingMatrix,
    ) -> Result<(), EmodError> {
        self.check_for_duplicate_property_name(property)?;
        check_for_valid_value_list_size(property, values)?;
        check_for_valid_scaling_matrix_size(property, scaling_matrix, values)?;

        self.property_matrices
            .insert(property.to_string(), scaling_matrix.clone());
        Ok(())
    }

    fn check_for_duplicate_property_name(&self, property: &str) -> Result<(), EmodError> {
        if self.property_matrices.contains_key(property) {
            return Err(EmodError::DuplicateProperty {
                property: property.to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.property_matrices.contains_key(property)
    }

    /// Aggregates the matrices of `properties` into one route matrix and records the group offset
    /// of every property value.
    pub fn build_route_matrix(
        &mut self,
        properties: &BTreeMap<String, PropertyValueList>,
    ) -> Result<ScalingMatrix, EmodError> {
        let mut cumulative = initialize_cumulative_matrix();

        for (property, values) in properties {
            self.add_property_values_to_value_to_index_map(property, values, cumulative.len());
            let property_matrix =
                self.property_matrices
                    .get(property)
                    .ok_or_else(|| EmodError::BadMapKey {
                        map: "property_matrices",
                        key: property.clone(),
                    })?;
            cumulative = aggregate_property_matrix_with_cumulative_matrix(property_matrix, &cumulative);
        }

        debug!(
            "built {n}x{n} scaling matrix from {} properties",
            properties.len(),
            n = cumulative.len()
        );
        Ok(cumulative)
    }

    fn add_property_values_to_value_to_index_map(
        &mut self,
        property: &str,
        values: &[String],
        current_matrix_size: usize,
    ) {
        let offsets = values
            .iter()
            .enumerate()
            .map(|(value_index, value)| (value.clone(), value_index * current_matrix_size))
            .collect();
        self.value_offsets.insert(property.to_string(), offsets);
    }

    /// `None` if the property does not take part in any built route.
    #[must_use]
    pub fn offsets_for(&self, property: &str) -> Option<&HashMap<String, GroupIndex>> {
        self.value_offsets.get(property)
    }

    /// Offset contributed by `property = value`. The property must have been built; an
    /// undeclared value is an error rather than a silent group 0.
    pub fn offset(&self, property: &str, value: &str) -> Result<GroupIndex, EmodError> {
        let offsets = self
            .offsets_for(property)
            .ok_or_else(|| EmodError::UnknownProperty(property.to_string()))?;
        offsets
            .get(value)
            .copied()
            .ok_or_else(|| EmodError::UnknownPropertyValue {
                property: property.to_string(),
                value: value.to_string(),
            })
    }
}

fn check_for_valid_value_list_size(property: &str, values: &[String]) -> Result<(), EmodError> {
    if values.is_empty() {
        return Err(EmodError::EmptyValueList {
            property: property.to_string(),
        });
    }
    Ok(())
}

fn check_for_valid_scaling_matrix_size(
    property: &str,
    scaling_matrix: &ScalingMatrix,
    values: &[String],
) -> Result<(), EmodError> {
    let expected = values.len();
    if scaling_matrix.len() != expected {
        return Err(EmodError::ScalingMatrixSize {
            property: property.to_string(),
            expected,
            rows: scaling_matrix.len(),
            bad_row: None,
        });
    }
    if let Some((row, entries)) = scaling_matrix
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != expected)
    {
        return Err(EmodError::ScalingMatrixSize {
            property: property.to_string(),
            expected,
            rows: scaling_matrix.len(),
            bad_row: Some((row, entries.len())),
        });
    }
    Ok(())
}

/// The 1x1 identity every route matrix starts from.
#[must_use]
pub fn initialize_cumulative_matrix() -> ScalingMatrix {
    vec![vec![1.0]]
}

/// Kronecker product `property ⊗ cumulative`, indexed `[sink][source]`.
#[must_use]
pub fn aggregate_property_matrix_with_cumulative_matrix(
    property_matrix: &ScalingMatrix,
    cumulative_matrix: &ScalingMatrix,
) -> ScalingMatrix {
    let current_size = cumulative_matrix.len();
    let property_size = property_matrix.len();
    let new_size = current_size * property_size;
    let mut aggregate = vec![vec![0.0; new_size]; new_size];

    for (i_sink_property, property_row) in property_matrix.iter().enumerate() {
        for (i_source_property, property_weight) in property_row.iter().enumerate() {
            for (i_sink_cumulative, cumulative_row) in cumulative_matrix.iter().enumerate() {
                let sink = i_sink_property * current_size + i_sink_cumulative;
                for (i_source_cumulative, cumulative_weight) in cumulative_row.iter().enumerate() {
                    let source = i_source_property * current_size + i_source_cumulative;
                    aggregate[sink][source] = property_weight * cumulative_weight;
                }
            }
        }
    }

    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(names: &[&str]) -> PropertyValueList {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn rejects_duplicate_property() {
        let mut builder = ScalingMatrixBuilder::new();
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        builder
            .register("RISK", &values(&["LOW", "HIGH"]), &identity)
            .unwrap();
        let result = builder.register("RISK", &values(&["LOW", "HIGH"]), &identity);
        assert!(matches!(result, Err(EmodError::DuplicateProperty { property }) if property == "RISK"));
    }

    #[test]
    fn rejects_empty_value_list() {
        let mut builder = ScalingMatrixBuilder::new();
        let result = builder.register("RISK", &[], &Vec::new());
        assert!(matches!(result, Err(EmodError::EmptyValueList { .. })));
    }

    #[test]
    fn rejects_wrong_row_count() {
        let mut builder = ScalingMatrixBuilder::new();
        let result = builder.register("RISK", &values(&["LOW", "HIGH"]), &vec![vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(EmodError::ScalingMatrixSize {
                expected: 2,
                rows: 1,
                bad_row: None,
                ..
            })
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut builder = ScalingMatrixBuilder::new();
        let ragged = vec![vec![1.0, 0.0], vec![0.0]];
        let result = builder.register("RISK", &values(&["LOW", "HIGH"]), &ragged);
        assert!(matches!(
            result,
            Err(EmodError::ScalingMatrixSize {
                bad_row: Some((1, 1)),
                ..
            })
        ));
        assert!(!builder.has_property("RISK"));
    }

    #[test]
    fn kronecker_aggregation() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![0.0, 5.0], vec![6.0, 7.0]];
        let result = aggregate_property_matrix_with_cumulative_matrix(&a, &b);
        let expected = vec![
            vec![0.0, 5.0, 0.0, 10.0],
            vec![6.0, 7.0, 12.0, 14.0],
            vec![0.0, 15.0, 0.0, 20.0],
            vec![18.0, 21.0, 24.0, 28.0],
        ];
        assert_eq!(result, expected);
    }

    #[test]
    fn aggregating_into_identity_is_a_copy() {
        let a = vec![vec![0.5, 0.5], vec![0.25, 0.75]];
        let result = aggregate_property_matrix_with_cumulative_matrix(&a, &initialize_cumulative_matrix());
        assert_eq!(result, a);
    }

    #[test]
    fn offsets_follow_property_name_order() {
        let mut builder = ScalingMatrixBuilder::new();
        let risk_matrix = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let place_matrix = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        builder
            .register("RISK", &values(&["LOW", "HIGH"]), &risk_matrix)
            .unwrap();
        builder
            .register("PLACE", &values(&["A", "B", "C"]), &place_matrix)
            .unwrap();

        let mut properties = BTreeMap::new();
        properties.insert("RISK".to_string(), values(&["LOW", "HIGH"]));
        properties.insert("PLACE".to_string(), values(&["A", "B", "C"]));
        let matrix = builder.build_route_matrix(&properties).unwrap();
        assert_eq!(matrix.len(), 6);

        // "PLACE" sorts first and is aggregated into the 1x1 starting matrix.
        assert_eq!(builder.offset("PLACE", "C").unwrap(), 2);
        assert_eq!(builder.offset("RISK", "LOW").unwrap(), 0);
        assert_eq!(builder.offset("RISK", "HIGH").unwrap(), 3);

        assert!(matches!(
            builder.offset("RISK", "MEDIUM"),
            Err(EmodError::UnknownPropertyValue { .. })
        ));
        assert!(matches!(
            builder.offset("AGE", "OLD"),
            Err(EmodError::UnknownProperty(_))
        ));
    }

    #[test]
    fn unregistered_property_is_a_bad_key() {
        let mut builder = ScalingMatrixBuilder::new();
        let mut properties = BTreeMap::new();
        properties.insert("RISK".to_string(), values(&["LOW"]));
        assert!(matches!(
            builder.build_route_matrix(&properties),
            Err(EmodError::BadMapKey { .. })
        ));
    }
}
