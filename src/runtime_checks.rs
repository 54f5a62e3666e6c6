use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::graph::OperandDescriptor;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    Input,
    Output,
}

impl TensorKind {
    fn as_str(self) -> &'static str {
        match self {
            TensorKind::Input => "input",
            TensorKind::Output => "output",
        }
    }
}

/// Check that `tensors` and `descriptors` name the same set of tensors and
/// that every tensor matches its descriptor.
pub fn validate_named_tensors(
    tensors: &BTreeMap<String, Tensor>,
    descriptors: &BTreeMap<String, OperandDescriptor>,
    kind: TensorKind,
) -> Result<(), GraphError> {
    for name in descriptors.keys() {
        if !tensors.contains_key(name) {
            return Err(GraphError::RuntimeTensorMissing {
                kind: kind.as_str().to_string(),
                name: name.clone(),
            });
        }
    }

    for (name, tensor) in tensors {
        let descriptor =
            descriptors
                .get(name)
                .ok_or_else(|| GraphError::RuntimeTensorUnexpected {
                    kind: kind.as_str().to_string(),
                    name: name.clone(),
                })?;
        validate_tensor(name, tensor, descriptor, kind)?;
    }

    Ok(())
}

pub fn validate_tensor(
    name: &str,
    tensor: &Tensor,
    descriptor: &OperandDescriptor,
    kind: TensorKind,
) -> Result<(), GraphError> {
    if tensor.data_type() != descriptor.data_type {
        return Err(GraphError::RuntimeTensorTypeMismatch {
            kind: kind.as_str().to_string(),
            name: name.to_string(),
            expected: descriptor.data_type,
            actual: tensor.data_type(),
        });
    }

    if tensor.rank() != descriptor.rank() {
        return Err(GraphError::RuntimeTensorRankMismatch {
            kind: kind.as_str().to_string(),
            name: name.to_string(),
            expected_rank: descriptor.rank(),
            actual_rank: tensor.rank(),
        });
    }

    for (axis, (&actual, &expected)) in tensor.shape.iter().zip(&descriptor.shape).enumerate() {
        if actual != expected as usize {
            return Err(GraphError::RuntimeStaticDimensionMismatch {
                kind: kind.as_str().to_string(),
                name: name.to_string(),
                axis,
                expected,
                actual,
            });
        }
    }

    validate_shape_data_length(name, &tensor.shape, tensor.element_count())
}

pub fn validate_shape_data_length(
    name: &str,
    shape: &[usize],
    data_len: usize,
) -> Result<(), GraphError> {
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| GraphError::RuntimeTensorShapeOverflow {
            name: name.to_string(),
            shape: shape.to_vec(),
        })?;

    if data_len != expected {
        return Err(GraphError::RuntimeTensorDataLengthMismatch {
            name: name.to_string(),
            expected,
            actual: data_len,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DataType;
    use crate::tensor::TensorData;

    fn desc(shape: &[u32]) -> OperandDescriptor {
        OperandDescriptor::new(DataType::Float32, shape)
    }

    fn tensor(shape: &[usize]) -> Tensor {
        let count = shape.iter().product();
        Tensor::new(shape.to_vec(), TensorData::Float32(vec![0.0; count])).unwrap()
    }

    #[test]
    fn validates_matching_tensor() {
        assert!(validate_tensor("x", &tensor(&[2, 3]), &desc(&[2, 3]), TensorKind::Input).is_ok());
    }

    #[test]
    fn rejects_static_mismatch() {
        let err =
            validate_tensor("x", &tensor(&[2, 4]), &desc(&[2, 3]), TensorKind::Input).unwrap_err();
        assert!(matches!(
            err,
            GraphError::RuntimeStaticDimensionMismatch { axis: 1, .. }
        ));
    }

    #[test]
    fn rejects_rank_mismatch() {
        let err =
            validate_tensor("x", &tensor(&[6]), &desc(&[2, 3]), TensorKind::Input).unwrap_err();
        assert!(matches!(err, GraphError::RuntimeTensorRankMismatch { .. }));
    }

    #[test]
    fn rejects_type_mismatch() {
        let half = Tensor::zeros(&OperandDescriptor::new(DataType::Float16, &[2, 3])).unwrap();
        let err = validate_tensor("x", &half, &desc(&[2, 3]), TensorKind::Input).unwrap_err();
        assert!(matches!(err, GraphError::RuntimeTensorTypeMismatch { .. }));
    }

    #[test]
    fn validates_named_tensor_sets() {
        let mut descs = BTreeMap::new();
        descs.insert("x".to_string(), desc(&[2, 3]));
        let mut actual = BTreeMap::new();
        actual.insert("x".to_string(), tensor(&[2, 3]));
        assert!(validate_named_tensors(&actual, &descs, TensorKind::Input).is_ok());
    }

    #[test]
    fn rejects_missing_named_tensor() {
        let mut descs = BTreeMap::new();
        descs.insert("x".to_string(), desc(&[1]));
        let err =
            validate_named_tensors(&BTreeMap::new(), &descs, TensorKind::Input).unwrap_err();
        assert!(matches!(err, GraphError::RuntimeTensorMissing { .. }));
    }

    #[test]
    fn rejects_unexpected_named_tensor() {
        let mut actual = BTreeMap::new();
        actual.insert("x".to_string(), tensor(&[1]));
        let err =
            validate_named_tensors(&actual, &BTreeMap::new(), TensorKind::Output).unwrap_err();
        assert!(matches!(err, GraphError::RuntimeTensorUnexpected { .. }));
    }

    #[test]
    fn validates_shape_data_length() {
        assert!(validate_shape_data_length("x", &[2, 3], 6).is_ok());
        assert!(validate_shape_data_length("x", &[], 1).is_ok());
        let err = validate_shape_data_length("x", &[2, 3], 7).unwrap_err();
        assert!(matches!(
            err,
            GraphError::RuntimeTensorDataLengthMismatch { .. }
        ));
    }
}
