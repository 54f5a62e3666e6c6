use log::debug;

use crate::error::GraphError;
use crate::executors::{NamedTensors, Precision};

/// `|candidate - reference| <= atol + rtol * |reference|`, elementwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub atol: f32,
    pub rtol: f32,
}

impl Tolerance {
    pub fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::Fp32 => Tolerance {
                atol: 1e-5,
                rtol: 1e-4,
            },
            Precision::Fp16 => Tolerance {
                atol: 1e-2,
                rtol: 1e-2,
            },
        }
    }

    fn accepts(&self, expected: f32, actual: f32) -> bool {
        if expected.is_nan() || actual.is_nan() {
            return expected.is_nan() && actual.is_nan();
        }
        if expected == actual {
            return true;
        }
        (actual - expected).abs() <= self.atol + self.rtol * expected.abs()
    }
}

/// Compare every reference output with the candidate output of the same name.
/// Returns the number of outputs compared.
pub fn compare_outputs(
    reference: &NamedTensors,
    candidate: &NamedTensors,
    tolerance: Tolerance,
) -> Result<usize, GraphError> {
    for name in candidate.keys() {
        if !reference.contains_key(name) {
            return Err(GraphError::RuntimeTensorUnexpected {
                kind: "output".to_string(),
                name: name.clone(),
            });
        }
    }

    for (name, expected) in reference {
        let actual = candidate
            .get(name)
            .ok_or_else(|| GraphError::RuntimeTensorMissing {
                kind: "output".to_string(),
                name: name.clone(),
            })?;
        if actual.shape.len() != expected.shape.len() {
            return Err(GraphError::RuntimeTensorRankMismatch {
                kind: "output".to_string(),
                name: name.clone(),
                expected_rank: expected.shape.len(),
                actual_rank: actual.shape.len(),
            });
        }
        if let Some((axis, (&e, &a))) = expected
            .shape
            .iter()
            .zip(&actual.shape)
            .enumerate()
            .find(|(_, (e, a))| e != a)
        {
            return Err(GraphError::RuntimeStaticDimensionMismatch {
                kind: "output".to_string(),
                name: name.clone(),
                axis,
                expected: e as u32,
                actual: a,
            });
        }

        let expected_values = expected.to_f32_vec();
        let actual_values = actual.to_f32_vec();
        let mut max_abs_diff = 0.0f32;
        for (index, (&e, &a)) in expected_values.iter().zip(&actual_values).enumerate() {
            if !tolerance.accepts(e, a) {
                return Err(GraphError::AccuracyMismatch {
                    name: name.clone(),
                    index,
                    expected: e,
                    actual: a,
                    abs_diff: (a - e).abs(),
                    atol: tolerance.atol,
                    rtol: tolerance.rtol,
                });
            }
            if e.is_finite() && a.is_finite() {
                max_abs_diff = max_abs_diff.max((a - e).abs());
            }
        }
        debug!(
            "output `{}`: {} elements within tolerance, max |diff| {:e}",
            name,
            expected_values.len(),
            max_abs_diff
        );
    }

    Ok(reference.len())
}
