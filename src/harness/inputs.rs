//! Input data generators shared by layer tests.

use std::collections::BTreeMap;

use half::f16;
use rand::Rng;

use crate::error::GraphError;
use crate::graph::{DataType, OperandDescriptor};
use crate::tensor::{Tensor, TensorData};

/// Generated inputs keyed by graph input name.
pub type InputBundle = BTreeMap<String, Tensor>;

/// Largest float16 value below 1.0.
const F16_BELOW_ONE: u16 = 0x3BFF;

/// Draw from [0, 1) and store as `data_type`, keeping the half-open bound
/// after rounding.
fn unit_values(data_type: DataType, values: Vec<f32>) -> Result<TensorData, GraphError> {
    match data_type {
        DataType::Float32 => Ok(TensorData::Float32(values)),
        DataType::Float16 => Ok(TensorData::Float16(
            values
                .into_iter()
                .map(|v| {
                    let h = f16::from_f32(v);
                    if h.to_f32() >= 1.0 {
                        f16::from_bits(F16_BELOW_ONE)
                    } else {
                        h
                    }
                })
                .collect(),
        )),
        other => Err(GraphError::UnsupportedDataType { data_type: other }),
    }
}

/// Uniform sample in [0, 1).
pub fn uniform_scalar<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(0.0f32..1.0)
}

/// Elementwise uniform in [0, 1) with the descriptor's shape and type.
pub fn uniform<R: Rng + ?Sized>(
    rng: &mut R,
    descriptor: &OperandDescriptor,
) -> Result<Tensor, GraphError> {
    let shape = descriptor.shape_usize();
    let count: usize = shape.iter().product();
    let values = (0..count).map(|_| uniform_scalar(rng)).collect();
    Tensor::new(shape, unit_values(descriptor.data_type, values)?)
}

/// One uniform draw in [0, 1) broadcast over the descriptor's shape.
pub fn uniform_constant<R: Rng + ?Sized>(
    rng: &mut R,
    descriptor: &OperandDescriptor,
) -> Result<Tensor, GraphError> {
    let value = uniform_scalar(rng);
    let shape = descriptor.shape_usize();
    let count: usize = shape.iter().product();
    Tensor::new(shape, unit_values(descriptor.data_type, vec![value; count])?)
}

pub fn zeros(descriptor: &OperandDescriptor) -> Result<Tensor, GraphError> {
    if !descriptor.data_type.is_floating_point() {
        return Err(GraphError::UnsupportedDataType {
            data_type: descriptor.data_type,
        });
    }
    Tensor::zeros(descriptor)
}
