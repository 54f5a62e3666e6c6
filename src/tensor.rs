use half::f16;

use crate::error::GraphError;
use crate::graph::{DataType, OperandDescriptor};

/// Host-side tensor payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Float16(Vec<f16>),
}

impl TensorData {
    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::Float32(_) => DataType::Float32,
            TensorData::Float16(_) => DataType::Float16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::Float32(v) => v.len(),
            TensorData::Float16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen to f32. Float16 values convert exactly.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            TensorData::Float32(v) => v.clone(),
            TensorData::Float16(v) => v.iter().map(|x| x.to_f32()).collect(),
        }
    }

    /// Narrow f32 values into `data_type` storage.
    pub fn from_f32(data_type: DataType, values: Vec<f32>) -> Result<Self, GraphError> {
        match data_type {
            DataType::Float32 => Ok(TensorData::Float32(values)),
            DataType::Float16 => Ok(TensorData::Float16(
                values.into_iter().map(f16::from_f32).collect(),
            )),
            other => Err(GraphError::UnsupportedDataType { data_type: other }),
        }
    }

    /// Decode little-endian constant bytes.
    pub fn from_le_bytes(data_type: DataType, bytes: &[u8]) -> Result<Self, GraphError> {
        if bytes.len() % data_type.bytes_per_element() != 0 {
            return Err(GraphError::PartialElement {
                data_type,
                byte_length: bytes.len(),
            });
        }
        match data_type {
            DataType::Float32 => Ok(TensorData::Float32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )),
            DataType::Float16 => Ok(TensorData::Float16(
                bytes
                    .chunks_exact(2)
                    .map(|c| f16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )),
            other => Err(GraphError::UnsupportedDataType { data_type: other }),
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            TensorData::Float32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TensorData::Float16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, GraphError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GraphError::RuntimeTensorDataLengthMismatch {
                name: "tensor".to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(
        data_type: DataType,
        shape: Vec<usize>,
        values: Vec<f32>,
    ) -> Result<Self, GraphError> {
        Self::new(shape, TensorData::from_f32(data_type, values)?)
    }

    pub fn full(descriptor: &OperandDescriptor, value: f32) -> Result<Self, GraphError> {
        let shape = descriptor.shape_usize();
        let count = shape.iter().product();
        Self::from_f32(descriptor.data_type, shape, vec![value; count])
    }

    pub fn zeros(descriptor: &OperandDescriptor) -> Result<Self, GraphError> {
        Self::full(descriptor, 0.0)
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data.to_f32_vec()
    }
}
