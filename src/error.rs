use std::path::PathBuf;

use thiserror::Error;

use crate::graph::DataType;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("operand {operand} referenced by `{context}` does not exist")]
    InvalidOperandReference { context: String, operand: u32 },
    #[error("operand {operand} is produced more than once")]
    DuplicateOperandProducer { operand: u32 },
    #[error("graph declares no output operands")]
    MissingOutputs,
    #[error("input operand {operand} has no name")]
    UnnamedInput { operand: u32 },
    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: String, name: String },
    #[error("operation `{op_type}` expects {expected} inputs, got {actual}")]
    OperationArity {
        op_type: String,
        expected: usize,
        actual: usize,
    },
    #[error("operation `{op_type}` is not supported")]
    UnsupportedOperation { op_type: String },
    #[error("operation `{op_type}`: {reason}")]
    InvalidOperation { op_type: String, reason: String },
    #[error("shapes {lhs:?} and {rhs:?} are not broadcast compatible")]
    IncompatibleShapes { lhs: Vec<u32>, rhs: Vec<u32> },
    #[error("operand {operand} is {byte_length} bytes which exceeds the limit of {limit}")]
    TensorLimitExceeded {
        operand: u32,
        byte_length: usize,
        limit: usize,
    },
    #[error("data type {data_type:?} is not supported here")]
    UnsupportedDataType { data_type: DataType },
    #[error("constant operand {operand} carries {actual} bytes, expected {expected}")]
    ConstantLengthMismatch {
        operand: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{byte_length} bytes do not hold whole {data_type} elements")]
    PartialElement {
        data_type: DataType,
        byte_length: usize,
    },
    #[error("no converter registered for format `{format}`")]
    UnknownConverter { format: String },
    #[error("conversion to `{format}` failed: {reason}")]
    ConversionFailed { format: String, reason: String },
    #[error("IR version {version} is not supported (supported: {supported:?})")]
    UnsupportedIrVersion { version: u32, supported: Vec<u32> },
    #[error("artifact format `{format}` cannot be executed by the interpreter")]
    UnsupportedRuntimeFormat { format: String },
    #[error("device `{device}` has no candidate backend")]
    UnsupportedDevice { device: String },
    #[error("unknown {kind} `{value}`")]
    ParseValue { kind: &'static str, value: String },
    #[error("input `{name}` is missing from the inputs info")]
    MissingInput { name: String },
    #[error("{kind} tensor `{name}` is missing")]
    RuntimeTensorMissing { kind: String, name: String },
    #[error("{kind} tensor `{name}` is not declared by the graph")]
    RuntimeTensorUnexpected { kind: String, name: String },
    #[error("{kind} tensor `{name}` has rank {actual_rank}, expected {expected_rank}")]
    RuntimeTensorRankMismatch {
        kind: String,
        name: String,
        expected_rank: usize,
        actual_rank: usize,
    },
    #[error("{kind} tensor `{name}` axis {axis} is {actual}, expected {expected}")]
    RuntimeStaticDimensionMismatch {
        kind: String,
        name: String,
        axis: usize,
        expected: u32,
        actual: usize,
    },
    #[error("{kind} tensor `{name}` has type {actual:?}, expected {expected:?}")]
    RuntimeTensorTypeMismatch {
        kind: String,
        name: String,
        expected: DataType,
        actual: DataType,
    },
    #[error("tensor `{name}` shape {shape:?} overflows")]
    RuntimeTensorShapeOverflow { name: String, shape: Vec<usize> },
    #[error("tensor `{name}` holds {actual} elements, shape requires {expected}")]
    RuntimeTensorDataLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("operand {operand} was read before it was computed")]
    RuntimeOperandUnavailable { operand: u32 },
    #[error(
        "output `{name}` mismatch at index {index}: reference {expected}, candidate {actual} \
         (|diff| {abs_diff:e} > atol {atol:e} + rtol {rtol:e} * |reference|)"
    )]
    AccuracyMismatch {
        name: String,
        index: usize,
        expected: f32,
        actual: f32,
        abs_diff: f32,
        atol: f32,
        rtol: f32,
    },
    #[error("failed to parse graph `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write `{path}`: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Export {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_operation(op_type: &str, reason: impl Into<String>) -> Self {
        GraphError::InvalidOperation {
            op_type: op_type.to_string(),
            reason: reason.into(),
        }
    }
}
