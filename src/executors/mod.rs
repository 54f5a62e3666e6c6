use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use half::f16;

use crate::builder::ADJUST_SATURATION;
use crate::debug_print;
use crate::error::GraphError;
use crate::graph::{GraphInfo, OperandDescriptor};
use crate::ops::{
    BinaryOp, ReduceOp, adjust_saturation_closed_form, adjust_saturation_reference, binary,
    clamp, reduce, where_select,
};
use crate::runtime_checks::{TensorKind, validate_named_tensors};
use crate::shape_inference::normalize_axis;
use crate::tensor::{Tensor, TensorData};

pub mod interpreter;
pub mod reference;

pub use interpreter::{run_interpreter_from_path, run_interpreter_with_inputs};
pub use reference::run_reference;

/// Tensors keyed by graph input or output name.
pub type NamedTensors = BTreeMap<String, Tensor>;

/// Inference precision of the candidate backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Fp32,
    Fp16,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Fp32 => "FP32",
            Precision::Fp16 => "FP16",
        }
    }

    fn round(self, values: &mut [f32]) {
        if self == Precision::Fp16 {
            for v in values.iter_mut() {
                *v = f16::from_f32(*v).to_f32();
            }
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FP32" | "F32" => Ok(Precision::Fp32),
            "FP16" | "F16" => Ok(Precision::Fp16),
            _ => Err(GraphError::ParseValue {
                kind: "precision",
                value: s.to_string(),
            }),
        }
    }
}

/// Kernel used for fused `adjustSaturation` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaturationKernel {
    HsvRoundTrip,
    ClosedForm,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ExecutionOptions {
    pub precision: Precision,
    pub saturation: SaturationKernel,
}

struct Value {
    data: Vec<f32>,
    shape: Vec<usize>,
}

pub(crate) fn input_descriptors(graph: &GraphInfo) -> BTreeMap<String, OperandDescriptor> {
    graph
        .input_operands
        .iter()
        .filter_map(|&id| {
            graph
                .operand(id)
                .map(|operand| (graph.operand_name(id), operand.descriptor.clone()))
        })
        .collect()
}

fn scalar_of(value: &Value, op_type: &str) -> Result<f32, GraphError> {
    match value.data.as_slice() {
        [x] => Ok(*x),
        _ => Err(GraphError::invalid_operation(
            op_type,
            format!("expected a scalar operand, got shape {:?}", value.shape),
        )),
    }
}

/// Evaluate `graph` in operation order on host memory.
pub(crate) fn execute_graph(
    graph: &GraphInfo,
    inputs: &NamedTensors,
    options: ExecutionOptions,
) -> Result<NamedTensors, GraphError> {
    validate_named_tensors(inputs, &input_descriptors(graph), TensorKind::Input)?;

    let mut values: Vec<Option<Value>> = Vec::new();
    values.resize_with(graph.operands.len(), || None);

    for &id in &graph.input_operands {
        graph.operand_or_err(id, "graph inputs")?;
        let name = graph.operand_name(id);
        let tensor = inputs
            .get(&name)
            .ok_or_else(|| GraphError::RuntimeTensorMissing {
                kind: "input".to_string(),
                name: name.clone(),
            })?;
        let mut data = tensor.to_f32_vec();
        options.precision.round(&mut data);
        values[id as usize] = Some(Value {
            data,
            shape: tensor.shape.clone(),
        });
    }
    for (&id, payload) in &graph.constant_operand_ids_to_handles {
        let operand = graph.operand_or_err(id, "constant payloads")?;
        let data = TensorData::from_le_bytes(operand.descriptor.data_type, &payload.data)?;
        let expected = operand.descriptor.byte_length().unwrap_or(usize::MAX);
        if payload.data.len() != expected {
            return Err(GraphError::ConstantLengthMismatch {
                operand: id,
                expected,
                actual: payload.data.len(),
            });
        }
        values[id as usize] = Some(Value {
            data: data.to_f32_vec(),
            shape: operand.descriptor.shape_usize(),
        });
    }

    for op in &graph.operations {
        let args = op
            .input_operands
            .iter()
            .map(|&id| {
                values
                    .get(id as usize)
                    .and_then(Option::as_ref)
                    .ok_or(GraphError::RuntimeOperandUnavailable { operand: id })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let arity = |expected: usize| -> Result<(), GraphError> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(GraphError::OperationArity {
                    op_type: op.op_type.clone(),
                    expected,
                    actual: args.len(),
                })
            }
        };

        let (mut data, shape) = match op.op_type.as_str() {
            ADJUST_SATURATION => {
                arity(2)?;
                let scale = scalar_of(args[1], &op.op_type)?;
                let out = match options.saturation {
                    SaturationKernel::HsvRoundTrip => {
                        adjust_saturation_reference(&args[0].data, scale)?
                    }
                    SaturationKernel::ClosedForm => {
                        adjust_saturation_closed_form(&args[0].data, scale)?
                    }
                };
                (out, args[0].shape.clone())
            }
            "reduceMax" | "reduceMin" => {
                arity(1)?;
                let kind = ReduceOp::from_op_type(&op.op_type).ok_or_else(|| {
                    GraphError::UnsupportedOperation {
                        op_type: op.op_type.clone(),
                    }
                })?;
                let axes = op
                    .attr_i64_list("axes")
                    .unwrap_or_default()
                    .into_iter()
                    .map(|axis| {
                        normalize_axis(axis, args[0].shape.len()).ok_or_else(|| {
                            GraphError::invalid_operation(
                                &op.op_type,
                                format!("axis {axis} out of range"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let keep = op.attr_bool("keepDimensions").unwrap_or(false);
                reduce(kind, &args[0].data, &args[0].shape, &axes, keep)?
            }
            "clamp" => {
                arity(1)?;
                let min_value = op.attr_f64("minValue").unwrap_or(f64::NEG_INFINITY) as f32;
                let max_value = op.attr_f64("maxValue").unwrap_or(f64::INFINITY) as f32;
                (
                    clamp(&args[0].data, min_value, max_value)?,
                    args[0].shape.clone(),
                )
            }
            "where" => {
                arity(3)?;
                where_select(
                    (args[0].data.as_slice(), args[0].shape.as_slice()),
                    (args[1].data.as_slice(), args[1].shape.as_slice()),
                    (args[2].data.as_slice(), args[2].shape.as_slice()),
                )?
            }
            other => {
                let kind = BinaryOp::from_op_type(other).ok_or_else(|| {
                    GraphError::UnsupportedOperation {
                        op_type: other.to_string(),
                    }
                })?;
                arity(2)?;
                binary(
                    kind,
                    &args[0].data,
                    &args[0].shape,
                    &args[1].data,
                    &args[1].shape,
                )?
            }
        };
        options.precision.round(&mut data);
        debug_print!(
            "executed `{}` -> operand {} shape {:?}",
            op.display_name(),
            op.output_operand,
            shape
        );

        let slot = values
            .get_mut(op.output_operand as usize)
            .ok_or(GraphError::InvalidOperandReference {
                context: op.display_name(),
                operand: op.output_operand,
            })?;
        *slot = Some(Value { data, shape });
    }

    let mut outputs = NamedTensors::new();
    for &id in &graph.output_operands {
        let operand = graph.operand_or_err(id, "graph outputs")?;
        let value = values[id as usize]
            .take()
            .ok_or(GraphError::RuntimeOperandUnavailable { operand: id })?;
        let tensor = Tensor::from_f32(operand.descriptor.data_type, value.shape, value.data)?;
        outputs.insert(graph.operand_name(id), tensor);
    }
    Ok(outputs)
}
