//! Caller-owned graph construction.
//!
//! Every graph is built from a fresh `GraphBuilder`; there is no process-wide
//! default graph to reset. `build` consumes the builder, so a builder cannot
//! leak operands into a second graph.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::error::GraphError;
use crate::graph::{
    ConstantData, DataType, GraphInfo, Operand, OperandDescriptor, OperandKind, Operation,
};
use crate::shape_inference::{broadcast_shapes, infer_reduce_shape, normalize_axis};
use crate::tensor::TensorData;

pub const ADJUST_SATURATION: &str = "adjustSaturation";

#[derive(Debug, Default)]
pub struct GraphBuilder {
    operands: Vec<Operand>,
    input_operands: Vec<u32>,
    operations: Vec<Operation>,
    constants: HashMap<u32, ConstantData>,
    input_names: HashSet<String>,
    label_prefix: Option<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every following operation `<prefix>_<type>_<n>`.
    pub fn set_label_prefix(&mut self, prefix: impl Into<String>) {
        self.label_prefix = Some(prefix.into());
    }

    pub fn descriptor(&self, id: u32) -> Result<&OperandDescriptor, GraphError> {
        self.operands
            .get(id as usize)
            .map(|operand| &operand.descriptor)
            .ok_or_else(|| GraphError::InvalidOperandReference {
                context: "graph builder".to_string(),
                operand: id,
            })
    }

    pub fn input(
        &mut self,
        name: &str,
        descriptor: OperandDescriptor,
    ) -> Result<u32, GraphError> {
        if !self.input_names.insert(name.to_string()) {
            return Err(GraphError::DuplicateName {
                kind: "input".to_string(),
                name: name.to_string(),
            });
        }
        let id = self.push_operand(OperandKind::Input, descriptor, Some(name.to_string()));
        self.input_operands.push(id);
        Ok(id)
    }

    pub fn constant(
        &mut self,
        descriptor: OperandDescriptor,
        data: &TensorData,
    ) -> Result<u32, GraphError> {
        let id = self.operands.len() as u32;
        let bytes = data.to_le_bytes();
        let expected = descriptor.byte_length().unwrap_or(usize::MAX);
        if bytes.len() != expected {
            return Err(GraphError::ConstantLengthMismatch {
                operand: id,
                expected,
                actual: bytes.len(),
            });
        }
        self.push_operand(OperandKind::Constant, descriptor, None);
        self.constants.insert(
            id,
            ConstantData {
                data: bytes,
                label: None,
            },
        );
        Ok(id)
    }

    pub fn scalar_constant(&mut self, data_type: DataType, value: f32) -> Result<u32, GraphError> {
        let data = TensorData::from_f32(data_type, vec![value])?;
        self.constant(OperandDescriptor::scalar(data_type), &data)
    }

    /// Saturation adjustment of an RGB image batch by a scalar factor.
    pub fn adjust_saturation(&mut self, images: u32, scale: u32) -> Result<u32, GraphError> {
        let images_desc = self.descriptor(images)?.clone();
        let scale_desc = self.descriptor(scale)?;
        check_adjust_saturation(&images_desc, scale_desc)?;
        Ok(self.push_operation(
            ADJUST_SATURATION,
            vec![images, scale],
            images_desc,
            serde_json::Value::Null,
        ))
    }

    pub fn reduce_max(
        &mut self,
        input: u32,
        axes: &[i64],
        keep_dimensions: bool,
    ) -> Result<u32, GraphError> {
        self.reduce("reduceMax", input, axes, keep_dimensions)
    }

    pub fn reduce_min(
        &mut self,
        input: u32,
        axes: &[i64],
        keep_dimensions: bool,
    ) -> Result<u32, GraphError> {
        self.reduce("reduceMin", input, axes, keep_dimensions)
    }

    pub fn sub(&mut self, a: u32, b: u32) -> Result<u32, GraphError> {
        self.binary("sub", a, b)
    }

    pub fn mul(&mut self, a: u32, b: u32) -> Result<u32, GraphError> {
        self.binary("mul", a, b)
    }

    pub fn div(&mut self, a: u32, b: u32) -> Result<u32, GraphError> {
        self.binary("div", a, b)
    }

    pub fn min(&mut self, a: u32, b: u32) -> Result<u32, GraphError> {
        self.binary("min", a, b)
    }

    /// Element-wise `a > b` as a 0/1 mask in the operands' float type.
    pub fn greater(&mut self, a: u32, b: u32) -> Result<u32, GraphError> {
        self.binary("greater", a, b)
    }

    pub fn clamp(&mut self, input: u32, min_value: f32, max_value: f32) -> Result<u32, GraphError> {
        let desc = self.descriptor(input)?.clone();
        Ok(self.push_operation(
            "clamp",
            vec![input],
            desc,
            json!({ "minValue": min_value, "maxValue": max_value }),
        ))
    }

    /// Select `true_value` where `condition` is non-zero, else `false_value`.
    pub fn where_(
        &mut self,
        condition: u32,
        true_value: u32,
        false_value: u32,
    ) -> Result<u32, GraphError> {
        let cond = self.descriptor(condition)?.shape.clone();
        let t = self.descriptor(true_value)?.clone();
        let f = self.descriptor(false_value)?.clone();
        if t.data_type != f.data_type {
            return Err(GraphError::invalid_operation(
                "where",
                format!("branch types differ: {} vs {}", t.data_type, f.data_type),
            ));
        }
        let shape = broadcast_shapes(&broadcast_shapes(&cond, &t.shape)?, &f.shape)?;
        Ok(self.push_operation(
            "where",
            vec![condition, true_value, false_value],
            OperandDescriptor::new(t.data_type, &shape),
            serde_json::Value::Null,
        ))
    }

    /// Finish the graph. `outputs` pairs an output name with the operand that
    /// produces it.
    pub fn build(mut self, outputs: &[(&str, u32)]) -> Result<GraphInfo, GraphError> {
        if outputs.is_empty() {
            return Err(GraphError::MissingOutputs);
        }
        let mut output_operands = Vec::with_capacity(outputs.len());
        let mut seen = HashSet::new();
        for &(name, id) in outputs {
            if !seen.insert(name) {
                return Err(GraphError::DuplicateName {
                    kind: "output".to_string(),
                    name: name.to_string(),
                });
            }
            let operand = self.operands.get_mut(id as usize).ok_or_else(|| {
                GraphError::InvalidOperandReference {
                    context: format!("output `{name}`"),
                    operand: id,
                }
            })?;
            if operand.kind != OperandKind::Intermediate {
                return Err(GraphError::invalid_operation(
                    "output",
                    format!("operand {id} is not produced by an operation"),
                ));
            }
            operand.kind = OperandKind::Output;
            operand.name = Some(name.to_string());
            output_operands.push(id);
        }

        Ok(GraphInfo {
            operands: self.operands,
            input_operands: self.input_operands,
            output_operands,
            operations: self.operations,
            constant_operand_ids_to_handles: self.constants,
        })
    }

    fn reduce(
        &mut self,
        op_type: &str,
        input: u32,
        axes: &[i64],
        keep_dimensions: bool,
    ) -> Result<u32, GraphError> {
        let desc = self.descriptor(input)?.clone();
        let resolved = axes
            .iter()
            .map(|&axis| {
                normalize_axis(axis, desc.rank()).ok_or_else(|| {
                    GraphError::invalid_operation(
                        op_type,
                        format!("axis {axis} out of range for rank {}", desc.rank()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let shape = infer_reduce_shape(&desc.shape, &resolved, keep_dimensions);
        Ok(self.push_operation(
            op_type,
            vec![input],
            OperandDescriptor::new(desc.data_type, &shape),
            json!({ "axes": axes, "keepDimensions": keep_dimensions }),
        ))
    }

    fn binary(&mut self, op_type: &str, a: u32, b: u32) -> Result<u32, GraphError> {
        let lhs = self.descriptor(a)?.clone();
        let rhs = self.descriptor(b)?;
        if lhs.data_type != rhs.data_type {
            return Err(GraphError::invalid_operation(
                op_type,
                format!("operand types differ: {} vs {}", lhs.data_type, rhs.data_type),
            ));
        }
        let shape = broadcast_shapes(&lhs.shape, &rhs.shape)?;
        Ok(self.push_operation(
            op_type,
            vec![a, b],
            OperandDescriptor::new(lhs.data_type, &shape),
            serde_json::Value::Null,
        ))
    }

    fn push_operand(
        &mut self,
        kind: OperandKind,
        descriptor: OperandDescriptor,
        name: Option<String>,
    ) -> u32 {
        let id = self.operands.len() as u32;
        self.operands.push(Operand {
            kind,
            descriptor,
            name,
        });
        id
    }

    fn push_operation(
        &mut self,
        op_type: &str,
        input_operands: Vec<u32>,
        output: OperandDescriptor,
        attributes: serde_json::Value,
    ) -> u32 {
        let output_operand = self.push_operand(OperandKind::Intermediate, output, None);
        let label = self
            .label_prefix
            .as_ref()
            .map(|prefix| format!("{prefix}_{op_type}_{}", self.operations.len()));
        self.operations.push(Operation {
            op_type: op_type.to_string(),
            input_operands,
            output_operand,
            attributes,
            label,
        });
        output_operand
    }
}

/// Shape and type rules of `adjustSaturation`: floating-point images of rank
/// at least 3 with 3 channels last, and a scalar scale of the same type.
pub fn check_adjust_saturation(
    images: &OperandDescriptor,
    scale: &OperandDescriptor,
) -> Result<(), GraphError> {
    if !images.data_type.is_floating_point() {
        return Err(GraphError::UnsupportedDataType {
            data_type: images.data_type,
        });
    }
    if images.rank() < 3 {
        return Err(GraphError::invalid_operation(
            ADJUST_SATURATION,
            format!("images must have rank >= 3, got {:?}", images.shape),
        ));
    }
    if images.shape.last() != Some(&3) {
        return Err(GraphError::invalid_operation(
            ADJUST_SATURATION,
            format!("images must have 3 channels last, got {:?}", images.shape),
        ));
    }
    if scale.rank() != 0 {
        return Err(GraphError::invalid_operation(
            ADJUST_SATURATION,
            format!("scale must be a scalar, got {:?}", scale.shape),
        ));
    }
    if scale.data_type != images.data_type {
        return Err(GraphError::invalid_operation(
            ADJUST_SATURATION,
            format!(
                "scale type {} does not match images type {}",
                scale.data_type, images.data_type
            ),
        ));
    }
    Ok(())
}
