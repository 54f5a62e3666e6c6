use std::collections::{BTreeMap, HashSet};

use crate::builder::{ADJUST_SATURATION, check_adjust_saturation};
use crate::debug_print;
use crate::error::GraphError;
use crate::graph::{GraphInfo, OperandDescriptor, OperandKind, Operation};
use crate::shape_inference::{broadcast_shapes, infer_reduce_shape, normalize_axis};

/// Limits applied while validating a graph.
#[derive(Debug, Clone)]
pub struct ContextProperties {
    pub tensor_byte_length_limit: usize,
}

impl Default for ContextProperties {
    fn default() -> Self {
        Self {
            tensor_byte_length_limit: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationArtifacts {
    pub input_names_to_descriptors: BTreeMap<String, OperandDescriptor>,
    pub output_names_to_descriptors: BTreeMap<String, OperandDescriptor>,
    /// Operand id to the display names of the operations that consume it.
    pub operand_to_dependent_operations: BTreeMap<u32, Vec<String>>,
}

pub struct GraphValidator<'a> {
    graph: &'a GraphInfo,
    context: ContextProperties,
}

impl<'a> GraphValidator<'a> {
    pub fn new(graph: &'a GraphInfo, context: ContextProperties) -> Self {
        Self { graph, context }
    }

    pub fn validate(&self) -> Result<ValidationArtifacts, GraphError> {
        let mut artifacts = ValidationArtifacts::default();
        self.check_operands()?;

        let mut available: HashSet<u32> = HashSet::new();
        for &id in &self.graph.input_operands {
            let operand = self.graph.operand_or_err(id, "graph inputs")?;
            let name = operand
                .name
                .clone()
                .ok_or(GraphError::UnnamedInput { operand: id })?;
            if artifacts
                .input_names_to_descriptors
                .insert(name.clone(), operand.descriptor.clone())
                .is_some()
            {
                return Err(GraphError::DuplicateName {
                    kind: "input".to_string(),
                    name,
                });
            }
            available.insert(id);
        }
        for &id in self.graph.constant_operand_ids_to_handles.keys() {
            available.insert(id);
        }

        let mut produced: HashSet<u32> = HashSet::new();
        for (idx, op) in self.graph.operations.iter().enumerate() {
            for &input in &op.input_operands {
                if !available.contains(&input) {
                    debug_print!(
                        "operation #{} `{}` reads operand {} before it is defined",
                        idx,
                        op.display_name(),
                        input
                    );
                    return Err(GraphError::InvalidOperandReference {
                        context: op.display_name(),
                        operand: input,
                    });
                }
                artifacts
                    .operand_to_dependent_operations
                    .entry(input)
                    .or_default()
                    .push(op.display_name());
            }
            self.graph
                .operand_or_err(op.output_operand, &op.display_name())?;
            if !produced.insert(op.output_operand) || available.contains(&op.output_operand) {
                return Err(GraphError::DuplicateOperandProducer {
                    operand: op.output_operand,
                });
            }
            self.check_operation(op)?;
            available.insert(op.output_operand);
        }

        if self.graph.output_operands.is_empty() {
            return Err(GraphError::MissingOutputs);
        }
        for &id in &self.graph.output_operands {
            let operand = self.graph.operand_or_err(id, "graph outputs")?;
            if !produced.contains(&id) {
                return Err(GraphError::InvalidOperandReference {
                    context: "graph outputs".to_string(),
                    operand: id,
                });
            }
            let name = self.graph.operand_name(id);
            if artifacts
                .output_names_to_descriptors
                .insert(name.clone(), operand.descriptor.clone())
                .is_some()
            {
                return Err(GraphError::DuplicateName {
                    kind: "output".to_string(),
                    name,
                });
            }
        }

        Ok(artifacts)
    }

    fn check_operands(&self) -> Result<(), GraphError> {
        for (id, operand) in self.graph.operands.iter().enumerate() {
            let id = id as u32;
            let byte_length = operand.descriptor.byte_length().unwrap_or(usize::MAX);
            if byte_length > self.context.tensor_byte_length_limit {
                return Err(GraphError::TensorLimitExceeded {
                    operand: id,
                    byte_length,
                    limit: self.context.tensor_byte_length_limit,
                });
            }
            if operand.kind == OperandKind::Constant {
                let data = self
                    .graph
                    .constant_operand_ids_to_handles
                    .get(&id)
                    .ok_or_else(|| GraphError::InvalidOperandReference {
                        context: "constant payloads".to_string(),
                        operand: id,
                    })?;
                if data.data.len() != byte_length {
                    return Err(GraphError::ConstantLengthMismatch {
                        operand: id,
                        expected: byte_length,
                        actual: data.data.len(),
                    });
                }
            }
        }
        for &id in self.graph.constant_operand_ids_to_handles.keys() {
            let operand = self.graph.operand_or_err(id, "constant payloads")?;
            if operand.kind != OperandKind::Constant {
                return Err(GraphError::invalid_operation(
                    "constant",
                    format!("operand {id} has a payload but is not a constant"),
                ));
            }
        }
        Ok(())
    }

    fn descriptor(&self, id: u32, op: &Operation) -> Result<&OperandDescriptor, GraphError> {
        Ok(&self.graph.operand_or_err(id, &op.display_name())?.descriptor)
    }

    fn check_operation(&self, op: &Operation) -> Result<(), GraphError> {
        let arity = match op.op_type.as_str() {
            ADJUST_SATURATION => 2,
            "reduceMax" | "reduceMin" | "clamp" => 1,
            "sub" | "mul" | "div" | "min" | "greater" => 2,
            "where" => 3,
            _ => {
                return Err(GraphError::UnsupportedOperation {
                    op_type: op.op_type.clone(),
                });
            }
        };
        if op.input_operands.len() != arity {
            return Err(GraphError::OperationArity {
                op_type: op.op_type.clone(),
                expected: arity,
                actual: op.input_operands.len(),
            });
        }

        let inputs = op
            .input_operands
            .iter()
            .map(|&id| self.descriptor(id, op))
            .collect::<Result<Vec<_>, _>>()?;
        let output = self.descriptor(op.output_operand, op)?;

        let expected_shape = match op.op_type.as_str() {
            ADJUST_SATURATION => {
                check_adjust_saturation(inputs[0], inputs[1])?;
                inputs[0].shape.clone()
            }
            "reduceMax" | "reduceMin" => {
                let axes = op
                    .attr_i64_list("axes")
                    .ok_or_else(|| GraphError::invalid_operation(&op.op_type, "missing axes"))?;
                let resolved = axes
                    .iter()
                    .map(|&axis| {
                        normalize_axis(axis, inputs[0].rank()).ok_or_else(|| {
                            GraphError::invalid_operation(
                                &op.op_type,
                                format!("axis {axis} out of range"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let keep = op.attr_bool("keepDimensions").unwrap_or(false);
                infer_reduce_shape(&inputs[0].shape, &resolved, keep)
            }
            "clamp" => inputs[0].shape.clone(),
            "where" => broadcast_shapes(
                &broadcast_shapes(&inputs[0].shape, &inputs[1].shape)?,
                &inputs[2].shape,
            )?,
            _ => broadcast_shapes(&inputs[0].shape, &inputs[1].shape)?,
        };

        if output.shape != expected_shape {
            return Err(GraphError::invalid_operation(
                &op.op_type,
                format!(
                    "output shape {:?} does not match inferred {:?}",
                    output.shape, expected_shape
                ),
            ));
        }
        Ok(())
    }
}
