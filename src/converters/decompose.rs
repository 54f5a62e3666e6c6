use std::collections::HashMap;

use crate::builder::{ADJUST_SATURATION, GraphBuilder};
use crate::converters::GraphConverter;
use crate::debug_print;
use crate::error::GraphError;
use crate::graph::{GraphInfo, Operation};
use crate::tensor::TensorData;

/// Default frontend: fused image operators are lowered into element-wise and
/// reduction primitives.
#[derive(Debug, Default)]
pub struct DecomposeConverter;

impl DecomposeConverter {
    pub const FORMAT: &'static str = "decomposed";

    fn mapped(map: &HashMap<u32, u32>, id: u32, op: &Operation) -> Result<u32, GraphError> {
        map.get(&id)
            .copied()
            .ok_or_else(|| GraphError::InvalidOperandReference {
                context: format!("{} lowering", op.display_name()),
                operand: id,
            })
    }

    /// Saturation adjustment in RGB space:
    ///
    /// ```text
    /// max, min = reduceMax(x), reduceMin(x)      over channels, kept
    /// delta    = max - min
    /// s        = clamp(delta / max * scale, 0, 1)
    /// y        = max - (max - x) * (s * max / delta)
    /// out      = where(min(delta, max) > 0, y, max)
    /// ```
    fn lower_adjust_saturation(
        builder: &mut GraphBuilder,
        images: u32,
        scale: u32,
    ) -> Result<u32, GraphError> {
        let data_type = builder.descriptor(images)?.data_type;

        let max = builder.reduce_max(images, &[-1], true)?;
        let min = builder.reduce_min(images, &[-1], true)?;
        let delta = builder.sub(max, min)?;

        let saturation = builder.div(delta, max)?;
        let scaled = builder.mul(saturation, scale)?;
        let clamped = builder.clamp(scaled, 0.0, 1.0)?;

        let chroma = builder.mul(clamped, max)?;
        let factor = builder.div(chroma, delta)?;
        let distance = builder.sub(max, images)?;
        let shift = builder.mul(distance, factor)?;
        let adjusted = builder.sub(max, shift)?;

        let guard = builder.min(delta, max)?;
        let zero = builder.scalar_constant(data_type, 0.0)?;
        let colored = builder.greater(guard, zero)?;
        builder.where_(colored, adjusted, max)
    }
}

impl GraphConverter for DecomposeConverter {
    fn format(&self) -> &'static str {
        Self::FORMAT
    }

    fn lower(&self, graph: &GraphInfo) -> Result<GraphInfo, GraphError> {
        debug_print!(
            "decomposed frontend: lowering {} operations ({} {})",
            graph.operations.len(),
            graph.count_operations(ADJUST_SATURATION),
            ADJUST_SATURATION
        );

        let mut builder = GraphBuilder::new();
        let mut map: HashMap<u32, u32> = HashMap::new();

        for &id in &graph.input_operands {
            let operand = graph.operand_or_err(id, "graph inputs")?;
            let name = operand
                .name
                .as_deref()
                .ok_or(GraphError::UnnamedInput { operand: id })?;
            let new_id = builder.input(name, operand.descriptor.clone())?;
            map.insert(id, new_id);
        }

        let mut constant_ids: Vec<u32> = graph.constant_operand_ids_to_handles.keys().copied().collect();
        constant_ids.sort_unstable();
        for id in constant_ids {
            let operand = graph.operand_or_err(id, "constant payloads")?;
            let payload = &graph.constant_operand_ids_to_handles[&id];
            let data = TensorData::from_le_bytes(operand.descriptor.data_type, &payload.data)?;
            let new_id = builder.constant(operand.descriptor.clone(), &data)?;
            map.insert(id, new_id);
        }

        for (idx, op) in graph.operations.iter().enumerate() {
            let inputs = op
                .input_operands
                .iter()
                .map(|&id| Self::mapped(&map, id, op))
                .collect::<Result<Vec<_>, _>>()?;
            let arity_error = |expected: usize| GraphError::OperationArity {
                op_type: op.op_type.clone(),
                expected,
                actual: inputs.len(),
            };

            builder.set_label_prefix(format!("{}{}", op.display_name(), idx));
            let output = match op.op_type.as_str() {
                ADJUST_SATURATION => {
                    let [images, scale] = inputs[..] else {
                        return Err(arity_error(2));
                    };
                    Self::lower_adjust_saturation(&mut builder, images, scale)?
                }
                "reduceMax" | "reduceMin" => {
                    let [input] = inputs[..] else {
                        return Err(arity_error(1));
                    };
                    let axes = op.attr_i64_list("axes").unwrap_or_default();
                    let keep = op.attr_bool("keepDimensions").unwrap_or(false);
                    if op.op_type == "reduceMax" {
                        builder.reduce_max(input, &axes, keep)?
                    } else {
                        builder.reduce_min(input, &axes, keep)?
                    }
                }
                "clamp" => {
                    let [input] = inputs[..] else {
                        return Err(arity_error(1));
                    };
                    let min_value = op.attr_f64("minValue").unwrap_or(f64::NEG_INFINITY);
                    let max_value = op.attr_f64("maxValue").unwrap_or(f64::INFINITY);
                    builder.clamp(input, min_value as f32, max_value as f32)?
                }
                "sub" | "mul" | "div" | "min" | "greater" => {
                    let [a, b] = inputs[..] else {
                        return Err(arity_error(2));
                    };
                    match op.op_type.as_str() {
                        "sub" => builder.sub(a, b)?,
                        "mul" => builder.mul(a, b)?,
                        "div" => builder.div(a, b)?,
                        "min" => builder.min(a, b)?,
                        _ => builder.greater(a, b)?,
                    }
                }
                "where" => {
                    let [condition, t, f] = inputs[..] else {
                        return Err(arity_error(3));
                    };
                    builder.where_(condition, t, f)?
                }
                other => {
                    return Err(GraphError::ConversionFailed {
                        format: Self::FORMAT.to_string(),
                        reason: format!("no lowering for `{other}`"),
                    });
                }
            };
            map.insert(op.output_operand, output);
        }

        let names: Vec<String> = graph
            .output_operands
            .iter()
            .map(|&id| graph.operand_name(id))
            .collect();
        let outputs = graph
            .output_operands
            .iter()
            .zip(&names)
            .map(|(&id, name)| {
                map.get(&id)
                    .map(|&new_id| (name.as_str(), new_id))
                    .ok_or_else(|| GraphError::InvalidOperandReference {
                        context: "graph outputs".to_string(),
                        operand: id,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let lowered = builder.build(&outputs)?;
        debug_print!(
            "decomposed frontend: emitted {} operations",
            lowered.operations.len()
        );
        Ok(lowered)
    }
}
