use std::path::Path;

use crate::converters::{DecomposeConverter, WebnnConverter};
use crate::debug_print;
use crate::error::GraphError;
use crate::executors::{ExecutionOptions, NamedTensors, Precision, SaturationKernel, execute_graph};
use crate::ir::IrModel;
use crate::loader::load_ir_model_from_path;
use crate::validator::{ContextProperties, GraphValidator};

/// Execute a converted model on the host interpreter.
///
/// The model graph is validated first, so malformed files fail with an error
/// instead of reaching the kernels. Every intermediate is rounded to
/// `precision`. Fused `adjustSaturation`
/// nodes left by the legacy frontend run the closed-form RGB kernel.
pub fn run_interpreter(
    model: &IrModel,
    inputs: &NamedTensors,
    precision: Precision,
) -> Result<NamedTensors, GraphError> {
    if ![WebnnConverter::FORMAT, DecomposeConverter::FORMAT].contains(&model.format.as_str()) {
        return Err(GraphError::UnsupportedRuntimeFormat {
            format: model.format.clone(),
        });
    }
    GraphValidator::new(&model.graph, ContextProperties::default()).validate()?;
    debug_print!(
        "interpreter: `{}` model, IR v{}, {} operations at {}",
        model.format,
        model.ir_version,
        model.graph.operations.len(),
        precision
    );
    execute_graph(
        &model.graph,
        inputs,
        ExecutionOptions {
            precision,
            saturation: SaturationKernel::ClosedForm,
        },
    )
}

pub fn run_interpreter_with_inputs(
    model_bytes: &[u8],
    inputs: &NamedTensors,
    precision: Precision,
) -> Result<NamedTensors, GraphError> {
    let model = IrModel::from_bytes(model_bytes)?;
    run_interpreter(&model, inputs, precision)
}

pub fn run_interpreter_from_path(
    path: &Path,
    inputs: &NamedTensors,
    precision: Precision,
) -> Result<NamedTensors, GraphError> {
    let model = load_ir_model_from_path(path)?;
    run_interpreter(&model, inputs, precision)
}
