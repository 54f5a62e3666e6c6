use crate::error::GraphError;
use crate::executors::{ExecutionOptions, NamedTensors, Precision, SaturationKernel, execute_graph};
use crate::graph::GraphInfo;

/// Evaluate the source graph at full precision with the exact HSV kernel.
///
/// This is the ground truth every candidate backend is compared against.
pub fn run_reference(graph: &GraphInfo, inputs: &NamedTensors) -> Result<NamedTensors, GraphError> {
    execute_graph(
        graph,
        inputs,
        ExecutionOptions {
            precision: Precision::Fp32,
            saturation: SaturationKernel::HsvRoundTrip,
        },
    )
}
