use crate::converters::GraphConverter;
use crate::debug_print;
use crate::error::GraphError;
use crate::graph::GraphInfo;

/// Legacy frontend: the graph is ingested as-is and fused operators are left
/// for the interpreter's native kernels.
#[derive(Debug, Default)]
pub struct WebnnConverter;

impl WebnnConverter {
    pub const FORMAT: &'static str = "webnn";
}

impl GraphConverter for WebnnConverter {
    fn format(&self) -> &'static str {
        Self::FORMAT
    }

    fn lower(&self, graph: &GraphInfo) -> Result<GraphInfo, GraphError> {
        debug_print!(
            "webnn frontend: passing through {} operations",
            graph.operations.len()
        );
        Ok(graph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{ConvertOptions, GraphConverter};
    use crate::graph::{DataType, OperandDescriptor};
    use crate::builder::GraphBuilder;

    #[test]
    fn keeps_fused_operation_and_stamps_version() {
        let mut builder = GraphBuilder::new();
        let x = builder
            .input("images", OperandDescriptor::new(DataType::Float32, &[5, 5, 3]))
            .unwrap();
        let s = builder
            .input("scale", OperandDescriptor::scalar(DataType::Float32))
            .unwrap();
        let y = builder.adjust_saturation(x, s).unwrap();
        let graph = builder.build(&[("output", y)]).unwrap();

        let converted = WebnnConverter
            .convert(&graph, &ConvertOptions { ir_version: 10 })
            .unwrap();
        assert_eq!(converted.format, "webnn");
        assert_eq!(converted.file_name(), "model.webnn.ir.json");
        let model = converted.to_model().unwrap();
        assert_eq!(model.ir_version, 10);
        assert_eq!(model.graph.operations.len(), 1);
        assert_eq!(model.graph.operations[0].op_type, "adjustSaturation");
    }
}
