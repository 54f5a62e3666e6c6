pub mod builder;
pub mod converters;
pub mod debug;
pub mod error;
pub mod executors;
pub mod graph;
pub mod harness;
pub mod ir;
pub mod layers;
pub mod loader;
pub mod ops;
pub mod runtime_checks;
pub mod shape_inference;
pub mod tensor;
pub mod validator;

pub use builder::GraphBuilder;
pub use converters::{ConvertOptions, ConvertedGraph, ConverterRegistry, GraphConverter};
pub use error::GraphError;
pub use executors::{
    NamedTensors, Precision, run_interpreter_from_path, run_interpreter_with_inputs,
    run_reference,
};
pub use graph::{
    ConstantData, DataType, GraphInfo, Operand, OperandDescriptor, OperandKind, Operation,
};
pub use harness::{
    Device, LayerTest, RunConfig, SweepConfig, TestOutcome, TestTier, Tolerance, run_layer_test,
};
pub use ir::{DEFAULT_IR_VERSION, IrModel, SUPPORTED_IR_VERSIONS};
pub use loader::{load_graph_from_path, load_ir_model_from_path};
pub use tensor::{Tensor, TensorData};
pub use validator::{ContextProperties, GraphValidator, ValidationArtifacts};
