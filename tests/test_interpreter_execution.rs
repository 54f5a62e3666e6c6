//! Interpreter execution tests with numerical verification.
//!
//! Graphs are built with `GraphBuilder`, converted through a frontend and
//! executed from the serialized model bytes.

use layercheck::converters::DecomposeConverter;
use layercheck::{
    ConvertOptions, ConverterRegistry, DataType, GraphBuilder, GraphError, GraphInfo, IrModel,
    NamedTensors, OperandDescriptor, Precision, Tensor, run_interpreter_with_inputs,
    run_reference,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn tensor(shape: &[usize], values: Vec<f32>) -> Tensor {
    Tensor::from_f32(DataType::Float32, shape.to_vec(), values).unwrap()
}

fn inputs(entries: Vec<(&str, Tensor)>) -> NamedTensors {
    entries
        .into_iter()
        .map(|(name, t)| (name.to_string(), t))
        .collect()
}

fn execute(
    graph: &GraphInfo,
    format: &str,
    inputs: &NamedTensors,
    precision: Precision,
) -> Result<Vec<f32>, GraphError> {
    let converted =
        ConverterRegistry::with_defaults().convert(format, graph, &ConvertOptions::default())?;
    let outputs = run_interpreter_with_inputs(&converted.data, inputs, precision)?;
    Ok(outputs["output"].to_f32_vec())
}

fn assert_close(actual: &[f32], expected: &[f32], atol: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= atol,
            "element {i}: got {a}, expected {e} (atol {atol})"
        );
    }
}

/// `a <op> b` with `b` broadcast along the leading axis.
fn binary_graph(op_type: &str) -> GraphInfo {
    let mut builder = GraphBuilder::new();
    let a = builder
        .input("a", OperandDescriptor::new(DataType::Float32, &[2, 3]))
        .unwrap();
    let b = builder
        .input("b", OperandDescriptor::new(DataType::Float32, &[3]))
        .unwrap();
    let out = match op_type {
        "sub" => builder.sub(a, b),
        "mul" => builder.mul(a, b),
        "div" => builder.div(a, b),
        "min" => builder.min(a, b),
        "greater" => builder.greater(a, b),
        other => panic!("no builder for {other}"),
    }
    .unwrap();
    builder.build(&[("output", out)]).unwrap()
}

#[rstest]
#[case("sub", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])]
#[case("mul", vec![1.0, 4.0, 9.0, 4.0, 10.0, 18.0])]
#[case("div", vec![1.0, 1.0, 1.0, 4.0, 2.5, 2.0])]
#[case("min", vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0])]
#[case("greater", vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])]
fn binary_ops_broadcast(
    #[case] op_type: &str,
    #[case] expected: Vec<f32>,
    #[values("webnn", "decomposed")] format: &str,
) {
    let graph = binary_graph(op_type);
    let feeds = inputs(vec![
        ("a", tensor(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
        ("b", tensor(&[3], vec![1.0, 2.0, 3.0])),
    ]);
    let actual = execute(&graph, format, &feeds, Precision::Fp32).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn reduce_over_last_axis_keeps_dimensions() {
    let mut builder = GraphBuilder::new();
    let x = builder
        .input("x", OperandDescriptor::new(DataType::Float32, &[2, 3]))
        .unwrap();
    let hi = builder.reduce_max(x, &[-1], true).unwrap();
    let lo = builder.reduce_min(x, &[-1], true).unwrap();
    let out = builder.sub(hi, lo).unwrap();
    assert_eq!(builder.descriptor(out).unwrap().shape, vec![2, 1]);
    let graph = builder.build(&[("output", out)]).unwrap();

    let feeds = inputs(vec![(
        "x",
        tensor(&[2, 3], vec![0.2, 0.9, 0.5, 0.4, 0.4, 0.1]),
    )]);
    let actual = execute(&graph, "decomposed", &feeds, Precision::Fp32).unwrap();
    assert_close(&actual, &[0.7, 0.3], 1e-6);
}

#[test]
fn clamp_and_where_select() {
    let mut builder = GraphBuilder::new();
    let x = builder
        .input("x", OperandDescriptor::new(DataType::Float32, &[4]))
        .unwrap();
    let clamped = builder.clamp(x, 0.0, 1.0).unwrap();
    let zero = builder.scalar_constant(DataType::Float32, 0.0).unwrap();
    let positive = builder.greater(x, zero).unwrap();
    let out = builder.where_(positive, clamped, zero).unwrap();
    let graph = builder.build(&[("output", out)]).unwrap();

    let feeds = inputs(vec![("x", tensor(&[4], vec![-2.0, 0.5, 1.5, 0.0]))]);
    let actual = execute(&graph, "webnn", &feeds, Precision::Fp32).unwrap();
    assert_eq!(actual, vec![0.0, 0.5, 1.0, 0.0]);
}

fn saturation_graph(shape: &[u32]) -> GraphInfo {
    let mut builder = GraphBuilder::new();
    let images = builder
        .input("images", OperandDescriptor::new(DataType::Float32, shape))
        .unwrap();
    let scale = builder
        .input("scale", OperandDescriptor::scalar(DataType::Float32))
        .unwrap();
    let out = builder.adjust_saturation(images, scale).unwrap();
    builder.build(&[("output", out)]).unwrap()
}

fn random_saturation_inputs(shape: &[usize], rng: &mut StdRng, scale: f32) -> NamedTensors {
    let count = shape.iter().product();
    let images: Vec<f32> = (0..count).map(|_| rng.gen_range(0.0f32..1.0)).collect();
    inputs(vec![
        ("images", tensor(shape, images)),
        ("scale", tensor(&[], vec![scale])),
    ])
}

#[rstest]
#[case(0.0)]
#[case(0.5)]
#[case(1.0)]
#[case(2.5)]
fn lowering_matches_hsv_reference(#[case] scale: f32) {
    let graph = saturation_graph(&[4, 4, 3]);
    let mut rng = StdRng::seed_from_u64(17);
    let feeds = random_saturation_inputs(&[4, 4, 3], &mut rng, scale);

    let expected = run_reference(&graph, &feeds).unwrap()["output"].to_f32_vec();
    for format in ["webnn", "decomposed"] {
        let actual = execute(&graph, format, &feeds, Precision::Fp32).unwrap();
        assert_close(&actual, &expected, 2e-5);
    }
}

#[test]
fn fp16_lowering_stays_within_half_tolerance() {
    let graph = saturation_graph(&[1, 2, 3, 3, 3]);
    let mut rng = StdRng::seed_from_u64(23);
    let feeds = random_saturation_inputs(&[1, 2, 3, 3, 3], &mut rng, 0.7);

    let expected = run_reference(&graph, &feeds).unwrap()["output"].to_f32_vec();
    let actual = execute(&graph, "decomposed", &feeds, Precision::Fp16).unwrap();
    assert_close(&actual, &expected, 1e-2);
}

#[test]
fn known_pixels() {
    let graph = saturation_graph(&[1, 3, 3]);
    let feeds = inputs(vec![
        (
            "images",
            tensor(&[1, 3, 3], vec![0.0, 0.0, 0.0, 0.3, 0.3, 0.3, 0.8, 0.4, 0.6]),
        ),
        ("scale", tensor(&[], vec![4.0])),
    ]);
    let actual = execute(&graph, "decomposed", &feeds, Precision::Fp32).unwrap();
    assert_close(
        &actual,
        &[0.0, 0.0, 0.0, 0.3, 0.3, 0.3, 0.8, 0.0, 0.4],
        1e-6,
    );
}

#[test]
fn unsupported_ir_versions_are_rejected() {
    let graph = saturation_graph(&[5, 5, 3]);
    let err = ConverterRegistry::with_defaults()
        .convert(
            DecomposeConverter::FORMAT,
            &graph,
            &ConvertOptions { ir_version: 12 },
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedIrVersion { version: 12, .. }));

    // A model stamped with an unsupported version is refused at load time.
    let model = IrModel::new(11, "webnn", graph).unwrap();
    let mut value: serde_json::Value = serde_json::from_slice(&model.to_bytes().unwrap()).unwrap();
    value["ir_version"] = serde_json::json!(9);
    let bytes = serde_json::to_vec(&value).unwrap();
    let err = run_interpreter_with_inputs(&bytes, &NamedTensors::new(), Precision::Fp32)
        .unwrap_err();
    assert!(matches!(err, GraphError::UnsupportedIrVersion { version: 9, .. }));
}

#[test]
fn mismatched_input_shape_is_rejected_before_execution() {
    let graph = saturation_graph(&[5, 5, 3]);
    let feeds = inputs(vec![
        ("images", tensor(&[5, 4, 3], vec![0.5; 60])),
        ("scale", tensor(&[], vec![0.5])),
    ]);
    let err = execute(&graph, "decomposed", &feeds, Precision::Fp32).unwrap_err();
    assert!(matches!(
        err,
        GraphError::RuntimeStaticDimensionMismatch { axis: 1, .. }
    ));
}

#[test]
fn missing_scale_is_rejected() {
    let graph = saturation_graph(&[2, 2, 3]);
    let feeds = inputs(vec![("images", tensor(&[2, 2, 3], vec![0.5; 12]))]);
    let err = execute(&graph, "webnn", &feeds, Precision::Fp32).unwrap_err();
    assert!(matches!(err, GraphError::RuntimeTensorMissing { .. }));
}
