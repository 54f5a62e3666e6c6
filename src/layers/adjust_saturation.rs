use std::collections::BTreeMap;
use std::fmt;

use log::info;
use rand::Rng;

use crate::builder::GraphBuilder;
use crate::error::GraphError;
use crate::graph::{DataType, GraphInfo, OperandDescriptor};
use crate::harness::inputs::{self, InputBundle};
use crate::harness::{Device, LayerTest, RunConfig, TestOutcome, TestTier, run_layer_test};

pub const IMAGES: &str = "images";
pub const SCALE: &str = "scale";
pub const OUTPUT: &str = "output";
pub const GPU_SKIP_REASON: &str = "Accuracy mismatch on GPU";

/// Image content fed to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialCase {
    /// Independent uniform samples in [0, 1).
    #[default]
    Default,
    /// All zeros.
    BlackImage,
    /// One random value everywhere, so every pixel has zero saturation.
    GrayscaleImage,
}

impl fmt::Display for SpecialCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpecialCase::Default => "",
            SpecialCase::BlackImage => "Black Image",
            SpecialCase::GrayscaleImage => "Grayscale Image",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustSaturationParams {
    /// Channels-last shape; the last dimension is 3.
    pub input_shape: Vec<u32>,
    pub input_type: DataType,
    pub special_case: SpecialCase,
    pub tiers: &'static [TestTier],
}

impl fmt::Display for AdjustSaturationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.input_shape, self.input_type)?;
        if self.special_case != SpecialCase::Default {
            write!(f, " {}", self.special_case)?;
        }
        Ok(())
    }
}

const ALL_TIERS: &[TestTier] = &[TestTier::Precommit, TestTier::Nightly];

fn params(input_shape: &[u32], special_case: SpecialCase) -> AdjustSaturationParams {
    AdjustSaturationParams {
        input_shape: input_shape.to_vec(),
        input_type: DataType::Float32,
        special_case,
        tiers: ALL_TIERS,
    }
}

/// The basic parameter matrix. Ranks 3 to 5, 3 channels, float32.
pub fn test_data_basic() -> Vec<AdjustSaturationParams> {
    vec![
        params(&[7, 7, 3], SpecialCase::BlackImage),
        params(&[7, 7, 3], SpecialCase::GrayscaleImage),
        params(&[5, 5, 3], SpecialCase::Default),
        params(&[2, 3, 4, 3], SpecialCase::Default),
        params(&[1, 2, 3, 3, 3], SpecialCase::Default),
    ]
}

pub fn test_data_for_tier(tier: TestTier) -> Vec<AdjustSaturationParams> {
    test_data_basic()
        .into_iter()
        .filter(|p| p.tiers.contains(&tier))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustSaturationTest {
    pub special_case: SpecialCase,
}

impl AdjustSaturationTest {
    pub fn new(special_case: SpecialCase) -> Self {
        Self { special_case }
    }

    /// Build the one-operator graph on a fresh builder. The second element
    /// is the expected converted IR, which this operator does not provide.
    pub fn create_net(
        &self,
        input_shape: &[u32],
        input_type: DataType,
    ) -> Result<(GraphInfo, Option<GraphInfo>), GraphError> {
        let mut builder = GraphBuilder::new();
        let images = builder.input(IMAGES, OperandDescriptor::new(input_type, input_shape))?;
        let scale = builder.input(SCALE, OperandDescriptor::scalar(input_type))?;
        let output = builder.adjust_saturation(images, scale)?;
        Ok((builder.build(&[(OUTPUT, output)])?, None))
    }
}

impl LayerTest for AdjustSaturationTest {
    fn prepare_input<R: Rng + ?Sized>(
        &self,
        inputs_info: &BTreeMap<String, OperandDescriptor>,
        rng: &mut R,
    ) -> Result<InputBundle, GraphError> {
        let images_desc = inputs_info
            .get(IMAGES)
            .ok_or_else(|| GraphError::MissingInput {
                name: IMAGES.to_string(),
            })?;
        let images = match self.special_case {
            SpecialCase::BlackImage => inputs::zeros(images_desc)?,
            SpecialCase::GrayscaleImage => inputs::uniform_constant(rng, images_desc)?,
            SpecialCase::Default => inputs::uniform(rng, images_desc)?,
        };

        let scale_desc = inputs_info
            .get(SCALE)
            .ok_or_else(|| GraphError::MissingInput {
                name: SCALE.to_string(),
            })?;
        let scale = inputs::uniform(rng, scale_desc)?;

        let mut bundle = InputBundle::new();
        bundle.insert(IMAGES.to_string(), images);
        bundle.insert(SCALE.to_string(), scale);
        Ok(bundle)
    }
}

/// Run one parameter set at one sweep point. GPU runs are skipped.
pub fn run_adjust_saturation_case<R: Rng + ?Sized>(
    params: &AdjustSaturationParams,
    config: &RunConfig,
    rng: &mut R,
) -> Result<TestOutcome, GraphError> {
    if config.device == Device::Gpu {
        info!("{} on {}: skipped ({})", params, config, GPU_SKIP_REASON);
        return Ok(TestOutcome::skipped(GPU_SKIP_REASON));
    }
    let test = AdjustSaturationTest::new(params.special_case);
    let (graph, expected_ir) = test.create_net(&params.input_shape, params.input_type)?;
    run_layer_test(&test, &graph, expected_ir.as_ref(), config, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::Precision;
    use crate::validator::{ContextProperties, GraphValidator};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn inputs_info(shape: &[u32]) -> BTreeMap<String, OperandDescriptor> {
        let test = AdjustSaturationTest::new(SpecialCase::Default);
        let (graph, _) = test.create_net(shape, DataType::Float32).unwrap();
        GraphValidator::new(&graph, ContextProperties::default())
            .validate()
            .unwrap()
            .input_names_to_descriptors
    }

    #[test]
    fn matrix_has_five_three_channel_cases() {
        let cases = test_data_basic();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().all(|c| c.input_shape.last() == Some(&3)));
        assert!(cases.iter().all(|c| c.input_type == DataType::Float32));
        let ranks: Vec<usize> = cases.iter().map(|c| c.input_shape.len()).collect();
        assert_eq!(ranks, vec![3, 3, 3, 4, 5]);
        assert_eq!(test_data_for_tier(TestTier::Precommit).len(), 5);
        assert_eq!(test_data_for_tier(TestTier::Nightly).len(), 5);
    }

    #[test]
    fn create_net_returns_graph_and_no_secondary_artifact() {
        for case in test_data_basic() {
            let test = AdjustSaturationTest::new(case.special_case);
            let (graph, secondary) = test.create_net(&case.input_shape, case.input_type).unwrap();
            assert!(secondary.is_none());
            assert_eq!(graph.operations.len(), 1);
            assert_eq!(graph.operations[0].op_type, "adjustSaturation");
            assert_eq!(graph.operations[0].input_operands.len(), 2);
        }
    }

    #[test]
    fn special_case_does_not_change_graph() {
        let black = AdjustSaturationTest::new(SpecialCase::BlackImage)
            .create_net(&[7, 7, 3], DataType::Float32)
            .unwrap()
            .0;
        let gray = AdjustSaturationTest::new(SpecialCase::GrayscaleImage)
            .create_net(&[7, 7, 3], DataType::Float32)
            .unwrap()
            .0;
        assert_eq!(
            serde_json::to_value(&black).unwrap(),
            serde_json::to_value(&gray).unwrap()
        );
    }

    #[test]
    fn black_image_is_all_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let bundle = AdjustSaturationTest::new(SpecialCase::BlackImage)
            .prepare_input(&inputs_info(&[7, 7, 3]), &mut rng)
            .unwrap();
        assert_eq!(bundle[IMAGES].shape, vec![7, 7, 3]);
        assert!(bundle[IMAGES].to_f32_vec().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn grayscale_image_is_constant() {
        let mut rng = StdRng::seed_from_u64(2);
        let bundle = AdjustSaturationTest::new(SpecialCase::GrayscaleImage)
            .prepare_input(&inputs_info(&[7, 7, 3]), &mut rng)
            .unwrap();
        let values = bundle[IMAGES].to_f32_vec();
        assert!(values.iter().all(|&v| v == values[0]));
        assert!((0.0..1.0).contains(&values[0]));
    }

    #[test]
    fn example_bundle_for_five_by_five() {
        let mut rng = StdRng::seed_from_u64(3);
        let bundle = AdjustSaturationTest::new(SpecialCase::Default)
            .prepare_input(&inputs_info(&[5, 5, 3]), &mut rng)
            .unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle[IMAGES].shape, vec![5, 5, 3]);
        assert_eq!(bundle[IMAGES].data_type(), DataType::Float32);
        assert_eq!(bundle[SCALE].shape, Vec::<usize>::new());
        assert_eq!(bundle[SCALE].data_type(), DataType::Float32);
    }

    #[test]
    fn missing_images_is_an_error() {
        let mut rng = StdRng::seed_from_u64(4);
        let err = AdjustSaturationTest::new(SpecialCase::Default)
            .prepare_input(&BTreeMap::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingInput { .. }));
    }

    #[test]
    fn missing_scale_is_an_error() {
        let mut info = inputs_info(&[5, 5, 3]);
        info.remove(SCALE);
        let mut rng = StdRng::seed_from_u64(4);
        let err = AdjustSaturationTest::new(SpecialCase::Default)
            .prepare_input(&info, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingInput { name } if name == SCALE));
    }

    #[test]
    fn float16_inputs_keep_their_type() {
        let mut info = BTreeMap::new();
        info.insert(
            IMAGES.to_string(),
            OperandDescriptor::new(DataType::Float16, &[2, 2, 3]),
        );
        info.insert(SCALE.to_string(), OperandDescriptor::scalar(DataType::Float16));
        let mut rng = StdRng::seed_from_u64(5);
        let bundle = AdjustSaturationTest::new(SpecialCase::Default)
            .prepare_input(&info, &mut rng)
            .unwrap();
        assert_eq!(bundle[IMAGES].data_type(), DataType::Float16);
        assert_eq!(bundle[SCALE].data_type(), DataType::Float16);
    }

    #[test]
    fn gpu_is_skipped_without_running() {
        let config = RunConfig {
            device: Device::Gpu,
            precision: Precision::Fp32,
            ir_version: 11,
            // Never created: a skipped run must not touch the filesystem.
            temp_dir: std::path::PathBuf::from("/nonexistent/layercheck"),
            use_legacy_frontend: false,
        };
        let mut rng = StdRng::seed_from_u64(6);
        for case in test_data_basic() {
            let outcome = run_adjust_saturation_case(&case, &config, &mut rng).unwrap();
            assert_eq!(outcome, TestOutcome::skipped(GPU_SKIP_REASON));
        }
        assert!(!config.temp_dir.exists());
    }

    proptest! {
        #[test]
        fn default_inputs_match_shape_and_range(
            shape in prop::collection::vec(1u32..5, 2..5),
            seed in any::<u64>(),
        ) {
            let mut shape = shape;
            shape.push(3);
            let mut rng = StdRng::seed_from_u64(seed);
            let bundle = AdjustSaturationTest::new(SpecialCase::Default)
                .prepare_input(&inputs_info(&shape), &mut rng)
                .unwrap();
            let expected: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            prop_assert_eq!(&bundle[IMAGES].shape, &expected);
            prop_assert!(bundle[IMAGES].to_f32_vec().iter().all(|v| (0.0..1.0).contains(v)));
            let scale = bundle[SCALE].to_f32_vec();
            prop_assert_eq!(scale.len(), 1);
            prop_assert!((0.0..1.0).contains(&scale[0]));
        }
    }
}
