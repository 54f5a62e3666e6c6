//! Shared single-layer test driver.
//!
//! A layer test supplies a source graph and an input generator. The driver
//! validates the graph and generates inputs. It then converts through the
//! selected frontend and writes artifacts to the run's temp dir. Finally it
//! runs the reference and candidate backends and compares their outputs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::{debug, info};
use rand::Rng;

use crate::converters::{ConvertOptions, ConverterRegistry, frontend_format};
use crate::error::GraphError;
use crate::executors::{Precision, run_interpreter_from_path, run_reference};
use crate::graph::{GraphInfo, OperandDescriptor};
use crate::ir::DEFAULT_IR_VERSION;
use crate::loader::write_artifact;
use crate::runtime_checks::{TensorKind, validate_named_tensors};
use crate::validator::{ContextProperties, GraphValidator};

pub mod compare;
pub mod inputs;

pub use compare::{Tolerance, compare_outputs};
pub use inputs::InputBundle;

pub const SOURCE_GRAPH_FILE: &str = "model.webnn.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Gpu,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cpu => "CPU",
            Device::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPU" => Ok(Device::Cpu),
            "GPU" => Ok(Device::Gpu),
            _ => Err(GraphError::ParseValue {
                kind: "device",
                value: s.to_string(),
            }),
        }
    }
}

/// Scheduling tier a test case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestTier {
    Precommit,
    Nightly,
}

impl FromStr for TestTier {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precommit" => Ok(TestTier::Precommit),
            "nightly" => Ok(TestTier::Nightly),
            _ => Err(GraphError::ParseValue {
                kind: "test tier",
                value: s.to_string(),
            }),
        }
    }
}

/// One point of the device/precision/IR sweep.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub device: Device,
    pub precision: Precision,
    pub ir_version: u32,
    pub temp_dir: PathBuf,
    pub use_legacy_frontend: bool,
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/IR{}{}",
            self.device,
            self.precision,
            self.ir_version,
            if self.use_legacy_frontend {
                "/legacy"
            } else {
                ""
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed { compared_outputs: usize },
    Skipped { reason: String },
}

impl TestOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        TestOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestOutcome::Skipped { .. })
    }
}

/// The per-layer half of a layer test.
pub trait LayerTest {
    /// Generate data for every input named in `inputs_info`.
    fn prepare_input<R: Rng + ?Sized>(
        &self,
        inputs_info: &BTreeMap<String, OperandDescriptor>,
        rng: &mut R,
    ) -> Result<InputBundle, GraphError>;

    fn tolerance(&self, precision: Precision) -> Tolerance {
        Tolerance::for_precision(precision)
    }
}

/// Validate, convert, execute on both backends and compare.
///
/// `expected_ir` is an optional secondary artifact: when present, the
/// converted model must contain the same operation sequence.
pub fn run_layer_test<T, R>(
    test: &T,
    graph: &GraphInfo,
    expected_ir: Option<&GraphInfo>,
    config: &RunConfig,
    rng: &mut R,
) -> Result<TestOutcome, GraphError>
where
    T: LayerTest + ?Sized,
    R: Rng + ?Sized,
{
    if config.device != Device::Cpu {
        return Err(GraphError::UnsupportedDevice {
            device: config.device.to_string(),
        });
    }

    let artifacts = GraphValidator::new(graph, ContextProperties::default()).validate()?;
    let inputs = test.prepare_input(&artifacts.input_names_to_descriptors, rng)?;
    validate_named_tensors(
        &inputs,
        &artifacts.input_names_to_descriptors,
        TensorKind::Input,
    )?;

    let format = frontend_format(config.use_legacy_frontend);
    let converted = ConverterRegistry::with_defaults().convert(
        format,
        graph,
        &ConvertOptions {
            ir_version: config.ir_version,
        },
    )?;
    if let Some(expected) = expected_ir {
        let model = converted.to_model()?;
        let actual: Vec<&str> = model
            .graph
            .operations
            .iter()
            .map(|op| op.op_type.as_str())
            .collect();
        let wanted: Vec<&str> = expected
            .operations
            .iter()
            .map(|op| op.op_type.as_str())
            .collect();
        if actual != wanted {
            return Err(GraphError::ConversionFailed {
                format: format.to_string(),
                reason: format!("converted operations {actual:?} differ from expected {wanted:?}"),
            });
        }
    }

    std::fs::create_dir_all(&config.temp_dir)
        .map_err(|err| GraphError::export(config.temp_dir.clone(), err))?;
    write_artifact(
        &config.temp_dir.join(SOURCE_GRAPH_FILE),
        &graph.to_json_bytes()?,
    )?;
    let model_path = config.temp_dir.join(converted.file_name());
    write_artifact(&model_path, &converted.data)?;
    debug!(
        "{}: wrote `{}` ({} bytes, {})",
        config,
        model_path.display(),
        converted.data.len(),
        converted.content_type
    );

    let reference = run_reference(graph, &inputs)?;
    let candidate = run_interpreter_from_path(&model_path, &inputs, config.precision)?;
    validate_named_tensors(
        &candidate,
        &artifacts.output_names_to_descriptors,
        TensorKind::Output,
    )?;
    let compared_outputs =
        compare_outputs(&reference, &candidate, test.tolerance(config.precision))?;

    info!(
        "{}: {} output(s) match through the `{}` frontend",
        config, compared_outputs, format
    );
    Ok(TestOutcome::Passed { compared_outputs })
}

/// The external sweep: every combination of device, precision and frontend
/// at one IR version.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub devices: Vec<Device>,
    pub precisions: Vec<Precision>,
    pub ir_version: u32,
    pub frontends: Vec<bool>,
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            devices: vec![Device::Cpu, Device::Gpu],
            precisions: vec![Precision::Fp32],
            ir_version: DEFAULT_IR_VERSION,
            frontends: vec![false],
            seed: 0,
        }
    }
}

fn parse_list<T: FromStr<Err = GraphError>>(value: &str) -> Result<Vec<T>, GraphError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Parse a legacy-frontend flag into the frontends to sweep. `both` runs the
/// default and the legacy frontend.
pub fn parse_frontend_flag(value: &str) -> Result<Vec<bool>, GraphError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(vec![true]),
        "0" | "false" | "no" => Ok(vec![false]),
        "both" => Ok(vec![false, true]),
        _ => Err(GraphError::ParseValue {
            kind: "frontend flag",
            value: value.to_string(),
        }),
    }
}

impl SweepConfig {
    /// Build from `LAYERCHECK_*` environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, GraphError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GraphError> {
        let mut config = Self::default();
        if let Some(devices) = lookup("LAYERCHECK_DEVICES") {
            config.devices = parse_list(&devices)?;
        }
        if let Some(precisions) = lookup("LAYERCHECK_PRECISIONS") {
            config.precisions = parse_list(&precisions)?;
        }
        if let Some(version) = lookup("LAYERCHECK_IR_VERSION") {
            config.ir_version = version.trim().parse().map_err(|_| GraphError::ParseValue {
                kind: "IR version",
                value: version.clone(),
            })?;
        }
        if let Some(flag) = lookup("LAYERCHECK_USE_LEGACY_FRONTEND") {
            config.frontends = parse_frontend_flag(&flag)?;
        }
        if let Some(seed) = lookup("LAYERCHECK_SEED") {
            config.seed = seed.trim().parse().map_err(|_| GraphError::ParseValue {
                kind: "seed",
                value: seed.clone(),
            })?;
        }
        Ok(config)
    }

    /// Expand into run configs rooted at `temp_root`, one sub-directory per
    /// point.
    pub fn points(&self, temp_root: &std::path::Path) -> Vec<RunConfig> {
        let mut points = Vec::new();
        for &device in &self.devices {
            for &precision in &self.precisions {
                for &use_legacy_frontend in &self.frontends {
                    let config = RunConfig {
                        device,
                        precision,
                        ir_version: self.ir_version,
                        temp_dir: PathBuf::new(),
                        use_legacy_frontend,
                    };
                    let dir = config.to_string().replace('/', "_");
                    points.push(RunConfig {
                        temp_dir: temp_root.join(dir),
                        ..config
                    });
                }
            }
        }
        points
    }
}
