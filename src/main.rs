use std::path::PathBuf;

use clap::Parser;
use layercheck::debug::init_logging;
use layercheck::harness::parse_frontend_flag;
use layercheck::ir::check_ir_version;
use layercheck::layers::adjust_saturation::{
    AdjustSaturationTest, run_adjust_saturation_case, test_data_basic, test_data_for_tier,
};
use layercheck::loader::write_artifact;
use layercheck::{
    DEFAULT_IR_VERSION, Device, GraphError, Precision, SweepConfig, TestOutcome, TestTier,
};
use log::error;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
struct Frontends(Vec<bool>);

fn parse_frontends(value: &str) -> Result<Frontends, GraphError> {
    parse_frontend_flag(value).map(Frontends)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the adjustSaturation layer tests", long_about = None)]
struct Cli {
    /// Target devices. GPU runs are reported as skipped.
    #[arg(
        long = "device",
        env = "LAYERCHECK_DEVICES",
        value_delimiter = ',',
        default_values_t = [Device::Cpu, Device::Gpu]
    )]
    devices: Vec<Device>,
    /// Candidate inference precisions (FP32, FP16).
    #[arg(
        long = "precision",
        env = "LAYERCHECK_PRECISIONS",
        value_delimiter = ',',
        default_values_t = [Precision::Fp32]
    )]
    precisions: Vec<Precision>,
    #[arg(long, env = "LAYERCHECK_IR_VERSION", default_value_t = DEFAULT_IR_VERSION)]
    ir_version: u32,
    /// Ingest through the legacy frontend. Pass `both` to run each frontend.
    #[arg(
        long,
        env = "LAYERCHECK_USE_LEGACY_FRONTEND",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_frontends
    )]
    use_legacy_frontend: Option<Frontends>,
    /// Directory for serialized artifacts. A fresh temporary dir if omitted.
    #[arg(long)]
    temp_dir: Option<PathBuf>,
    /// Only run cases tagged with this tier (precommit, nightly).
    #[arg(long)]
    tier: Option<TestTier>,
    #[arg(long, env = "LAYERCHECK_SEED", default_value_t = 0)]
    seed: u64,
    /// Write the WebNN JSON of the first case's graph to this path.
    #[arg(long)]
    export_graph: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    skipped: usize,
    failed: usize,
}

fn run() -> Result<Summary, GraphError> {
    let cli = Cli::parse();
    init_logging();

    let sweep = SweepConfig {
        devices: cli.devices,
        precisions: cli.precisions,
        ir_version: cli.ir_version,
        frontends: cli.use_legacy_frontend.map_or(vec![false], |f| f.0),
        seed: cli.seed,
    };
    check_ir_version(sweep.ir_version)?;

    let cases = match cli.tier {
        Some(tier) => test_data_for_tier(tier),
        None => test_data_basic(),
    };

    if let (Some(path), Some(first)) = (&cli.export_graph, cases.first()) {
        let (graph, _) = AdjustSaturationTest::new(first.special_case)
            .create_net(&first.input_shape, first.input_type)?;
        write_artifact(path, &graph.to_json_bytes()?)?;
        println!("Exported WebNN graph to `{}`.", path.display());
    }

    // Dropping the guard removes the scratch dir, so it lives until the end.
    let scratch;
    let root = match cli.temp_dir {
        Some(dir) => dir,
        None => {
            scratch = tempfile::tempdir()
                .map_err(|err| GraphError::io(std::env::temp_dir(), err))?;
            scratch.path().to_path_buf()
        }
    };

    let mut summary = Summary::default();
    for (index, case) in cases.iter().enumerate() {
        for point in sweep.points(&root.join(format!("case{index}"))) {
            // Every sweep point of a case sees the same inputs.
            let mut rng = StdRng::seed_from_u64(sweep.seed.wrapping_add(index as u64));
            match run_adjust_saturation_case(case, &point, &mut rng) {
                Ok(TestOutcome::Passed { compared_outputs }) => {
                    summary.passed += 1;
                    println!("PASS {case} @ {point} ({compared_outputs} output(s))");
                }
                Ok(TestOutcome::Skipped { reason }) => {
                    summary.skipped += 1;
                    println!("SKIP {case} @ {point}: {reason}");
                }
                Err(err) => {
                    summary.failed += 1;
                    error!("{case} @ {point}: {err}");
                    println!("FAIL {case} @ {point}: {err}");
                }
            }
        }
    }

    println!(
        "{} passed, {} skipped, {} failed.",
        summary.passed, summary.skipped, summary.failed
    );
    Ok(summary)
}

fn main() {
    match run() {
        Ok(summary) if summary.failed > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}
