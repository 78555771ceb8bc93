//! Publicness-checker CLI.
//!
//! Provides the `pubcheck` binary: reads a trace + CFG NDJSON pair, runs the
//! dual-execution engine over every enumerated path, and writes per-path
//! verdicts, per-path/per-function analysis summaries, and the aggregated
//! per-program-point verdicts as NDJSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use pubcheck_engine::analyze::QueryCache;
use pubcheck_model::join::build_pipeline;
use pubcheck_model::record::{FunctionAnalysisSummary, MissingPolicy, PathPublicness};
use pubcheck_model::{load_inputs, write_record};
use z3::{Config, Context};

/// Publicness checker: dual-execution symbolic analysis over program traces.
#[derive(Parser)]
#[command(name = "pubcheck", about = "Dual-execution publicness checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a trace+CFG pair and emit verdicts, summaries, and aggregates.
    Analyze {
        /// Path to the trace NDJSON file.
        #[arg(long)]
        trace: PathBuf,

        /// Path to the CFG NDJSON file.
        #[arg(long)]
        cfg: PathBuf,

        /// Output NDJSON path for verdicts, summaries, and aggregates.
        #[arg(short, long)]
        output: PathBuf,

        /// How to resolve a point's aggregate when coverage is incomplete or
        /// truncated.
        #[arg(long, value_enum, default_value_t = MissingPolicyArg::Unknown)]
        missing_policy: MissingPolicyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingPolicyArg {
    Unknown,
    Public,
    Secret,
}

impl From<MissingPolicyArg> for MissingPolicy {
    fn from(arg: MissingPolicyArg) -> Self {
        match arg {
            MissingPolicyArg::Unknown => MissingPolicy::Unknown,
            MissingPolicyArg::Public => MissingPolicy::Public,
            MissingPolicyArg::Secret => MissingPolicy::Secret,
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Analyze {
            trace,
            cfg,
            output,
            missing_policy,
        } => run_analyze(&trace, &cfg, &output, missing_policy.into()),
    };
    process::exit(exit_code);
}

/// Runs the full pipeline. Exit codes: 0 success, 1 ingest error, 2
/// encoding/path error (at least one path could not be analyzed), 3 I/O
/// error writing output.
fn run_analyze(trace_path: &PathBuf, cfg_path: &PathBuf, output_path: &PathBuf, missing_policy: MissingPolicy) -> i32 {
    let inputs = match load_inputs(trace_path, cfg_path) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("ingest error: {e}");
            return 1;
        }
    };

    let out_file = match File::create(output_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("I/O error opening '{}': {e}", output_path.display());
            return 3;
        }
    };
    let mut writer = BufWriter::new(out_file);

    let pipeline = build_pipeline(&inputs.trace, &inputs.cfg);
    let z3_config = Config::new();
    let ctx = Context::new(&z3_config);
    let mut cache = QueryCache::new();
    let mut had_encode_error = false;
    let mut io_failed = false;

    for (fn_name, fp) in &pipeline {
        let mut all_verdicts: Vec<PathPublicness> = Vec::new();
        let mut fn_summary = FunctionAnalysisSummary::new(fn_name.clone());

        for bundle in &fp.paths {
            match pubcheck_engine::analyze_path(&ctx, bundle, Some(&mut cache)) {
                Ok((verdicts, summary)) => {
                    tracing::debug!(
                        fn_ = %fn_name,
                        path_id = bundle.path.path_id.unwrap_or(-1),
                        inst_count = summary.inst_count,
                        query_count = summary.query_count,
                        "path analyzed"
                    );
                    fn_summary.accumulate(&summary);
                    if write_record(&mut writer, &summary).is_err() {
                        io_failed = true;
                    }
                    for v in &verdicts {
                        if write_record(&mut writer, v).is_err() {
                            io_failed = true;
                        }
                    }
                    all_verdicts.extend(verdicts);
                }
                Err(e) => {
                    had_encode_error = true;
                    tracing::warn!(
                        fn_ = %fn_name,
                        path_id = bundle.path.path_id.unwrap_or(-1),
                        error = %e,
                        "path skipped: encoding error"
                    );
                }
            }
        }

        if write_record(&mut writer, &fn_summary).is_err() {
            io_failed = true;
        }

        let paths: Vec<_> = fp.paths.iter().map(|b| b.path.clone()).collect();
        let aggregated = pubcheck_engine::aggregate(&paths, &fp.pp_coverage, &all_verdicts, missing_policy);
        for point in &aggregated {
            if write_record(&mut writer, point).is_err() {
                io_failed = true;
            }
        }
    }

    if io_failed {
        eprintln!("I/O error writing '{}'", output_path.display());
        return 3;
    }
    if had_encode_error {
        return 2;
    }
    0
}
