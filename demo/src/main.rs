//! VERITAS Compliance Pipeline — Demo CLI
//!
//! Runs one of a handful of illustrative AI-application scenarios through
//! the full evaluator + policy engine pipeline and prints the resulting
//! compliance report. This binary exists to exercise `veritas-pipeline`
//! end to end; it is not a reference client — a command-line front end is
//! not part of the core library's surface.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- healthcare-triage
//!   cargo run -p demo -- finance-missing-data
//!   cargo run -p demo -- manipulative-reply
//!   cargo run -p demo -- biased-lending

mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use veritas_contracts::contract::Contract;
use veritas_contracts::error::VeritasResult;
use veritas_contracts::report::ReportFormat;
use veritas_core::registry::initialize_once;
use veritas_pipeline::CompliancePipeline;
use veritas_policy::engine::{EngineRunMode, PolicyEngineDriver};
use veritas_policy::loader::PolicyLoader;

/// VERITAS — AI compliance certification pipeline demo.
///
/// Each subcommand builds a sample contract, runs it through the evaluator
/// registry and policy engine driver, and prints the combined compliance
/// report.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "VERITAS compliance pipeline demo",
    long_about = "Runs the VERITAS evaluator + policy engine pipeline against sample\n\
                  AI-application contracts.\n\n\
                  Scenarios:\n\
                  1. healthcare-triage      — full pipeline pass, risk docs present\n\
                  2. finance-missing-data   — fails validation before evaluators run\n\
                  3. manipulative-reply     — trips the manipulation detector\n\
                  4. biased-lending         — trips the counterfactual fairness evaluator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root directory of the demo policy bundle.
    #[arg(long, global = true, default_value = "demo/policies")]
    policy_root: PathBuf,

    /// Where to write the rendered report. Printed to stdout if omitted.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Report format: json or markdown.
    #[arg(long, global = true, default_value = "markdown")]
    report_format: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario 1: compliant healthcare triage assistant.
    HealthcareTriage,
    /// Scenario 2: finance contract missing required context (validation failure).
    FinanceMissingData,
    /// Scenario 3: customer-support reply exploiting urgency and guilt.
    ManipulativeReply,
    /// Scenario 4: lending assistant with a gendered counterfactual gap.
    BiasedLending,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    print_banner();

    let report_format = match cli.report_format.to_lowercase().as_str() {
        "json" => ReportFormat::Json,
        _ => ReportFormat::Markdown,
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let result = runtime.block_on(run(cli.command, &cli.policy_root, report_format, cli.output_dir.as_deref()));

    match result {
        Ok(all_compliant) => {
            if !all_compliant {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("demo error: {error}");
            std::process::exit(2);
        }
    }
}

/// Runs the selected scenario(s), returning whether every run was
/// `overall_compliant`.
async fn run(
    command: Command,
    policy_root: &std::path::Path,
    report_format: ReportFormat,
    output_dir: Option<&std::path::Path>,
) -> VeritasResult<bool> {
    let registry = initialize_once(veritas_evaluators::register_builtins);
    let loader = PolicyLoader::load(policy_root)?;

    // No policy engine binary ships with this crate, so the
    // demo always runs in embedded mode against a path that does not
    // resolve; `skip_opa_check = true` suppresses the startup reachability
    // probe so every scenario still runs phase-1 evaluators and only phase-2
    // policy results come back as `PolicyStatus::Error`. Point
    // `--policy-root` at a real OPA bundle and set `POLICY_ENGINE_PATH` to
    // exercise a live engine instead.
    let engine_path = std::env::var("POLICY_ENGINE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("opa"));
    let run_mode = if std::env::var("POLICY_ENGINE_DEBUG").is_ok() {
        EngineRunMode::Development
    } else {
        EngineRunMode::Production
    };
    let ci = std::env::var("CI").is_ok();

    let engine = if let Ok(base_url) = std::env::var("POLICY_ENGINE_SERVER_URL") {
        PolicyEngineDriver::server(base_url, run_mode, ci).await
    } else {
        PolicyEngineDriver::embedded(engine_path, run_mode, ci).await
    };

    let pipeline = CompliancePipeline::new(registry, &loader, &engine);

    let scenarios: Vec<(&str, &str, fn() -> VeritasResult<Contract>)> = match command {
        Command::RunAll => vec![
            ("healthcare-triage", "healthcare", scenarios::healthcare_triage),
            ("finance-missing-data", "international", scenarios::finance_missing_customer_data),
            ("manipulative-reply", "retail", scenarios::manipulative_support_reply),
            ("biased-lending", "international", scenarios::biased_lending_reply),
        ],
        Command::HealthcareTriage => vec![("healthcare-triage", "healthcare", scenarios::healthcare_triage)],
        Command::FinanceMissingData => {
            vec![("finance-missing-data", "international", scenarios::finance_missing_customer_data)]
        }
        Command::ManipulativeReply => {
            vec![("manipulative-reply", "retail", scenarios::manipulative_support_reply)]
        }
        Command::BiasedLending => vec![("biased-lending", "international", scenarios::biased_lending_reply)],
    };

    let mut all_compliant = true;
    for (label, policy_folder, build_contract) in scenarios {
        println!("── {label} ──────────────────────────────────────────");
        match build_contract() {
            Err(error) => {
                println!("contract validation failed as expected: {error}\n");
            }
            Ok(contract) => match pipeline.evaluate(&contract, policy_folder, report_format, output_dir).await {
                Ok(result) => {
                    all_compliant &= result.overall_compliant;
                    println!("overall_compliant: {}", result.overall_compliant);
                    if let Some(path) = &result.report_path {
                        println!("report written to {}", path.display());
                    } else if let Some(report) = &result.report {
                        println!("{}", report.content);
                    }
                    if let Some(error) = &result.report_error {
                        eprintln!("report generation warning: {error}");
                    }
                    println!();
                }
                Err(error) => {
                    println!("pipeline error: {error}\n");
                    all_compliant = false;
                }
            },
        }
    }

    Ok(all_compliant)
}

fn print_banner() {
    println!();
    println!("VERITAS — AI Compliance Certification Pipeline");
    println!("Demo CLI");
    println!("===============================================");
    println!();
    println!("Pipeline per scenario:");
    println!("  [1] Contract validated against its declared domain");
    println!("  [2] Policy selector resolved to required metrics");
    println!("  [3] Covering evaluators discovered and run concurrently");
    println!("  [4] Evaluator output forwarded to the policy engine");
    println!("  [5] Combined compliance report projected and printed");
    println!();
}
