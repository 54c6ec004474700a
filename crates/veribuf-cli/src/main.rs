//! veribuf command-line front end.
//!
//! Runs one verification pass and exits 0 on a matching result, 1 on a
//! mismatch, 2 on any failure before the comparison.

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing::error;

mod exit;

use exit::{exit_code, EXIT_FATAL};

/// GPU compute verification harness
#[derive(Parser)]
#[command(name = "veribuf")]
#[command(about = "Dispatch a compute kernel over structured buffers and verify the result")]
#[command(version)]
struct Cli {
    /// Elements per structured buffer
    #[arg(long, value_name = "N", default_value_t = veribuf::DEFAULT_ELEMENTS)]
    elements: u32,

    /// Kernel to dispatch (element_sum, element_copy)
    #[arg(long, value_name = "NAME", default_value = "element_sum")]
    kernel: String,

    /// Skip hardware adapters and use the software rasterizer
    #[arg(long)]
    force_software: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Report format (text, json)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    format: String,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);
    std::process::exit(run_cli(&cli));
}

fn run_cli(cli: &Cli) -> i32 {
    let config = veribuf::RunConfig {
        elements: cli.elements,
        kernel: cli.kernel.clone(),
        force_software: cli.force_software,
    };

    let report = match pollster::block_on(veribuf::run(&config)) {
        Ok(report) => report,
        Err(e) => {
            log_error_chain(&e);
            return EXIT_FATAL;
        }
    };

    if let Err(e) = render_report(&report, &cli.format) {
        error!("failed to render report: {e:#}");
        return EXIT_FATAL;
    }
    exit_code(&report.verification)
}

fn render_report(report: &veribuf::RunReport, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            let body = serde_json::to_string_pretty(report).context("serializing report")?;
            println!("{body}");
        }
        _ => {
            let outcome = if report.verification.passed() {
                style("PASS").green().bold()
            } else {
                style("MISMATCH").red().bold()
            };
            println!("{outcome}  {}", report.verification);
            println!("  adapter:    {} ({})", report.adapter, report.backend);
            println!("  tier:       {} ({} profile)", report.tier, report.profile);
            println!("  kernel:     {}", report.kernel);
            println!("  elements:   {}", report.elements);
            println!("  workgroups: {:?}", report.workgroups);
        }
    }
    Ok(())
}

fn log_error_chain(e: &dyn std::error::Error) {
    error!("Run failed: {}", e);
    let mut source = e.source();
    while let Some(err) = source {
        error!("  Caused by: {}", err);
        source = err.source();
    }
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}
