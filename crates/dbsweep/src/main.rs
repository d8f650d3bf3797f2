//! dbsweep - YCSB benchmark sweeps over replicated storage deployments.

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use dbsweep::{
    cli::Cli,
    config::BenchmarkConfig,
    results::{export_json, ReportPrinter},
    Harness, HarnessError, Settings,
};
use dbsweep_deploy::signal;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors
            let code = u8::from(e.use_stderr());
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Log lines go above the phase spinner instead of through it
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(indicatif_layer.get_stderr_writer()),
        )
        .with(indicatif_layer)
        .with(filter)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            match e.downcast_ref::<HarnessError>() {
                Some(harness_error) => {
                    if harness_error.exit_code() == 1 {
                        eprintln!();
                        eprintln!("{}", Cli::command().render_usage());
                    }
                    harness_error.exit_code()
                }
                None => 2,
            }
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(2))
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    // Extract what the config doesn't carry before consuming cli
    let json_output = cli.json.clone();
    let settings_path = cli.config.clone();
    let color = cli.color();
    let show_progress = std::io::stderr().is_terminal();

    let config = cli.into_config()?;
    let settings = Settings::load(settings_path.as_deref())?;

    signal::install_signal_handler().context("Failed to install signal handlers")?;

    print_banner(&config, color);

    let harness = Harness::new(settings).with_progress(show_progress, color);
    let report = harness.run(&config)?;

    ReportPrinter::new(color).print(&report);

    if let Some(path) = json_output {
        export_json(&report, &path).context("Failed to export JSON")?;
        println!("Results exported to: {}", path.display());
    }

    Ok(report.exit_code())
}

/// Print a compact one-line banner with the sweep configuration.
fn print_banner(config: &BenchmarkConfig, color: bool) {
    use owo_colors::OwoColorize;

    let mode = if config.reuse() { "reuse" } else { "fresh deployment" };
    let summary = format!(
        "{} x{} - {} - {} iteration(s), load {} ({})",
        config.kind().display_name(),
        config.node_count(),
        config.ratios(),
        config.iterations(),
        config.load_policy(),
        mode
    );

    println!();
    if color {
        println!("{}: {}", "dbsweep".cyan().bold(), summary);
    } else {
        println!("dbsweep: {summary}");
    }
    println!();
}
