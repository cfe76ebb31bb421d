//! Seed command implementation.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qseed::{QuantumSeeder, SeedReport};

use super::common::{ConfigOverrides, load_config, print_counts};

/// Output format for the seed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Execute the seed command.
pub async fn execute(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    format: OutputFormat,
    draw: bool,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let seeder = QuantumSeeder::new(config);

    let spinner = if format == OutputFormat::Text {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.set_message(format!(
            "Entangling {} qubits ({} shots)...",
            seeder.config().qubits,
            seeder.config().shots
        ));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    } else {
        ProgressBar::hidden()
    };

    let report = seeder.run().await;
    spinner.finish_and_clear();
    let report = report?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, draw),
    }
    Ok(())
}

fn print_report(report: &SeedReport, draw: bool) {
    println!(
        "{} Ran {} qubits on {} ({} shots)",
        style("→").cyan().bold(),
        report.qubits,
        style(&report.backend).yellow(),
        report.shots
    );
    if let Some(reason) = &report.fallback {
        println!("  Simulated: {}", style(reason).dim());
    }

    if draw {
        println!();
        for line in report.drawing.lines() {
            println!("  {line}");
        }
    }

    println!();
    print_counts(&report.counts, report.shots);
    println!(
        "\n  Most probable: {} ({:.2}%)",
        style(&report.most_probable).cyan(),
        report.probability
    );

    println!(
        "\n{} Seed: {}",
        style("✓").green().bold(),
        style(&report.seed).bold()
    );
    println!("  Hex:  0x{}", report.seed.to_hex());
    println!("  Bits: {}", report.seed.bits());
}
