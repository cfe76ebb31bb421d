//! Backends command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use qseed::select::simulator_backend;
use qseed::{DeviceDirectory, DeviceProbe, pick_lowest_queue};
use qseed_adapter_ibm::IbmClient;
use qseed_hal::Backend;

use super::common::{ConfigOverrides, load_config};

/// List IBM devices and mark the one a seed run would use.
pub async fn execute(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let qubits = config.qubits;

    println!(
        "{} Backends for a {}-qubit seed:\n",
        style("qseed").cyan().bold(),
        qubits
    );

    let sim = simulator_backend(&config);
    let caps = sim.capabilities();
    println!(
        "  {} {} (local)",
        style("●").green(),
        style(sim.name()).bold()
    );
    println!("    Qubits: {}", caps.num_qubits);
    println!("    Max shots: {}", caps.max_shots);
    println!();

    let Some(credentials) = config.credentials() else {
        println!(
            "  {} {} (not configured)",
            style("○").dim(),
            style("ibm").dim()
        );
        println!("    Set IBM_API_KEY + IBM_SERVICE_CRN (or IBM_QUANTUM_TOKEN) to enable");
        return Ok(());
    };

    let client = IbmClient::authenticate(&credentials).await?;
    let devices = client.list_devices().await?;
    let chosen = pick_lowest_queue(&devices, qubits);

    for probe in &devices {
        match probe {
            DeviceProbe::Status(device) => {
                let eligible = device.eligible_for(qubits);
                let is_chosen = chosen.as_ref().is_some_and(|c| c.name == device.name);
                let marker = if is_chosen {
                    style("★").yellow()
                } else if eligible {
                    style("●").green()
                } else {
                    style("○").dim()
                };
                println!("  {} {}", marker, style(&device.name).bold());
                println!("    Qubits: {}", device.num_qubits);
                println!(
                    "    Queue: {}",
                    device
                        .pending_jobs
                        .map_or_else(|| "unknown".to_string(), |n| n.to_string())
                );
                if !device.operational {
                    println!("    Status: offline or maintenance");
                } else if device.num_qubits < qubits {
                    println!("    Status: too few qubits");
                } else if device.is_simulator() {
                    println!("    Status: remote simulator, not used");
                }
            }
            DeviceProbe::Unreachable { name, reason } => {
                println!("  {} {}", style("○").red(), style(name).dim());
                println!("    Status: {reason}");
            }
        }
        println!();
    }

    match chosen {
        Some(device) => println!(
            "{} A seed run would use {}",
            style("→").cyan().bold(),
            style(device.name).yellow()
        ),
        None => println!(
            "{} No eligible device; a seed run would use the simulator",
            style("→").cyan().bold()
        ),
    }
    Ok(())
}
