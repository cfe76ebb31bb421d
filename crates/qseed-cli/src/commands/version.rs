//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - random seeds from entangled qubits",
        style("qseed").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qseed-ir     Circuit intermediate representation");
    println!("  qseed-qasm3  OpenQASM 3 emission");
    println!("  qseed-hal    Hardware abstraction layer");
    println!("  qseed        Seeding pipeline");
    println!("  qseed-cli    Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
