//! qseed Command-Line Interface
//!
//! ```text
//! q[0]: --[H]---*-----------[M:0]--
//! q[1]: --[H]--(+)--*-------[M:1]--
//! q[2]: --[H]------(+)--*---[M:2]--
//!
//!                Q S E E D
//!     random seeds from entangled qubits
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::ConfigOverrides;
use commands::seed::OutputFormat;
use commands::{backends, draw, seed, version};

/// qseed - random seeds from entangled qubits on IBM Quantum or a simulator
#[derive(Parser, Debug)]
#[command(name = "qseed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ~/.qseed/config.yaml)
    #[arg(short, long, global = true, env = "QSEED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Circuit shape options shared by several commands.
#[derive(Args, Debug, Default)]
struct ShapeArgs {
    /// Number of qubits to entangle
    #[arg(short, long)]
    qubits: Option<u32>,

    /// Number of classical bits (defaults to the qubit count)
    #[arg(long)]
    classical_bits: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a seed
    Seed {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Number of shots
        #[arg(short, long)]
        shots: Option<u32>,

        /// Use the simulator when more qubits than this are requested
        #[arg(long)]
        max_qubits: Option<u32>,

        /// Skip device selection and run locally
        #[arg(long)]
        simulate: bool,

        /// Fix the simulator's RNG seed
        #[arg(long)]
        sim_seed: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show the circuit drawing
        #[arg(long)]
        draw: bool,
    },

    /// List IBM Quantum devices and the one that would be chosen
    Backends {
        /// Number of qubits the seed circuit needs
        #[arg(short, long)]
        qubits: Option<u32>,
    },

    /// Print the seed circuit
    Draw {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Also print the OpenQASM 3 source
        #[arg(long)]
        qasm: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Seed {
            shape,
            shots,
            max_qubits,
            simulate,
            sim_seed,
            format,
            draw: show_drawing,
        } => {
            let overrides = ConfigOverrides {
                qubits: shape.qubits,
                classical_bits: shape.classical_bits,
                max_qubits,
                shots,
                simulate,
                sim_seed,
            };
            seed::execute(config, &overrides, format, show_drawing).await
        }

        Commands::Backends { qubits } => {
            let overrides = ConfigOverrides {
                qubits,
                ..Default::default()
            };
            backends::execute(config, &overrides).await
        }

        Commands::Draw { shape, qasm } => {
            let overrides = ConfigOverrides {
                qubits: shape.qubits,
                classical_bits: shape.classical_bits,
                ..Default::default()
            };
            draw::execute(config, &overrides, qasm)
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
