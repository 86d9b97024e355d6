//! ilsim - CLI Entry Point
//!
//! Commands:
//! - `ilsim run <program>` - Drive a number of scan cycles with scripted inputs
//! - `ilsim check <program>` - Dry-run one scan and report errors
//! - `ilsim fmt <program>` - Normalise program text
//! - `ilsim monitor <program>` - Interactive terminal monitor

use clap::{Parser, Subcommand};
use ilsim::plc::{Recorder, ScanError, Snapshot};
use ilsim::{load_program, save_program, Observer, Plc, PlcConfig, Program, ScriptedInputs, Stimulus};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ilsim")]
#[command(version)]
#[command(about = "A scan-cycle simulator for boolean Instruction List PLC programs")]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program for a fixed number of scan cycles
    Run {
        /// Path to the program text
        program: String,
        /// Number of scan cycles to run
        #[arg(short = 'n', long, default_value = "10")]
        cycles: u64,
        /// Drive an input high: ADDR, ADDR@N, ADDR@FROM..TO or ADDR@FROM..
        #[arg(short, long = "input")]
        inputs: Vec<Stimulus>,
        /// Print every cycle and enable debug logging
        #[arg(short, long)]
        trace: bool,
        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dry-run one scan cycle and report errors
    Check {
        /// Path to the program text
        program: String,
    },
    /// Rewrite a program in canonical form
    Fmt {
        /// Path to the program text
        program: String,
        /// Output file (default: rewrite in place)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Interactive terminal monitor
    #[cfg(feature = "tui")]
    Monitor {
        /// Path to the program text
        program: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // The monitor owns the terminal; log lines would corrupt its screen.
    let level = match &cli.command {
        Commands::Run { trace: true, .. } => Some(tracing::Level::DEBUG),
        #[cfg(feature = "tui")]
        Commands::Monitor { .. } => None,
        _ => Some(tracing::Level::WARN),
    };
    if let Some(level) = level {
        init_logging(level);
    }

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Run { program, cycles, inputs, trace, json } => {
            run_program(&config, &program, cycles, inputs, trace, json);
        }
        Commands::Check { program } => {
            check_program(&config, &program);
        }
        Commands::Fmt { program, output } => {
            format_program(&program, output);
        }
        #[cfg(feature = "tui")]
        Commands::Monitor { program } => {
            monitor_program(config, &program);
        }
    }
}

fn init_logging(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> PlcConfig {
    match path {
        Some(path) => match PlcConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => PlcConfig::default(),
    }
}

fn read_program(path: &str) -> Program {
    match load_program(path) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

/// Prints each cycle as it completes.
struct CycleTrace;

impl Observer for CycleTrace {
    fn on_error(&mut self, error: &ScanError) {
        println!("  ✗ {}", error);
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        println!("{:04}  {}", snapshot.cycle, format_outputs(snapshot));
    }
}

fn run_program(
    config: &PlcConfig,
    path: &str,
    cycles: u64,
    stimuli: Vec<Stimulus>,
    trace: bool,
    json: bool,
) {
    let program = read_program(path);

    if let Some(s) = stimuli.iter().find(|s| !config.inputs.contains(&s.address)) {
        eprintln!("❌ Input {} is not configured", s.address);
        std::process::exit(1);
    }

    let mut plc = Plc::new(config);
    let mut inputs = ScriptedInputs::new(stimuli);
    let mut tracer = CycleTrace;
    let mut silent = ();

    if !json {
        println!("🔧 Running: {} ({} cycles)", path, cycles);
    }

    plc.run();
    for _ in 0..cycles {
        let observer: &mut dyn Observer = if trace && !json { &mut tracer } else { &mut silent };
        let Some(report) = plc.scan(&program, &mut inputs, observer) else {
            break;
        };
        if !report.is_clean() {
            if !trace || json {
                for error in &report.errors {
                    eprintln!("❌ {}", error);
                }
            }
            break;
        }
    }

    let snapshot = plc.snapshot();

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode snapshot: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_snapshot(&snapshot);
    }

    if plc.mode() != ilsim::RunMode::Running {
        std::process::exit(1);
    }
}

fn check_program(config: &PlcConfig, path: &str) {
    let program = read_program(path);
    let mut plc = Plc::new(config);
    let mut recorder = Recorder::default();

    plc.run();
    plc.scan(&program, &mut (), &mut recorder);

    if recorder.errors.is_empty() {
        println!(
            "✓ {}: {} instructions, no errors",
            path,
            program.instructions().count()
        );
    } else {
        for error in &recorder.errors {
            eprintln!("❌ {}: {}", path, error);
        }
        std::process::exit(1);
    }
}

fn format_program(path: &str, output: Option<String>) {
    let program = read_program(path);
    let out_path = output.unwrap_or_else(|| path.to_string());

    if let Err(e) = save_program(&out_path, &program.normalized()) {
        eprintln!("❌ Failed to save program: {}", e);
        std::process::exit(1);
    }

    println!("✓ Formatted {} → {}", path, out_path);
}

#[cfg(feature = "tui")]
fn monitor_program(config: PlcConfig, path: &str) {
    let program = read_program(path);

    if let Err(e) = ilsim::run_monitor(program, config) {
        eprintln!("❌ Monitor error: {}", e);
        std::process::exit(1);
    }
}

fn format_outputs(snapshot: &Snapshot) -> String {
    snapshot
        .outputs
        .iter()
        .map(|(_, v)| if *v { '1' } else { '0' })
        .collect()
}

fn print_snapshot(snapshot: &Snapshot) {
    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", snapshot.cycle);
    println!("Mode:   {}", snapshot.mode);
    println!();

    let high = |table: &indexmap::IndexMap<String, bool>| -> String {
        let on: Vec<&str> = table.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str()).collect();
        if on.is_empty() { "-".to_string() } else { on.join(" ") }
    };
    println!("Inputs high:  {}", high(&snapshot.inputs));
    println!("Outputs high: {}", high(&snapshot.outputs));

    if !snapshot.memory.is_empty() {
        println!();
        println!("{:<6} {:>5} {:>7} {:>7} {:>4}", "Cell", "Value", "Count", "Preset", "DN");
        for cell in &snapshot.memory {
            println!(
                "{:<6} {:>5} {:>7} {:>7} {:>4}",
                cell.id,
                u8::from(cell.current_value),
                cell.counter,
                cell.max_timer,
                u8::from(cell.end_timer)
            );
        }
    }
}
