//! Operator CLI for reviewed tensor sets.
//!
//! # Responsibility
//! - Rebuild a store from a baseline snapshot and audit log.
//! - Print deterministic summaries and compact edits into a new baseline.

use clap::{Args, Parser, Subcommand};
use log::info;
use polarity_core::{
    apply_audit_log, init_logging, read_raw_tensors, replace_file, write_raw_tensors, CreationType,
    TensorStore,
};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "polarity", version, about = "Inspect reviewed polarity tensors")]
struct Cli {
    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level used with --log-dir.
    #[arg(long, global = true, default_value_t = polarity_core::default_log_level().to_string())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print tensor counts after replay.
    Summary(ReplayArgs),
    /// Print one line per cell: cell id, tensors, active tensors.
    Cells(ReplayArgs),
    /// Write the replayed automated tensors as a new baseline snapshot.
    Compact {
        #[command(flatten)]
        replay: ReplayArgs,
        /// Destination snapshot path.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ReplayArgs {
    /// Baseline snapshot (`raw_tensors.txt`).
    #[arg(long)]
    snapshot: PathBuf,
    /// Audit log to replay on top of the snapshot.
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(&cli.log_level, log_dir)?;
    }

    match cli.command {
        Command::Summary(args) => {
            let store = replay(&args)?;
            let active = store.tensors().filter(|t| t.is_active()).count();
            let manual = store
                .tensors()
                .filter(|t| t.creation_type() == CreationType::Manual)
                .count();
            println!("tensors={}", store.len());
            println!("active={active}");
            println!("automated={}", store.len() - manual);
            println!("manual={manual}");
            println!("cells={}", store.cell_identifiers().len());
        }
        Command::Cells(args) => {
            let store = replay(&args)?;
            for cell_id in store.cell_identifiers() {
                let tensors = store.cell_tensors(cell_id);
                let active = tensors.iter().filter(|t| t.is_active()).count();
                println!("{cell_id}\t{}\t{active}", tensors.len());
            }
        }
        Command::Compact { replay: args, out } => {
            let store = replay(&args)?;
            let written = replace_file(&out, |writer| write_raw_tensors(&store, writer))?;
            info!(
                "event=compact module=cli status=ok tensors={} out={}",
                written,
                out.display()
            );
            println!("wrote {written} tensors to {}", out.display());
        }
    }
    Ok(())
}

fn replay(args: &ReplayArgs) -> Result<TensorStore, Box<dyn Error>> {
    let mut store = read_raw_tensors(open(&args.snapshot)?)?;
    if let Some(audit_log) = &args.audit_log {
        let applied = apply_audit_log(&mut store, open(audit_log)?)?;
        info!("event=replay module=cli status=ok entries={applied}");
    }
    Ok(store)
}

fn open(path: &Path) -> Result<BufReader<File>, Box<dyn Error>> {
    let file =
        File::open(path).map_err(|err| format!("cannot open `{}`: {err}", path.display()))?;
    Ok(BufReader::new(file))
}
