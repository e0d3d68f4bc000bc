use std::{fs::File, io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use appfs::Partition;
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short='v', action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long="no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    #[arg(help = "Size of the new partition, in bytes")]
    size: usize,

    #[arg(help = "Path to write the formatted image to", value_name = "OUT FILE")]
    out_path: PathBuf,
}

fn run(args: &Arguments) -> Result<()> {
    let partition = Partition::create(args.size)
        .with_context(|| format!("failed to format a {}-byte partition", args.size))?;

    let mut file = File::create(&args.out_path)
        .with_context(|| format!("failed to create {}", args.out_path.display()))?;
    file.write_all(partition.raw())
        .with_context(|| format!("failed to write {}", args.out_path.display()))?;

    info!(
        "wrote formatted partition to {} ({} bytes)",
        args.out_path.display(),
        args.size
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Arguments::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .with_ansi(args.color)
        .without_time()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("appfs_generate: {e:#}");
            ExitCode::FAILURE
        }
    }
}
