use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use appfs::{AppFsError, Partition};
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short='v', action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long="no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    #[arg(help = "Existing AppFS image to mount and modify")]
    image_path: PathBuf,

    #[arg(help = "File whose bytes become the new file's contents")]
    payload_path: PathBuf,

    #[arg(help = "Name stored in the head page (truncated past 47 bytes)")]
    name: String,

    #[arg(help = "Title stored in the head page (truncated past 63 bytes)")]
    title: String,

    #[arg(help = "16-bit version number")]
    version: u16,
}

fn run(args: &Arguments) -> Result<()> {
    let image = fs::read(&args.image_path)
        .with_context(|| format!("failed to read {}", args.image_path.display()))?;
    let mut partition = Partition::mount(image)
        .with_context(|| format!("failed to mount {}", args.image_path.display()))?;

    let payload = fs::read(&args.payload_path)
        .with_context(|| format!("failed to read {}", args.payload_path.display()))?;

    match partition.create_file(&args.name, &args.title, args.version, &payload) {
        Ok(()) => {}
        Err(AppFsError::InsufficientSpace { requested, free }) => {
            anyhow::bail!(
                "not enough free space: file needs {requested} bytes, partition has {free} free"
            );
        }
        Err(e) => return Err(e).context("failed to add file"),
    }

    fs::write(&args.image_path, partition.raw())
        .with_context(|| format!("failed to write {}", args.image_path.display()))?;

    info!(
        "added {:?} ({} bytes) to {}",
        args.name,
        payload.len(),
        args.image_path.display()
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
            eprintln!("appfs_add_file: {e:#}");
            ExitCode::FAILURE
        }
    }
}
