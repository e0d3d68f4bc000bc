use std::{fs, path::PathBuf, process::ExitCode};

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

    #[arg(
        short = 'o',
        long = "output",
        default_value = "output",
        help = "Directory each file is written to, as <output>/<name>"
    )]
    output: PathBuf,

    #[arg(help = "AppFS image to mount and read")]
    image_path: PathBuf,
}

fn run(args: &Arguments) -> Result<()> {
    let image = fs::read(&args.image_path)
        .with_context(|| format!("failed to read {}", args.image_path.display()))?;
    let partition = Partition::mount(image)
        .with_context(|| format!("failed to mount {}", args.image_path.display()))?;

    let files = partition.extract_all().context("failed to walk page chains")?;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    for file in &files {
        let dest = args.output.join(&file.name);
        fs::write(&dest, &file.contents)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        info!(
            " - {} {:?} v{:#x} ({} bytes) -> {}",
            file.name,
            file.title,
            file.version,
            file.contents.len(),
            dest.display()
        );
    }

    info!("extracted {} file(s) to {}", files.len(), args.output.display());
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
            eprintln!("appfs_extract: {e:#}");
            ExitCode::FAILURE
        }
    }
}
