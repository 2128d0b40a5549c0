//! spacehound — fast disk space analyser.
//!
//! Thin CLI over the `spacehound-core` engine:
//!
//! ```text
//! spacehound                 list mounted volumes with capacity figures
//! spacehound PATH            scan PATH and print its top-level breakdown
//!     --by-name              sort the listing by name instead of size
//!     --workers N            scan worker threads (default: engine default)
//!     --json                 emit the directory view as JSON
//! ```

use anyhow::{bail, Context};
use spacehound_core::model::size::{format_count, format_size, percent_of};
use spacehound_core::scanner::progress::ScanEvent;
use spacehound_core::{ScanOptions, ScanPhase, SessionController, SortMode};
use std::io::Write;
use std::time::Duration;

struct Args {
    path: Option<String>,
    by_name: bool,
    workers: Option<usize>,
    json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        path: None,
        by_name: false,
        workers: None,
        json: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--by-name" => args.by_name = true,
            "--json" => args.json = true,
            "--workers" => {
                let value = iter.next().context("--workers requires a number")?;
                args.workers = Some(value.parse().context("--workers requires a number")?);
            }
            "--help" | "-h" => {
                println!(
                    "usage: spacehound [PATH] [--by-name] [--workers N] [--json]\n\
                     with no PATH, lists mounted volumes"
                );
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            other => {
                if args.path.is_some() {
                    bail!("only one PATH may be given");
                }
                args.path = Some(other.to_string());
            }
        }
    }
    Ok(args)
}

fn print_drives() {
    let drives = spacehound_core::platform::enumerate_drives();
    for drive in drives {
        let used = drive.total_bytes.saturating_sub(drive.free_bytes);
        println!(
            "{:<24} {:>10} total  {:>10} free  {:>5.1}% used",
            drive.path,
            format_size(drive.total_bytes),
            format_size(drive.free_bytes),
            percent_of(used, drive.total_bytes),
        );
    }
}

fn scan_and_report(args: &Args) -> anyhow::Result<()> {
    let path = args.path.as_deref().expect("caller checked");
    let mut controller = SessionController::new();
    controller.start_scan(
        path,
        ScanOptions {
            workers: args.workers,
        },
    )?;

    // Poll until the terminal event, echoing the latest snapshot.
    loop {
        for event in controller.poll() {
            if let ScanEvent::Progress {
                files_scanned,
                dirs_scanned,
                errors,
                ..
            } = event
            {
                eprint!(
                    "\rscanning… {} files, {} dirs, {} errors",
                    format_count(files_scanned),
                    format_count(dirs_scanned),
                    format_count(errors),
                );
                let _ = std::io::stderr().flush();
            }
        }
        match controller.phase() {
            Some(ScanPhase::Running) => std::thread::sleep(Duration::from_millis(50)),
            _ => break,
        }
    }
    eprintln!();

    if controller.phase() != Some(ScanPhase::Complete) {
        bail!("scan did not complete");
    }

    let mode = if args.by_name {
        SortMode::ByName
    } else {
        SortMode::BySize
    };
    let view = controller.directory_view(&[], mode)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}  ({} items)", view.path, view.item_count);
    for entry in &view.entries {
        let marker = if entry.is_dir { "/" } else { "" };
        println!(
            "{:>10}  {:>5.1}%  {}{}",
            format_size(entry.size),
            percent_of(entry.size, view.total_size),
            entry.name,
            marker,
        );
    }
    println!("{:>10}  total", format_size(view.total_size));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Structured logging to stderr; progress lines own the terminal, so
    // only warnings and up are emitted by default.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.path.is_none() {
        print_drives();
        return Ok(());
    }
    scan_and_report(&args)
}
