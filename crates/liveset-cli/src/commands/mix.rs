//! Batch volume and panning writes.

use std::path::PathBuf;

use clap::Args;
use liveset_core::BatchReport;

use super::common::{open_set, parse_target, save_set};

/// Set track volume and panning.
///
/// Targets outside a parameter's range are clamped to it. Invalid track
/// indices are reported and skipped; the remaining targets still apply.
#[derive(Args)]
pub struct MixArgs {
    /// Set name or path
    pub set: String,

    /// Volume target as track=value (repeatable)
    #[arg(long = "volume", value_parser = parse_target)]
    pub volume: Vec<(i64, f64)>,

    /// Panning target as track=value (repeatable)
    #[arg(long = "pan", value_parser = parse_target)]
    pub pan: Vec<(i64, f64)>,

    /// Write the updated set here (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the result without saving
    #[arg(long)]
    pub dry_run: bool,
}

fn print_report(label: &str, report: &BatchReport<f64>) {
    for (track, value) in &report.applied {
        println!("{label} track {track} -> {value:.4}");
    }
    for skip in &report.skipped {
        println!("{label} track {} skipped: {}", skip.index, skip.reason);
    }
}

/// Run the mix command.
pub fn run(args: MixArgs, settings: Option<&std::path::Path>) -> anyhow::Result<()> {
    if args.volume.is_empty() && args.pan.is_empty() {
        anyhow::bail!("Nothing to do: pass at least one --volume or --pan target");
    }

    let (access, path) = open_set(&args.set, settings)?;

    let volume = access.tracks().batch_set_volume(args.volume);
    let panning = access.tracks().batch_set_panning(args.pan);
    print_report("volume", &volume);
    print_report("pan", &panning);

    if !args.dry_run && (!volume.applied.is_empty() || !panning.applied.is_empty()) {
        save_set(&access, args.output.as_deref().unwrap_or(&path))?;
    }

    if !volume.is_complete() || !panning.is_complete() {
        anyhow::bail!(
            "{} target(s) skipped",
            volume.skipped.len() + panning.skipped.len()
        );
    }
    Ok(())
}
