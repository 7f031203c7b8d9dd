//! Print the observable state of a saved set.

use std::ops::ControlFlow;

use clap::Args;
use liveset_core::{ClipState, DeviceState, Handle, LiveAccess, MemoryHost, TrackState};
use serde::Serialize;

use super::common::open_set;

/// Inspect a saved set.
#[derive(Args)]
pub struct InspectArgs {
    /// Set name or path (JSON or TOML)
    pub set: String,

    /// Only this track
    #[arg(long)]
    pub track: Option<i64>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Append operation log statistics
    #[arg(long)]
    pub stats: bool,
}

#[derive(Serialize)]
struct TrackReport {
    #[serde(flatten)]
    state: TrackState,
    devices: Vec<DeviceState>,
    clips: Vec<ClipState>,
}

fn collect(access: &LiveAccess<MemoryHost>, only: Option<i64>) -> anyhow::Result<Vec<TrackReport>> {
    let indices: Vec<i64> = match only {
        Some(track) => vec![track],
        None => (0..access.tracks().count()? as i64).collect(),
    };

    let states = access.tracks().batch_get_track_info(&indices);
    if states.is_empty() && only.is_some() {
        let skipped = access.log().recent_errors(1).first().and_then(|r| r.error.clone());
        anyhow::bail!(skipped.unwrap_or_else(|| "track not available".to_string()));
    }

    let mut reports = Vec::with_capacity(states.len());
    for state in states {
        let track = state.index;
        let devices = (0..state.device_count as u32)
            .map(|device| access.devices().device_state(track, device))
            .collect::<Result<Vec<_>, _>>()?;

        let mut occupied = Vec::new();
        access.clips().iterate_clip_slots(track, |slot, index| {
            if slot.get_bool("has_clip")? {
                occupied.push(index);
            }
            Ok(ControlFlow::Continue(()))
        });
        let clips = occupied
            .into_iter()
            .map(|slot| access.clips().clip_state(track, slot))
            .collect::<Result<Vec<_>, _>>()?;

        reports.push(TrackReport { state, devices, clips });
    }
    Ok(reports)
}

fn print_table(reports: &[TrackReport]) {
    for report in reports {
        let t = &report.state;
        let mut flags = Vec::new();
        if t.mute {
            flags.push("muted");
        }
        if t.solo {
            flags.push("solo");
        }
        if t.arm == Some(true) {
            flags.push("armed");
        }
        println!(
            "[{}] {:<20} vol {:.3}  pan {:+.3}  {}",
            t.index,
            t.name,
            t.volume,
            t.panning,
            flags.join(" ")
        );

        for device in &report.devices {
            let state = if device.is_active { "on" } else { "off" };
            println!(
                "    device {}: {} ({}, {state})",
                device.index, device.name, device.class_name
            );
            for p in &device.parameters {
                println!(
                    "        {:>3} {:<24} {:>10.4}  [{}, {}]",
                    p.index, p.name, p.value, p.min, p.max
                );
            }
        }

        for clip in &report.clips {
            let kind = if clip.is_midi { "midi" } else { "audio" };
            println!(
                "    slot {}: {} ({kind}, {} beats, loop {}-{})",
                clip.slot, clip.name, clip.length, clip.loop_start, clip.loop_end
            );
        }
    }
}

/// Run the inspect command.
pub fn run(args: InspectArgs, settings: Option<&std::path::Path>) -> anyhow::Result<()> {
    let (access, path) = open_set(&args.set, settings)?;
    let reports = collect(&access, args.track)?;

    if args.json {
        let stats = args.stats.then(|| access.log().stats());
        let out = serde_json::json!({
            "set": path.display().to_string(),
            "tracks": reports,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Set: {}", path.display());
    println!("Tracks: {}", reports.len());
    println!();
    print_table(&reports);

    if args.stats {
        let stats = access.log().stats();
        println!();
        println!("Operations: {} ({} errors)", stats.total_operations, stats.error_count);
        for (name, metric) in &stats.metrics {
            println!(
                "  {name:<24} {:>5} calls  avg {:?}  max {:?}",
                metric.count, metric.avg, metric.max
            );
        }
    }

    Ok(())
}
