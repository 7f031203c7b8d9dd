//! Write MIDI notes into a clip.

use std::path::PathBuf;

use clap::Args;
use liveset_core::{InsertOptions, Note};

use super::common::{open_set, parse_note, save_set};

/// Write notes into a clip slot.
#[derive(Args)]
pub struct NotesArgs {
    /// Set name or path
    pub set: String,

    /// Track index
    #[arg(long)]
    pub track: i64,

    /// Clip slot index
    #[arg(long)]
    pub slot: i64,

    /// Note as pitch:start:duration[:velocity] (repeatable)
    #[arg(short, long = "note", value_parser = parse_note, required = true)]
    pub notes: Vec<Note>,

    /// Keep the clip's existing notes
    #[arg(long)]
    pub keep: bool,

    /// Move the loop end to this beat
    #[arg(long)]
    pub loop_end: Option<f64>,

    /// Create a clip of this many beats when the slot is empty
    #[arg(long)]
    pub create: Option<f64>,

    /// Write the updated set here (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl NotesArgs {
    fn options(&self) -> InsertOptions {
        let mut options = InsertOptions::default();
        if self.keep {
            options = options.keep_existing();
        }
        if let Some(beats) = self.loop_end {
            options = options.with_loop_end(beats);
        }
        if let Some(beats) = self.create {
            options = options.create_if_missing(beats);
        }
        options
    }
}

/// Run the notes command.
pub fn run(args: NotesArgs, settings: Option<&std::path::Path>) -> anyhow::Result<()> {
    let (access, path) = open_set(&args.set, settings)?;

    let written = access
        .clips()
        .insert_notes_batch(args.track, args.slot, &args.notes, &args.options())?;
    println!("Wrote {written} note(s) to track {} slot {}", args.track, args.slot);

    save_set(&access, args.output.as_deref().unwrap_or(&path))
}
