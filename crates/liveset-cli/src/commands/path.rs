//! Build host object paths from indices.

use clap::Args;
use liveset_core::{EntityPath, MixerTarget, PathSpec, build_path};

/// Build a host object path.
///
/// A device outranks a clip slot, which outranks the mixer. A scene is only
/// used when no track is given; `--browser` ignores everything else.
#[derive(Args)]
pub struct PathArgs {
    /// Track index
    #[arg(long)]
    pub track: Option<u32>,

    /// Device index on the track
    #[arg(long)]
    pub device: Option<u32>,

    /// Parameter index on the device
    #[arg(long)]
    pub parameter: Option<u32>,

    /// Clip slot index on the track
    #[arg(long)]
    pub clip_slot: Option<u32>,

    /// Address the clip inside the clip slot
    #[arg(long)]
    pub clip: bool,

    /// Scene index
    #[arg(long)]
    pub scene: Option<u32>,

    /// Address the track's mixer device
    #[arg(long)]
    pub mixer: bool,

    /// Mixer volume
    #[arg(long)]
    pub volume: bool,

    /// Mixer panning
    #[arg(long)]
    pub panning: bool,

    /// Mixer send index
    #[arg(long)]
    pub send: Option<u32>,

    /// The browser root
    #[arg(long)]
    pub browser: bool,

    /// Parse an existing path instead and print its segments
    #[arg(long, conflicts_with_all = ["track", "scene", "browser"])]
    pub parse: Option<String>,
}

impl PathArgs {
    fn spec(&self) -> PathSpec {
        let wants_mixer = self.mixer || self.volume || self.panning || self.send.is_some();
        let mixer = wants_mixer.then_some(MixerTarget {
            volume: self.volume,
            panning: self.panning,
            send: self.send,
        });
        PathSpec {
            track: self.track,
            device: self.device,
            parameter: self.parameter,
            clip_slot: self.clip_slot,
            clip: self.clip,
            scene: self.scene,
            mixer,
            browser: self.browser,
        }
    }
}

/// Run the path command.
pub fn run(args: PathArgs) -> anyhow::Result<()> {
    if let Some(text) = &args.parse {
        let path: EntityPath = text.parse()?;
        for segment in path.segments() {
            println!("{segment}");
        }
        return Ok(());
    }

    println!("{}", build_path(&args.spec()));
    Ok(())
}
