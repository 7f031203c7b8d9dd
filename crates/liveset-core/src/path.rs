//! Entity path construction.
//!
//! The host addresses every node with a space-joined token string such as
//! `live_set tracks 0 devices 1 parameters 3`. [`EntityPath`] is the typed
//! form of that string; [`PathSpec`] is the structured descriptor callers fill
//! in and [`build_path`] turns into a path.
//!
//! # Nesting order
//!
//! ```text
//! live_set ─ tracks N ─┬─ devices D ─ parameters P
//!                      ├─ clip_slots S ─ clip
//!                      └─ mixer_device ─ volume | panning | sends K
//! live_set ─ scenes N
//! live_app browser
//! ```
//!
//! When a descriptor names several branches under one track, the first match
//! in the order device → clip slot → mixer wins, and under the mixer the
//! order is volume → panning → sends. This tie-break is kept for
//! compatibility with existing callers.
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{PathSpec, build_path};
//!
//! let spec = PathSpec::new().with_track(2).with_device(0).with_parameter(5);
//! assert_eq!(build_path(&spec).to_string(), "live_set tracks 2 devices 0 parameters 5");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One token group of an entity path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// `live_set` root.
    LiveSet,
    /// `live_app` root.
    LiveApp,
    /// `browser` under `live_app`.
    Browser,
    /// `tracks N`.
    Tracks(u32),
    /// `devices N`.
    Devices(u32),
    /// `parameters N`.
    Parameters(u32),
    /// `clip_slots N`.
    ClipSlots(u32),
    /// `clip` inside a clip slot.
    Clip,
    /// `scenes N`.
    Scenes(u32),
    /// `mixer_device` of a track.
    MixerDevice,
    /// `volume` of a mixer device.
    Volume,
    /// `panning` of a mixer device.
    Panning,
    /// `sends N` of a mixer device.
    Sends(u32),
}

impl Segment {
    fn keyword(&self) -> &'static str {
        match self {
            Segment::LiveSet => "live_set",
            Segment::LiveApp => "live_app",
            Segment::Browser => "browser",
            Segment::Tracks(_) => "tracks",
            Segment::Devices(_) => "devices",
            Segment::Parameters(_) => "parameters",
            Segment::ClipSlots(_) => "clip_slots",
            Segment::Clip => "clip",
            Segment::Scenes(_) => "scenes",
            Segment::MixerDevice => "mixer_device",
            Segment::Volume => "volume",
            Segment::Panning => "panning",
            Segment::Sends(_) => "sends",
        }
    }

    /// Index carried by this segment, if it has one.
    pub fn index(&self) -> Option<u32> {
        match *self {
            Segment::Tracks(i)
            | Segment::Devices(i)
            | Segment::Parameters(i)
            | Segment::ClipSlots(i)
            | Segment::Scenes(i)
            | Segment::Sends(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{} {i}", self.keyword()),
            None => f.write_str(self.keyword()),
        }
    }
}

/// Address of one node in the host's live graph.
///
/// Built once per call and never persisted. The fluent constructors do not
/// check nesting; use [`build_path`] for descriptor-driven construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityPath {
    segments: Vec<Segment>,
}

impl EntityPath {
    /// The `live_set` root.
    pub fn live_set() -> Self {
        Self {
            segments: vec![Segment::LiveSet],
        }
    }

    /// The fixed browser path, `live_app browser`.
    pub fn browser() -> Self {
        Self {
            segments: vec![Segment::LiveApp, Segment::Browser],
        }
    }

    /// Build a path from raw segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    fn push(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Append `tracks N`.
    pub fn track(self, index: u32) -> Self {
        self.push(Segment::Tracks(index))
    }

    /// Append `devices N`.
    pub fn device(self, index: u32) -> Self {
        self.push(Segment::Devices(index))
    }

    /// Append `parameters N`.
    pub fn parameter(self, index: u32) -> Self {
        self.push(Segment::Parameters(index))
    }

    /// Append `clip_slots N`.
    pub fn clip_slot(self, index: u32) -> Self {
        self.push(Segment::ClipSlots(index))
    }

    /// Append `clip`.
    pub fn clip(self) -> Self {
        self.push(Segment::Clip)
    }

    /// Append `scenes N`.
    pub fn scene(self, index: u32) -> Self {
        self.push(Segment::Scenes(index))
    }

    /// Append `mixer_device`.
    pub fn mixer_device(self) -> Self {
        self.push(Segment::MixerDevice)
    }

    /// Append `volume`.
    pub fn volume(self) -> Self {
        self.push(Segment::Volume)
    }

    /// Append `panning`.
    pub fn panning(self) -> Self {
        self.push(Segment::Panning)
    }

    /// Append `sends N`.
    pub fn send(self, index: u32) -> Self {
        self.push(Segment::Sends(index))
    }

    /// The ordered segments of this path.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True for the browser path.
    pub fn is_browser(&self) -> bool {
        self.segments.last() == Some(&Segment::Browser)
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Error returned when a path string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathParseError {
    /// The string has no tokens.
    #[error("empty path")]
    Empty,
    /// A token is not a known segment keyword.
    #[error("unknown path token '{0}'")]
    UnknownToken(String),
    /// An indexed keyword is missing its index or the index is not a non-negative integer.
    #[error("expected index after '{keyword}', found {found:?}")]
    BadIndex {
        /// Keyword that needed an index.
        keyword: String,
        /// What followed it, if anything.
        found: Option<String>,
    },
}

impl FromStr for EntityPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let mut segments = Vec::new();

        while let Some(token) = tokens.next() {
            let mut indexed = |make: fn(u32) -> Segment| -> Result<Segment, PathParseError> {
                let next = tokens.next();
                next.and_then(|t| t.parse::<u32>().ok())
                    .map(make)
                    .ok_or_else(|| PathParseError::BadIndex {
                        keyword: token.to_string(),
                        found: next.map(str::to_string),
                    })
            };
            let segment = match token {
                "live_set" => Segment::LiveSet,
                "live_app" => Segment::LiveApp,
                "browser" => Segment::Browser,
                "clip" => Segment::Clip,
                "mixer_device" => Segment::MixerDevice,
                "volume" => Segment::Volume,
                "panning" => Segment::Panning,
                "tracks" => indexed(Segment::Tracks)?,
                "devices" => indexed(Segment::Devices)?,
                "parameters" => indexed(Segment::Parameters)?,
                "clip_slots" => indexed(Segment::ClipSlots)?,
                "scenes" => indexed(Segment::Scenes)?,
                "sends" => indexed(Segment::Sends)?,
                other => return Err(PathParseError::UnknownToken(other.to_string())),
            };
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(PathParseError::Empty);
        }
        Ok(Self { segments })
    }
}

/// Mixer sub-target requested under a track's `mixer_device`.
///
/// At most one is used; see the module docs for precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerTarget {
    /// Address the volume parameter.
    pub volume: bool,
    /// Address the panning parameter.
    pub panning: bool,
    /// Address send N.
    pub send: Option<u32>,
}

/// Structured descriptor of the node a caller wants to reach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSpec {
    /// Track index.
    pub track: Option<u32>,
    /// Device index (under `track`).
    pub device: Option<u32>,
    /// Parameter index (under `device`).
    pub parameter: Option<u32>,
    /// Clip slot index (under `track`).
    pub clip_slot: Option<u32>,
    /// Address the clip inside `clip_slot`.
    pub clip: bool,
    /// Scene index (only when no track is given).
    pub scene: Option<u32>,
    /// Mixer sub-target (under `track`).
    pub mixer: Option<MixerTarget>,
    /// Short-circuit to the browser root.
    pub browser: bool,
}

impl PathSpec {
    /// An empty descriptor, which builds `live_set`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the track index.
    pub fn with_track(mut self, index: u32) -> Self {
        self.track = Some(index);
        self
    }

    /// Set the device index.
    pub fn with_device(mut self, index: u32) -> Self {
        self.device = Some(index);
        self
    }

    /// Set the parameter index.
    pub fn with_parameter(mut self, index: u32) -> Self {
        self.parameter = Some(index);
        self
    }

    /// Set the clip slot index.
    pub fn with_clip_slot(mut self, index: u32) -> Self {
        self.clip_slot = Some(index);
        self
    }

    /// Address the clip inside the clip slot.
    pub fn with_clip(mut self) -> Self {
        self.clip = true;
        self
    }

    /// Set the scene index.
    pub fn with_scene(mut self, index: u32) -> Self {
        self.scene = Some(index);
        self
    }

    /// Set the mixer sub-target.
    pub fn with_mixer(mut self, target: MixerTarget) -> Self {
        self.mixer = Some(target);
        self
    }

    /// Request the browser root.
    pub fn with_browser(mut self) -> Self {
        self.browser = true;
        self
    }

    /// Build the path this descriptor names. See [`build_path`].
    pub fn build(&self) -> EntityPath {
        build_path(self)
    }
}

/// Turn a descriptor into the host's canonical path.
///
/// Pure and infallible: indices are not checked against the host here.
pub fn build_path(spec: &PathSpec) -> EntityPath {
    if spec.browser {
        return EntityPath::browser();
    }

    let mut path = EntityPath::live_set();

    if let Some(track) = spec.track {
        path = path.track(track);

        if let Some(device) = spec.device {
            path = path.device(device);
            if let Some(parameter) = spec.parameter {
                path = path.parameter(parameter);
            }
        } else if let Some(slot) = spec.clip_slot {
            path = path.clip_slot(slot);
            if spec.clip {
                path = path.clip();
            }
        } else if let Some(mixer) = spec.mixer {
            path = path.mixer_device();
            if mixer.volume {
                path = path.volume();
            } else if mixer.panning {
                path = path.panning();
            } else if let Some(send) = mixer.send {
                path = path.send(send);
            }
        }
    } else if let Some(scene) = spec.scene {
        path = path.scene(scene);
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_device_parameter() {
        let spec = PathSpec::new().with_track(2).with_device(0).with_parameter(5);
        assert_eq!(build_path(&spec).to_string(), "live_set tracks 2 devices 0 parameters 5");
    }

    #[test]
    fn clip_inside_slot() {
        let spec = PathSpec::new().with_track(0).with_clip_slot(2).with_clip();
        assert_eq!(spec.build().to_string(), "live_set tracks 0 clip_slots 2 clip");
    }

    #[test]
    fn clip_flag_without_slot_is_ignored() {
        let spec = PathSpec::new().with_track(1).with_clip();
        assert_eq!(spec.build().to_string(), "live_set tracks 1");
    }

    #[test]
    fn scene_path() {
        assert_eq!(PathSpec::new().with_scene(1).build().to_string(), "live_set scenes 1");
    }

    #[test]
    fn scene_ignored_under_track() {
        let spec = PathSpec::new().with_track(3).with_scene(1);
        assert_eq!(spec.build().to_string(), "live_set tracks 3");
    }

    #[test]
    fn browser_short_circuits() {
        let spec = PathSpec::new().with_track(1).with_device(2).with_browser();
        assert_eq!(spec.build().to_string(), "live_app browser");
        assert!(spec.build().is_browser());
    }

    #[test]
    fn empty_descriptor_is_root() {
        assert_eq!(PathSpec::new().build().to_string(), "live_set");
    }

    #[test]
    fn device_wins_over_clip_slot_and_mixer() {
        let spec = PathSpec::new()
            .with_track(0)
            .with_device(1)
            .with_clip_slot(4)
            .with_mixer(MixerTarget { volume: true, ..Default::default() });
        assert_eq!(spec.build().to_string(), "live_set tracks 0 devices 1");
    }

    #[test]
    fn mixer_volume_wins_over_panning_and_send() {
        let mixer = MixerTarget {
            volume: true,
            panning: true,
            send: Some(1),
        };
        let spec = PathSpec::new().with_track(0).with_mixer(mixer);
        assert_eq!(spec.build().to_string(), "live_set tracks 0 mixer_device volume");
    }

    #[test]
    fn mixer_panning_wins_over_send() {
        let mixer = MixerTarget {
            panning: true,
            send: Some(1),
            ..Default::default()
        };
        let spec = PathSpec::new().with_track(4).with_mixer(mixer);
        assert_eq!(spec.build().to_string(), "live_set tracks 4 mixer_device panning");
    }

    #[test]
    fn mixer_send_and_bare_mixer() {
        let send = PathSpec::new().with_track(0).with_mixer(MixerTarget {
            send: Some(2),
            ..Default::default()
        });
        assert_eq!(send.build().to_string(), "live_set tracks 0 mixer_device sends 2");

        let bare = PathSpec::new().with_track(0).with_mixer(MixerTarget::default());
        assert_eq!(bare.build().to_string(), "live_set tracks 0 mixer_device");
    }

    #[test]
    fn parse_accepts_canonical_strings() {
        let path: EntityPath = "live_set tracks 0 clip_slots 2 clip".parse().unwrap();
        assert_eq!(path, EntityPath::live_set().track(0).clip_slot(2).clip());

        let browser: EntityPath = "live_app browser".parse().unwrap();
        assert!(browser.is_browser());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!("".parse::<EntityPath>(), Err(PathParseError::Empty));
        assert_eq!(
            "live_set bogus".parse::<EntityPath>(),
            Err(PathParseError::UnknownToken("bogus".into()))
        );
        assert!(matches!(
            "live_set tracks -1".parse::<EntityPath>(),
            Err(PathParseError::BadIndex { .. })
        ));
        assert!(matches!(
            "live_set tracks".parse::<EntityPath>(),
            Err(PathParseError::BadIndex { found: None, .. })
        ));
    }
}
