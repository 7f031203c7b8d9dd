//! Point-in-time views of host entities.
//!
//! Snapshots are what the entity utilities read, cache and hand to the UI
//! layer. They are plain data: nothing in a snapshot tracks the host after
//! it was taken.

use serde::{Deserialize, Serialize};

/// Observable state of one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackState {
    /// Track index.
    pub index: u32,
    /// Track name.
    pub name: String,
    /// Track color as `0xRRGGBB`.
    pub color: i64,
    /// Mute switch.
    pub mute: bool,
    /// Solo switch.
    pub solo: bool,
    /// Record arm, `None` when the track cannot be armed.
    pub arm: Option<bool>,
    /// Mixer volume value.
    pub volume: f64,
    /// Mixer panning value.
    pub panning: f64,
    /// Number of devices on the track.
    pub device_count: usize,
    /// Number of clip slots on the track.
    pub clip_slot_count: usize,
}

/// Observable state of one device parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterState {
    /// Parameter index on its device.
    pub index: u32,
    /// Parameter name.
    pub name: String,
    /// Current value.
    pub value: f64,
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
    /// Whether the parameter moves in discrete steps.
    pub is_quantized: bool,
}

/// Observable state of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    /// Owning track index.
    pub track: u32,
    /// Device index on the track.
    pub index: u32,
    /// Display name.
    pub name: String,
    /// Host class of the device.
    pub class_name: String,
    /// Whether the device is switched on.
    pub is_active: bool,
    /// Parameters in host order.
    pub parameters: Vec<ParameterState>,
}

/// Observable state of one clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipState {
    /// Owning track index.
    pub track: u32,
    /// Clip slot index.
    pub slot: u32,
    /// Clip name.
    pub name: String,
    /// Length in beats.
    pub length: f64,
    /// Loop switch.
    pub looping: bool,
    /// Loop start in beats.
    pub loop_start: f64,
    /// Loop end in beats.
    pub loop_end: f64,
    /// MIDI (true) or audio (false).
    pub is_midi: bool,
    /// Whether the clip is playing.
    pub is_playing: bool,
}

/// Any cacheable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    /// A track.
    Track(TrackState),
    /// A device.
    Device(DeviceState),
    /// A clip.
    Clip(ClipState),
}

impl Snapshot {
    /// The track snapshot, if this is one.
    pub fn into_track(self) -> Option<TrackState> {
        match self {
            Snapshot::Track(state) => Some(state),
            _ => None,
        }
    }

    /// The device snapshot, if this is one.
    pub fn into_device(self) -> Option<DeviceState> {
        match self {
            Snapshot::Device(state) => Some(state),
            _ => None,
        }
    }

    /// The clip snapshot, if this is one.
    pub fn into_clip(self) -> Option<ClipState> {
        match self {
            Snapshot::Clip(state) => Some(state),
            _ => None,
        }
    }
}

/// Cache keys for snapshots.
///
/// Keys end in `/` so that invalidating `track/1/` never touches `track/10/`,
/// while still covering everything nested under track 1.
pub mod keys {
    /// Key of a track snapshot.
    pub fn track(track: u32) -> String {
        format!("track/{track}/")
    }

    /// Key of a device snapshot.
    pub fn device(track: u32, device: u32) -> String {
        format!("track/{track}/device/{device}/")
    }

    /// Key of a clip snapshot.
    pub fn clip(track: u32, slot: u32) -> String {
        format!("track/{track}/clip_slot/{slot}/")
    }
}

/// One MIDI note for batch insertion.
///
/// Omitted fields take the defaults pitch 60, start 0, duration 1,
/// velocity 100, unmuted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    /// MIDI pitch, 0-127.
    pub pitch: u8,
    /// Start time in beats.
    pub start: f64,
    /// Duration in beats.
    pub duration: f64,
    /// Velocity, 0-127.
    pub velocity: u8,
    /// Mute flag.
    pub mute: bool,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            pitch: 60,
            start: 0.0,
            duration: 1.0,
            velocity: 100,
            mute: false,
        }
    }
}

impl Note {
    /// A note with default velocity, unmuted.
    pub fn new(pitch: u8, start: f64, duration: f64) -> Self {
        Self {
            pitch,
            start,
            duration,
            ..Self::default()
        }
    }

    /// Set the velocity.
    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    /// Mute the note.
    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_defaults_fill_omitted_fields() {
        let note: Note = serde_json::from_str(r#"{"pitch": 64, "start": 2.0}"#).unwrap();
        assert_eq!(note, Note::new(64, 2.0, 1.0));

        let empty: Note = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Note::default());
        assert_eq!((empty.pitch, empty.velocity, empty.mute), (60, 100, false));
    }

    #[test]
    fn keys_do_not_collide_by_substring() {
        assert!(!keys::track(10).contains(&keys::track(1)));
        assert!(keys::device(1, 0).contains(&keys::track(1)));
        assert!(keys::clip(1, 2).contains(&keys::track(1)));
        assert!(!keys::clip(1, 2).contains(&keys::device(1, 2)));
    }

    #[test]
    fn snapshot_downcasts() {
        let clip = ClipState {
            track: 0,
            slot: 1,
            name: "A".into(),
            length: 4.0,
            looping: true,
            loop_start: 0.0,
            loop_end: 4.0,
            is_midi: true,
            is_playing: false,
        };
        let snap = Snapshot::Clip(clip.clone());
        assert_eq!(snap.clone().into_clip(), Some(clip));
        assert_eq!(snap.into_track(), None);
    }
}
