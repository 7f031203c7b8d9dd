//! In-memory host.
//!
//! [`MemoryHost`] models a live set (tracks with mixer, devices and clip
//! slots, plus scenes) and answers the same property, method and child-list
//! vocabulary as a real host. It also records every write in a journal,
//! counts handle opens and can be told to fail, which makes it the backbone
//! of the test suite and of the CLI's fixture mode.
//!
//! Fixtures can be written in JSON or TOML:
//!
//! ```rust
//! use liveset_core::MemoryHost;
//!
//! let host = MemoryHost::from_json(r#"{
//!     "tracks": [{ "name": "Bass", "clip_slots": [null, null] }],
//!     "scenes": [{ "name": "Intro" }, { "name": "Drop" }]
//! }"#).unwrap();
//! assert_eq!(host.with_set(|set| set.tracks.len()), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::{Handle, Host, HostError, HostResult, HostValue};
use crate::path::{EntityPath, Segment};
use crate::snapshot::Note;

/// A mixer parameter (volume, panning or a send).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixerParam {
    /// Current value.
    pub value: f64,
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl MixerParam {
    /// Default volume: 0.85 in `[0, 1]`.
    pub fn volume() -> Self {
        Self {
            value: 0.85,
            min: 0.0,
            max: 1.0,
        }
    }

    /// Default panning: centred in `[-1, 1]`.
    pub fn panning() -> Self {
        Self {
            value: 0.0,
            min: -1.0,
            max: 1.0,
        }
    }

    /// Default send: off in `[0, 1]`.
    pub fn send() -> Self {
        Self {
            value: 0.0,
            min: 0.0,
            max: 1.0,
        }
    }
}

/// A device parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterModel {
    /// Parameter name.
    pub name: String,
    /// Current value.
    pub value: f64,
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
    /// Discrete steps.
    pub is_quantized: bool,
}

impl Default for ParameterModel {
    fn default() -> Self {
        Self {
            name: "Parameter".to_string(),
            value: 0.0,
            min: 0.0,
            max: 1.0,
            is_quantized: false,
        }
    }
}

/// A device on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceModel {
    /// Display name.
    pub name: String,
    /// Host class.
    pub class_name: String,
    /// On/off.
    pub is_active: bool,
    /// Parameters in order.
    pub parameters: Vec<ParameterModel>,
}

impl Default for DeviceModel {
    fn default() -> Self {
        Self {
            name: "Device".to_string(),
            class_name: "PluginDevice".to_string(),
            is_active: true,
            parameters: Vec::new(),
        }
    }
}

impl DeviceModel {
    /// A device with `parameters` generic parameters in `[0, 1]`.
    pub fn new(name: impl Into<String>, parameters: usize) -> Self {
        Self {
            name: name.into(),
            parameters: (0..parameters)
                .map(|i| ParameterModel {
                    name: format!("Macro {}", i + 1),
                    ..ParameterModel::default()
                })
                .collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct PendingNotes {
    declared: Option<usize>,
    notes: Vec<Note>,
}

/// A clip in a clip slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipModel {
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
    /// MIDI or audio.
    pub is_midi: bool,
    /// Playing state.
    pub is_playing: bool,
    /// Committed notes.
    pub notes: Vec<Note>,
    #[serde(skip)]
    pending: Option<PendingNotes>,
}

impl Default for ClipModel {
    fn default() -> Self {
        Self {
            name: String::new(),
            length: 4.0,
            looping: true,
            loop_start: 0.0,
            loop_end: 4.0,
            is_midi: true,
            is_playing: false,
            notes: Vec::new(),
            pending: None,
        }
    }
}

impl ClipModel {
    /// An empty looping MIDI clip.
    pub fn midi(name: impl Into<String>, length: f64) -> Self {
        Self {
            name: name.into(),
            length,
            loop_end: length,
            ..Self::default()
        }
    }
}

/// A track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackModel {
    /// Track name.
    pub name: String,
    /// Color as `0xRRGGBB`.
    pub color: i64,
    /// Mute switch.
    pub mute: bool,
    /// Solo switch.
    pub solo: bool,
    /// Arm switch; `None` for tracks that cannot be armed.
    pub arm: Option<bool>,
    /// Whether the track takes MIDI input.
    pub has_midi_input: bool,
    /// Mixer volume.
    pub volume: MixerParam,
    /// Mixer panning.
    pub panning: MixerParam,
    /// Mixer sends.
    pub sends: Vec<MixerParam>,
    /// Device chain.
    pub devices: Vec<DeviceModel>,
    /// Clip slots; `None` is an empty slot.
    pub clip_slots: Vec<Option<ClipModel>>,
}

impl Default for TrackModel {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: 0,
            mute: false,
            solo: false,
            arm: Some(false),
            has_midi_input: false,
            volume: MixerParam::volume(),
            panning: MixerParam::panning(),
            sends: Vec::new(),
            devices: Vec::new(),
            clip_slots: Vec::new(),
        }
    }
}

impl TrackModel {
    /// A MIDI track.
    pub fn midi(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_midi_input: true,
            ..Self::default()
        }
    }

    /// An audio track.
    pub fn audio(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Give the track `count` empty clip slots.
    pub fn with_clip_slots(mut self, count: usize) -> Self {
        self.clip_slots = vec![None; count];
        self
    }

    /// Append a device with `parameters` generic parameters.
    pub fn with_device(mut self, name: impl Into<String>, parameters: usize) -> Self {
        self.devices.push(DeviceModel::new(name, parameters));
        self
    }

    /// Append a fully described device.
    pub fn with_device_model(mut self, device: DeviceModel) -> Self {
        self.devices.push(device);
        self
    }

    /// Put a clip into `slot`, growing the slot list if needed.
    pub fn with_clip(mut self, slot: usize, clip: ClipModel) -> Self {
        if self.clip_slots.len() <= slot {
            self.clip_slots.resize(slot + 1, None);
        }
        self.clip_slots[slot] = Some(clip);
        self
    }

    /// Set the mixer volume range and value.
    pub fn with_volume(mut self, volume: MixerParam) -> Self {
        self.volume = volume;
        self
    }
}

/// A scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneModel {
    /// Scene name.
    pub name: String,
}

/// The whole live set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetModel {
    /// Song tempo.
    pub tempo: f64,
    /// Tracks in order.
    pub tracks: Vec<TrackModel>,
    /// Scenes in order.
    pub scenes: Vec<SceneModel>,
}

impl Default for SetModel {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            tracks: Vec::new(),
            scenes: Vec::new(),
        }
    }
}

/// Whether a journal entry was a property write or a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JournalKind {
    /// `set(property, value)`.
    Set,
    /// `call(method, args)`.
    Call,
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    /// Target path.
    pub path: String,
    /// Write or call.
    pub kind: JournalKind,
    /// Property or method name.
    pub name: String,
    /// Value or arguments.
    pub args: Vec<HostValue>,
}

/// Failure to load a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Reading the file failed.
    #[error("failed to read fixture '{path}': {source}")]
    Read {
        /// Fixture path.
        path: std::path::PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// JSON parse failure.
    #[error("invalid JSON fixture: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML parse failure.
    #[error("invalid TOML fixture: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug)]
struct HostState {
    set: SetModel,
    reachable: bool,
    failing: HashSet<String>,
    journal: Vec<JournalEntry>,
    opens: usize,
    ids: HashMap<String, u64>,
    paths: HashMap<u64, EntityPath>,
}

impl HostState {
    fn id_for(&mut self, path: &EntityPath) -> u64 {
        let key = path.to_string();
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = self.ids.len() as u64 + 1;
        self.ids.insert(key, id);
        self.paths.insert(id, path.clone());
        id
    }

    fn gate(&self, path: &EntityPath) -> HostResult<()> {
        if !self.reachable {
            return Err(HostError::Unreachable("live set not loaded".to_string()));
        }
        let key = path.to_string();
        if self.failing.contains(&key) {
            return Err(HostError::call(format!("simulated failure at '{key}'")));
        }
        Ok(())
    }
}

/// In-memory [`Host`] implementation.
///
/// Clones share state, so a test can keep one copy for inspection while the
/// access layer owns another.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(SetModel::default())
    }
}

impl MemoryHost {
    /// Wrap a set model.
    pub fn new(set: SetModel) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                set,
                reachable: true,
                failing: HashSet::new(),
                journal: Vec::new(),
                opens: 0,
                ids: HashMap::new(),
                paths: HashMap::new(),
            })),
        }
    }

    /// Parse a JSON fixture.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Parse a TOML fixture.
    pub fn from_toml(toml_str: &str) -> Result<Self, FixtureError> {
        Ok(Self::new(toml::from_str(toml_str)?))
    }

    /// Load a fixture file; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Make the host (un)reachable. While unreachable every open fails.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Make every access to `path` fail.
    pub fn fail_path(&self, path: &EntityPath) {
        self.state.lock().failing.insert(path.to_string());
    }

    /// Remove all injected path failures.
    pub fn clear_faults(&self) {
        self.state.lock().failing.clear();
    }

    /// Recorded writes, oldest first.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    /// Forget recorded writes.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    /// Read the model.
    pub fn with_set<R>(&self, f: impl FnOnce(&SetModel) -> R) -> R {
        f(&self.state.lock().set)
    }

    /// Change the model behind the layer's back, as a user of the host would.
    pub fn with_set_mut<R>(&self, f: impl FnOnce(&mut SetModel) -> R) -> R {
        f(&mut self.state.lock().set)
    }
}

impl Host for MemoryHost {
    type Handle = MemoryHandle;

    fn open(&self, path: &EntityPath) -> HostResult<MemoryHandle> {
        let mut state = self.state.lock();
        state.opens += 1;
        state.gate(path)?;
        let id = if resolve(&state.set, path).is_some() {
            state.id_for(path)
        } else {
            0
        };
        Ok(MemoryHandle {
            state: Arc::clone(&self.state),
            path: path.clone(),
            id,
        })
    }
}

/// Handle into a [`MemoryHost`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<HostState>>,
    path: EntityPath,
    id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MixerSlot {
    Volume,
    Panning,
    Send(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    LiveSet,
    Browser,
    Track(usize),
    Mixer(usize),
    MixerParam(usize, MixerSlot),
    Device(usize, usize),
    Parameter(usize, usize, usize),
    ClipSlot(usize, usize),
    Clip(usize, usize),
    Scene(usize),
}

fn resolve(set: &SetModel, path: &EntityPath) -> Option<Node> {
    use Segment::*;

    match path.segments() {
        [LiveApp, Browser] => Some(Node::Browser),
        [LiveSet] => Some(Node::LiveSet),
        [LiveSet, Scenes(s)] => {
            let s = *s as usize;
            (s < set.scenes.len()).then_some(Node::Scene(s))
        }
        [LiveSet, Tracks(t), rest @ ..] => {
            let t = *t as usize;
            let track = set.tracks.get(t)?;
            match rest {
                [] => Some(Node::Track(t)),
                [MixerDevice] => Some(Node::Mixer(t)),
                [MixerDevice, Volume] => Some(Node::MixerParam(t, MixerSlot::Volume)),
                [MixerDevice, Panning] => Some(Node::MixerParam(t, MixerSlot::Panning)),
                [MixerDevice, Sends(k)] => {
                    let k = *k as usize;
                    (k < track.sends.len()).then_some(Node::MixerParam(t, MixerSlot::Send(k)))
                }
                [Devices(d)] => {
                    let d = *d as usize;
                    (d < track.devices.len()).then_some(Node::Device(t, d))
                }
                [Devices(d), Parameters(p)] => {
                    let (d, p) = (*d as usize, *p as usize);
                    let device = track.devices.get(d)?;
                    (p < device.parameters.len()).then_some(Node::Parameter(t, d, p))
                }
                [ClipSlots(s)] => {
                    let s = *s as usize;
                    (s < track.clip_slots.len()).then_some(Node::ClipSlot(t, s))
                }
                [ClipSlots(s), Clip] => {
                    let s = *s as usize;
                    matches!(track.clip_slots.get(s), Some(Some(_))).then_some(Node::Clip(t, s))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn unknown_property(name: &str) -> HostError {
    HostError::call(format!("unknown property '{name}'"))
}

fn arg_f64(args: &[HostValue], i: usize, method: &str) -> HostResult<f64> {
    args.get(i)
        .and_then(HostValue::as_f64)
        .ok_or_else(|| HostError::call(format!("{method}: argument {i} missing or not numeric")))
}

fn set_ranged(target: &mut f64, min: f64, max: f64, value: &HostValue) -> HostResult<()> {
    let v = value
        .as_f64()
        .ok_or_else(|| HostError::call(format!("value {value} is not numeric")))?;
    if v < min || v > max {
        return Err(HostError::call(format!("value {v} out of range [{min}, {max}]")));
    }
    *target = v;
    Ok(())
}

fn as_flag(value: &HostValue) -> HostResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| HostError::call(format!("value {value} is not boolean")))
}

impl MemoryHandle {
    fn with_node<R>(&self, f: impl FnOnce(&mut HostState, Node) -> HostResult<R>) -> HostResult<R> {
        let mut state = self.state.lock();
        state.gate(&self.path)?;
        if self.id == 0 {
            return Err(HostError::call(format!("invalid path '{}'", self.path)));
        }
        let node = resolve(&state.set, &self.path)
            .ok_or_else(|| HostError::call(format!("object at '{}' does not exist", self.path)))?;
        f(&mut state, node)
    }

    fn journal(
        state: &mut HostState,
        path: &EntityPath,
        kind: JournalKind,
        name: &str,
        args: &[HostValue],
    ) {
        state.journal.push(JournalEntry {
            path: path.to_string(),
            kind,
            name: name.to_string(),
            args: args.to_vec(),
        });
    }
}

fn mixer_param(set: &mut SetModel, t: usize, slot: MixerSlot) -> HostResult<&mut MixerParam> {
    let track = &mut set.tracks[t];
    match slot {
        MixerSlot::Volume => Ok(&mut track.volume),
        MixerSlot::Panning => Ok(&mut track.panning),
        MixerSlot::Send(k) => track
            .sends
            .get_mut(k)
            .ok_or_else(|| HostError::call("send does not exist")),
    }
}

fn clip_mut(set: &mut SetModel, t: usize, s: usize) -> HostResult<&mut ClipModel> {
    set.tracks[t].clip_slots[s]
        .as_mut()
        .ok_or_else(|| HostError::call("clip does not exist"))
}

impl Handle for MemoryHandle {
    fn id(&self) -> u64 {
        self.id
    }

    fn path(&self) -> &EntityPath {
        &self.path
    }

    fn get(&self, property: &str) -> HostResult<HostValue> {
        self.with_node(|state, node| {
            let set = &state.set;
            let value: HostValue = match (node, property) {
                (Node::LiveSet, "tempo") => set.tempo.into(),
                (Node::Track(t), p) => {
                    let track = &set.tracks[t];
                    match p {
                        "name" => track.name.clone().into(),
                        "color" => track.color.into(),
                        "mute" => track.mute.into(),
                        "solo" => track.solo.into(),
                        "has_midi_input" => track.has_midi_input.into(),
                        "arm" => track
                            .arm
                            .map(HostValue::from)
                            .ok_or_else(|| HostError::call("track cannot be armed"))?,
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::MixerParam(t, slot), p) => {
                    let param = match slot {
                        MixerSlot::Volume => set.tracks[t].volume,
                        MixerSlot::Panning => set.tracks[t].panning,
                        MixerSlot::Send(k) => set.tracks[t].sends[k],
                    };
                    match p {
                        "value" => param.value.into(),
                        "min" => param.min.into(),
                        "max" => param.max.into(),
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::Device(t, d), p) => {
                    let device = &set.tracks[t].devices[d];
                    match p {
                        "name" => device.name.clone().into(),
                        "class_name" => device.class_name.clone().into(),
                        "is_active" => device.is_active.into(),
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::Parameter(t, d, i), p) => {
                    let param = &set.tracks[t].devices[d].parameters[i];
                    match p {
                        "name" => param.name.clone().into(),
                        "value" => param.value.into(),
                        "min" => param.min.into(),
                        "max" => param.max.into(),
                        "is_quantized" => param.is_quantized.into(),
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::ClipSlot(t, s), "has_clip") => set.tracks[t].clip_slots[s].is_some().into(),
                (Node::Clip(t, s), p) => {
                    let Some(clip) = &set.tracks[t].clip_slots[s] else {
                        return Err(HostError::call("clip does not exist"));
                    };
                    match p {
                        "name" => clip.name.clone().into(),
                        "length" => clip.length.into(),
                        "looping" => clip.looping.into(),
                        "loop_start" => clip.loop_start.into(),
                        "loop_end" => clip.loop_end.into(),
                        "is_midi_clip" => clip.is_midi.into(),
                        "is_playing" => clip.is_playing.into(),
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::Scene(s), "name") => set.scenes[s].name.clone().into(),
                (_, other) => return Err(unknown_property(other)),
            };
            Ok(value)
        })
    }

    fn set(&self, property: &str, value: HostValue) -> HostResult<()> {
        self.with_node(|state, node| {
            let set = &mut state.set;
            match (node, property) {
                (Node::LiveSet, "tempo") => set_ranged(&mut set.tempo, 20.0, 999.0, &value)?,
                (Node::Track(t), p) => {
                    let track = &mut set.tracks[t];
                    match p {
                        "name" => track.name = value.to_string(),
                        "mute" => track.mute = as_flag(&value)?,
                        "solo" => track.solo = as_flag(&value)?,
                        "color" => {
                            track.color = value
                                .as_i64()
                                .ok_or_else(|| HostError::call("color must be an integer"))?;
                        }
                        "arm" => match track.arm {
                            Some(_) => track.arm = Some(as_flag(&value)?),
                            None => return Err(HostError::call("track cannot be armed")),
                        },
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::MixerParam(t, slot), "value") => {
                    let param = mixer_param(set, t, slot)?;
                    set_ranged(&mut param.value, param.min, param.max, &value)?;
                }
                (Node::Device(t, d), "is_active") => {
                    set.tracks[t].devices[d].is_active = as_flag(&value)?;
                }
                (Node::Parameter(t, d, i), "value") => {
                    let param = &mut set.tracks[t].devices[d].parameters[i];
                    set_ranged(&mut param.value, param.min, param.max, &value)?;
                }
                (Node::Clip(t, s), p) => {
                    let clip = clip_mut(set, t, s)?;
                    match p {
                        "name" => clip.name = value.to_string(),
                        "looping" => clip.looping = as_flag(&value)?,
                        "loop_start" => set_ranged(&mut clip.loop_start, 0.0, f64::MAX, &value)?,
                        "loop_end" => set_ranged(&mut clip.loop_end, 0.0, f64::MAX, &value)?,
                        other => return Err(unknown_property(other)),
                    }
                }
                (Node::Scene(s), "name") => set.scenes[s].name = value.to_string(),
                (_, other) => return Err(unknown_property(other)),
            }
            let args = std::slice::from_ref(&value);
            Self::journal(state, &self.path, JournalKind::Set, property, args);
            Ok(())
        })
    }

    fn call(&self, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        self.with_node(|state, node| {
            let result = match (node, method) {
                (Node::ClipSlot(t, s), "create_clip") => {
                    let length = arg_f64(args, 0, method)?;
                    if length <= 0.0 {
                        return Err(HostError::call("clip length must be positive"));
                    }
                    let slot = &mut state.set.tracks[t].clip_slots[s];
                    if slot.is_some() {
                        return Err(HostError::call("clip slot already has a clip"));
                    }
                    *slot = Some(ClipModel::midi("", length));
                    HostValue::Int(0)
                }
                (Node::ClipSlot(t, s), "delete_clip") => {
                    state.set.tracks[t].clip_slots[s]
                        .take()
                        .ok_or_else(|| HostError::call("clip does not exist"))?;
                    HostValue::Int(0)
                }
                (Node::ClipSlot(t, s), "duplicate_clip_to") => {
                    let Some(HostValue::Id(target)) = args.first() else {
                        return Err(HostError::call("duplicate_clip_to expects a clip slot id"));
                    };
                    let target_path = state
                        .paths
                        .get(target)
                        .cloned()
                        .ok_or_else(|| {
                            HostError::call(format!("object id {target} does not exist"))
                        })?;
                    let Some(Node::ClipSlot(dt, ds)) = resolve(&state.set, &target_path) else {
                        return Err(HostError::call("duplicate target is not a clip slot"));
                    };
                    let clip = state.set.tracks[t].clip_slots[s]
                        .clone()
                        .ok_or_else(|| HostError::call("source clip does not exist"))?;
                    state.set.tracks[dt].clip_slots[ds] = Some(ClipModel { pending: None, ..clip });
                    HostValue::Int(0)
                }
                (Node::Clip(t, s), m) => {
                    let clip = clip_mut(&mut state.set, t, s)?;
                    clip_call(clip, m, args)?
                }
                (Node::Scene(_), "fire") => HostValue::Int(0),
                (_, other) => return Err(HostError::call(format!("unknown method '{other}'"))),
            };
            Self::journal(state, &self.path, JournalKind::Call, method, args);
            Ok(result)
        })
    }

    fn child_count(&self, child: &str) -> HostResult<usize> {
        self.with_node(|state, node| {
            let set = &state.set;
            match (node, child) {
                (Node::LiveSet, "tracks") => Ok(set.tracks.len()),
                (Node::LiveSet, "scenes") => Ok(set.scenes.len()),
                (Node::Track(t), "devices") => Ok(set.tracks[t].devices.len()),
                (Node::Track(t), "clip_slots") => Ok(set.tracks[t].clip_slots.len()),
                (Node::Mixer(t), "sends") => Ok(set.tracks[t].sends.len()),
                (Node::Device(t, d), "parameters") => Ok(set.tracks[t].devices[d].parameters.len()),
                (_, other) => Err(HostError::call(format!("no child list '{other}'"))),
            }
        })
    }
}

fn clip_call(clip: &mut ClipModel, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
    match method {
        "fire" => clip.is_playing = true,
        "stop" => clip.is_playing = false,
        "remove_notes" => {
            let from_time = arg_f64(args, 0, method)?;
            let from_pitch = arg_f64(args, 1, method)?;
            let time_span = arg_f64(args, 2, method)?;
            let pitch_span = arg_f64(args, 3, method)?;
            clip.notes.retain(|n| {
                let pitch = f64::from(n.pitch);
                let in_time = n.start >= from_time && n.start < from_time + time_span;
                let in_pitch = pitch >= from_pitch && pitch < from_pitch + pitch_span;
                !(in_time && in_pitch)
            });
        }
        "add_new_notes" => {
            if clip.pending.is_some() {
                return Err(HostError::call("note buffer already open"));
            }
            clip.pending = Some(PendingNotes::default());
        }
        "notes" => {
            let count = arg_f64(args, 0, method)?;
            let pending = clip
                .pending
                .as_mut()
                .ok_or_else(|| HostError::call("notes: no open note buffer"))?;
            if pending.declared.is_some() {
                return Err(HostError::call("notes: count already declared"));
            }
            pending.declared = Some(count as usize);
        }
        "note" => {
            let note = Note {
                pitch: arg_f64(args, 0, method)? as u8,
                start: arg_f64(args, 1, method)?,
                duration: arg_f64(args, 2, method)?,
                velocity: arg_f64(args, 3, method)? as u8,
                mute: arg_f64(args, 4, method)? != 0.0,
            };
            let pending = clip
                .pending
                .as_mut()
                .ok_or_else(|| HostError::call("note: no open note buffer"))?;
            let Some(declared) = pending.declared else {
                return Err(HostError::call("note: count not declared"));
            };
            if pending.notes.len() >= declared {
                return Err(HostError::call("note: more notes than declared"));
            }
            pending.notes.push(note);
        }
        "done" => {
            let pending = clip
                .pending
                .take()
                .ok_or_else(|| HostError::call("done: no open note buffer"))?;
            let declared = pending.declared.unwrap_or(0);
            if pending.notes.len() != declared {
                return Err(HostError::call(format!(
                    "done: declared {declared} notes, received {}",
                    pending.notes.len()
                )));
            }
            clip.notes.extend(pending.notes);
        }
        other => return Err(HostError::call(format!("unknown method '{other}'"))),
    }
    Ok(HostValue::Int(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MemoryHost {
        let mut set = SetModel::default();
        set.tracks.push(
            TrackModel::midi("Lead")
                .with_device("Wavetable", 2)
                .with_clip(1, ClipModel::midi("Riff", 8.0)),
        );
        MemoryHost::new(set)
    }

    #[test]
    fn missing_path_opens_with_id_zero() {
        let host = host();
        let handle = host.open(&EntityPath::live_set().track(7)).unwrap();
        assert_eq!(handle.id(), 0);
        assert!(handle.get("name").unwrap_err().to_string().contains("invalid path"));
    }

    #[test]
    fn ids_are_stable_per_path() {
        let host = host();
        let a = host.open(&EntityPath::live_set().track(0)).unwrap();
        let b = host.open(&EntityPath::live_set().track(0)).unwrap();
        assert_ne!(a.id(), 0);
        assert_eq!(a.id(), b.id());
        assert_eq!(host.open_count(), 2);
    }

    #[test]
    fn reads_and_writes_track_properties() {
        let host = host();
        let track = host.open(&EntityPath::live_set().track(0)).unwrap();
        assert_eq!(track.get_string("name").unwrap(), "Lead");
        track.set("mute", true.into()).unwrap();
        assert!(track.get_bool("mute").unwrap());
        assert_eq!(track.child_count("clip_slots").unwrap(), 2);
        assert_eq!(host.journal().len(), 1);
    }

    #[test]
    fn out_of_range_writes_are_rejected() {
        let host = host();
        let volume = host
            .open(&EntityPath::live_set().track(0).mixer_device().volume())
            .unwrap();
        assert!(volume.set("value", 1.5.into()).is_err());
        volume.set("value", 0.5.into()).unwrap();
        assert_eq!(volume.get_f64("value").unwrap(), 0.5);
    }

    #[test]
    fn unreachable_and_faulty_paths() {
        let host = host();
        let path = EntityPath::live_set().track(0);
        host.fail_path(&path);
        assert!(matches!(host.open(&path), Err(HostError::Call(_))));
        host.clear_faults();
        host.set_reachable(false);
        assert!(matches!(host.open(&path), Err(HostError::Unreachable(_))));
    }

    #[test]
    fn note_protocol_is_checked() {
        let host = host();
        let clip = host
            .open(&EntityPath::live_set().track(0).clip_slot(1).clip())
            .unwrap();
        let note: [HostValue; 5] =
            [60i64.into(), 0.0.into(), 1.0.into(), 100i64.into(), 0i64.into()];
        assert!(clip.call("note", &note).is_err());

        clip.call("add_new_notes", &[]).unwrap();
        clip.call("notes", &[2i64.into()]).unwrap();
        clip.call("note", &note).unwrap();
        let err = clip.call("done", &[]).unwrap_err();
        assert!(err.to_string().contains("declared 2 notes, received 1"));
        host.with_set(|set| {
            assert!(set.tracks[0].clip_slots[1].as_ref().unwrap().notes.is_empty());
        });
    }

    #[test]
    fn duplicate_copies_clip_to_target_slot() {
        let host = host();
        let source = host.open(&EntityPath::live_set().track(0).clip_slot(1)).unwrap();
        let target = host.open(&EntityPath::live_set().track(0).clip_slot(0)).unwrap();
        source.call("duplicate_clip_to", &[HostValue::Id(target.id())]).unwrap();
        host.with_set(|set| {
            assert_eq!(set.tracks[0].clip_slots[0].as_ref().map(|c| c.name.as_str()), Some("Riff"));
        });
    }

    #[test]
    fn toml_fixture_loads() {
        let host = MemoryHost::from_toml(
            r#"
            tempo = 98.0

            [[tracks]]
            name = "Keys"

            [[tracks.devices]]
            name = "EQ Eight"
            class_name = "Eq8"

            [[scenes]]
            name = "A"
            "#,
        )
        .unwrap();
        host.with_set(|set| {
            assert_eq!(set.tempo, 98.0);
            assert_eq!(set.tracks[0].devices[0].class_name, "Eq8");
            assert_eq!(set.scenes.len(), 1);
        });
    }
}
