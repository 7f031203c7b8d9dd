//! Track utilities.

use std::ops::ControlFlow;

use crate::access::LiveAccess;
use crate::batch::{BatchReport, Outcome, check_target, clamp_and_set};
use crate::error::{AccessResult, Dimension};
use crate::host::{Handle, Host, HostResult};
use crate::path::EntityPath;
use crate::snapshot::{Snapshot, TrackState, keys};

const OP_TRACK_COUNT: &str = "track_count";
const OP_ITERATE: &str = "iterate_tracks";
const OP_TRACK_STATE: &str = "get_track_state";
const OP_BATCH_INFO: &str = "batch_get_track_info";
const OP_SET_VOLUME: &str = "batch_set_volume";
const OP_SET_PANNING: &str = "batch_set_panning";

#[derive(Debug, Clone, Copy)]
enum MixerControl {
    Volume,
    Panning,
}

impl MixerControl {
    fn path(self, track: u32) -> EntityPath {
        let mixer = EntityPath::live_set().track(track).mixer_device();
        match self {
            MixerControl::Volume => mixer.volume(),
            MixerControl::Panning => mixer.panning(),
        }
    }
}

/// Track utilities, borrowed from a [`LiveAccess`].
#[derive(Debug)]
pub struct Tracks<'a, H: Host> {
    access: &'a LiveAccess<H>,
}

impl<'a, H: Host> Tracks<'a, H> {
    pub(crate) fn new(access: &'a LiveAccess<H>) -> Self {
        Self { access }
    }

    /// Number of tracks in the set.
    pub fn count(&self) -> AccessResult<usize> {
        self.access
            .call_required(OP_TRACK_COUNT, &EntityPath::live_set(), |set| {
                set.child_count("tracks")
            })
    }

    /// Call `callback` for every track in order until it returns `Break`.
    ///
    /// Tracks the callback fails on are skipped. Returns the number of
    /// tracks the callback completed on; `0` if the count is unavailable.
    pub fn iterate_tracks<F>(&self, callback: F) -> usize
    where
        F: FnMut(&H::Handle, u32) -> HostResult<ControlFlow<()>>,
    {
        let Ok(count) = self.count() else {
            return 0;
        };
        self.access
            .iterate_children(OP_ITERATE, 0, count, |i| EntityPath::live_set().track(i), callback)
    }

    /// Index of the first track called `name`.
    pub fn find_track_by_name(&self, name: &str) -> Option<u32> {
        let mut found = None;
        self.iterate_tracks(|track, index| {
            if track.get_string("name")? == name {
                found = Some(index);
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        });
        found
    }

    /// Cached snapshot of a track, or `None` if it cannot be read.
    pub fn get_track_state(&self, track: u32) -> Option<TrackState> {
        self.track_state(track)
            .inspect_err(|err| tracing::debug!(track, error = %err, "track state unavailable"))
            .ok()
    }

    /// Cached snapshot of a track.
    ///
    /// Served from the cache while fresh; otherwise read from the host and
    /// stored under the track's key.
    pub fn track_state(&self, track: u32) -> AccessResult<TrackState> {
        let snapshot = self
            .access
            .cache
            .get(&keys::track(track), || self.read_track(track).map(Snapshot::Track))?;
        snapshot.into_track().map_or_else(|| self.read_track(track), Ok)
    }

    /// Drop every cached snapshot of `track` and of its devices and clips.
    pub fn sync_track_state(&self, track: u32) -> usize {
        self.access.cache.invalidate(Some(&keys::track(track)))
    }

    /// Read the tracks at `indices`, skipping any that are out of range or fail.
    ///
    /// Results come back in input order and refresh the cache. Never fails.
    pub fn batch_get_track_info(&self, indices: &[i64]) -> Vec<TrackState> {
        let count = self.count();
        let report: BatchReport<TrackState> = indices
            .iter()
            .map(|&raw| {
                let index = match self.access.validator.check_index(
                    Dimension::Track,
                    raw,
                    count.as_ref().copied(),
                ) {
                    Ok(index) => index,
                    Err(err) => return Outcome::skipped(raw, err),
                };
                match self.read_track_as(OP_BATCH_INFO, index) {
                    Ok(state) => {
                        self.access
                            .cache
                            .set(&keys::track(index), Snapshot::Track(state.clone()));
                        Outcome::Applied { index, value: state }
                    }
                    Err(err) => Outcome::skipped(raw, err),
                }
            })
            .collect();
        self.access.record_skips(OP_BATCH_INFO, &report.skipped);
        report.into_values()
    }

    /// Set mixer volumes from `(track, target)` pairs.
    ///
    /// Each target is clamped into the track's volume range before it is
    /// written. Entries that fail are skipped; the rest still apply.
    pub fn batch_set_volume(
        &self,
        targets: impl IntoIterator<Item = (i64, f64)>,
    ) -> BatchReport<f64> {
        self.batch_set_mixer(OP_SET_VOLUME, MixerControl::Volume, targets)
    }

    /// Set mixer panning from `(track, target)` pairs, clamped like volume.
    pub fn batch_set_panning(
        &self,
        targets: impl IntoIterator<Item = (i64, f64)>,
    ) -> BatchReport<f64> {
        self.batch_set_mixer(OP_SET_PANNING, MixerControl::Panning, targets)
    }

    fn batch_set_mixer(
        &self,
        operation: &str,
        control: MixerControl,
        targets: impl IntoIterator<Item = (i64, f64)>,
    ) -> BatchReport<f64> {
        let report: BatchReport<f64> = targets
            .into_iter()
            .map(|(raw, target)| {
                let checked = check_target(target).and_then(|target| {
                    let index = self
                        .access
                        .validator
                        .validate_track_index(&self.access.host, raw)?;
                    Ok((index, target))
                });
                let (index, target) = match checked {
                    Ok(checked) => checked,
                    Err(err) => return Outcome::skipped(raw, err),
                };
                let path = control.path(index);
                match self.access.with_handle(operation, &path, false, |param| {
                    clamp_and_set(operation, param, target)
                }) {
                    Ok(applied) => {
                        self.sync_track_state(index);
                        Outcome::Applied { index, value: applied }
                    }
                    Err(err) => Outcome::skipped(raw, err),
                }
            })
            .collect();
        self.access.record_skips(operation, &report.skipped);
        report
    }

    fn read_track(&self, track: u32) -> AccessResult<TrackState> {
        self.read_track_as(OP_TRACK_STATE, track)
    }

    fn read_track_as(&self, operation: &str, track: u32) -> AccessResult<TrackState> {
        let path = EntityPath::live_set().track(track);
        let mut state = self.access.call_required(operation, &path, |handle| {
            Ok(TrackState {
                index: track,
                name: handle.get_string("name")?,
                color: handle.get("color")?.as_i64().unwrap_or_default(),
                mute: handle.get_bool("mute")?,
                solo: handle.get_bool("solo")?,
                // Return and group tracks have no arm switch.
                arm: handle.get_bool("arm").ok(),
                volume: 0.0,
                panning: 0.0,
                device_count: handle.child_count("devices")?,
                clip_slot_count: handle.child_count("clip_slots")?,
            })
        })?;
        state.volume = self.access.call(operation, &MixerControl::Volume.path(track), |volume| {
            volume.get_f64("value")
        })?;
        state.panning = self
            .access
            .call(operation, &MixerControl::Panning.path(track), |panning| {
                panning.get_f64("value")
            })?;
        Ok(state)
    }
}
