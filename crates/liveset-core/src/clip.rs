//! Clip slot and clip utilities, including batch note insertion.
//!
//! Notes reach a clip through a fixed host protocol issued on one clip
//! handle:
//!
//! 1. `remove_notes(0, 0, 128, 127)` (optional)
//! 2. `add_new_notes`
//! 3. `notes(N)`
//! 4. `note(pitch, start, duration, velocity, mute)`, N times
//! 5. `done`
//!
//! Hosts do not reliably reject a declared count that differs from the
//! number of notes fed, so [`NoteBatchWriter`] refuses to feed past the
//! declared count and refuses to commit short of it.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::access::LiveAccess;
use crate::call::host_failure;
use crate::error::{AccessResult, ValidationError};
use crate::host::{Handle, Host, HostError, HostResult, HostValue};
use crate::path::EntityPath;
use crate::snapshot::{ClipState, Note, Snapshot, keys};

const OP_SLOT_COUNT: &str = "clip_slot_count";
const OP_ITERATE: &str = "iterate_clip_slots";
const OP_HAS_CLIP: &str = "has_clip";
const OP_CLIP_STATE: &str = "get_clip_state";
const OP_CREATE: &str = "create_clip";
const OP_DELETE: &str = "delete_clip";
const OP_DUPLICATE: &str = "duplicate_clip_to_slot";
const OP_INSERT_NOTES: &str = "insert_notes_batch";

/// Highest pitch and velocity a note may carry.
pub const MIDI_MAX: u8 = 127;

fn slot_path(track: u32, slot: u32) -> EntityPath {
    EntityPath::live_set().track(track).clip_slot(slot)
}

/// Options for [`Clips::insert_notes_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertOptions {
    /// Remove every existing note first.
    pub clear_existing: bool,
    /// Set the clip's loop end before inserting.
    pub loop_end: Option<f64>,
    /// Create a clip of this length when the slot is empty.
    pub create_length: Option<f64>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            clear_existing: true,
            loop_end: None,
            create_length: None,
        }
    }
}

impl InsertOptions {
    /// Keep the clip's existing notes.
    pub fn keep_existing(mut self) -> Self {
        self.clear_existing = false;
        self
    }

    /// Set the loop end.
    pub fn with_loop_end(mut self, beats: f64) -> Self {
        self.loop_end = Some(beats);
        self
    }

    /// Create a clip of `beats` length if the slot is empty.
    pub fn create_if_missing(mut self, beats: f64) -> Self {
        self.create_length = Some(beats);
        self
    }
}

/// Check that a note is something the host will accept.
pub fn validate_note(position: usize, note: &Note) -> Result<(), ValidationError> {
    let reason = if note.pitch > MIDI_MAX {
        format!("pitch {} above {MIDI_MAX}", note.pitch)
    } else if note.velocity > MIDI_MAX {
        format!("velocity {} above {MIDI_MAX}", note.velocity)
    } else if !note.start.is_finite() || note.start < 0.0 {
        format!("start {} must be a finite, non-negative beat", note.start)
    } else if !note.duration.is_finite() || note.duration <= 0.0 {
        format!("duration {} must be a finite, positive length", note.duration)
    } else {
        return Ok(());
    };
    Err(ValidationError::InvalidNote { position, reason })
}

/// Check every note of a batch, reporting the first bad one.
pub fn validate_notes(notes: &[Note]) -> Result<(), ValidationError> {
    notes
        .iter()
        .enumerate()
        .try_for_each(|(position, note)| validate_note(position, note))
}

/// Writes one note batch onto an open clip handle.
///
/// [`begin`](Self::begin) opens the host buffer and declares the count,
/// [`feed`](Self::feed) sends one note, [`commit`](Self::commit) closes the
/// buffer. Feeding past the declared count, or committing short of it, is
/// refused before anything reaches the host.
#[derive(Debug)]
pub struct NoteBatchWriter<'h, K: Handle> {
    handle: &'h K,
    declared: usize,
    fed: usize,
}

impl<'h, K: Handle> NoteBatchWriter<'h, K> {
    /// Open a note buffer on `clip` and declare `count` notes.
    pub fn begin(clip: &'h K, count: usize) -> AccessResult<Self> {
        let writer = Self {
            handle: clip,
            declared: count,
            fed: 0,
        };
        writer.send("add_new_notes", &[])?;
        writer.send("notes", &[HostValue::Int(count as i64)])?;
        Ok(writer)
    }

    /// Declared count.
    pub fn declared(&self) -> usize {
        self.declared
    }

    /// Notes still expected before [`commit`](Self::commit).
    pub fn remaining(&self) -> usize {
        self.declared - self.fed
    }

    /// Send one note.
    pub fn feed(&mut self, note: &Note) -> AccessResult<()> {
        if self.fed >= self.declared {
            return Err(ValidationError::NoteCountMismatch {
                declared: self.declared,
                fed: self.fed + 1,
            }
            .into());
        }
        validate_note(self.fed, note)?;
        self.send(
            "note",
            &[
                note.pitch.into(),
                note.start.into(),
                note.duration.into(),
                note.velocity.into(),
                note.mute.into(),
            ],
        )?;
        self.fed += 1;
        Ok(())
    }

    /// Commit the buffer. Returns the number of notes written.
    pub fn commit(self) -> AccessResult<usize> {
        if self.fed != self.declared {
            return Err(ValidationError::NoteCountMismatch {
                declared: self.declared,
                fed: self.fed,
            }
            .into());
        }
        self.send("done", &[])?;
        Ok(self.fed)
    }

    fn send(&self, method: &str, args: &[HostValue]) -> AccessResult<HostValue> {
        self.handle
            .call(method, args)
            .map_err(|err| host_failure(OP_INSERT_NOTES, self.handle.path(), &err))
    }
}

/// Clip utilities, borrowed from a [`LiveAccess`].
#[derive(Debug)]
pub struct Clips<'a, H: Host> {
    access: &'a LiveAccess<H>,
}

impl<'a, H: Host> Clips<'a, H> {
    pub(crate) fn new(access: &'a LiveAccess<H>) -> Self {
        Self { access }
    }

    /// Number of clip slots on `track`.
    pub fn slot_count(&self, track: u32) -> AccessResult<usize> {
        self.access
            .call_required(OP_SLOT_COUNT, &EntityPath::live_set().track(track), |t| {
                t.child_count("clip_slots")
            })
    }

    /// Call `callback` for every clip slot on `track` until it returns `Break`.
    pub fn iterate_clip_slots<F>(&self, track: u32, callback: F) -> usize
    where
        F: FnMut(&H::Handle, u32) -> HostResult<ControlFlow<()>>,
    {
        self.iterate_clip_slots_from(track, 0, callback)
    }

    fn iterate_clip_slots_from<F>(&self, track: u32, start: u32, callback: F) -> usize
    where
        F: FnMut(&H::Handle, u32) -> HostResult<ControlFlow<()>>,
    {
        let Ok(count) = self.slot_count(track) else {
            return 0;
        };
        self.access
            .iterate_children(OP_ITERATE, start, count, |s| slot_path(track, s), callback)
    }

    /// Whether the slot holds a clip.
    pub fn has_clip(&self, track: u32, slot: u32) -> AccessResult<bool> {
        self.access
            .call_required(OP_HAS_CLIP, &slot_path(track, slot), |s| s.get_bool("has_clip"))
    }

    /// First empty slot on `track` at or after `start`.
    pub fn find_next_empty_slot(&self, track: u32, start: u32) -> Option<u32> {
        let mut found = None;
        self.iterate_clip_slots_from(track, start, |slot, index| {
            if slot.get_bool("has_clip")? {
                return Ok(ControlFlow::Continue(()));
            }
            found = Some(index);
            Ok(ControlFlow::Break(()))
        });
        found
    }

    /// Cached snapshot of the clip in a slot, or `None` (also for empty slots).
    pub fn get_clip_state(&self, track: u32, slot: u32) -> Option<ClipState> {
        self.clip_state(track, slot)
            .inspect_err(|err| tracing::debug!(track, slot, error = %err, "clip state unavailable"))
            .ok()
    }

    /// Cached snapshot of the clip in a slot.
    pub fn clip_state(&self, track: u32, slot: u32) -> AccessResult<ClipState> {
        let snapshot = self.access.cache.get(&keys::clip(track, slot), || {
            self.read_clip(track, slot).map(Snapshot::Clip)
        })?;
        snapshot.into_clip().map_or_else(|| self.read_clip(track, slot), Ok)
    }

    /// Drop the cached snapshot of a clip.
    pub fn sync_clip_state(&self, track: u32, slot: u32) -> usize {
        self.access.cache.invalidate(Some(&keys::clip(track, slot)))
    }

    /// Create an empty MIDI clip of `length` beats in a slot.
    pub fn create_clip(&self, track: i64, slot: i64, length: f64) -> AccessResult<()> {
        let (t, s) = self
            .access
            .validator
            .validate_clip_slot(&self.access.host, track, slot)?;
        self.access
            .call_required(OP_CREATE, &slot_path(t, s), |slot| {
                slot.call("create_clip", &[length.into()])
            })?;
        self.sync_clip_state(t, s);
        Ok(())
    }

    /// Delete the clip in a slot.
    pub fn delete_clip(&self, track: i64, slot: i64) -> AccessResult<()> {
        let (t, s) = self
            .access
            .validator
            .validate_clip_slot(&self.access.host, track, slot)?;
        self.access
            .call_required(OP_DELETE, &slot_path(t, s), |slot| slot.call("delete_clip", &[]))?;
        self.sync_clip_state(t, s);
        Ok(())
    }

    /// Copy the clip in one slot into another. Returns `false` on any failure.
    pub fn duplicate_clip_to_slot(
        &self,
        src_track: i64,
        src_slot: i64,
        dst_track: i64,
        dst_slot: i64,
    ) -> bool {
        self.duplicate_clip(src_track, src_slot, dst_track, dst_slot)
            .inspect_err(|err| tracing::debug!(error = %err, "duplicate failed"))
            .is_ok()
    }

    /// Copy the clip in one slot into another.
    pub fn duplicate_clip(
        &self,
        src_track: i64,
        src_slot: i64,
        dst_track: i64,
        dst_slot: i64,
    ) -> AccessResult<()> {
        let validator = &self.access.validator;
        let (st, ss) = validator.validate_clip_slot(&self.access.host, src_track, src_slot)?;
        let (dt, ds) = validator.validate_clip_slot(&self.access.host, dst_track, dst_slot)?;

        let target = self
            .access
            .call_required(OP_DUPLICATE, &slot_path(dt, ds), |slot| Ok(slot.id()))?;
        self.access.call_required(OP_DUPLICATE, &slot_path(st, ss), |slot| {
            if !slot.get_bool("has_clip")? {
                return Err(HostError::call("source clip does not exist"));
            }
            slot.call("duplicate_clip_to", &[HostValue::Id(target)])
        })?;
        self.sync_clip_state(dt, ds);
        Ok(())
    }

    /// Insert `notes` into the clip at `(track, slot)`.
    ///
    /// Indices and every note are checked before the host is touched. Returns
    /// the number of notes written. A failure partway leaves earlier host
    /// calls (such as clearing existing notes) in effect.
    pub fn insert_notes_batch(
        &self,
        track: i64,
        slot: i64,
        notes: &[Note],
        options: &InsertOptions,
    ) -> AccessResult<usize> {
        let (t, s) = self
            .access
            .validator
            .validate_clip_slot(&self.access.host, track, slot)?;
        validate_notes(notes)?;

        if let Some(length) = options.create_length {
            if !self.has_clip(t, s)? {
                self.create_clip(i64::from(t), i64::from(s), length)?;
            }
        }

        let path = slot_path(t, s).clip();
        let written = self.access.with_handle(OP_INSERT_NOTES, &path, true, |clip| {
            let fail = |err: HostError| host_failure(OP_INSERT_NOTES, &path, &err);
            if options.clear_existing {
                clip.call("remove_notes", &[0i64.into(), 0i64.into(), 128i64.into(), 127i64.into()])
                    .map_err(fail)?;
            }
            if let Some(end) = options.loop_end {
                clip.set("loop_end", end.into()).map_err(fail)?;
            }
            let mut writer = NoteBatchWriter::begin(clip, notes.len())?;
            for note in notes {
                writer.feed(note)?;
            }
            writer.commit()
        });
        self.sync_clip_state(t, s);
        written
    }

    /// [`insert_notes_batch`](Self::insert_notes_batch) reporting only success.
    pub fn insert_notes_to_clip(
        &self,
        track: i64,
        slot: i64,
        notes: &[Note],
        options: &InsertOptions,
    ) -> bool {
        match self.insert_notes_batch(track, slot, notes, options) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(track, slot, error = %err, "note insertion failed");
                false
            }
        }
    }

    fn read_clip(&self, track: u32, slot: u32) -> AccessResult<ClipState> {
        let path = slot_path(track, slot).clip();
        self.access.call_required(OP_CLIP_STATE, &path, |clip| {
            Ok(ClipState {
                track,
                slot,
                name: clip.get_string("name")?,
                length: clip.get_f64("length")?,
                looping: clip.get_bool("looping")?,
                loop_start: clip.get_f64("loop_start")?,
                loop_end: clip.get_f64("loop_end")?,
                is_midi: clip.get_bool("is_midi_clip")?,
                is_playing: clip.get_bool("is_playing")?,
            })
        })
    }
}
