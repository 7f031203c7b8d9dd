//! Object-graph access layer for a live music host.
//!
//! The host owns a hierarchy of live entities (tracks, devices, parameters,
//! clip slots, clips, scenes) addressed by space-joined paths such as
//! `live_set tracks 0 devices 1 parameters 3`. It offers no bulk queries and
//! no change notifications, so this crate puts a disciplined layer in front
//! of it:
//!
//! - **Paths**: [`PathSpec`] and [`build_path`] turn a descriptor into an
//!   [`EntityPath`]
//! - **Validation**: [`Validator`] checks indices against live counts, with an
//!   explicit [`VerifyPolicy`] for when the host cannot answer
//! - **Protected calls**: [`LiveAccess::safe_call`] is the single chokepoint
//!   that classifies, times and logs every host interaction
//! - **Caching**: [`StateCache`] keeps short-lived snapshots with a background
//!   sweep
//! - **Operation log**: [`OperationLog`] ring-buffers records and keeps
//!   per-operation timing metrics
//! - **Entity utilities**: [`Tracks`], [`Devices`] and [`Clips`] provide
//!   iteration, cached snapshots, partial-success batches and note insertion
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{AccessConfig, InsertOptions, LiveAccess, MemoryHost, Note, SetModel, TrackModel};
//!
//! let mut set = SetModel::default();
//! set.tracks.push(TrackModel::midi("Lead").with_clip_slots(8));
//! let access = LiveAccess::new(MemoryHost::new(set), AccessConfig::default());
//!
//! let clips = access.clips();
//! let slot = clips.find_next_empty_slot(0, 0).unwrap();
//! let notes = [Note::new(60, 0.0, 1.0), Note::new(63, 1.0, 1.0)];
//! let options = InsertOptions::default().create_if_missing(4.0);
//! assert!(clips.insert_notes_to_clip(0, i64::from(slot), &notes, &options));
//!
//! let volume = access.tracks().batch_set_volume([(0, 1.4)]);
//! assert_eq!(volume.applied, vec![(0, 1.0)]);
//! ```

pub mod access;
pub mod batch;
pub mod cache;
pub mod call;
pub mod clip;
pub mod clock;
pub mod device;
pub mod error;
pub mod host;
pub mod memory;
pub mod oplog;
pub mod path;
pub mod retry;
pub mod snapshot;
pub mod track;
pub mod validate;

pub use access::{AccessConfig, LiveAccess};
pub use batch::{BatchReport, Outcome, Skip};
pub use cache::{CachePolicy, CacheStats, PolicyError, StateCache};
pub use call::CallContext;
pub use clip::{Clips, InsertOptions, NoteBatchWriter, validate_note, validate_notes};
pub use clock::{Clock, ManualClock, SystemClock};
pub use device::Devices;
pub use error::{AccessError, AccessResult, Dimension, ErrorKind, HostCallError, ValidationError};
pub use host::{Handle, Host, HostError, HostResult, HostValue};
pub use memory::{
    ClipModel, DeviceModel, FixtureError, JournalEntry, JournalKind, MemoryHandle, MemoryHost,
    MixerParam, ParameterModel, SceneModel, SetModel, TrackModel,
};
pub use oplog::{LogStats, OperationLog, OperationRecord, PerformanceMetric};
pub use path::{EntityPath, MixerTarget, PathParseError, PathSpec, Segment, build_path};
pub use retry::RetryPolicy;
pub use snapshot::{ClipState, DeviceState, Note, ParameterState, Snapshot, TrackState, keys};
pub use track::Tracks;
pub use validate::{Validator, VerifyPolicy};
