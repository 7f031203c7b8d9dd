//! Index validation against the host's live counts.
//!
//! Every check rejects negative indices outright, then asks the host for the
//! current size of the dimension and rejects indices outside `[0, count)`.
//! When the count itself cannot be read, [`VerifyPolicy`] decides: the
//! default [`FailOpen`](VerifyPolicy::FailOpen) lets the index through so
//! that a host still starting up does not block every operation.

use serde::{Deserialize, Serialize};

use crate::error::{Dimension, ValidationError};
use crate::host::{Handle, Host, HostError};
use crate::path::EntityPath;

/// What to do when the live count cannot be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyPolicy {
    /// Treat the index as provisionally valid.
    #[default]
    FailOpen,
    /// Reject the index with [`ValidationError::Unverified`].
    FailClosed,
}

/// Checks indices against the host's current graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validator {
    policy: VerifyPolicy,
}

impl Validator {
    /// Create a validator with the given policy.
    pub fn new(policy: VerifyPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> VerifyPolicy {
        self.policy
    }

    /// Validate a track index.
    pub fn validate_track_index<H: Host>(
        &self,
        host: &H,
        track: i64,
    ) -> Result<u32, ValidationError> {
        self.check(host, Dimension::Track, track, &EntityPath::live_set())
    }

    /// Validate a scene index.
    pub fn validate_scene_index<H: Host>(
        &self,
        host: &H,
        scene: i64,
    ) -> Result<u32, ValidationError> {
        self.check(host, Dimension::Scene, scene, &EntityPath::live_set())
    }

    /// Validate a device index on a track. The track is validated first.
    pub fn validate_device_index<H: Host>(
        &self,
        host: &H,
        track: i64,
        device: i64,
    ) -> Result<(u32, u32), ValidationError> {
        let track = self.validate_track_index(host, track)?;
        let parent = EntityPath::live_set().track(track);
        let device = self.check(host, Dimension::Device, device, &parent)?;
        Ok((track, device))
    }

    /// Validate a clip slot index on a track. The track is validated first.
    pub fn validate_clip_slot<H: Host>(
        &self,
        host: &H,
        track: i64,
        slot: i64,
    ) -> Result<(u32, u32), ValidationError> {
        let track = self.validate_track_index(host, track)?;
        let parent = EntityPath::live_set().track(track);
        let slot = self.check(host, Dimension::ClipSlot, slot, &parent)?;
        Ok((track, slot))
    }

    /// Validate a parameter index on a device. Track and device are validated first.
    pub fn validate_parameter_index<H: Host>(
        &self,
        host: &H,
        track: i64,
        device: i64,
        parameter: i64,
    ) -> Result<(u32, u32, u32), ValidationError> {
        let (track, device) = self.validate_device_index(host, track, device)?;
        let parent = EntityPath::live_set().track(track).device(device);
        let parameter = self.check(host, Dimension::Parameter, parameter, &parent)?;
        Ok((track, device, parameter))
    }

    /// Check `index` against a count the caller already fetched.
    ///
    /// Batch loops read a count once and check every entry against it; an
    /// `Err` count is treated according to the policy.
    pub fn check_index<E: std::fmt::Display>(
        &self,
        dimension: Dimension,
        index: i64,
        count: Result<usize, E>,
    ) -> Result<u32, ValidationError> {
        if index < 0 {
            return Err(ValidationError::Negative { dimension, index });
        }
        let Ok(checked) = u32::try_from(index) else {
            return Err(ValidationError::OutOfRange {
                dimension,
                index,
                count: count.unwrap_or(u32::MAX as usize),
            });
        };

        match count {
            Ok(count) if checked as usize >= count => Err(ValidationError::OutOfRange {
                dimension,
                index,
                count,
            }),
            Ok(_) => Ok(checked),
            Err(err) => match self.policy {
                VerifyPolicy::FailOpen => {
                    tracing::debug!(
                        %dimension,
                        index,
                        error = %err,
                        "count unavailable, accepting index"
                    );
                    Ok(checked)
                }
                VerifyPolicy::FailClosed => Err(ValidationError::Unverified {
                    dimension,
                    index,
                    reason: err.to_string(),
                }),
            },
        }
    }

    fn check<H: Host>(
        &self,
        host: &H,
        dimension: Dimension,
        index: i64,
        parent: &EntityPath,
    ) -> Result<u32, ValidationError> {
        if index < 0 {
            return Err(ValidationError::Negative { dimension, index });
        }
        self.check_index(dimension, index, live_count(host, parent, dimension))
    }
}

fn live_count<H: Host>(
    host: &H,
    parent: &EntityPath,
    dimension: Dimension,
) -> Result<usize, HostError> {
    let handle = host.open(parent)?;
    if handle.id() == 0 {
        return Err(HostError::call(format!("invalid path '{parent}'")));
    }
    handle.child_count(dimension.child_list())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, SetModel, TrackModel};

    fn host_with_two_tracks() -> MemoryHost {
        let mut set = SetModel::default();
        set.tracks.push(TrackModel::midi("Drums").with_clip_slots(4).with_device("Drum Rack", 3));
        set.tracks.push(TrackModel::audio("Vox"));
        set.scenes = vec![Default::default(); 3];
        MemoryHost::new(set)
    }

    #[test]
    fn track_range_error_cites_valid_range() {
        let host = host_with_two_tracks();
        let validator = Validator::default();
        assert_eq!(validator.validate_track_index(&host, 1), Ok(1));

        let err = validator.validate_track_index(&host, 2).unwrap_err();
        assert!(err.to_string().contains("0-1"), "got: {err}");
    }

    #[test]
    fn negative_index_rejected_before_host() {
        let host = host_with_two_tracks();
        host.set_reachable(false);
        let err = Validator::default().validate_track_index(&host, -1).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Negative {
                dimension: Dimension::Track,
                index: -1
            }
        );
    }

    #[test]
    fn fail_open_accepts_when_host_unreachable() {
        let host = host_with_two_tracks();
        host.set_reachable(false);
        assert_eq!(Validator::new(VerifyPolicy::FailOpen).validate_track_index(&host, 40), Ok(40));
    }

    #[test]
    fn fail_closed_rejects_when_host_unreachable() {
        let host = host_with_two_tracks();
        host.set_reachable(false);
        let err = Validator::new(VerifyPolicy::FailClosed)
            .validate_scene_index(&host, 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Unverified { dimension: Dimension::Scene, .. }));
    }

    #[test]
    fn nested_dimensions_compose() {
        let host = host_with_two_tracks();
        let validator = Validator::new(VerifyPolicy::FailClosed);

        assert_eq!(validator.validate_device_index(&host, 0, 0), Ok((0, 0)));
        assert!(matches!(
            validator.validate_device_index(&host, 1, 0),
            Err(ValidationError::OutOfRange { dimension: Dimension::Device, count: 0, .. })
        ));
        assert!(matches!(
            validator.validate_device_index(&host, 5, 0),
            Err(ValidationError::OutOfRange { dimension: Dimension::Track, .. })
        ));

        assert_eq!(validator.validate_clip_slot(&host, 0, 3), Ok((0, 3)));
        assert!(validator.validate_clip_slot(&host, 0, 4).is_err());

        assert_eq!(validator.validate_parameter_index(&host, 0, 0, 2), Ok((0, 0, 2)));
        assert!(matches!(
            validator.validate_parameter_index(&host, 0, 0, 3),
            Err(ValidationError::OutOfRange { dimension: Dimension::Parameter, count: 3, .. })
        ));
    }

    #[test]
    fn prefetched_counts_follow_policy() {
        let open = Validator::default();
        assert_eq!(open.check_index(Dimension::Track, 3, Ok::<_, String>(4)), Ok(3));
        assert!(open.check_index(Dimension::Track, 4, Ok::<_, String>(4)).is_err());
        assert_eq!(open.check_index(Dimension::Track, 9, Err("offline")), Ok(9));

        let closed = Validator::new(VerifyPolicy::FailClosed);
        assert!(matches!(
            closed.check_index(Dimension::Device, 0, Err("offline")),
            Err(ValidationError::Unverified { .. })
        ));
        assert!(matches!(
            closed.check_index(Dimension::Device, -2, Ok::<_, String>(4)),
            Err(ValidationError::Negative { index: -2, .. })
        ));
    }

    #[test]
    fn scenes_are_counted() {
        let host = host_with_two_tracks();
        let validator = Validator::default();
        assert_eq!(validator.validate_scene_index(&host, 2), Ok(2));
        assert!(validator.validate_scene_index(&host, 3).is_err());
    }
}
