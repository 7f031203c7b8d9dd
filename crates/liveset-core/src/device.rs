//! Device and parameter utilities.

use std::ops::ControlFlow;

use crate::access::LiveAccess;
use crate::batch::{BatchReport, Outcome, check_target, clamp_and_set};
use crate::error::{AccessResult, Dimension};
use crate::host::{Handle, Host, HostResult};
use crate::path::EntityPath;
use crate::snapshot::{DeviceState, ParameterState, Snapshot, keys};

const OP_DEVICE_COUNT: &str = "device_count";
const OP_PARAMETER_COUNT: &str = "parameter_count";
const OP_ITERATE: &str = "iterate_devices";
const OP_DEVICE_STATE: &str = "get_device_state";
const OP_GET_PARAMETERS: &str = "batch_get_parameters";
const OP_SET_PARAMETERS: &str = "batch_set_parameters";

fn device_path(track: u32, device: u32) -> EntityPath {
    EntityPath::live_set().track(track).device(device)
}

/// Device utilities, borrowed from a [`LiveAccess`].
#[derive(Debug)]
pub struct Devices<'a, H: Host> {
    access: &'a LiveAccess<H>,
}

impl<'a, H: Host> Devices<'a, H> {
    pub(crate) fn new(access: &'a LiveAccess<H>) -> Self {
        Self { access }
    }

    /// Number of devices on `track`.
    pub fn count(&self, track: u32) -> AccessResult<usize> {
        self.access.call_required(OP_DEVICE_COUNT, &EntityPath::live_set().track(track), |t| {
            t.child_count("devices")
        })
    }

    /// Number of parameters on a device.
    pub fn parameter_count(&self, track: u32, device: u32) -> AccessResult<usize> {
        self.access
            .call_required(OP_PARAMETER_COUNT, &device_path(track, device), |d| {
                d.child_count("parameters")
            })
    }

    /// Call `callback` for every device on `track` until it returns `Break`.
    ///
    /// Same contract as [`Tracks::iterate_tracks`](crate::Tracks::iterate_tracks).
    pub fn iterate_devices<F>(&self, track: u32, callback: F) -> usize
    where
        F: FnMut(&H::Handle, u32) -> HostResult<ControlFlow<()>>,
    {
        let Ok(count) = self.count(track) else {
            return 0;
        };
        self.access
            .iterate_children(OP_ITERATE, 0, count, |d| device_path(track, d), callback)
    }

    /// Index of the first device on `track` called `name`.
    pub fn find_device_by_name(&self, track: u32, name: &str) -> Option<u32> {
        let mut found = None;
        self.iterate_devices(track, |device, index| {
            if device.get_string("name")? == name {
                found = Some(index);
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        });
        found
    }

    /// Cached snapshot of a device with all its parameters, or `None`.
    pub fn get_device_state(&self, track: u32, device: u32) -> Option<DeviceState> {
        self.device_state(track, device)
            .inspect_err(|err| {
                tracing::debug!(track, device, error = %err, "device state unavailable");
            })
            .ok()
    }

    /// Cached snapshot of a device.
    pub fn device_state(&self, track: u32, device: u32) -> AccessResult<DeviceState> {
        let snapshot = self.access.cache.get(&keys::device(track, device), || {
            self.read_device(track, device).map(Snapshot::Device)
        })?;
        snapshot
            .into_device()
            .map_or_else(|| self.read_device(track, device), Ok)
    }

    /// Drop the cached snapshot of a device.
    pub fn sync_device_state(&self, track: u32, device: u32) -> usize {
        self.access.cache.invalidate(Some(&keys::device(track, device)))
    }

    /// Read the parameters at `indices`, skipping any that are out of range or fail.
    pub fn batch_get_parameters(
        &self,
        track: u32,
        device: u32,
        indices: &[i64],
    ) -> Vec<ParameterState> {
        let count = self.parameter_count(track, device);
        let report: BatchReport<ParameterState> = indices
            .iter()
            .map(|&raw| {
                let index = match self.access.validator.check_index(
                    Dimension::Parameter,
                    raw,
                    count.as_ref().copied(),
                ) {
                    Ok(index) => index,
                    Err(err) => return Outcome::skipped(raw, err),
                };
                match self.read_parameter(OP_GET_PARAMETERS, track, device, index) {
                    Ok(value) => Outcome::Applied { index, value },
                    Err(err) => Outcome::skipped(raw, err),
                }
            })
            .collect();
        self.access.record_skips(OP_GET_PARAMETERS, &report.skipped);
        report.into_values()
    }

    /// Set device parameters from `(parameter, target)` pairs.
    ///
    /// Every target is clamped into that parameter's `[min, max]` before it
    /// is written. If the device itself does not validate, every entry is
    /// skipped with that reason.
    pub fn batch_set_parameters(
        &self,
        track: i64,
        device: i64,
        targets: impl IntoIterator<Item = (i64, f64)>,
    ) -> BatchReport<f64> {
        let validated = self
            .access
            .validator
            .validate_device_index(&self.access.host, track, device);
        let report: BatchReport<f64> = match validated {
            Err(err) => targets
                .into_iter()
                .map(|(raw, _)| Outcome::skipped(raw, &err))
                .collect(),
            Ok((t, d)) => {
                let count = self.parameter_count(t, d);
                let report: BatchReport<f64> = targets
                    .into_iter()
                    .map(|(raw, target)| {
                        self.set_parameter(t, d, raw, target, count.as_ref().copied())
                    })
                    .collect();
                if !report.applied.is_empty() {
                    self.sync_device_state(t, d);
                }
                report
            }
        };
        self.access.record_skips(OP_SET_PARAMETERS, &report.skipped);
        report
    }

    fn set_parameter<E: std::fmt::Display>(
        &self,
        track: u32,
        device: u32,
        raw: i64,
        target: f64,
        count: Result<usize, E>,
    ) -> Outcome<f64> {
        let checked = check_target(target).and_then(|target| {
            let index = self.access.validator.check_index(Dimension::Parameter, raw, count)?;
            Ok((index, target))
        });
        let (index, target) = match checked {
            Ok(checked) => checked,
            Err(err) => return Outcome::skipped(raw, err),
        };
        let path = device_path(track, device).parameter(index);
        match self.access.with_handle(OP_SET_PARAMETERS, &path, false, |param| {
            clamp_and_set(OP_SET_PARAMETERS, param, target)
        }) {
            Ok(value) => Outcome::Applied { index, value },
            Err(err) => Outcome::skipped(raw, err),
        }
    }

    fn read_device(&self, track: u32, device: u32) -> AccessResult<DeviceState> {
        let (mut state, parameter_count) =
            self.access
                .call_required(OP_DEVICE_STATE, &device_path(track, device), |handle| {
                    let state = DeviceState {
                        track,
                        index: device,
                        name: handle.get_string("name")?,
                        class_name: handle.get_string("class_name")?,
                        is_active: handle.get_bool("is_active")?,
                        parameters: Vec::new(),
                    };
                    Ok((state, handle.child_count("parameters")?))
                })?;
        state.parameters = (0..parameter_count as u32)
            .map(|p| self.read_parameter(OP_DEVICE_STATE, track, device, p))
            .collect::<AccessResult<Vec<_>>>()?;
        Ok(state)
    }

    fn read_parameter(
        &self,
        operation: &str,
        track: u32,
        device: u32,
        index: u32,
    ) -> AccessResult<ParameterState> {
        let path = device_path(track, device).parameter(index);
        self.access.call_required(operation, &path, |param| {
            Ok(ParameterState {
                index,
                name: param.get_string("name")?,
                value: param.get_f64("value")?,
                min: param.get_f64("min")?,
                max: param.get_f64("max")?,
                is_quantized: param.get_bool("is_quantized")?,
            })
        })
    }
}
