//! Property-based tests for the access layer.
//!
//! Uses proptest to check clamping, substring invalidation and path
//! round trips across arbitrary inputs.

use std::collections::HashSet;

use liveset_core::{
    AccessConfig, CachePolicy, DeviceModel, EntityPath, LiveAccess, MemoryHost, MixerParam,
    MixerTarget, ParameterModel, PathSpec, SetModel, StateCache, TrackModel, build_path,
};
use proptest::prelude::*;

fn host_with_ranges(volume: (f64, f64), param: (f64, f64)) -> MemoryHost {
    let device = DeviceModel {
        parameters: vec![ParameterModel {
            name: "Amount".into(),
            value: param.0,
            min: param.0,
            max: param.1,
            is_quantized: false,
        }],
        ..DeviceModel::default()
    };
    let mut set = SetModel::default();
    set.tracks.push(
        TrackModel::audio("A")
            .with_device_model(device)
            .with_volume(MixerParam {
                value: volume.0,
                min: volume.0,
                max: volume.1,
            }),
    );
    MemoryHost::new(set)
}

fn range() -> impl Strategy<Value = (f64, f64)> {
    (-100.0f64..100.0, 0.0f64..50.0).prop_map(|(min, span)| (min, min + span))
}

fn path_spec() -> impl Strategy<Value = PathSpec> {
    (
        prop::option::of(0u32..64),
        prop::option::of(0u32..32),
        prop::option::of(0u32..128),
        prop::option::of(0u32..16),
        any::<bool>(),
        prop::option::of(0u32..16),
        prop::option::of((any::<bool>(), any::<bool>(), prop::option::of(0u32..12))),
        prop::bool::weighted(0.05),
    )
        .prop_map(|(track, device, parameter, clip_slot, clip, scene, mixer, browser)| PathSpec {
            track,
            device,
            parameter,
            clip_slot,
            clip,
            scene,
            mixer: mixer.map(|(volume, panning, send)| MixerTarget { volume, panning, send }),
            browser,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whatever the target, the written volume lies inside the reported range.
    #[test]
    fn volume_writes_stay_in_range(range in range(), target in -500.0f64..500.0) {
        let host = host_with_ranges(range, (0.0, 1.0));
        let access = LiveAccess::new(host.clone(), AccessConfig::default());
        let report = access.tracks().batch_set_volume([(0, target)]);

        let applied = *report.value(0).unwrap();
        prop_assert!(applied >= range.0 && applied <= range.1);
        if target >= range.0 && target <= range.1 {
            prop_assert_eq!(applied, target);
        }
        prop_assert_eq!(host.with_set(|set| set.tracks[0].volume.value), applied);
    }

    /// Parameter targets below min land on min, above max land on max.
    #[test]
    fn parameter_writes_clamp(range in range(), below in 1.0f64..100.0, above in 1.0f64..100.0) {
        let access = LiveAccess::new(host_with_ranges((0.0, 1.0), range), AccessConfig::default());
        let devices = access.devices();

        let low = devices.batch_set_parameters(0, 0, [(0, range.0 - below)]);
        prop_assert_eq!(low.applied, vec![(0, range.0)]);

        let high = devices.batch_set_parameters(0, 0, [(0, range.1 + above)]);
        prop_assert_eq!(high.applied, vec![(0, range.1)]);
    }

    /// Invalidating a pattern removes exactly the keys that contain it.
    #[test]
    fn invalidate_removes_exactly_matching_keys(
        keys in prop::collection::hash_set("[a-c/0-9]{1,8}", 0..24),
        pattern in "[a-c/0-9]{1,3}",
    ) {
        let cache: StateCache<u32> = StateCache::new(CachePolicy::default());
        for key in &keys {
            cache.set(key, 1);
        }

        let removed = cache.invalidate(Some(&pattern));

        let expected: HashSet<&String> =
            keys.iter().filter(|k| k.contains(pattern.as_str())).collect();
        prop_assert_eq!(removed, expected.len());
        for key in &keys {
            prop_assert_eq!(cache.peek(key).is_some(), !expected.contains(key));
        }
    }

    /// Every built path parses back to itself.
    #[test]
    fn built_paths_round_trip(spec in path_spec()) {
        let path = build_path(&spec);
        let text = path.to_string();
        let parsed: EntityPath = text.parse().unwrap();
        prop_assert_eq!(parsed, path);
        prop_assert!(text.starts_with("live_set") || text == "live_app browser");
    }
}
