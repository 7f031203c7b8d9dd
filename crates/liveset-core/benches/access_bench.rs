//! Criterion benchmarks for liveset-core hot paths
//!
//! Run with: cargo bench -p liveset-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use liveset_core::{
    AccessConfig, CachePolicy, EntityPath, LiveAccess, MemoryHost, MixerTarget, PathSpec, SetModel,
    StateCache, TrackModel, build_path, keys,
};

const TRACK_COUNTS: &[usize] = &[8, 32, 128];

fn live_set(tracks: usize) -> SetModel {
    let mut set = SetModel::default();
    set.tracks = (0..tracks)
        .map(|i| TrackModel::midi(format!("Track {i}")).with_clip_slots(8).with_device("Device", 8))
        .collect();
    set
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("Path");

    let parameter = PathSpec::new().with_track(12).with_device(3).with_parameter(7);
    group.bench_function("build_parameter", |b| {
        b.iter(|| black_box(build_path(black_box(&parameter))));
    });

    let mixer = PathSpec::new().with_track(4).with_mixer(MixerTarget {
        panning: true,
        ..MixerTarget::default()
    });
    group.bench_function("build_mixer", |b| {
        b.iter(|| black_box(build_path(black_box(&mixer))));
    });

    group.bench_function("render_and_parse", |b| {
        let path = build_path(&parameter);
        b.iter(|| {
            let text = black_box(&path).to_string();
            black_box(text.parse::<EntityPath>())
        });
    });

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("StateCache");

    let cache: StateCache<u64> = StateCache::new(CachePolicy::default());
    cache.set("track/0/", 42);
    group.bench_function("hit", |b| {
        b.iter(|| black_box(cache.get(black_box("track/0/"), || Ok::<_, ()>(0))));
    });

    for &entries in &[64usize, 1024] {
        group.bench_with_input(
            BenchmarkId::new("invalidate_prefix", entries),
            &entries,
            |b, &entries| {
                b.iter(|| {
                    for i in 0..entries as u32 {
                        cache.set(&keys::device(i % 16, i), u64::from(i));
                    }
                    black_box(cache.invalidate(Some(&keys::track(3))))
                });
            },
        );
    }

    group.finish();
}

fn bench_tracks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tracks");

    for &count in TRACK_COUNTS {
        let access = LiveAccess::new(MemoryHost::new(live_set(count)), AccessConfig::default());
        let indices: Vec<i64> = (0..count as i64).collect();

        group.bench_with_input(BenchmarkId::new("batch_get_track_info", count), &count, |b, _| {
            b.iter(|| black_box(access.tracks().batch_get_track_info(&indices)));
        });

        group.bench_with_input(BenchmarkId::new("find_last_by_name", count), &count, |b, &count| {
            let name = format!("Track {}", count - 1);
            b.iter(|| black_box(access.tracks().find_track_by_name(&name)));
        });

        group.bench_with_input(BenchmarkId::new("cached_state", count), &count, |b, _| {
            b.iter(|| black_box(access.tracks().get_track_state(0)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_paths, bench_cache, bench_tracks);

criterion_main!(benches);
