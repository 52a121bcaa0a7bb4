use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::Vec3;

use relief::mesh::template::MeshTemplate;
use relief::mesh::{MeshBuffers, SurfaceSink};
use relief::streaming::{EngineConfig, GridCoord, LodPreset, TerrainEngine};
use relief::terrain::heightfield::{HeightField, OctaveParams};

struct NullSink;

impl SurfaceSink for NullSink {
    fn commit(&mut self, _coord: GridCoord, buffers: &MeshBuffers) {
        black_box(buffers.positions.len());
    }
}

fn bench_config() -> EngineConfig {
    EngineConfig {
        chunk_size: 40.0,
        reach: 4,
        threaded: false,
        lod_presets: vec![
            LodPreset { lod: 0.625, range: 2, enabled: true },
            LodPreset { lod: 2.5, range: 3, enabled: true },
        ],
        decor_layers: vec![],
        ..EngineConfig::default()
    }
}

fn bench_heightfield_sample(c: &mut Criterion) {
    let field = HeightField::new(
        1337,
        vec![
            OctaveParams { distance: 200.0, height: 40.0, enabled: true },
            OctaveParams { distance: 50.0, height: 10.0, enabled: true },
            OctaveParams { distance: 9.0, height: 1.5, enabled: true },
        ],
        None,
        4.0,
    );

    c.bench_function("heightfield_sample_1k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for i in 0..1000 {
                let x = i as f32 * 0.73;
                sum += field.sample_local(black_box(x), black_box(-x * 0.4));
            }
            sum
        });
    });
}

fn bench_template_build(c: &mut Criterion) {
    c.bench_function("template_build_lod_0_625", |b| {
        b.iter(|| MeshTemplate::build(black_box(0.625)).unwrap());
    });

    c.bench_function("template_build_lod_2_5", |b| {
        b.iter(|| MeshTemplate::build(black_box(2.5)).unwrap());
    });
}

fn bench_initial_window_fill(c: &mut Criterion) {
    c.bench_function("initial_window_fill_reach_4", |b| {
        b.iter(|| {
            let mut engine = TerrainEngine::new(bench_config()).unwrap();
            let mut sink = NullSink;
            engine.update(black_box(Vec3::ZERO));
            while engine.pending_apply() > 0 {
                engine.apply(&mut sink);
            }
        });
    });
}

fn bench_streaming_walk(c: &mut Criterion) {
    c.bench_function("streaming_walk_100_ticks", |b| {
        b.iter(|| {
            let mut engine = TerrainEngine::new(bench_config()).unwrap();
            let mut sink = NullSink;
            for tick in 0..100 {
                let pos = Vec3::new(tick as f32 * 15.0, 0.0, tick as f32 * 7.0);
                engine.update(black_box(pos));
                engine.apply(&mut sink);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_heightfield_sample,
    bench_template_build,
    bench_initial_window_fill,
    bench_streaming_walk
);
criterion_main!(benches);
