use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use focus_stack_rs::focus_stack::{
    BitDepth, FocusStackPipeline, Pyramid, RasterImage, StackConfig,
};

fn generate_frame(width: usize, height: usize, phase: f32) -> RasterImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let v = 0.5 + 0.25 * ((x as f32 * 0.09 + phase).sin() * (y as f32 * 0.05).cos());
            let v = (v * 255.0).round() as u16;
            data.extend_from_slice(&[v, v / 2 + 40, 255 - v]);
        }
    }
    RasterImage::new(width, height, data, BitDepth::Eight).unwrap()
}

fn benchmark_pyramid_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid_build");

    for (width, height, label) in [(256, 256, "256x256"), (1024, 768, "1024x768")] {
        let frame = generate_frame(width, height, 0.0);
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| Pyramid::build_laplacian(black_box(frame)));
        });
    }

    group.finish();
}

fn benchmark_pyramid_collapse(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid_collapse");

    for (width, height, label) in [(256, 256, "256x256"), (1024, 768, "1024x768")] {
        let pyramid = Pyramid::build_laplacian(&generate_frame(width, height, 0.0));
        group.bench_with_input(BenchmarkId::from_parameter(label), &pyramid, |b, pyramid| {
            b.iter(|| black_box(pyramid).collapse());
        });
    }

    group.finish();
}

fn benchmark_small_stack(c: &mut Criterion) {
    let frames: Vec<RasterImage> = (0..4).map(|i| generate_frame(320, 240, i as f32 * 0.3)).collect();
    let aligned = FocusStackPipeline::new(StackConfig::builder().previews(false).build());
    let prealigned = FocusStackPipeline::new(StackConfig::builder().previews(false).align(false).build());

    let mut group = c.benchmark_group("stack_4x320x240");
    group.sample_size(10);
    group.bench_function("aligned", |b| {
        b.iter(|| aligned.stack_frames(black_box(frames.clone()), |_| {}).unwrap());
    });
    group.bench_function("prealigned", |b| {
        b.iter(|| prealigned.stack_frames(black_box(frames.clone()), |_| {}).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_pyramid_build,
    benchmark_pyramid_collapse,
    benchmark_small_stack
);
criterion_main!(benches);
