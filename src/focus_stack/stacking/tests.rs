use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::focus_stack::common::error::{Result, StackError};
use crate::focus_stack::io::{FrameReader, FrameWriter, OutputConfig, TiffCompression};
use crate::focus_stack::raster::{BitDepth, RasterImage};
use crate::focus_stack::registration::{AffineTransform, CropRect};
use crate::focus_stack::stacking::{CancelToken, FocusStackPipeline, Progress, StackConfig};

/// Serves frames by index; the path is the index as text.
struct MockReader {
    frames: Vec<RasterImage>,
    fail_at: Option<usize>,
}

impl FrameReader for MockReader {
    fn read_frame(&self, path: &Path) -> Result<RasterImage> {
        let index: usize = path
            .to_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StackError::unable_to_open(path, "bad mock path"))?;
        if self.fail_at == Some(index) {
            return Err(StackError::unable_to_open(path, "Mock decode error"));
        }
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| StackError::unable_to_open(path, "no such frame"))
    }
}

struct MockWriter {
    should_fail: bool,
    written: Arc<Mutex<Vec<RasterImage>>>,
}

impl FrameWriter for MockWriter {
    fn write_tiff(&self, image: &RasterImage, _output: &mut dyn std::io::Write, _config: &OutputConfig) -> Result<()> {
        self.written.lock().unwrap().push(image.clone());
        Ok(())
    }

    fn write_frame(&self, image: &RasterImage, _path: &Path, _config: &OutputConfig) -> Result<()> {
        if self.should_fail {
            return Err(StackError::OutputWriteError("Mock write error".to_string()));
        }
        self.written.lock().unwrap().push(image.clone());
        Ok(())
    }
}

fn paths(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

fn rgb_image(width: usize, height: usize, f: impl Fn(usize, usize) -> [f32; 3]) -> RasterImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            for v in f(x, y) {
                data.push((v.clamp(0.0, 1.0) * 255.0).round() as u16);
            }
        }
    }
    RasterImage::new(width, height, data, BitDepth::Eight).unwrap()
}

fn texture(x: f64, y: f64) -> f32 {
    let v = 0.5
        + 0.15 * (0.07 * x + 0.03 * y).sin()
        + 0.15 * (0.05 * y - 0.02 * x).cos()
        + 0.1 * (0.04 * (x + y)).sin() * (0.06 * x).cos();
    v as f32
}

fn textured_frame(width: usize, height: usize, dx: f64, dy: f64) -> RasterImage {
    rgb_image(width, height, |x, y| {
        let t = texture(x as f64 + dx, y as f64 + dy);
        [t, 0.8 * t + 0.1, 1.0 - t]
    })
}

fn mock_pipeline(frames: Vec<RasterImage>, fail_at: Option<usize>, config: StackConfig) -> FocusStackPipeline<MockReader> {
    FocusStackPipeline::with_reader(MockReader { frames, fail_at }, config)
}

#[test]
fn test_config_builder() {
    let config = StackConfig::builder()
        .align(false)
        .crop(false)
        .previews(false)
        .output_depth(BitDepth::Sixteen)
        .output(OutputConfig::builder().compression(TiffCompression::None).build())
        .build();

    assert!(!config.align);
    assert!(!config.crop);
    assert!(!config.previews);
    assert_eq!(config.output_depth, BitDepth::Sixteen);
    assert_eq!(config.output.compression, TiffCompression::None);
    assert_eq!(config.fusion, StackConfig::default().fusion);
}

#[test]
fn test_empty_input_rejected() {
    let pipeline = mock_pipeline(vec![], None, StackConfig::default());
    let no_paths: Vec<String> = Vec::new();
    let mut calls = 0;
    let result = pipeline.stack(&no_paths, |_| calls += 1);
    assert!(matches!(result, Err(StackError::NoInputFrames)));
    assert_eq!(calls, 0);

    let result = pipeline.stack_frames(Vec::new(), |_| {});
    assert!(matches!(result, Err(StackError::NoInputFrames)));
}

#[test]
fn test_decode_failure_aborts_run() {
    let frame = textured_frame(32, 32, 0.0, 0.0);
    let pipeline = mock_pipeline(vec![frame.clone(), frame.clone(), frame], Some(1), StackConfig::default());

    let mut snapshots = 0;
    let result = pipeline.stack(&paths(3), |_| snapshots += 1);
    match result {
        Err(StackError::UnableToOpen { path, .. }) => assert_eq!(path, Path::new("1")),
        other => panic!("unexpected result: {other:?}"),
    }
    // only the reference snapshot was emitted
    assert_eq!(snapshots, 1);
}

#[test]
fn test_reference_decode_failure() {
    let pipeline = mock_pipeline(vec![textured_frame(16, 16, 0.0, 0.0)], Some(0), StackConfig::default());
    let result = pipeline.stack(&paths(1), |_| {});
    assert!(matches!(result, Err(StackError::UnableToOpen { .. })));
}

#[test]
fn test_dimension_mismatch() {
    let frames = vec![textured_frame(32, 32, 0.0, 0.0), textured_frame(32, 30, 0.0, 0.0)];
    let pipeline = mock_pipeline(vec![], None, StackConfig::default());
    let result = pipeline.stack_frames(frames, |_| {});
    assert!(matches!(
        result,
        Err(StackError::DimensionMismatch {
            index: 1,
            width: 32,
            height: 30,
            expected_width: 32,
            expected_height: 32
        })
    ));
}

#[test]
fn test_single_frame_returns_reference() {
    let frame = textured_frame(40, 30, 0.0, 0.0);
    let pipeline = mock_pipeline(vec![frame.clone()], None, StackConfig::default());

    let output = pipeline.stack(&paths(1), |_| {}).unwrap();
    assert_eq!(output.image, frame);
    assert_eq!(output.crop, CropRect::full(40, 30));
    assert_eq!(output.transforms, vec![AffineTransform::identity()]);
    assert!(output.reports.is_empty());
}

#[test]
fn test_identical_frames_reproduce_input() {
    let frame = textured_frame(96, 80, 0.0, 0.0);
    let pipeline = mock_pipeline(vec![], None, StackConfig::default());

    let mut seen: Vec<(usize, usize, bool, Option<(usize, usize)>)> = Vec::new();
    let output = pipeline
        .stack_frames(vec![frame.clone(), frame.clone(), frame.clone()], |p: &Progress<'_>| {
            let dims = p.preview().map(|img| (img.width, img.height));
            seen.push((p.current, p.limit, p.is_running, dims));
        })
        .unwrap();

    for t in &output.transforms {
        assert!(t.is_identity(1e-3), "{t:?}");
    }
    assert_eq!(output.crop, CropRect::full(96, 80));
    assert_eq!(output.image, frame);
    assert!(output.contributions.data().iter().all(|&m| m == 0.0));

    assert_eq!(
        seen,
        vec![
            (1, 3, true, Some((96, 80))),
            (2, 3, true, Some((96, 80))),
            (3, 3, true, Some((96, 80))),
            (3, 3, false, Some((96, 80))),
        ]
    );
}

#[test]
fn test_previews_disabled() {
    let frame = textured_frame(24, 24, 0.0, 0.0);
    let config = StackConfig::builder().previews(false).align(false).build();
    let pipeline = mock_pipeline(vec![], None, config);

    let mut previews = Vec::new();
    pipeline
        .stack_frames(vec![frame.clone(), frame], |p| previews.push(p.preview().is_some()))
        .unwrap();
    // the final snapshot always carries the result
    assert_eq!(previews, vec![false, false, true]);
}

/// Sixteen-level gray checkerboard: every frame is sharp (high contrast) in
/// its own third of the width and increasingly flattened further away.
fn third_sharp_frame(sharp_third: usize) -> RasterImage {
    const AMPLITUDE: [i32; 3] = [64, 16, 3];
    let (width, height) = (256usize, 256usize);
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let third = x * 3 / width;
            let amplitude = AMPLITUDE[third.abs_diff(sharp_third)];
            let sign = if (x + y) % 2 == 0 { 1 } else { -1 };
            let v = (128 + sign * amplitude) as u16;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    RasterImage::new(width, height, data, BitDepth::Eight).unwrap()
}

#[test]
fn test_each_third_taken_from_its_sharp_frame() {
    let frames: Vec<RasterImage> = (0..3).map(third_sharp_frame).collect();
    let config = StackConfig::builder().align(false).build();
    let pipeline = mock_pipeline(frames.clone(), None, config);

    let output = pipeline.stack(&paths(3), |_| {}).unwrap();
    assert_eq!((output.image.width, output.image.height), (256, 256));
    assert!(output.reports.iter().all(|r| r.local == AffineTransform::identity()));

    for (sharp, columns) in [(0usize, 0..85), (1, 86..170), (2, 171..256)] {
        for y in 0..256 {
            for x in columns.clone() {
                assert_eq!(
                    output.image.pixel(x, y),
                    frames[sharp].pixel(x, y),
                    "pixel ({x}, {y}) should come from frame {sharp}"
                );
            }
        }
    }
}

#[test]
fn test_translated_frames_are_registered_and_cropped() {
    let (w, h) = (128usize, 128usize);
    // frame i shows the scene moved by i * (2, -1)
    let frames: Vec<RasterImage> = (0..3)
        .map(|i| textured_frame(w, h, 2.0 * i as f64, -(i as f64)))
        .collect();
    let pipeline = mock_pipeline(frames, None, StackConfig::default());

    let output = pipeline.stack(&paths(3), |_| {}).unwrap();

    for (i, t) in output.transforms.iter().enumerate() {
        let (tx, ty) = t.offset();
        assert!((tx - 2.0 * i as f64).abs() <= 0.25, "frame {i}: tx = {tx}");
        assert!((ty + i as f64).abs() <= 0.25, "frame {i}: ty = {ty}");
    }

    // the crop loses the cumulative shift of (4, 2) on the leading edges
    let crop = output.crop;
    assert_eq!(crop, CropRect::new(4, 0, 124, 126));
    assert_eq!((output.image.width, output.image.height), (crop.width, crop.height));
}

#[test]
fn test_crop_can_be_disabled() {
    let frames: Vec<RasterImage> = (0..2).map(|i| textured_frame(96, 96, 3.0 * i as f64, 0.0)).collect();
    let config = StackConfig::builder().crop(false).build();
    let pipeline = mock_pipeline(frames, None, config);

    let output = pipeline.stack(&paths(2), |_| {}).unwrap();
    assert_eq!((output.image.width, output.image.height), (96, 96));
    assert!(output.crop.width < 96);
}

#[test]
fn test_sixteen_bit_output() {
    let frame = textured_frame(32, 32, 0.0, 0.0);
    let config = StackConfig::builder().output_depth(BitDepth::Sixteen).align(false).build();
    let pipeline = mock_pipeline(vec![], None, config);

    let output = pipeline.stack_frames(vec![frame.clone(), frame.clone()], |_| {}).unwrap();
    assert_eq!(output.image.depth, BitDepth::Sixteen);
    assert_eq!(output.image.convert_depth(BitDepth::Eight), frame);
}

#[test]
fn test_cancel_before_start() {
    let token = CancelToken::new();
    token.cancel();
    let pipeline = mock_pipeline(vec![textured_frame(16, 16, 0.0, 0.0)], None, StackConfig::default())
        .with_cancel_token(token);

    let result = pipeline.stack(&paths(1), |_| {});
    assert!(matches!(result, Err(StackError::Cancelled)));
}

#[test]
fn test_cancel_from_progress_callback() {
    let frame = textured_frame(24, 24, 0.0, 0.0);
    let token = CancelToken::new();
    let pipeline = mock_pipeline(vec![frame.clone(), frame.clone(), frame], None, StackConfig::default())
        .with_cancel_token(token.clone());

    let mut snapshots = 0;
    let result = pipeline.stack(&paths(3), |_| {
        snapshots += 1;
        token.cancel();
    });
    assert!(matches!(result, Err(StackError::Cancelled)));
    assert_eq!(snapshots, 1);
}

#[test]
fn test_stack_to_writer() {
    let frame = textured_frame(32, 32, 0.0, 0.0);
    let written = Arc::new(Mutex::new(Vec::new()));
    let writer = MockWriter { should_fail: false, written: written.clone() };
    let pipeline = mock_pipeline(vec![frame.clone(), frame], None, StackConfig::default());

    let output = pipeline.stack_to_writer(&paths(2), "out.tif", &writer, |_| {}).unwrap();
    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0], output.image);
}

#[test]
fn test_writer_failure() {
    let frame = textured_frame(32, 32, 0.0, 0.0);
    let writer = MockWriter { should_fail: true, written: Arc::new(Mutex::new(Vec::new())) };
    let pipeline = mock_pipeline(vec![frame], None, StackConfig::default());

    let result = pipeline.stack_to_writer(&paths(1), "out.tif", &writer, |_| {});
    assert!(matches!(result, Err(StackError::OutputWriteError(_))));
}

#[test]
fn test_stack_to_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("stacked.tif");
    let frame = textured_frame(40, 40, 0.0, 0.0);
    let pipeline = mock_pipeline(vec![frame.clone(), frame.clone()], None, StackConfig::default());

    pipeline.stack_to_file(&paths(2), &output_path, |_| {}).unwrap();

    use crate::focus_stack::io::ImageFrameReader;
    let decoded = ImageFrameReader.read_frame(&output_path).unwrap();
    assert_eq!(decoded, frame);
}
