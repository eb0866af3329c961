use crate::focus_stack::fusion::{FocusAccumulator, FusionConfig, neighborhood_sum};
use crate::focus_stack::pyramid::{Pyramid, PyramidLevel};
use crate::focus_stack::raster::{BitDepth, Plane, RasterImage};

fn level_with_luma(luma: Plane) -> PyramidLevel {
    let (w, h) = luma.dimensions();
    let chroma = luma.map(|v| v * 0.1);
    PyramidLevel::new([luma, chroma, Plane::filled(w, h, 0.0)])
}

fn flat_level(w: usize, h: usize, luma: f32) -> PyramidLevel {
    level_with_luma(Plane::filled(w, h, luma))
}

/// Two-level pyramid so that level 0 is the finest and not also the base.
fn finest_pyramid(level0: PyramidLevel) -> Pyramid {
    Pyramid::from_levels(vec![level0, flat_level(5, 5, 0.5)])
}

fn textured_image(width: usize, height: usize) -> RasterImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            data.push(((x * 5 + y * 3) % 256) as u16);
            data.push(((x * y) % 251) as u16);
            data.push((128 + (x % 7) * 10 - (y % 5) * 8) as u16);
        }
    }
    RasterImage::new(width, height, data, BitDepth::Eight).unwrap()
}

#[test]
fn test_neighborhood_sum_zero_padding() {
    let ones = Plane::filled(4, 3, 1.0);
    let sum = neighborhood_sum(&ones);
    assert_eq!(sum.at(0, 0), 4.0);
    assert_eq!(sum.at(1, 0), 6.0);
    assert_eq!(sum.at(1, 1), 9.0);
    assert_eq!(sum.at(3, 2), 4.0);
}

#[test]
fn test_finest_ignores_isolated_pixel() {
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(9, 9, 0.5)), FusionConfig::default());
    let mut luma = Plane::filled(9, 9, 0.4);
    luma.set(4, 4, 0.6);
    let stats = acc.update(&finest_pyramid(level_with_luma(luma)));

    assert_eq!(stats.replaced[0], 0);
    assert!(acc.pyramid().finest().luma().data().iter().all(|&v| v == 0.5));
}

#[test]
fn test_finest_replaces_supported_block() {
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(9, 9, 0.5)), FusionConfig::default());
    let luma = Plane::from_fn(9, 9, |x, y| {
        if (3..=5).contains(&x) && (3..=5).contains(&y) { 0.6 } else { 0.4 }
    });
    acc.update(&finest_pyramid(level_with_luma(luma)));

    let finest = acc.pyramid().finest();
    // center and edge midpoints of the block have enough support
    for (x, y) in [(4, 4), (3, 4), (5, 4), (4, 3), (4, 5)] {
        assert_eq!(finest.luma().at(x, y), 0.6, "({x}, {y})");
        assert_eq!(finest.channels[1].at(x, y), 0.6 * 0.1);
    }
    // block corners and everything outside stay
    for (x, y) in [(3, 3), (5, 5), (2, 4), (0, 0)] {
        assert_eq!(finest.luma().at(x, y), 0.5, "({x}, {y})");
    }

    let map = acc.contribution_map();
    assert_eq!(map.at(4, 4), 1.0);
    assert_eq!(map.at(0, 0), 0.0);
}

#[test]
fn test_finest_threshold_and_ties() {
    let config = FusionConfig {
        finest_threshold: 0.0,
        ties_favor_new: true,
    };
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(6, 6, 0.5)), config);
    acc.update(&finest_pyramid(flat_level(6, 6, -0.5)));
    // equal energy, so every pixel goes to the new frame
    assert!(acc.pyramid().finest().luma().data().iter().all(|&v| v == -0.5));

    let config = FusionConfig {
        finest_threshold: 2.0,
        ties_favor_new: false,
    };
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(6, 6, 0.5)), config);
    acc.update(&finest_pyramid(flat_level(6, 6, 0.7)));
    // 9 * (0.49 - 0.25) clears the threshold only with a full neighborhood
    let finest = acc.pyramid().finest();
    assert_eq!(finest.luma().at(2, 2), 0.7);
    assert_eq!(finest.luma().at(0, 0), 0.5);
}

#[test]
fn test_intermediate_replaces_exact_half() {
    let base = || flat_level(5, 5, 0.5);
    let best = Pyramid::from_levels(vec![flat_level(9, 9, 0.5), flat_level(9, 9, 0.3), base()]);
    let mut acc = FocusAccumulator::new(best, FusionConfig::default());

    let luma = Plane::from_fn(9, 9, |x, _| if x < 4 { -0.5 } else { 0.3 });
    let frame = Pyramid::from_levels(vec![flat_level(9, 9, 0.5), level_with_luma(luma), base()]);
    let stats = acc.update(&frame);

    let level = &acc.pyramid().levels()[1];
    for y in 0..9 {
        for x in 0..9 {
            let expected = if x < 4 { -0.5 } else { 0.3 };
            assert_eq!(level.luma().at(x, y), expected, "({x}, {y})");
        }
    }
    assert_eq!(stats.replaced, vec![0, 36, 25]);
}

#[test]
fn test_intermediate_ties_keep_best() {
    let best = Pyramid::from_levels(vec![
        flat_level(4, 4, 0.0),
        level_with_luma(Plane::filled(4, 4, 0.3)),
        flat_level(2, 2, 0.0),
    ]);
    let mut acc = FocusAccumulator::new(best, FusionConfig::default());
    let frame = Pyramid::from_levels(vec![
        flat_level(4, 4, 0.0),
        PyramidLevel::new([Plane::filled(4, 4, -0.3), Plane::filled(4, 4, 9.0), Plane::new(4, 4)]),
        flat_level(2, 2, 0.0),
    ]);
    acc.update(&frame);
    assert!(acc.pyramid().levels()[1].channels[1].data().iter().all(|&v| v != 9.0));
}

#[test]
fn test_coarsest_is_mean_of_all_frames() {
    let values = [0.1f32, 0.4, 0.7, 0.2, 0.9];
    let single = |v: f32| Pyramid::from_levels(vec![flat_level(8, 8, v)]);

    for n in 1..=values.len() {
        let mut acc = FocusAccumulator::new(single(values[0]), FusionConfig::default());
        for &v in &values[1..n] {
            acc.update(&single(v));
        }
        let mean = values[..n].iter().sum::<f32>() / n as f32;
        assert_eq!(acc.count(), n);
        for &v in acc.pyramid().coarsest().luma().data() {
            assert!((v - mean).abs() < 1e-6, "n = {n}: {v} vs {mean}");
        }
        // single-level stacks never touch the contribution map
        assert!(acc.contribution_map().data().iter().all(|&m| m == 0.0));
    }
}

#[test]
fn test_contribution_map_is_never_cleared() {
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(6, 6, 0.2)), FusionConfig::default());
    acc = acc.fuse(&finest_pyramid(flat_level(6, 6, 0.8)));
    assert!(acc.contribution_map().data().iter().all(|&m| m == 1.0));

    acc = acc.fuse(&finest_pyramid(flat_level(6, 6, 0.1)));
    assert!(acc.contribution_map().data().iter().all(|&m| m == 1.0));
    assert_eq!(acc.count(), 3);
    assert!(acc.pyramid().finest().luma().data().iter().all(|&v| v == 0.8));
}

#[test]
fn test_identical_frames_reproduce_input() {
    let image = textured_image(140, 130);
    let pyramid = Pyramid::build_laplacian(&image);
    assert_eq!(pyramid.len(), 2);

    let mut acc = FocusAccumulator::new(pyramid.clone(), FusionConfig::default());
    acc.update(&pyramid);
    acc.update(&pyramid);

    assert_eq!(acc.current_composite(BitDepth::Eight), image);
}

#[test]
#[should_panic(expected = "level count")]
fn test_mismatched_levels_panic() {
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(9, 9, 0.5)), FusionConfig::default());
    acc.update(&Pyramid::from_levels(vec![flat_level(9, 9, 0.5)]));
}

#[test]
fn test_base_level_counts_as_fully_updated() {
    let mut acc = FocusAccumulator::new(finest_pyramid(flat_level(9, 9, 0.5)), FusionConfig::default());
    let stats = acc.update(&finest_pyramid(flat_level(9, 9, 0.5)));

    // identical finest bands change nothing, the 5x5 base is re-averaged
    assert_eq!(stats.replaced, vec![0, 25]);
    assert_eq!(stats.total_pixels, 81 + 25);
    assert!((stats.percent_replaced() - 2500.0 / 106.0).abs() < 1e-9);
}
