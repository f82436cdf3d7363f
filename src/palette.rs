//! Per-mask colour assignment.
//!
//! Masks of one image share an `n`-bucket sample of the cyclic `hsv`
//! colormap; a permutation seeded with the image index decides which mask
//! gets which bucket.

use image::Rgb;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// `(x, value)` anchors of one colour channel, linearly interpolated.
type Segments = &'static [(f32, f32)];

// matplotlib's `hsv` colormap segment data.
const HSV_RED: Segments = &[
    (0.0, 1.0),
    (0.158_730, 1.0),
    (0.174_603, 0.968_750),
    (0.333_333, 0.031_250),
    (0.349_206, 0.0),
    (0.666_667, 0.0),
    (0.682_540, 0.031_250),
    (0.841_270, 0.968_750),
    (0.857_143, 1.0),
    (1.0, 1.0),
];

const HSV_GREEN: Segments = &[
    (0.0, 0.0),
    (0.158_730, 0.937_500),
    (0.174_603, 1.0),
    (0.507_937, 1.0),
    (0.666_667, 0.062_500),
    (0.682_540, 0.0),
    (1.0, 0.0),
];

const HSV_BLUE: Segments = &[
    (0.0, 0.0),
    (0.333_333, 0.0),
    (0.349_206, 0.062_500),
    (0.507_937, 1.0),
    (0.841_270, 1.0),
    (0.857_143, 0.937_500),
    (1.0, 0.093_750),
];

fn interpolate(segments: Segments, x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    segments
        .windows(2)
        .find(|pair| x <= pair[1].0)
        .map(|pair| {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x1 <= x0 {
                y1
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        })
        .unwrap_or(segments[segments.len() - 1].1)
}

/// Colour of the `hsv` colormap at `x` in `[0, 1]`.
pub fn hsv_colormap(x: f32) -> Rgb<f32> {
    Rgb([
        interpolate(HSV_RED, x),
        interpolate(HSV_GREEN, x),
        interpolate(HSV_BLUE, x),
    ])
}

/// `n` colours sampled at `linspace(0, 1, n)`. A one-entry palette takes the
/// colour at `x = 1`, as matplotlib's lookup tables do.
pub fn hsv_palette(n: usize) -> Vec<Rgb<f32>> {
    match n {
        0 => Vec::new(),
        1 => vec![hsv_colormap(1.0)],
        _ => (0..n)
            .map(|i| hsv_colormap(i as f32 / (n - 1) as f32))
            .collect(),
    }
}

/// A permutation of `0..n`, fully determined by `seed`.
pub fn seeded_permutation(seed: u64, n: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng);
    order
}

/// Colours for the `n` masks of the image at `image_index`, in mask order.
pub fn assign_colors(image_index: usize, n: usize) -> Vec<Rgb<f32>> {
    let palette = hsv_palette(n);
    seeded_permutation(image_index as u64, n)
        .into_iter()
        .map(|bucket| palette[bucket])
        .collect()
}
