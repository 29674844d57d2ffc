// THEORY:
// The edge detector turns a grayscale buffer into a binary edge map (0 or 255) in four
// steps:
//
// 1.  **Noise suppression**: a fixed 5-tap Gaussian (sigma 1.0) smooths the input. This
//     is independent of the user's blur kernel.
// 2.  **Gradients**: a 3x3 Sobel operator gives gx and gy per pixel (clamp-to-edge).
//     Magnitude is the Euclidean norm; the direction is quantized into four bins.
// 3.  **Non-maximum suppression**: a pixel keeps its magnitude only if it is a local
//     maximum along its gradient direction. Ties are broken asymmetrically (strictly
//     above the neighbour behind, at least the neighbour ahead) so a plateau two pixels
//     wide thins to one.
// 4.  **Hysteresis**: magnitudes at or above `high` seed strong edges; magnitudes in
//     `[low, high)` are candidates. A depth-first flood over 8-connected candidates
//     promotes every chain that touches a strong pixel, however long.
//
// Thresholds are normalized to `(min, max)` first, so their order never matters. A
// pixel with zero gradient is never an edge, so a flat frame yields an empty map even
// with both thresholds at 0.

use crate::core_modules::blur::{gaussian_kernel_1d, separable_convolve};
use crate::core_modules::params::EdgeParams;
use crate::core_modules::pixel_buffer::{PixelBuffer, PixelFormat};
use crate::error::InvalidInput;
use rayon::prelude::*;

const SMOOTHING_KERNEL_SIZE: usize = 5;
const SMOOTHING_SIGMA: f32 = 1.0;
const TAN_22_5: f32 = 0.414_213_56;

pub const EDGE: u8 = 255;
pub const NON_EDGE: u8 = 0;

/// Gradient direction quantized to the axis of the two neighbours compared in NMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Gradient mostly along x: compare left and right.
    Horizontal,
    /// Gradient along +x+y (image y grows downward): compare up-left and down-right.
    Diagonal,
    /// Gradient mostly along y: compare up and down.
    Vertical,
    /// Gradient along +x-y: compare down-left and up-right.
    AntiDiagonal,
}

impl Direction {
    fn quantize(gx: f32, gy: f32) -> Self {
        let (ax, ay) = (gx.abs(), gy.abs());
        if ay <= ax * TAN_22_5 {
            Direction::Horizontal
        } else if ax <= ay * TAN_22_5 {
            Direction::Vertical
        } else if gx * gy > 0.0 {
            Direction::Diagonal
        } else {
            Direction::AntiDiagonal
        }
    }

    /// Step `(dx, dy)` towards the neighbour ahead along the gradient.
    fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::Vertical => (0, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }
}

struct Gradients {
    magnitude: Vec<f32>,
    direction: Vec<Direction>,
}

fn sobel_gradients(smoothed: &[f32], width: usize, height: usize) -> Gradients {
    let mut magnitude = vec![0.0f32; width * height];
    let mut direction = vec![Direction::Horizontal; width * height];

    magnitude
        .par_chunks_mut(width)
        .zip(direction.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (mag_row, dir_row))| {
            let up = &smoothed[y.saturating_sub(1) * width..][..width];
            let mid = &smoothed[y * width..][..width];
            let down = &smoothed[(y + 1).min(height - 1) * width..][..width];

            for x in 0..width {
                let l = x.saturating_sub(1);
                let r = (x + 1).min(width - 1);

                let gx = (up[r] + 2.0 * mid[r] + down[r]) - (up[l] + 2.0 * mid[l] + down[l]);
                let gy = (down[l] + 2.0 * down[x] + down[r]) - (up[l] + 2.0 * up[x] + up[r]);

                mag_row[x] = (gx * gx + gy * gy).sqrt();
                dir_row[x] = Direction::quantize(gx, gy);
            }
        });

    Gradients {
        magnitude,
        direction,
    }
}

fn non_max_suppression(gradients: &Gradients, width: usize, height: usize) -> Vec<f32> {
    let magnitude = &gradients.magnitude;
    let at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0.0
        } else {
            magnitude[y as usize * width + x as usize]
        }
    };

    let mut thinned = vec![0.0f32; width * height];
    thinned
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let idx = y * width + x;
                let m = magnitude[idx];
                if m <= 0.0 {
                    continue;
                }
                let (dx, dy) = gradients.direction[idx].step();
                let (xi, yi) = (x as isize, y as isize);
                let behind = at(xi - dx, yi - dy);
                let ahead = at(xi + dx, yi + dy);
                if m > behind && m >= ahead {
                    *out = m;
                }
            }
        });

    thinned
}

fn hysteresis(thinned: &[f32], width: usize, height: usize, low: f32, high: f32) -> Vec<u8> {
    const UNSET: u8 = 0;
    const CANDIDATE: u8 = 1;
    const STRONG: u8 = 2;

    let mut state = vec![UNSET; thinned.len()];
    let mut stack = Vec::new();

    for (idx, &m) in thinned.iter().enumerate() {
        if m <= 0.0 {
            continue;
        }
        if m >= high {
            state[idx] = STRONG;
            stack.push(idx);
        } else if m >= low {
            state[idx] = CANDIDATE;
        }
    }

    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % width, idx / width);
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let n = ny * width + nx;
                if state[n] == CANDIDATE {
                    state[n] = STRONG;
                    stack.push(n);
                }
            }
        }
    }

    state
        .into_iter()
        .map(|s| if s == STRONG { EDGE } else { NON_EDGE })
        .collect()
}

pub mod edge_detector {
    use super::*;

    /// Binary edge map of a 1-channel buffer. Threshold order is irrelevant.
    pub fn detect(buf: &PixelBuffer, low: u8, high: u8) -> Result<PixelBuffer, InvalidInput> {
        buf.ensure_not_empty()?;
        buf.ensure_channels(1)?;

        let (low, high) = EdgeParams::new(low, high).normalized();
        let width = buf.width() as usize;
        let height = buf.height() as usize;

        // --- 1. Noise Suppression ---
        let input: Vec<f32> = buf.samples().iter().map(|&v| f32::from(v)).collect();
        let kernel = gaussian_kernel_1d(SMOOTHING_KERNEL_SIZE, SMOOTHING_SIGMA);
        let smoothed = separable_convolve(&input, width, height, 1, &kernel);

        // --- 2. Gradients ---
        let gradients = sobel_gradients(&smoothed, width, height);

        // --- 3. Non-Maximum Suppression ---
        let thinned = non_max_suppression(&gradients, width, height);

        // --- 4. Hysteresis ---
        let edges = hysteresis(&thinned, width, height, f32::from(low), f32::from(high));

        PixelBuffer::new(buf.width(), buf.height(), PixelFormat::Gray8, edges)
    }
}
