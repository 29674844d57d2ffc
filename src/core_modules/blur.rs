// THEORY:
// The blur filter smooths a buffer with a Gaussian kernel whose size the caller picks
// each frame. A 2-D Gaussian is separable, so it is applied as two 1-D passes:
// horizontal into a floating-point scratch buffer, then vertical into the output. That
// turns k*k taps per sample into 2*k.
//
// Key principles:
// 1.  **Kernel**: `k = raw | 1`, sigma = max(k / 6, 0.5), weights normalized to sum 1.
//     With k == 1 the single tap is 1.0, so the filter short-circuits to a copy. A
//     kernel reaching past the image is truncated to the longest side and the cut-off
//     weight moves to the outermost taps, so any `u32` size costs at most O(w + h).
// 2.  **Borders**: out-of-range taps read the nearest edge sample (clamp-to-edge), so
//     edges keep their brightness instead of fading towards black.
// 3.  **Channels**: every interleaved channel is filtered independently; the format of
//     the input is the format of the output.
// 4.  **Rows in parallel**: both passes write disjoint output rows, one rayon task per
//     row.
//
// `separable_convolve` works on `f32` planes so the edge detector can reuse it for its
// own fixed pre-smoothing without quantizing back to bytes in between.

use crate::core_modules::params::BlurParams;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::InvalidInput;
use rayon::prelude::*;

/// A normalized 1-D Gaussian of `size` taps (`size` must be odd).
pub fn gaussian_kernel_1d(size: usize, sigma: f32) -> Vec<f32> {
    debug_assert!(size % 2 == 1, "gaussian kernel size must be odd");
    let center = (size / 2) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = (i as isize - center) as f32;
            (-(x * x) / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    if sum > 0.0 {
        for weight in &mut kernel {
            *weight /= sum;
        }
    }
    kernel
}

/// Tail lengths up to this many taps are summed tap by tap; longer tails are integrated.
const DIRECT_TAIL_LIMIT: u64 = 1 << 16;
/// Even panel count for the Simpson integration of long tails.
const TAIL_PANELS: u64 = 4096;

/// The `size`-tap Gaussian of `sigma`, truncated to `max_radius` taps per side.
///
/// Under clamp-to-edge sampling every tap further out than `max_radius` (at least
/// `max(width, height) - 1`) reads the same sample as the tap at `max_radius`, so the
/// weight of the dropped taps is folded into the two outermost taps. The filtered
/// result is the one the full kernel gives, but the kernel never outgrows the image.
pub(crate) fn clamped_gaussian_kernel(size: u32, sigma: f32, max_radius: usize) -> Vec<f32> {
    let radius = u64::from(size / 2);
    let max_radius = max_radius as u64;
    if radius <= max_radius {
        return gaussian_kernel_1d(size as usize, sigma);
    }

    let sigma = f64::from(sigma);
    let weight = |d: f64| (-(d * d) / (2.0 * sigma * sigma)).exp();

    let mut kernel: Vec<f64> = (0..=2 * max_radius)
        .map(|i| weight(i as f64 - max_radius as f64))
        .collect();
    let tail = tail_mass(max_radius + 1, radius, &weight);
    let last = kernel.len() - 1;
    kernel[0] += tail;
    kernel[last] += tail;

    let sum: f64 = kernel.iter().sum();
    kernel.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Sum of `weight(d)` for integer `d` in `first..=last`.
fn tail_mass(first: u64, last: u64, weight: &impl Fn(f64) -> f64) -> f64 {
    if last < first {
        return 0.0;
    }
    if last - first < DIRECT_TAIL_LIMIT {
        return (first..=last).map(|d| weight(d as f64)).sum();
    }

    // Long tails only occur with sigma = k / 6 far above one tap, where the sum over
    // unit steps equals the integral over [first - 0.5, last + 0.5].
    let a = first as f64 - 0.5;
    let b = last as f64 + 0.5;
    let h = (b - a) / TAIL_PANELS as f64;
    let inner: f64 = (1..TAIL_PANELS)
        .map(|i| {
            let coefficient = if i % 2 == 1 { 4.0 } else { 2.0 };
            coefficient * weight(a + i as f64 * h)
        })
        .sum();
    (weight(a) + weight(b) + inner) * h / 3.0
}

#[inline]
fn clamp_to_edge(coord: isize, len: usize) -> usize {
    coord.clamp(0, len as isize - 1) as usize
}

/// Convolves an interleaved `width * height * channels` plane with `kernel` along x,
/// then along y, replicating edge samples.
pub(crate) fn separable_convolve(
    input: &[f32],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let stride = width * channels;

    let mut horizontal = vec![0.0f32; input.len()];
    horizontal
        .par_chunks_mut(stride)
        .zip(input.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut acc = 0.0f32;
                    for (tap, &weight) in kernel.iter().enumerate() {
                        let sx = clamp_to_edge(x as isize + tap as isize - radius, width);
                        acc += weight * in_row[sx * channels + c];
                    }
                    out_row[x * channels + c] = acc;
                }
            }
        });

    let mut vertical = vec![0.0f32; input.len()];
    vertical
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (tap, &weight) in kernel.iter().enumerate() {
                let sy = clamp_to_edge(y as isize + tap as isize - radius, height);
                let src_row = &horizontal[sy * stride..(sy + 1) * stride];
                for (out, &sample) in out_row.iter_mut().zip(src_row) {
                    *out += weight * sample;
                }
            }
        });

    vertical
}

pub mod blur_filter {
    use super::*;

    /// Blurs `buf` with a Gaussian of size `kernel_size_raw | 1`. Dimensions and format
    /// are preserved.
    pub fn apply(buf: &PixelBuffer, kernel_size_raw: u32) -> Result<PixelBuffer, InvalidInput> {
        buf.ensure_not_empty()?;

        let params = BlurParams::new(kernel_size_raw);
        let size = params.kernel_size();
        if size == 1 {
            return Ok(buf.clone());
        }

        let longest_side = buf.width().max(buf.height()) as usize;
        let kernel = clamped_gaussian_kernel(size, params.sigma(), longest_side - 1);
        let input: Vec<f32> = buf.samples().iter().map(|&v| f32::from(v)).collect();
        let blurred = separable_convolve(
            &input,
            buf.width() as usize,
            buf.height() as usize,
            buf.channels(),
            &kernel,
        );

        let samples: Vec<u8> = blurred
            .par_iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        PixelBuffer::new(buf.width(), buf.height(), buf.format(), samples)
    }
}

#[cfg(test)]
mod tests {
    use super::blur_filter::apply;
    use super::*;
    use crate::core_modules::pixel_buffer::PixelFormat;

    fn checkerboard(width: u32, height: u32, format: PixelFormat) -> PixelBuffer {
        let channels = format.channels();
        let mut samples = Vec::with_capacity(width as usize * height as usize * channels);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 0u8 } else { 200u8 };
                for c in 0..channels {
                    samples.push(v.saturating_add(c as u8 * 20));
                }
            }
        }
        PixelBuffer::new(width, height, format, samples).unwrap()
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel_1d(7, 7.0 / 6.0);
        assert_eq!(kernel.len(), 7);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..3 {
            assert!((kernel[i] - kernel[6 - i]).abs() < 1e-7);
            assert!(kernel[i] < kernel[i + 1]);
        }
    }

    #[test]
    fn size_one_is_identity() {
        let buf = checkerboard(9, 5, PixelFormat::Bgr8);
        let out = apply(&buf, 1).unwrap();
        assert_eq!(out.samples(), buf.samples());
        // 0 coerces to 1 as well.
        assert_eq!(apply(&buf, 0).unwrap().samples(), buf.samples());
    }

    #[test]
    fn preserves_shape_for_odd_and_even_sizes() {
        for format in [PixelFormat::Gray8, PixelFormat::Bgr8] {
            let buf = checkerboard(13, 7, format);
            for raw in 1..=12 {
                let out = apply(&buf, raw).unwrap();
                assert_eq!(out.width(), 13);
                assert_eq!(out.height(), 7);
                assert_eq!(out.format(), format);
                assert_eq!(out.samples().len(), buf.samples().len());
            }
        }
    }

    #[test]
    fn even_size_matches_next_odd() {
        let buf = checkerboard(11, 11, PixelFormat::Gray8);
        assert_eq!(apply(&buf, 4).unwrap(), apply(&buf, 5).unwrap());
    }

    #[test]
    fn uniform_buffer_is_unchanged_including_borders() {
        let buf = PixelBuffer::uniform(16, 9, PixelFormat::Bgr8, &[40, 90, 200]).unwrap();
        let out = apply(&buf, 15).unwrap();
        assert_eq!(out.samples(), buf.samples());
    }

    #[test]
    fn smooths_towards_the_mean() {
        let buf = checkerboard(20, 20, PixelFormat::Gray8);
        let out = apply(&buf, 9).unwrap();
        let center = out.pixel(10, 10).unwrap()[0];
        assert!((80..=120).contains(&center), "center was {center}");
    }

    #[test]
    fn channels_are_filtered_independently() {
        // Blue varies, green and red are constant.
        let mut samples = Vec::new();
        for x in 0..10u8 {
            samples.extend_from_slice(&[x * 25, 100, 50]);
        }
        let buf = PixelBuffer::new(10, 1, PixelFormat::Bgr8, samples).unwrap();
        let out = apply(&buf, 5).unwrap();
        for px in out.samples().chunks_exact(3) {
            assert_eq!(px[1], 100);
            assert_eq!(px[2], 50);
        }
    }

    #[test]
    fn rejects_empty_buffer() {
        let empty = PixelBuffer::new(0, 3, PixelFormat::Bgr8, Vec::<u8>::new()).unwrap();
        assert!(matches!(apply(&empty, 5), Err(InvalidInput::EmptyBuffer { .. })));
    }

    #[test]
    fn largest_kernel_on_a_tiny_frame() {
        let buf = PixelBuffer::uniform(2, 2, PixelFormat::Bgr8, &[10, 20, 30]).unwrap();
        let out = apply(&buf, u32::MAX).unwrap();
        assert_eq!(out, buf);

        // A near-flat Gaussian spread over a 3-pixel row averages the two clamped ends.
        let ramp = PixelBuffer::new(3, 1, PixelFormat::Gray8, vec![0u8, 90, 180]).unwrap();
        let out = apply(&ramp, u32::MAX).unwrap();
        for &v in out.samples() {
            assert!((89..=91).contains(&v), "sample was {v}");
        }
    }

    #[test]
    fn truncated_kernel_matches_the_full_kernel() {
        let (width, height) = (4usize, 3usize);
        let input: Vec<f32> = (0..width * height).map(|i| ((i * 53) % 256) as f32).collect();
        let sigma = 21.0 / 6.0;

        let full = gaussian_kernel_1d(21, sigma);
        let folded = clamped_gaussian_kernel(21, sigma, 3);
        assert_eq!(folded.len(), 7);
        assert!((folded.iter().sum::<f32>() - 1.0).abs() < 1e-5);

        let expected = separable_convolve(&input, width, height, 1, &full);
        let actual = separable_convolve(&input, width, height, 1, &folded);
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-3, "{a} vs {e}");
        }
    }

    #[test]
    fn long_tails_are_integrated_accurately() {
        let sigma = 50_000.0f64;
        let weight = |d: f64| (-(d * d) / (2.0 * sigma * sigma)).exp();
        let exact: f64 = (10..=200_000u64).map(|d| weight(d as f64)).sum();
        let integrated = tail_mass(10, 200_000, &weight);
        assert!((integrated - exact).abs() / exact < 1e-6);
    }
}
