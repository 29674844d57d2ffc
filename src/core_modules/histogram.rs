// THEORY:
// The histogram counts how often each of the 256 gray levels appears in a 1-channel
// buffer. Counting is commutative, so the buffer is split into row bands that are
// counted in parallel into private partial histograms and merged by summation. The
// result is identical to a sequential count.
//
// Invariant: the bins always sum to `width * height` of the source buffer.

use std::ops::Index;

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::InvalidInput;

/// Number of bins, one per 8-bit value.
pub const BINS: usize = 256;

/// Per-value pixel counts of a grayscale buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u64; BINS],
}

impl Histogram {
    pub fn bins(&self) -> &[u64; BINS] {
        &self.bins
    }

    pub fn count(&self, value: u8) -> u64 {
        self.bins[value as usize]
    }

    /// Total number of samples counted.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Most frequent value. The lowest value wins a tie.
    pub fn peak(&self) -> u8 {
        let mut best = 0usize;
        for (value, &count) in self.bins.iter().enumerate() {
            if count > self.bins[best] {
                best = value;
            }
        }
        best as u8
    }

    /// Fraction of samples in each bin.
    pub fn normalized(&self) -> [f64; BINS] {
        let total = self.total();
        if total == 0 {
            return [0.0; BINS];
        }
        self.bins.map(|count| count as f64 / total as f64)
    }

    /// Running sum of the bins; the last entry equals `total()`.
    pub fn cumulative(&self) -> [u64; BINS] {
        let mut running = 0u64;
        self.bins.map(|count| {
            running += count;
            running
        })
    }
}

impl Index<usize> for Histogram {
    type Output = u64;

    fn index(&self, value: usize) -> &u64 {
        &self.bins[value]
    }
}

pub mod histogram_aggregator {
    use super::*;
    use rayon::prelude::*;

    /// Counts every sample of a 1-channel buffer.
    pub fn compute(buf: &PixelBuffer) -> Result<Histogram, InvalidInput> {
        buf.ensure_not_empty()?;
        buf.ensure_channels(1)?;

        let bins = buf
            .samples()
            .par_chunks(buf.width() as usize)
            .fold(
                || [0u64; BINS],
                |mut partial, row| {
                    for &value in row {
                        partial[value as usize] += 1;
                    }
                    partial
                },
            )
            .reduce(
                || [0u64; BINS],
                |mut merged, partial| {
                    for (total, count) in merged.iter_mut().zip(partial.iter()) {
                        *total += count;
                    }
                    merged
                },
            );

        Ok(Histogram { bins })
    }
}
