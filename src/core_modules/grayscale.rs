// THEORY:
// The grayscale converter reduces a 3-channel frame to a single luma channel using the
// Rec. 601 weights (0.299 R + 0.587 G + 0.114 B). Which byte is red and which is blue
// comes from the buffer's `PixelFormat`, so BGR capture frames and RGB images both
// weight the right channel. It is a stateless utility with no memory of past frames.
//
// The weighted sum is done in integer thousandths with a +500 bias, which is exactly
// `round(luma)` with halves rounding up and can never exceed 255.

use crate::core_modules::pixel_buffer::{PixelBuffer, PixelFormat};
use crate::error::InvalidInput;

pub mod grayscale_converter {
    use super::*;
    use rayon::prelude::*;

    const RED_WEIGHT: u32 = 299;
    const GREEN_WEIGHT: u32 = 587;
    const BLUE_WEIGHT: u32 = 114;
    const WEIGHT_SCALE: u32 = 1000;

    /// Luma of one pixel given its red, green and blue samples.
    #[inline]
    pub fn luma(red: u8, green: u8, blue: u8) -> u8 {
        let weighted = RED_WEIGHT * u32::from(red)
            + GREEN_WEIGHT * u32::from(green)
            + BLUE_WEIGHT * u32::from(blue);
        ((weighted + WEIGHT_SCALE / 2) / WEIGHT_SCALE) as u8
    }

    /// Converts a 3-channel buffer to a 1-channel luma buffer of the same size.
    pub fn convert(buf: &PixelBuffer) -> Result<PixelBuffer, InvalidInput> {
        buf.ensure_not_empty()?;
        buf.ensure_channels(3)?;
        let (r, g, b) = buf.format().rgb_offsets().ok_or(InvalidInput::ChannelMismatch {
            expected: 3,
            actual: buf.channels(),
        })?;

        let samples: Vec<u8> = buf
            .samples()
            .par_chunks_exact(3)
            .map(|px| luma(px[r], px[g], px[b]))
            .collect();

        PixelBuffer::new(buf.width(), buf.height(), PixelFormat::Gray8, samples)
    }
}
