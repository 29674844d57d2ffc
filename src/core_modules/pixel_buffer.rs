// THEORY:
// `PixelBuffer` is the data model every stage reads. It is a "dumb" container: a
// width, a height, a format that names what each interleaved byte means, and the
// samples themselves in row-major order.
//
// Key principles:
// 1.  **Immutability**: samples live behind an `Arc<[u8]>` and are never mutated after
//     construction. A stage that transforms a buffer allocates a new one. Cloning a
//     buffer (for example to hand the original frame through to the output) only bumps
//     a reference count.
// 2.  **Validated shape**: `samples.len() == width * height * channels` is checked at
//     construction and holds for the lifetime of the value.
// 3.  **Empty is representable**: a zero-width or zero-height buffer can exist, which is
//     how a failed capture arrives. Stages reject it with `InvalidInput::EmptyBuffer`.

use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::InvalidInput;

/// The byte layout of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One 8-bit luma sample.
    Gray8,
    /// Three 8-bit samples in blue, green, red order (what capture devices deliver).
    Bgr8,
    /// Three 8-bit samples in red, green, blue order.
    Rgb8,
}

impl PixelFormat {
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
        }
    }

    /// Byte offsets of the red, green and blue samples inside one pixel.
    pub const fn rgb_offsets(self) -> Option<(usize, usize, usize)> {
        match self {
            PixelFormat::Gray8 => None,
            PixelFormat::Bgr8 => Some((2, 1, 0)),
            PixelFormat::Rgb8 => Some((0, 1, 2)),
        }
    }
}

/// A rectangular grid of 8-bit samples with 1 or 3 interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// The width of the buffer in pixels.
    width: u32,
    /// The height of the buffer in pixels.
    height: u32,
    /// How the interleaved samples of one pixel are laid out.
    format: PixelFormat,
    /// Row-major samples, `width * height * format.channels()` long.
    samples: Arc<[u8]>,
}

impl PixelBuffer {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        samples: impl Into<Arc<[u8]>>,
    ) -> Result<Self, InvalidInput> {
        let samples = samples.into();
        let expected = Self::expected_len(width, height, format)?;
        if samples.len() != expected {
            return Err(InvalidInput::SampleLengthMismatch {
                width,
                height,
                channels: format.channels(),
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            samples,
        })
    }

    /// Builds a buffer where every pixel has the same value.
    pub fn uniform(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel: &[u8],
    ) -> Result<Self, InvalidInput> {
        if pixel.len() != format.channels() {
            return Err(InvalidInput::ChannelMismatch {
                expected: format.channels(),
                actual: pixel.len(),
            });
        }
        let len = Self::expected_len(width, height, format)?;
        let samples: Vec<u8> = pixel.iter().copied().cycle().take(len).collect();
        Self::new(width, height, format, samples)
    }

    fn expected_len(width: u32, height: u32, format: PixelFormat) -> Result<usize, InvalidInput> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(format.channels()))
            .ok_or(InvalidInput::DimensionsOverflow { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Samples of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * self.channels();
        let start = y as usize * stride;
        self.samples.get(start..start + stride)
    }

    /// Samples of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let channels = self.channels();
        let start = x as usize * channels;
        self.row(y).map(|row| &row[start..start + channels])
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<(), InvalidInput> {
        if self.is_empty() {
            return Err(InvalidInput::EmptyBuffer {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_channels(&self, expected: usize) -> Result<(), InvalidInput> {
        if self.channels() != expected {
            return Err(InvalidInput::ChannelMismatch {
                expected,
                actual: self.channels(),
            });
        }
        Ok(())
    }

    /// Copies a 1-channel buffer into an `image::GrayImage`.
    pub fn to_gray_image(&self) -> Result<GrayImage, InvalidInput> {
        self.ensure_channels(1)?;
        Ok(GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.samples[y as usize * self.width as usize + x as usize]])
        }))
    }

    /// Copies any buffer into an `image::RgbImage` for display. Gray expands to three
    /// equal channels and BGR is reordered to RGB.
    pub fn to_rgb_image(&self) -> RgbImage {
        let channels = self.channels();
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let start = (y as usize * self.width as usize + x as usize) * channels;
            let px = &self.samples[start..start + channels];
            match self.format.rgb_offsets() {
                Some((r, g, b)) => Rgb([px[r], px[g], px[b]]),
                None => Rgb([px[0], px[0], px[0]]),
            }
        })
    }
}

impl From<GrayImage> for PixelBuffer {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Gray8,
            samples: image.into_raw().into(),
        }
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            samples: image.into_raw().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_sample_length() {
        let err = PixelBuffer::new(2, 2, PixelFormat::Bgr8, vec![0u8; 11]).unwrap_err();
        assert_eq!(
            err,
            InvalidInput::SampleLengthMismatch {
                width: 2,
                height: 2,
                channels: 3,
                expected: 12,
                actual: 11,
            }
        );
    }

    #[test]
    fn empty_buffers_are_constructible_but_flagged() {
        let buf = PixelBuffer::new(0, 4, PixelFormat::Gray8, Vec::<u8>::new()).unwrap();
        assert!(buf.is_empty());
        assert_eq!(
            buf.ensure_not_empty(),
            Err(InvalidInput::EmptyBuffer { width: 0, height: 4 })
        );
    }

    #[test]
    fn uniform_repeats_the_pixel() {
        let buf = PixelBuffer::uniform(3, 2, PixelFormat::Bgr8, &[1, 2, 3]).unwrap();
        assert_eq!(buf.samples().len(), 18);
        assert_eq!(buf.pixel(2, 1), Some(&[1u8, 2, 3][..]));
        assert!(PixelBuffer::uniform(3, 2, PixelFormat::Gray8, &[1, 2]).is_err());
    }

    #[test]
    fn row_and_pixel_indexing() {
        let buf = PixelBuffer::new(2, 2, PixelFormat::Gray8, vec![10u8, 20, 30, 40]).unwrap();
        assert_eq!(buf.row(1), Some(&[30u8, 40][..]));
        assert_eq!(buf.pixel(1, 0), Some(&[20u8][..]));
        assert_eq!(buf.pixel(2, 0), None);
        assert_eq!(buf.row(2), None);
    }

    #[test]
    fn clones_share_storage() {
        let buf = PixelBuffer::uniform(64, 64, PixelFormat::Bgr8, &[9, 9, 9]).unwrap();
        let copy = buf.clone();
        assert!(std::ptr::eq(buf.samples().as_ptr(), copy.samples().as_ptr()));
    }

    #[test]
    fn bgr_exports_as_rgb() {
        let buf = PixelBuffer::new(1, 1, PixelFormat::Bgr8, vec![10u8, 20, 30]).unwrap();
        let rgb = buf.to_rgb_image();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([30, 20, 10]));
        assert!(buf.to_gray_image().is_err());
    }

    #[test]
    fn gray_image_round_trip_keeps_layout() {
        let gray = GrayImage::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as u8]));
        let buf = PixelBuffer::from(gray.clone());
        assert_eq!(buf.format(), PixelFormat::Gray8);
        assert_eq!(buf.pixel(2, 1), Some(&[12u8][..]));
        assert_eq!(buf.to_gray_image().unwrap(), gray);
    }
}
