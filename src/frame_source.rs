// THEORY:
// A `FrameSource` is the seam between the pipeline and whatever produces frames. Real
// capture devices live outside this crate; they only need to implement the trait. The
// lifecycle mirrors a capture device: `open`, then `read_frame` once per tick, then
// `close`. Reading before `open` is a caller bug and fails loudly.
//
// `SyntheticSource` is a deterministic stand-in that renders a BGR test pattern (a
// colour gradient with a white bar sliding across it). It drives the example runner and
// the integration tests.

use log::debug;

use crate::core_modules::pixel_buffer::{PixelBuffer, PixelFormat};
use crate::error::InvalidInput;

#[derive(Debug, thiserror::Error)]
pub enum FrameSourceError {
    #[error("frame source is not opened; call open() first")]
    NotOpened,

    #[error("frame source produced an invalid frame: {0}")]
    InvalidFrame(#[from] InvalidInput),
}

pub trait FrameSource {
    fn open(&mut self) -> Result<(), FrameSourceError>;

    /// The next frame, or `None` when no frame is available.
    fn read_frame(&mut self) -> Result<Option<PixelBuffer>, FrameSourceError>;

    fn close(&mut self);

    fn is_opened(&self) -> bool;
}

/// Renders a moving BGR test pattern.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frames_emitted: u64,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_limit: None,
            frames_emitted: 0,
            opened: false,
        }
    }

    /// Stop producing frames after `limit` reads.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    fn render(&self, frame_index: u64) -> Result<PixelBuffer, InvalidInput> {
        let (w, h) = (self.width as u64, self.height as u64);
        let bar_width = (w / 8).max(1);
        let bar_start = (frame_index * 4) % w.max(1);

        let mut samples = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let in_bar = x >= bar_start && x < bar_start + bar_width;
                if in_bar {
                    samples.extend_from_slice(&[255, 255, 255]);
                } else {
                    let blue = (x * 255 / w.max(1)) as u8;
                    let green = (y * 255 / h.max(1)) as u8;
                    samples.extend_from_slice(&[blue, green, 40]);
                }
            }
        }
        PixelBuffer::new(self.width, self.height, PixelFormat::Bgr8, samples)
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<(), FrameSourceError> {
        debug!("synthetic source opened at {}x{}", self.width, self.height);
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<PixelBuffer>, FrameSourceError> {
        if !self.opened {
            return Err(FrameSourceError::NotOpened);
        }
        if self.frame_limit.is_some_and(|limit| self.frames_emitted >= limit) {
            return Ok(None);
        }
        let frame = self.render(self.frames_emitted)?;
        self.frames_emitted += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if self.opened {
            debug!("synthetic source closed after {} frames", self.frames_emitted);
        }
        self.opened = false;
    }

    fn is_opened(&self) -> bool {
        self.opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_before_open_fails() {
        let mut source = SyntheticSource::new(8, 8);
        assert!(matches!(source.read_frame(), Err(FrameSourceError::NotOpened)));
    }

    #[test]
    fn open_read_close_lifecycle() {
        let mut source = SyntheticSource::new(16, 12);
        source.open().unwrap();
        assert!(source.is_opened());

        let frame = source.read_frame().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 12));
        assert_eq!(frame.format(), PixelFormat::Bgr8);

        source.close();
        assert!(!source.is_opened());
        assert!(matches!(source.read_frame(), Err(FrameSourceError::NotOpened)));
    }

    #[test]
    fn frame_limit_ends_the_stream() {
        let mut source = SyntheticSource::new(8, 4).with_frame_limit(2);
        source.open().unwrap();
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
        assert_eq!(source.frames_emitted(), 2);
    }

    #[test]
    fn the_bar_moves_between_frames() {
        let mut source = SyntheticSource::new(64, 8);
        source.open().unwrap();
        let first = source.read_frame().unwrap().unwrap();
        let second = source.read_frame().unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(first.pixel(0, 0), Some(&[255u8, 255, 255][..]));
        assert_eq!(second.pixel(4, 0), Some(&[255u8, 255, 255][..]));
    }

    #[test]
    fn zero_sized_source_yields_empty_frames() {
        let mut source = SyntheticSource::new(0, 10);
        source.open().unwrap();
        let frame = source.read_frame().unwrap().unwrap();
        assert!(frame.is_empty());
    }
}
