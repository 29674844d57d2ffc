// THEORY:
// Tunables arrive from continuous user controls (sliders) and change between frames.
// They are plain values passed into each pipeline call; nothing here is remembered
// across frames. Out-of-range combinations are normalized instead of rejected so that
// a live frame loop is never interrupted by a slider position.

/// Default blur kernel, matching the blur slider's starting position.
pub const DEFAULT_BLUR_KERNEL: u32 = 5;
/// Default lower hysteresis threshold.
pub const DEFAULT_EDGE_LOW: u8 = 50;
/// Default upper hysteresis threshold.
pub const DEFAULT_EDGE_HIGH: u8 = 150;

/// Gaussian blur kernel size. Always odd and at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlurParams {
    kernel_size: u32,
}

impl BlurParams {
    /// Coerces an even raw size up to the next odd value (`raw | 1`), so 0 becomes 1.
    pub const fn new(kernel_size_raw: u32) -> Self {
        Self {
            kernel_size: kernel_size_raw | 1,
        }
    }

    pub const fn kernel_size(self) -> u32 {
        self.kernel_size
    }

    /// Standard deviation used for the kernel: `k / 6`, never below 0.5.
    pub fn sigma(self) -> f32 {
        (self.kernel_size as f32 / 6.0).max(0.5)
    }
}

impl Default for BlurParams {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_KERNEL)
    }
}

/// Hysteresis thresholds for edge detection, kept exactly as the caller supplied them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeParams {
    pub low_threshold: u8,
    pub high_threshold: u8,
}

impl EdgeParams {
    pub const fn new(low_threshold: u8, high_threshold: u8) -> Self {
        Self {
            low_threshold,
            high_threshold,
        }
    }

    /// `(min, max)` of the two thresholds, whatever order they were given in.
    pub fn normalized(self) -> (u8, u8) {
        let low = self.low_threshold.min(self.high_threshold);
        let high = self.low_threshold.max(self.high_threshold);
        (low, high)
    }
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_LOW, DEFAULT_EDGE_HIGH)
    }
}

/// Everything one pipeline call needs besides the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameParams {
    pub blur: BlurParams,
    pub edge: EdgeParams,
}

impl FrameParams {
    pub const fn new(blur_kernel: u32, edge_low: u8, edge_high: u8) -> Self {
        Self {
            blur: BlurParams::new(blur_kernel),
            edge: EdgeParams::new(edge_low, edge_high),
        }
    }
}
