use std::fmt;

/// Raised by a stage (or by `PixelBuffer` construction) when the buffer it was
/// handed cannot be processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("buffer is empty ({width}x{height})")]
    EmptyBuffer { width: u32, height: u32 },

    #[error("expected {expected} channel(s), found {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("{width}x{height}x{channels} buffer needs {expected} samples, found {actual}")]
    SampleLengthMismatch {
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    #[error("dimensions {width}x{height} overflow the addressable sample count")]
    DimensionsOverflow { width: u32, height: u32 },
}

/// Identifies which pipeline stage rejected a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Grayscale,
    Histogram,
    Blur,
    EdgeDetection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Grayscale => "grayscale",
            Stage::Histogram => "histogram",
            Stage::Blur => "blur",
            Stage::EdgeDetection => "edge detection",
        };
        f.write_str(name)
    }
}

/// A stage failure, tagged with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} stage rejected the frame: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: InvalidInput,
}

impl PipelineError {
    pub fn new(stage: Stage, source: InvalidInput) -> Self {
        Self { stage, source }
    }

    /// Adapter for `map_err` at a stage call site.
    pub(crate) fn at(stage: Stage) -> impl FnOnce(InvalidInput) -> Self {
        move |source| Self::new(stage, source)
    }
}
