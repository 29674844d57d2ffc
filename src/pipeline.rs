// THEORY:
// The `pipeline` module is the top-level synchronous API. It takes one captured frame
// plus the caller's current tunables and returns every view the display needs for that
// frame. It holds no state between frames beyond the parameters the caller gave it.
//
// Stage order:
//   grayscale = convert(frame)
//   histogram = compute(grayscale)
//   blurred   = apply(frame, blur kernel)
//   edges     = detect(grayscale, low, high)
//
// A stage failure is never papered over: the first `InvalidInput` is returned as a
// `PipelineError` naming the stage, and the caller skips that frame.

use std::time::Instant;

use log::debug;

use crate::core_modules::blur::blur_filter;
use crate::core_modules::edge_detector::edge_detector;
use crate::core_modules::grayscale::grayscale_converter;
use crate::core_modules::histogram::{Histogram, histogram_aggregator};
use crate::core_modules::params::FrameParams;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::{PipelineError, Stage};

/// Everything derived from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutputs {
    /// The input frame, untouched.
    pub original: PixelBuffer,
    pub grayscale: PixelBuffer,
    pub blurred: PixelBuffer,
    /// Binary edge map: every sample is 0 or 255.
    pub edges: PixelBuffer,
    pub histogram: Histogram,
}

/// Runs all stages on `frame` with explicit tunables.
pub fn process_frame(
    frame: &PixelBuffer,
    blur_kernel: u32,
    edge_low: u8,
    edge_high: u8,
) -> Result<FrameOutputs, PipelineError> {
    FramePipeline::new(FrameParams::new(blur_kernel, edge_low, edge_high)).process(frame)
}

/// The synchronous frame pipeline. Holds only the caller's current tunables.
#[derive(Debug, Clone, Default)]
pub struct FramePipeline {
    params: FrameParams,
}

impl FramePipeline {
    pub fn new(params: FrameParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> FrameParams {
        self.params
    }

    /// Replaces the tunables used for subsequent frames (e.g. after a slider moved).
    pub fn set_params(&mut self, params: FrameParams) {
        self.params = params;
    }

    pub fn process(&self, frame: &PixelBuffer) -> Result<FrameOutputs, PipelineError> {
        Self::process_with(frame, self.params)
    }

    pub fn process_with(
        frame: &PixelBuffer,
        params: FrameParams,
    ) -> Result<FrameOutputs, PipelineError> {
        let started = Instant::now();

        // Stage 1: Luma reduction
        let grayscale =
            grayscale_converter::convert(frame).map_err(PipelineError::at(Stage::Grayscale))?;

        // Stage 2: Histogram of the luma view
        let histogram = histogram_aggregator::compute(&grayscale)
            .map_err(PipelineError::at(Stage::Histogram))?;

        // Stage 3: Caller-tuned blur of the colour frame
        let blurred = blur_filter::apply(frame, params.blur.kernel_size())
            .map_err(PipelineError::at(Stage::Blur))?;

        // Stage 4: Edge map of the luma view
        let (low, high) = (params.edge.low_threshold, params.edge.high_threshold);
        let edges = edge_detector::detect(&grayscale, low, high)
            .map_err(PipelineError::at(Stage::EdgeDetection))?;

        debug!(
            "processed {}x{} frame (blur k={}, edges {:?}) in {:?}",
            frame.width(),
            frame.height(),
            params.blur.kernel_size(),
            params.edge.normalized(),
            started.elapsed()
        );

        Ok(FrameOutputs {
            original: frame.clone(),
            grayscale,
            blurred,
            edges,
            histogram,
        })
    }
}
