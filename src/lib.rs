// THEORY:
// This file is the entry point for the `frame_vision` library crate. It exposes the
// per-frame transformation pipeline as a small public API: a `PixelBuffer` goes in,
// and four derived views plus a grayscale histogram come out.
//
// The stage implementations (`core_modules`) are pure functions over immutable
// buffers. The two orchestrators (`pipeline` for the synchronous path and
// `parallel_pipeline` for the async worker pool) are the only places that know the
// order in which stages run. Everything a live application owns (camera, sliders,
// display) stays outside and talks to the crate through `FrameSource`, `FrameParams`
// and `FrameOutputs`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame_source;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::PipelineConfig;
pub use core_modules::histogram::Histogram;
pub use core_modules::params::{BlurParams, EdgeParams, FrameParams};
pub use core_modules::pixel_buffer::{PixelBuffer, PixelFormat};
pub use error::{InvalidInput, PipelineError, Stage};
pub use pipeline::{FrameOutputs, FramePipeline, process_frame};
