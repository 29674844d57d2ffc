// Example runner for the `frame_vision` library.
//
// Opens a synthetic frame source, pushes every frame through the pipeline with the
// tunables from the environment (`FV_*`, see `config.rs`) and logs a one-line summary
// per frame. Pass `--parallel` to use the async worker pool instead of the synchronous
// pipeline. Set `RUST_LOG=debug` for per-stage timings.

use std::env;

use anyhow::Context;
use frame_vision::frame_source::{FrameSource, SyntheticSource};
use frame_vision::parallel_pipeline::ParallelPipeline;
use frame_vision::{FrameOutputs, FramePipeline, PipelineConfig};
use log::{info, warn};

const DEFAULT_DEMO_FRAMES: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env().context("reading FV_* configuration")?;
    let parallel = env::args().skip(1).any(|arg| arg == "--parallel");
    info!("frame_vision example runner ({config:?}, parallel={parallel})");

    let mut source = SyntheticSource::new(config.frame_width, config.frame_height)
        .with_frame_limit(config.frame_limit.unwrap_or(DEFAULT_DEMO_FRAMES));
    source.open().context("opening frame source")?;

    if parallel {
        run_parallel(&mut source, &config).await?;
    } else {
        run_sequential(&mut source, &config)?;
    }

    source.close();
    info!("processing complete after {} frames", source.frames_emitted());
    Ok(())
}

fn run_sequential(source: &mut SyntheticSource, config: &PipelineConfig) -> anyhow::Result<()> {
    let pipeline = FramePipeline::new(config.params);
    let mut frame_index = 0u64;

    while let Some(frame) = source.read_frame()? {
        match pipeline.process(&frame) {
            Ok(outputs) => report(frame_index, &outputs),
            Err(err) => warn!("skipping frame {frame_index}: {err}"),
        }
        frame_index += 1;
    }
    Ok(())
}

async fn run_parallel(source: &mut SyntheticSource, config: &PipelineConfig) -> anyhow::Result<()> {
    let pipeline = ParallelPipeline::new(config);
    info!("worker pool running {} workers", pipeline.worker_count());

    while let Some(frame) = source.read_frame()? {
        match pipeline.process_frame(frame, config.params).await {
            Ok(analysis) => {
                if Some(analysis.frame_id) != pipeline.latest_frame_id() {
                    warn!("discarding superseded frame {}", analysis.frame_id);
                    continue;
                }
                report(analysis.frame_id, &analysis.outputs);
            }
            Err(err) => warn!("skipping frame: {err}"),
        }
    }

    pipeline.shutdown().await;
    Ok(())
}

fn report(frame_index: u64, outputs: &FrameOutputs) {
    let edge_pixels = outputs.edges.samples().iter().filter(|&&v| v > 0).count();
    info!(
        "frame {frame_index}: {}x{}, histogram peak {} ({} px), {} edge px",
        outputs.original.width(),
        outputs.original.height(),
        outputs.histogram.peak(),
        outputs.histogram.count(outputs.histogram.peak()),
        edge_pixels
    );
}
