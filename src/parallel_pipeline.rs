// THEORY:
// `ParallelPipeline` is the async counterpart of `FramePipeline`. It exists for live
// loops that want to keep capturing while earlier frames are still being processed.
//
// Architecture:
// 1.  **Dispatcher**: one task receives every submitted frame and hands it to the next
//     worker round-robin.
// 2.  **Workers**: each worker owns a queue. For a frame it runs the grayscale stage,
//     then fans histogram, blur and edge detection out as three concurrent blocking
//     tasks and joins them. The stages share nothing but read-only buffers, so the join
//     is the only synchronization.
// 3.  **Replies**: every task carries a oneshot sender. The caller awaits the receiver.
// 4.  **Frame ids**: each submission gets the next id from an atomic counter. A caller
//     that has moved on compares `frame_id` against `latest_frame_id()` and drops stale
//     results. There is no internal cancellation; a dropped receiver just means the
//     worker's reply goes nowhere.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

use crate::config::PipelineConfig;
use crate::core_modules::blur::blur_filter;
use crate::core_modules::edge_detector::edge_detector;
use crate::core_modules::grayscale::grayscale_converter;
use crate::core_modules::histogram::histogram_aggregator;
use crate::core_modules::params::FrameParams;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::{PipelineError, Stage};
use crate::pipeline::FrameOutputs;

#[derive(Debug, thiserror::Error)]
pub enum ParallelPipelineError {
    #[error(transparent)]
    Stage(#[from] PipelineError),

    #[error("worker pool is no longer accepting frames")]
    WorkerUnavailable,

    #[error("stage task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

/// The result of one frame, tagged with its submission order.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub frame_id: u64,
    pub outputs: FrameOutputs,
    /// Time from submission to completion, queueing included.
    pub elapsed: Duration,
}

struct FrameTask {
    frame_id: u64,
    frame: PixelBuffer,
    params: FrameParams,
    submitted: Instant,
    result_sender: oneshot::Sender<Result<FrameAnalysis, ParallelPipelineError>>,
}

pub(crate) struct WorkerPool {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers (at least one). Must be called inside a tokio
    /// runtime.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FrameTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    warn!("worker {worker_idx} is gone, dropping frame {}", task.frame_id);
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
            debug!("dispatcher stopped");
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker_idx, mut worker_receiver)| {
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let frame_id = task.frame_id;
                        let result = Self::run_stages(task.frame, task.params)
                            .await
                            .map(|outputs| FrameAnalysis {
                                frame_id,
                                outputs,
                                elapsed: task.submitted.elapsed(),
                            });
                        if let Err(err) = &result {
                            warn!("worker {worker_idx} failed frame {frame_id}: {err}");
                        }
                        if task.result_sender.send(result).is_err() {
                            debug!("frame {frame_id} finished after its caller went away");
                        }
                    }
                    debug!("worker {worker_idx} stopped");
                })
            })
            .collect();

        debug!("worker pool started with {worker_count} workers");

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    async fn run_stages(
        frame: PixelBuffer,
        params: FrameParams,
    ) -> Result<FrameOutputs, ParallelPipelineError> {
        let grayscale = {
            let frame = frame.clone();
            join_stage(tokio::task::spawn_blocking(move || {
                grayscale_converter::convert(&frame).map_err(PipelineError::at(Stage::Grayscale))
            }))
            .await?
        };

        let histogram_task = {
            let grayscale = grayscale.clone();
            tokio::task::spawn_blocking(move || {
                histogram_aggregator::compute(&grayscale)
                    .map_err(PipelineError::at(Stage::Histogram))
            })
        };
        let blur_task = {
            let frame = frame.clone();
            let kernel_size = params.blur.kernel_size();
            tokio::task::spawn_blocking(move || {
                blur_filter::apply(&frame, kernel_size).map_err(PipelineError::at(Stage::Blur))
            })
        };
        let edge_task = {
            let grayscale = grayscale.clone();
            let edge = params.edge;
            tokio::task::spawn_blocking(move || {
                edge_detector::detect(&grayscale, edge.low_threshold, edge.high_threshold)
                    .map_err(PipelineError::at(Stage::EdgeDetection))
            })
        };

        let (histogram, blurred, edges) = futures::try_join!(
            join_stage(histogram_task),
            join_stage(blur_task),
            join_stage(edge_task)
        )?;

        Ok(FrameOutputs {
            original: frame,
            grayscale,
            blurred,
            edges,
            histogram,
        })
    }

    fn submit(&self, task: FrameTask) -> Result<(), ParallelPipelineError> {
        self.task_sender
            .send(task)
            .map_err(|_| ParallelPipelineError::WorkerUnavailable)
    }

    /// Stops accepting frames and waits for queued frames to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn join_stage<T>(
    handle: JoinHandle<Result<T, PipelineError>>,
) -> Result<T, ParallelPipelineError> {
    Ok(handle.await??)
}

pub struct ParallelPipeline {
    worker_pool: WorkerPool,
    next_frame_id: AtomicU64,
}

impl ParallelPipeline {
    /// Builds the pool from `config.worker_count`; 0 means one worker per CPU.
    pub fn new(config: &PipelineConfig) -> Self {
        let worker_count = match config.worker_count {
            0 => num_cpus::get(),
            n => n,
        };
        Self {
            worker_pool: WorkerPool::new(worker_count),
            next_frame_id: AtomicU64::new(0),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// Id of the most recently submitted frame, if any.
    pub fn latest_frame_id(&self) -> Option<u64> {
        self.next_frame_id.load(Ordering::Acquire).checked_sub(1)
    }

    pub async fn process_frame(
        &self,
        frame: PixelBuffer,
        params: FrameParams,
    ) -> Result<FrameAnalysis, ParallelPipelineError> {
        let frame_id = self.next_frame_id.fetch_add(1, Ordering::AcqRel);
        let (result_sender, result_receiver) = oneshot::channel();

        self.worker_pool.submit(FrameTask {
            frame_id,
            frame,
            params,
            submitted: Instant::now(),
            result_sender,
        })?;

        result_receiver
            .await
            .map_err(|_| ParallelPipelineError::WorkerUnavailable)?
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}
