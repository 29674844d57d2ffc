// THEORY:
// `PipelineConfig` bundles the default tunables, the size of the async worker pool and
// the example runner's frame settings. Defaults mirror the starting slider positions
// (blur 5, edges 50/150). Any field can be overridden through `FV_*` environment
// variables; parsing goes through a lookup function so tests never touch the real
// process environment.

use std::str::FromStr;

use crate::core_modules::params::{BlurParams, EdgeParams, FrameParams};

pub const ENV_BLUR_KERNEL: &str = "FV_BLUR_KERNEL";
pub const ENV_EDGE_LOW: &str = "FV_EDGE_LOW";
pub const ENV_EDGE_HIGH: &str = "FV_EDGE_HIGH";
pub const ENV_WORKERS: &str = "FV_WORKERS";
pub const ENV_FRAME_LIMIT: &str = "FV_FRAME_LIMIT";
pub const ENV_FRAME_WIDTH: &str = "FV_FRAME_WIDTH";
pub const ENV_FRAME_HEIGHT: &str = "FV_FRAME_HEIGHT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is not a valid value")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Configuration for the pipelines and the example runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Tunables applied until the caller changes them.
    pub params: FrameParams,
    /// Workers in the async pool. 0 means one per CPU.
    pub worker_count: usize,
    /// Stop after this many frames; `None` runs until the source runs dry.
    pub frame_limit: Option<u64>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            params: FrameParams::default(),
            worker_count: 0,
            frame_limit: None,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Starts from the defaults and applies every key `lookup` resolves.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(kernel) = parse::<u32>(&lookup, ENV_BLUR_KERNEL)? {
            config.params.blur = BlurParams::new(kernel);
        }
        let edge = config.params.edge;
        let low = parse::<u8>(&lookup, ENV_EDGE_LOW)?.unwrap_or(edge.low_threshold);
        let high = parse::<u8>(&lookup, ENV_EDGE_HIGH)?.unwrap_or(edge.high_threshold);
        config.params.edge = EdgeParams::new(low, high);

        if let Some(workers) = parse::<usize>(&lookup, ENV_WORKERS)? {
            config.worker_count = workers;
        }
        if let Some(limit) = parse::<u64>(&lookup, ENV_FRAME_LIMIT)? {
            config.frame_limit = Some(limit);
        }
        if let Some(width) = parse::<u32>(&lookup, ENV_FRAME_WIDTH)? {
            config.frame_width = non_zero(ENV_FRAME_WIDTH, width)?;
        }
        if let Some(height) = parse::<u32>(&lookup, ENV_FRAME_HEIGHT)? {
            config.frame_height = non_zero(ENV_FRAME_HEIGHT, height)?;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn non_zero(key: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}
