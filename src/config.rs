// src/config.rs
//! Runtime configuration read from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::jobs::JobLimits;
use crate::metrics::CostModel;
use crate::stages::segmenter::DEFAULT_MAX_SEGMENT_LENGTH;

/// One year; longer TTLs are rejected
pub const MAX_JOB_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub limits: JobLimits,
    /// Terminal jobs older than this are evicted; `None` keeps them forever
    pub job_ttl_hours: Option<i64>,
    pub max_segment_length: usize,
    pub cost: CostModel,
    pub eleven_labs_api_key: Option<String>,
    pub eleven_labs_voice_id: Option<String>,
    pub pexels_api_key: Option<String>,
    pub background_music_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = JobLimits::default();
        let cost = CostModel::default();

        let max_concurrent = parse_or("MAX_CONCURRENT_JOBS", get("MAX_CONCURRENT_JOBS"), defaults.max_concurrent)?;
        let max_pending = parse_or("MAX_PENDING_JOBS", get("MAX_PENDING_JOBS"), defaults.max_pending)?;
        if max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_JOBS",
                value: "0".to_string(),
            });
        }
        if max_pending == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_PENDING_JOBS",
                value: "0".to_string(),
            });
        }

        let job_ttl_hours = match get("JOB_TTL_HOURS") {
            Some(raw) => {
                let hours: i64 = parse("JOB_TTL_HOURS", &raw)?;
                if hours <= 0 || hours > MAX_JOB_TTL_HOURS {
                    return Err(ConfigError::Invalid { key: "JOB_TTL_HOURS", value: raw });
                }
                Some(hours)
            }
            None => None,
        };

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("outputs")),
            work_dir: get("WORK_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("work")),
            limits: JobLimits {
                max_concurrent,
                max_pending,
            },
            job_ttl_hours,
            max_segment_length: parse_or("MAX_SEGMENT_LENGTH", get("MAX_SEGMENT_LENGTH"), DEFAULT_MAX_SEGMENT_LENGTH)?,
            cost: CostModel {
                per_second_rate: parse_or("COST_PER_SECOND", get("COST_PER_SECOND"), cost.per_second_rate)?,
                per_image_rate: parse_or("COST_PER_IMAGE", get("COST_PER_IMAGE"), cost.per_image_rate)?,
            },
            eleven_labs_api_key: get("ELEVEN_LABS_API_KEY"),
            eleven_labs_voice_id: get("ELEVEN_LABS_VOICE_ID"),
            pexels_api_key: get("PEXELS_API_KEY"),
            background_music_path: get("BACKGROUND_MUSIC_PATH").map(PathBuf::from),
        })
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}
