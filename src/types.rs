// types.rs - Common data structures shared by the pipeline, jobs and handlers
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::JobError;

/// Unique identifier for a generation job
pub type JobId = String;

/// Narrative tone of the generated video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Emotional,
    Documentary,
    Informative,
    Persuasive,
}

/// Subject area of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Education,
    Health,
    Governance,
    Entertainment,
    News,
    Corporate,
}

/// Visual setting used when prompting for scene images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Rural,
    Urban,
    Futuristic,
    Nature,
    Indoors,
    Studio,
    Classroom,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Formal,
        Tone::Casual,
        Tone::Emotional,
        Tone::Documentary,
        Tone::Informative,
        Tone::Persuasive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Emotional => "emotional",
            Tone::Documentary => "documentary",
            Tone::Informative => "informative",
            Tone::Persuasive => "persuasive",
        }
    }
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Education,
        Domain::Health,
        Domain::Governance,
        Domain::Entertainment,
        Domain::News,
        Domain::Corporate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Education => "education",
            Domain::Health => "health",
            Domain::Governance => "governance",
            Domain::Entertainment => "entertainment",
            Domain::News => "news",
            Domain::Corporate => "corporate",
        }
    }
}

impl Environment {
    pub const ALL: [Environment; 7] = [
        Environment::Rural,
        Environment::Urban,
        Environment::Futuristic,
        Environment::Nature,
        Environment::Indoors,
        Environment::Studio,
        Environment::Classroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Rural => "rural",
            Environment::Urban => "urban",
            Environment::Futuristic => "futuristic",
            Environment::Nature => "nature",
            Environment::Indoors => "indoors",
            Environment::Studio => "studio",
            Environment::Classroom => "classroom",
        }
    }
}

// Parsing goes through the ALL tables so the accepted spellings never drift
// from what `as_str` reports.
macro_rules! impl_enum_text {
    ($ty:ident, $label:literal) => {
        impl FromStr for $ty {
            type Err = JobError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim().to_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str() == wanted)
                    .ok_or_else(|| {
                        JobError::InvalidConfig(format!("unknown {}: '{}'", $label, value))
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_enum_text!(Tone, "tone");
impl_enum_text!(Domain, "domain");
impl_enum_text!(Environment, "environment");

/// Output frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Longest edge accepted for a frame (8K)
pub const MAX_DIMENSION: u32 = 7680;
/// Pixel budget for one frame, 7680x4320
pub const MAX_PIXELS: u64 = 7680 * 4320;
pub const MAX_FPS: u32 = 120;
pub const MAX_DURATION_SECONDS: u32 = 3600;

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Both edges positive and the frame fits in 8K, either orientation
    pub fn is_supported(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.width <= MAX_DIMENSION
            && self.height <= MAX_DIMENSION
            && self.pixel_count() <= MAX_PIXELS
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Immutable per-job configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub tone: Tone,
    pub domain: Domain,
    pub environment: Environment,
    pub duration_seconds: u32,
    pub fps: u32,
    pub resolution: Resolution,
    pub language: String,
    pub include_subtitles: bool,
    pub include_background_music: bool,
    /// Reserved; no avatar stage exists yet.
    pub avatar_narration: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            tone: Tone::Formal,
            domain: Domain::Education,
            environment: Environment::Studio,
            duration_seconds: 30,
            fps: 24,
            resolution: Resolution::default(),
            language: "en".to_string(),
            include_subtitles: true,
            include_background_music: false,
            avatar_narration: false,
        }
    }
}

impl VideoConfig {
    /// Check the numeric invariants. Called by the job manager before a job exists.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.duration_seconds == 0 || self.duration_seconds > MAX_DURATION_SECONDS {
            return Err(JobError::InvalidConfig(format!(
                "duration must be between 1 and {} seconds, got {}",
                MAX_DURATION_SECONDS, self.duration_seconds
            )));
        }
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(JobError::InvalidConfig(format!(
                "fps must be between 1 and {}, got {}",
                MAX_FPS, self.fps
            )));
        }
        if !self.resolution.is_supported() {
            return Err(JobError::InvalidConfig(format!(
                "resolution must be positive and at most {}x{}, got {}",
                MAX_DIMENSION, MAX_PIXELS / MAX_DIMENSION as u64, self.resolution
            )));
        }
        if self.language.trim().is_empty() {
            return Err(JobError::InvalidConfig(
                "language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Length of one frame in seconds.
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

/// Metrics captured once a video has been composed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub inference_time: f64,
    pub memory_usage: f64,
    pub gpu_usage: f64,
    pub frame_rate: f64,
    pub scene_fidelity_score: f64,
    pub generation_cost: f64,
}

/// One ordered piece of the input text. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub index: usize,
    pub text: String,
}

/// Transport-agnostic submission payload. Every field except `text` is optional
/// and falls back to the `VideoConfig` default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub text: Option<String>,
    pub tone: Option<String>,
    pub domain: Option<String>,
    pub environment: Option<String>,
    pub duration: Option<i64>,
    pub fps: Option<i64>,
    pub resolution: Option<Vec<i64>>,
    pub language: Option<String>,
    pub include_subtitles: Option<bool>,
    pub include_background_music: Option<bool>,
    pub avatar_narration: Option<bool>,
}

impl GenerationRequest {
    /// Parse into the text and a typed configuration.
    ///
    /// Unknown enum spellings and non-positive numbers become `InvalidConfig`.
    /// Emptiness of the text is checked by `JobManager::submit`.
    pub fn into_parts(self) -> Result<(String, VideoConfig), JobError> {
        let text = self
            .text
            .ok_or_else(|| JobError::InvalidConfig("text is required".to_string()))?;

        let defaults = VideoConfig::default();
        let tone = match self.tone {
            Some(tone) => tone.parse()?,
            None => defaults.tone,
        };
        let domain = match self.domain {
            Some(domain) => domain.parse()?,
            None => defaults.domain,
        };
        let environment = match self.environment {
            Some(environment) => environment.parse()?,
            None => defaults.environment,
        };

        let duration_seconds = positive_u32("duration", self.duration, defaults.duration_seconds)?;
        let fps = positive_u32("fps", self.fps, defaults.fps)?;

        let resolution = match self.resolution {
            None => defaults.resolution,
            Some(dims) => match dims.as_slice() {
                [width, height] => Resolution::new(
                    positive_u32("resolution width", Some(*width), 0)?,
                    positive_u32("resolution height", Some(*height), 0)?,
                ),
                _ => {
                    return Err(JobError::InvalidConfig(
                        "resolution must be [width, height]".to_string(),
                    ))
                }
            },
        };

        let config = VideoConfig {
            tone,
            domain,
            environment,
            duration_seconds,
            fps,
            resolution,
            language: self.language.unwrap_or(defaults.language),
            include_subtitles: self.include_subtitles.unwrap_or(defaults.include_subtitles),
            include_background_music: self
                .include_background_music
                .unwrap_or(defaults.include_background_music),
            avatar_narration: self.avatar_narration.unwrap_or(defaults.avatar_narration),
        };

        Ok((text, config))
    }
}

fn positive_u32(field: &str, value: Option<i64>, default: u32) -> Result<u32, JobError> {
    match value {
        None => Ok(default),
        Some(v) if v > 0 && v <= u32::MAX as i64 => Ok(v as u32),
        Some(v) => Err(JobError::InvalidConfig(format!(
            "{} must be a positive integer, got {}",
            field, v
        ))),
    }
}
