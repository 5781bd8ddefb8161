// src/backends/mod.rs
//! Concrete stage backends: external services, ffmpeg, and offline stand-ins.

pub mod elevenlabs;
pub mod ffmpeg;
pub mod music;
pub mod offline;
pub mod pexels;

pub use elevenlabs::ElevenLabsClient;
pub use ffmpeg::FfmpegCompositionBackend;
pub use music::FileMusicProvider;
pub use offline::{DisabledImageBackend, SilentNarrationBackend};
pub use pexels::PexelsClient;
