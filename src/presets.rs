// src/presets.rs
//! Built-in demo requests served by `POST /api/demo`.

use crate::types::{Domain, Environment, Tone, VideoConfig};

#[derive(Debug, Clone, Copy)]
pub struct DemoPreset {
    pub name: &'static str,
    pub text: &'static str,
    pub tone: Tone,
    pub domain: Domain,
    pub environment: Environment,
    pub duration_seconds: u32,
}

impl DemoPreset {
    pub fn config(&self) -> VideoConfig {
        VideoConfig {
            tone: self.tone,
            domain: self.domain,
            environment: self.environment,
            duration_seconds: self.duration_seconds,
            include_subtitles: true,
            ..VideoConfig::default()
        }
    }
}

pub const DEFAULT_PRESET: &str = "pib_release";

pub const PRESETS: [DemoPreset; 3] = [
    DemoPreset {
        name: "pib_release",
        text: "The Government of India announces the launch of a new digital literacy program \
               aimed at empowering rural communities with technology skills. This initiative will \
               provide free internet access and digital training to over 10,000 villages across \
               the country, ensuring no citizen is left behind in the digital revolution.",
        tone: Tone::Formal,
        domain: Domain::Governance,
        environment: Environment::Rural,
        duration_seconds: 25,
    },
    DemoPreset {
        name: "health_awareness",
        text: "Regular exercise and a balanced diet are essential for maintaining good health. \
               Walking for 30 minutes daily, eating plenty of fruits and vegetables, and staying \
               hydrated can significantly improve your overall well-being and prevent many diseases.",
        tone: Tone::Informative,
        domain: Domain::Health,
        environment: Environment::Nature,
        duration_seconds: 20,
    },
    DemoPreset {
        name: "education_content",
        text: "Climate change is one of the most pressing challenges of our time. Rising global \
               temperatures, melting ice caps, and extreme weather events are clear indicators \
               that immediate action is needed to protect our planet for future generations.",
        tone: Tone::Documentary,
        domain: Domain::Education,
        environment: Environment::Nature,
        duration_seconds: 30,
    },
];

pub fn find_preset(name: &str) -> Option<&'static DemoPreset> {
    PRESETS.iter().find(|preset| preset.name == name)
}
