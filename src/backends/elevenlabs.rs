// Eleven Labs narration backend
// Text-to-speech with character timestamps, so the narration length is known
// without decoding the audio.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::stages::{NarrationAudio, NarrationBackend, VoiceParameters};

/// Stock "Rachel" voice
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

#[derive(Clone)]
pub struct ElevenLabsClient {
    api_key: String,
    voice_id: String,
    client: Client,
    base_url: String,
}

// ============================================================================
// API REQUEST/RESPONSE STRUCTURES
// ============================================================================

#[derive(Serialize, Debug)]
pub struct TextToSpeechRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
    pub speed: f64,
}

impl From<&VoiceParameters> for VoiceSettings {
    fn from(voice: &VoiceParameters) -> Self {
        // The API takes style as an exaggeration amount
        let style = match voice.style.as_str() {
            "friendly" => 0.3,
            "empathetic" => 0.6,
            "authoritative" => 0.2,
            _ => 0.0,
        };
        Self {
            stability: voice.stability,
            similarity_boost: 0.75,
            style,
            use_speaker_boost: true,
            // Accepted range is 0.7..=1.2
            speed: voice.speed.clamp(0.7, 1.2),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct TimestampedSpeech {
    pub audio_base64: String,
    pub alignment: Option<Alignment>,
}

#[derive(Deserialize, Debug)]
pub struct Alignment {
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub character_start_times_seconds: Vec<f64>,
    #[serde(default)]
    pub character_end_times_seconds: Vec<f64>,
}

impl Alignment {
    /// End of the last spoken character
    pub fn duration(&self) -> Option<f64> {
        self.character_end_times_seconds
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .reduce(f64::max)
            .filter(|d| *d > 0.0)
    }
}

// ============================================================================
// IMPLEMENTATION
// ============================================================================

impl ElevenLabsClient {
    pub fn new(api_key: String, voice_id: Option<String>) -> Self {
        Self {
            api_key,
            voice_id: voice_id.unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            client: Client::new(),
            base_url: "https://api.elevenlabs.io/v1".to_string(),
        }
    }

    /// Generate speech plus character alignment for `text`
    pub async fn text_to_speech_with_timestamps(
        &self,
        text: &str,
        voice_settings: VoiceSettings,
    ) -> Result<TimestampedSpeech, StageError> {
        let url = format!(
            "{}/text-to-speech/{}/with-timestamps",
            self.base_url, self.voice_id
        );

        let request_body = TextToSpeechRequest {
            text: text.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            voice_settings,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .query(&[("output_format", "mp3_44100_128")])
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StageError::Unavailable(format!(
                "Eleven Labs TTS API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response.json::<TimestampedSpeech>().await?)
    }
}

#[async_trait]
impl NarrationBackend for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParameters,
    ) -> Result<NarrationAudio, StageError> {
        tracing::info!("🎙️ Requesting Eleven Labs narration ({} chars)", text.chars().count());

        let speech = self
            .text_to_speech_with_timestamps(text, VoiceSettings::from(voice))
            .await?;
        decode_speech(speech)
    }
}

fn decode_speech(speech: TimestampedSpeech) -> Result<NarrationAudio, StageError> {
    let bytes = STANDARD
        .decode(speech.audio_base64.as_bytes())
        .map_err(|e| StageError::InvalidResponse(format!("audio is not valid base64: {}", e)))?;

    let duration_seconds = speech
        .alignment
        .as_ref()
        .and_then(Alignment::duration)
        .ok_or_else(|| StageError::InvalidResponse("response carried no alignment".to_string()))?;

    Ok(NarrationAudio {
        bytes,
        duration_seconds,
        extension: "mp3",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_settings_from_parameters() {
        let voice = VoiceParameters {
            speed: 0.9,
            style: "friendly".to_string(),
            stability: 0.5,
            language: "en".to_string(),
        };
        let settings = VoiceSettings::from(&voice);
        assert_eq!(settings.speed, 0.9);
        assert_eq!(settings.style, 0.3);
        assert_eq!(settings.stability, 0.5);

        let fast = VoiceParameters { speed: 2.0, ..voice };
        assert_eq!(VoiceSettings::from(&fast).speed, 1.2);
    }

    #[test]
    fn test_decode_timestamped_response() {
        let json = r#"{
            "audio_base64": "SUQzBAA=",
            "alignment": {
                "characters": ["H", "i"],
                "character_start_times_seconds": [0.0, 0.4],
                "character_end_times_seconds": [0.4, 1.25]
            }
        }"#;
        let speech: TimestampedSpeech = serde_json::from_str(json).unwrap();
        let audio = decode_speech(speech).unwrap();
        assert_eq!(audio.bytes, b"ID3\x04\x00");
        assert_eq!(audio.duration_seconds, 1.25);
        assert_eq!(audio.extension, "mp3");
    }

    #[test]
    fn test_missing_alignment_is_invalid_response() {
        let speech = TimestampedSpeech {
            audio_base64: "SUQz".to_string(),
            alignment: None,
        };
        assert!(matches!(decode_speech(speech), Err(StageError::InvalidResponse(_))));
    }
}
