// src/stages/subtitles.rs
use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::error::PipelineError;
use crate::types::TextSegment;
use crate::utils::format_srt_timestamp;

/// One caption entry covering `[start, end)` seconds
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionWindow {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Equal time slices, one per segment, in order.
///
/// Boundaries are computed from the index rather than accumulated, and the last
/// window ends exactly at `total_duration`.
pub fn caption_windows(segments: &[TextSegment], total_duration: f64) -> Vec<CaptionWindow> {
    let count = segments.len();
    if count == 0 {
        return Vec::new();
    }
    let slice = total_duration / count as f64;

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| CaptionWindow {
            index: i + 1,
            start: i as f64 * slice,
            end: if i + 1 == count {
                total_duration
            } else {
                (i + 1) as f64 * slice
            },
            text: segment.text.clone(),
        })
        .collect()
}

/// Render windows in SubRip format
pub fn render_srt(windows: &[CaptionWindow]) -> String {
    let mut srt = String::new();
    for window in windows {
        srt.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            window.index,
            format_srt_timestamp(window.start),
            format_srt_timestamp(window.end),
            window.text
        ));
    }
    srt
}

/// Subtitle stage: writes an `.srt` caption artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtitleSynthesizer;

impl SubtitleSynthesizer {
    pub async fn synthesize(
        &self,
        job_id: &str,
        segments: &[TextSegment],
        total_duration: f64,
        store: &ArtifactStore,
    ) -> Result<Artifact, PipelineError> {
        if segments.is_empty() {
            return Err(PipelineError::Subtitle("no segments to caption".to_string()));
        }
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(PipelineError::Subtitle(format!(
                "invalid narration duration {}",
                total_duration
            )));
        }

        let srt = render_srt(&caption_windows(segments, total_duration));
        let artifact = store
            .write(job_id, ArtifactKind::Captions, "captions.srt", srt.as_bytes())
            .await?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(texts: &[&str]) -> Vec<TextSegment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextSegment { index: i + 1, text: t.to_string() })
            .collect()
    }

    #[test]
    fn test_windows_are_contiguous_and_end_at_duration() {
        let duration = 10.0;
        let windows = caption_windows(&segments(&["a", "b", "c"]), duration);
        assert_eq!(windows.len(), 3);

        for (i, window) in windows.iter().enumerate() {
            let expected_start = i as f64 * duration / 3.0;
            assert!((window.start - expected_start).abs() < 1e-9);
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(windows[0].start, 0.0);
        assert_eq!(windows[2].end, duration);
    }

    #[test]
    fn test_windows_stay_within_a_frame_of_duration() {
        let config = crate::types::VideoConfig::default();
        let duration = 7.3;
        let windows = caption_windows(&segments(&["a", "b", "c", "d", "e", "f", "g"]), duration);
        let covered: f64 = windows.iter().map(|w| w.end - w.start).sum();
        assert!((covered - duration).abs() <= config.frame_interval());
    }

    #[test]
    fn test_render_srt() {
        let windows = caption_windows(&segments(&["Cats are great.", "Dogs are loyal."]), 5.0);
        assert_eq!(
            render_srt(&windows),
            "1\n00:00:00,000 --> 00:00:02,500\nCats are great.\n\n\
             2\n00:00:02,500 --> 00:00:05,000\nDogs are loyal.\n\n"
        );
    }

    #[tokio::test]
    async fn test_synthesize_writes_srt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("work"), tmp.path().join("out"));
        store.prepare("job").await.unwrap();

        let artifact = SubtitleSynthesizer
            .synthesize("job", &segments(&["Hello."]), 3.0, &store)
            .await
            .unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Captions);

        let content = tokio::fs::read_to_string(&artifact.path).await.unwrap();
        assert!(content.starts_with("1\n00:00:00,000 --> 00:00:03,000\nHello."));
    }

    #[tokio::test]
    async fn test_rejects_zero_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("work"), tmp.path().join("out"));
        let err = SubtitleSynthesizer
            .synthesize("job", &segments(&["Hello."]), 0.0, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Subtitle(_)));
    }
}
