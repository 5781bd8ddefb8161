// src/backends/pexels.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StageError;
use crate::stages::{key_concepts, ImageBackend};

/// Words from the prompt used as the search query
const QUERY_CONCEPTS: usize = 3;

/// Stock photo search as a scene image backend
#[derive(Debug, Clone)]
pub struct PexelsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PexelsPhotoResponse {
    pub page: i32,
    pub per_page: i32,
    pub total_results: i32,
    pub photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PexelsPhoto {
    pub id: i64,
    pub width: i32,
    pub height: i32,
    pub photographer: String,
    pub src: PexelsPhotoSrc,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PexelsPhotoSrc {
    pub original: String,
    pub large2x: String,
    pub large: String,
    pub landscape: String,
    pub portrait: String,
}

impl PexelsPhotoSrc {
    /// Rendition closest to the requested frame shape
    fn for_frame(&self, width: u32, height: u32) -> &str {
        if width >= height {
            &self.landscape
        } else {
            &self.portrait
        }
    }
}

/// Search query built from the leading key concepts of a scene prompt
pub fn search_query(prompt: &str) -> Option<String> {
    let concepts = key_concepts(prompt);
    if concepts.is_empty() {
        return None;
    }
    Some(
        concepts
            .into_iter()
            .take(QUERY_CONCEPTS)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

impl PexelsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.pexels.com".to_string(),
        }
    }

    /// Search for photos on Pexels
    pub async fn search_photos(
        &self,
        query: &str,
        per_page: u32,
        orientation: &str,
    ) -> Result<PexelsPhotoResponse, StageError> {
        info!("📸 Searching Pexels for photos: '{}'", query);

        let response = self
            .client
            .get(format!("{}/v1/search", self.base_url))
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query.to_string()),
                ("per_page", per_page.to_string()),
                ("orientation", orientation.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Pexels API error: {}", error_text);
            return Err(StageError::Unavailable(format!("Pexels API error: {}", error_text)));
        }

        let photos = response.json::<PexelsPhotoResponse>().await?;
        info!("✅ Found {} photos for query: '{}'", photos.photos.len(), query);
        Ok(photos)
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>, StageError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StageError::Unavailable(format!(
                "photo download failed with status {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageBackend for PexelsClient {
    async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>, StageError> {
        let query = search_query(prompt).ok_or_else(|| {
            StageError::InvalidResponse("prompt has no searchable words".to_string())
        })?;

        let orientation = if width >= height { "landscape" } else { "portrait" };
        let results = self.search_photos(&query, 1, orientation).await?;
        let photo = results.photos.first().ok_or_else(|| {
            StageError::InvalidResponse(format!("no photos found for '{}'", query))
        })?;

        self.download(photo.src.for_frame(width, height)).await
    }
}
