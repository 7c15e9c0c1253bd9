use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use log::{error, info, warn};
use reqwest::Client;

use crate::api::{CatUrl, FetchError, TagRegistry};
use crate::cache::CatDb;
use crate::models::CatMetadata;

/// A decoded cat with the metadata it was fetched with.
#[derive(Debug, Clone)]
pub struct FetchedCat {
    pub image: DynamicImage,
    pub metadata: CatMetadata,
    /// Version id the bytes were stored under, `None` if the store write
    /// failed.
    pub version_id: Option<String>,
}

/// Fetches cats from the service and records every retrieval in the store.
pub struct CatClient {
    db: Arc<CatDb>,
    tags: TagRegistry,
    metadata_client: Client,
    image_client: Client,
}

impl CatClient {
    /// `timeout` bounds the metadata request only. Image downloads use a
    /// client without a timeout.
    pub fn new(db: Arc<CatDb>, tags: TagRegistry, timeout: Duration) -> Result<Self, FetchError> {
        let metadata_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            db,
            tags,
            metadata_client,
            image_client: Client::new(),
        })
    }

    pub fn db(&self) -> &Arc<CatDb> {
        &self.db
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub async fn request_random_cat(&self) -> Result<FetchedCat, FetchError> {
        let url = CatUrl::with_registry(self.tags.clone());
        self.request_cat(&url).await
    }

    /// Fetches the cat described by `url`, forcing a JSON metadata response.
    pub async fn request_cat(&self, url: &CatUrl) -> Result<FetchedCat, FetchError> {
        let metadata_url = url.as_json().generate()?;
        self.request_cat_at(&metadata_url).await
    }

    /// Runs the pipeline against a metadata URL that already asks for JSON.
    pub async fn request_cat_at(&self, metadata_url: &str) -> Result<FetchedCat, FetchError> {
        info!("Requesting cat metadata from {}", metadata_url);

        let body = self
            .metadata_client
            .get(metadata_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let metadata: CatMetadata = serde_json::from_slice(&body)?;

        info!("Downloading cat {} from {}", metadata.id, metadata.url);
        let data = self
            .image_client
            .get(&metadata.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();

        let db = Arc::clone(&self.db);
        let stored_metadata = metadata.clone();
        let (image, version_id) = tokio::task::spawn_blocking(move || {
            let image = decode_image(&data, &stored_metadata.mime_type)?;
            let version_id = store_version(&db, &stored_metadata, &data);
            Ok::<_, FetchError>((image, version_id))
        })
        .await
        .map_err(|e| FetchError::Task(e.to_string()))??;

        Ok(FetchedCat {
            image,
            metadata,
            version_id,
        })
    }
}

fn decode_image(data: &[u8], mime_type: &str) -> Result<DynamicImage, FetchError> {
    let format = image::guess_format(data)?;
    let detected = mime_for_format(format);

    if detected == mime_type {
        info!("Decoding {} image ({} bytes)", detected, data.len());
    } else {
        warn!(
            "Image format mismatch: detected {}, metadata says {}",
            detected, mime_type
        );
    }

    Ok(image::load_from_memory_with_format(data, format)?)
}

fn store_version(db: &CatDb, metadata: &CatMetadata, data: &[u8]) -> Option<String> {
    match db.add_cat_version(metadata, data) {
        Ok((cat_id, version_id)) => {
            info!("Stored cat {} as version {}", cat_id, version_id);
            Some(version_id)
        }
        Err(e) => {
            error!("Failed to store cat {}: {}", metadata.id, e);
            None
        }
    }
}

fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        _ => "application/octet-stream",
    }
}
