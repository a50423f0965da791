use std::time::Duration;

use eframe::egui::ColorImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("thumbnail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("thumbnail server answered {0}")]
    Status(u16),
    #[error("thumbnail response was empty")]
    Empty,
}

/// Retrieves encoded thumbnail images. Called from a blocking thread.
pub trait ThumbnailFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP GET with the blocking reqwest client
pub struct HttpThumbnailFetcher {
    client: reqwest::blocking::Client,
}

impl HttpThumbnailFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reelgrab/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ThumbnailFetcher for HttpThumbnailFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self.client.get(url).send()?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let bytes = resp.bytes()?;
        if bytes.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(bytes.to_vec())
    }
}

/// Decodes thumbnail bytes into something egui can upload as a texture.
/// Returns `None` for data the `image` crate cannot read.
pub fn decode_thumbnail(bytes: &[u8]) -> Option<ColorImage> {
    // Load image data into an image::DynamicImage and convert to RGBA8
    let img = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
