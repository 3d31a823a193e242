//! Application state for the conversion service

use std::sync::Arc;

use anyhow::Result;
use convert_core::{default_recognizer, PdfiumRasterizer, Rasterizer, TextRecognizer};

use crate::config::Config;
use crate::storage::BlobStore;
use crate::store::ProcessedFileStore;

pub struct AppState {
    pub store: ProcessedFileStore,
    pub blobs: BlobStore,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub history_limit: u32,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self> {
        let blobs = BlobStore::new(&config.media_root);
        blobs.init().await?;
        tracing::info!("Media root: {}", blobs.root().display());

        let store = ProcessedFileStore::connect(&config.database_url()).await?;

        Ok(Self {
            store,
            blobs,
            rasterizer: Arc::new(PdfiumRasterizer::with_dpi(config.render_dpi)),
            recognizer: default_recognizer(&config.ocr_language),
            history_limit: config.history_limit,
        })
    }
}
