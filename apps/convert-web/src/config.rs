//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the conversion server
#[derive(Parser, Debug, Clone)]
#[command(name = "convert-web")]
#[command(about = "Web service for image, PDF, slide deck and OCR conversions")]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite connection string (defaults to convert.db inside the media root)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory holding uploads/ and processed/
    #[arg(long, env = "MEDIA_ROOT", default_value = "./media")]
    pub media_root: PathBuf,

    /// Number of records shown on the history page
    #[arg(long, env = "HISTORY_LIMIT", default_value = "20")]
    pub history_limit: u32,

    /// Maximum request body size in MiB
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "100")]
    pub max_upload_mb: usize,

    /// Resolution used when rasterising PDF pages for slides
    #[arg(long, env = "RENDER_DPI", default_value = "200")]
    pub render_dpi: f32,

    /// Tesseract language code
    #[arg(long, env = "OCR_LANGUAGE", default_value = "eng")]
    pub ocr_language: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!(
                "sqlite:{}/convert.db?mode=rwc",
                self.media_root.display()
            )
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn body_limit(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
