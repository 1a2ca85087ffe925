//! PDF text extraction by rasterizing pages and running OCR on each one.
//!
//! The OCR backend sits behind [`OcrEngine`]. The default
//! [`PopplerTesseract`] engine shells out to `pdftoppm` to render pages and
//! to `tesseract` to read each image. Rendered pages live in a temporary
//! directory owned by [`TextExtractor::extract`] and are removed when it
//! returns, on success or failure.
//!
//! Output is page-tagged in page order:
//!
//! ```text
//! --- Page 1 ---
//! <text>
//!
//! --- Page 2 ---
//! <text>
//! ```
//!
//! Any page failure fails the whole extraction; partial text is never returned.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::config::OcrConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("OCR processing failed: could not render pages: {0}")]
    Render(String),
    #[error("OCR processing failed on page {page}: {message}")]
    Ocr { page: usize, message: String },
    #[error("OCR processing failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendering and recognition primitives of an OCR backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Render every page of `pdf` into `out_dir` at `dpi`, returning image
    /// paths in page order.
    async fn render_to_images(
        &self,
        pdf: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError>;

    /// Recognize the text of one page image.
    async fn image_to_text(&self, image: &Path, lang: &str) -> Result<String, ExtractError>;
}

/// Poppler (`pdftoppm`) + Tesseract command-line engine.
pub struct PopplerTesseract {
    pdftoppm: String,
    tesseract: String,
}

impl PopplerTesseract {
    pub fn new(pdftoppm: impl Into<String>, tesseract: impl Into<String>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            tesseract: tesseract.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.pdftoppm, &config.tesseract)
    }
}

const PAGE_PREFIX: &str = "page";

#[async_trait]
impl OcrEngine for PopplerTesseract {
    async fn render_to_images(
        &self,
        pdf: &Path,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let output = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .await
            .map_err(|e| ExtractError::Render(format!("failed to run {}: {}", self.pdftoppm, e)))?;

        if !output.status.success() {
            return Err(ExtractError::Render(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut pages: Vec<(usize, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(out_dir)? {
            let path = entry?.path();
            if let Some(n) = page_number(&path) {
                pages.push((n, path));
            }
        }
        pages.sort_by_key(|(n, _)| *n);
        Ok(pages.into_iter().map(|(_, p)| p).collect())
    }

    async fn image_to_text(&self, image: &Path, lang: &str) -> Result<String, ExtractError> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .output()
            .await
            .map_err(|e| ExtractError::Ocr {
                page: 0,
                message: format!("failed to run {}: {}", self.tesseract, e),
            })?;

        if !output.status.success() {
            return Err(ExtractError::Ocr {
                page: 0,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse the page number out of `pdftoppm` output names like `page-07.png`.
fn page_number(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Runs an [`OcrEngine`] over a whole document.
#[derive(Clone)]
pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    dpi: u32,
    language: String,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, dpi: u32, language: impl Into<String>) -> Self {
        Self {
            engine,
            dpi,
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(PopplerTesseract::from_config(config)),
            config.dpi,
            &config.language,
        )
    }

    pub async fn extract(&self, pdf: &Path) -> Result<String, ExtractError> {
        let workdir = tempfile::Builder::new().prefix("ocrh-pages-").tempdir()?;

        let images = self
            .engine
            .render_to_images(pdf, self.dpi, workdir.path())
            .await?;
        tracing::debug!(pages = images.len(), pdf = %pdf.display(), "rendered pages");

        let mut text = String::new();
        for (i, image) in images.iter().enumerate() {
            let page = i + 1;
            let page_text = self
                .engine
                .image_to_text(image, &self.language)
                .await
                .map_err(|e| match e {
                    ExtractError::Ocr { message, .. } => ExtractError::Ocr { page, message },
                    other => ExtractError::Ocr {
                        page,
                        message: other.to_string(),
                    },
                })?;
            text.push_str(&format!("\n--- Page {} ---\n{}\n", page, page_text));
        }

        Ok(text.trim().to_string())
    }
}
