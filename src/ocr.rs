//! OCR and page rasterisation.
//!
//! Both are external tools reached through small traits so the extractor can
//! be exercised without them installed:
//!
//! - [`OcrEngine`] turns an image file into text. [`TesseractCli`] runs
//!   `tesseract <image> stdout -l <lang>`.
//! - [`PageRasterizer`] renders every page of a PDF to an image.
//!   [`PdftoppmRasterizer`] runs `pdftoppm -r <dpi> -png <pdf> <prefix>` into
//!   a temporary directory.
//!
//! Images are binarised before recognition: decode, convert to 8-bit luma,
//! threshold at the Otsu level, and write a temporary PNG.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;

use crate::config::OcrConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to run '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{cmd}' exited with {status}: {stderr}")]
    Failed {
        cmd: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recognises text in a single image file.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Renders every page of a PDF as an image, in page order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path) -> Result<RasterizedPages, OcrError>;
}

/// Page images plus the temporary directory that owns them.
///
/// The directory is removed when this value is dropped.
pub struct RasterizedPages {
    _dir: Option<TempDir>,
    pub pages: Vec<PathBuf>,
}

impl RasterizedPages {
    pub fn new(dir: TempDir, pages: Vec<PathBuf>) -> Self {
        Self {
            _dir: Some(dir),
            pages,
        }
    }

    /// Pages not backed by a temporary directory.
    pub fn from_paths(pages: Vec<PathBuf>) -> Self {
        Self { _dir: None, pages }
    }
}

#[derive(Debug, Clone)]
pub struct TesseractCli {
    cmd: String,
    language: String,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            cmd: config.tesseract_cmd.clone(),
            language: config.language.clone(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.cmd)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|source| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                cmd: self.cmd.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    cmd: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            cmd: config.pdftoppm_cmd.clone(),
            dpi: config.dpi,
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path) -> Result<RasterizedPages, OcrError> {
        let dir = TempDir::new()?;
        let prefix = dir.path().join("page");

        let output = Command::new(&self.cmd)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|source| OcrError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                cmd: self.cmd.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut pages: Vec<PathBuf> = std::fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        // pdftoppm zero-pads to the page count's width, so sort numerically.
        pages.sort_by_key(|p| page_suffix(p));

        Ok(RasterizedPages::new(dir, pages))
    }
}

fn page_suffix(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

/// Binarise `image` and run `engine` on the result.
pub fn ocr_image(engine: &dyn OcrEngine, image: &Path) -> Result<String, OcrError> {
    let dir = TempDir::new()?;
    let prepared = binarize_to_png(image, dir.path())?;
    engine.recognize(&prepared)
}

/// Decode, convert to luma, apply the Otsu threshold, and save as PNG in `out_dir`.
pub fn binarize_to_png(image: &Path, out_dir: &Path) -> Result<PathBuf, OcrError> {
    let mut gray = image::open(image)?.to_luma8();

    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let threshold = otsu_threshold(&histogram);

    for pixel in gray.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }

    let out = out_dir.join("binarized.png");
    gray.save(&out)?;
    Ok(out)
}

/// Otsu's threshold: the level maximising between-class variance.
pub fn otsu_threshold(histogram: &[u64; 256]) -> u8 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut best_variance = 0.0f64;
    let mut best_level = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += level as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_all - sum_background) / weight_foreground as f64;
        let diff = mean_background - mean_foreground;
        let variance = weight_background as f64 * weight_foreground as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}
