//! Rule-based image analysis
//!
//! Measures simple pixel statistics on a downscaled copy of the image and maps
//! them to a theme, a confidence, dominant colours and a quality score.
//! Everything here is CPU-bound and runs on the blocking pool.

use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::AppError;

/// Longest side measured
const ANALYSIS_EDGE: u32 = 256;
/// Sobel magnitude above which a pixel counts as an edge
const EDGE_THRESHOLD: f64 = 100.0;
/// Share of pixels a colour bin needs to count towards diversity
const COLOR_BIN_MIN_SHARE: f64 = 0.02;

/// Raw measurements, all normalised where noted
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageFeatures {
    /// Mean luma / 255
    pub brightness: f64,
    /// Luma standard deviation / 255
    pub contrast: f64,
    pub edge_density: f64,
    pub color_diversity: u32,
    pub aspect_ratio: f64,
    /// Laplacian variance
    pub sharpness: f64,
    pub noise: f64,
    pub symmetry: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominantColor {
    pub name: String,
    pub percentage: f64,
    pub hex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Composition {
    pub aspect_ratio: f64,
    pub symmetry_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Result returned to upload clients
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub theme: String,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub dominant_colors: Vec<DominantColor>,
    pub quality_score: f64,
    pub composition: Composition,
    pub dimensions: Dimensions,
    #[serde(skip)]
    pub features: ImageFeatures,
}

/// Live analyzer counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalyzerPerformance {
    pub analyses_run: u64,
    pub analysis_failures: u64,
    pub average_analysis_ms: f64,
}

/// Image analyzer with run statistics
#[derive(Debug, Default)]
pub struct ImageAnalyzer {
    runs: AtomicU64,
    failures: AtomicU64,
    total_micros: AtomicU64,
}

impl ImageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze encoded image bytes
    ///
    /// # Errors
    /// `Validation` when the bytes do not decode as an image
    pub async fn analyze(&self, bytes: Vec<u8>) -> Result<ImageAnalysis, AppError> {
        let (analysis, _) = self.run(bytes, None).await?;
        Ok(analysis)
    }

    /// Analyze and also render a JPEG thumbnail fitting `thumbnail_edge`
    pub async fn analyze_with_thumbnail(
        &self,
        bytes: Vec<u8>,
        thumbnail_edge: u32,
    ) -> Result<(ImageAnalysis, Vec<u8>), AppError> {
        let (analysis, thumbnail) = self.run(bytes, Some(thumbnail_edge)).await?;
        let thumbnail = thumbnail
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("thumbnail was not rendered")))?;
        Ok((analysis, thumbnail))
    }

    pub fn performance(&self) -> AnalyzerPerformance {
        let runs = self.runs.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);
        let average_analysis_ms = if runs == 0 {
            0.0
        } else {
            round_to(total_micros as f64 / runs as f64 / 1000.0, 2)
        };

        AnalyzerPerformance {
            analyses_run: runs,
            analysis_failures: self.failures.load(Ordering::Relaxed),
            average_analysis_ms,
        }
    }

    async fn run(
        &self,
        bytes: Vec<u8>,
        thumbnail_edge: Option<u32>,
    ) -> Result<(ImageAnalysis, Option<Vec<u8>>), AppError> {
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)
                .map_err(|_| AppError::Validation("Invalid image file".to_string()))?;
            let analysis = analyze_image(&image);
            let thumbnail = thumbnail_edge
                .map(|edge| render_thumbnail(&image, edge))
                .transpose()?;
            Ok::<_, AppError>((analysis, thumbnail))
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("analysis task failed: {}", e)))?;

        self.runs.fetch_add(1, Ordering::Relaxed);
        self.total_micros
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok((analysis, _)) = &result {
            tracing::debug!(
                theme = %analysis.theme,
                confidence = analysis.confidence,
                quality = analysis.quality_score,
                "Image analyzed"
            );
        }

        result
    }
}

/// Encode a JPEG thumbnail whose longest side is at most `edge`
pub fn render_thumbnail(image: &DynamicImage, edge: u32) -> Result<Vec<u8>, AppError> {
    let (width, height) = image.dimensions();
    let scaled = if width.max(height) > edge {
        image.thumbnail(edge, edge)
    } else {
        image.clone()
    };

    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(80))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("thumbnail encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Full analysis of a decoded image
pub fn analyze_image(image: &DynamicImage) -> ImageAnalysis {
    let (width, height) = image.dimensions();
    let sample = if width.max(height) > ANALYSIS_EDGE {
        image.thumbnail(ANALYSIS_EDGE, ANALYSIS_EDGE).to_rgb8()
    } else {
        image.to_rgb8()
    };

    let mut features = measure(&sample);
    features.aspect_ratio = if height == 0 {
        0.0
    } else {
        round_to(width as f64 / height as f64, 3)
    };

    let (theme, confidence) = classify(&features);
    let dominant_colors = dominant_colors(&sample, 3);
    let quality_score = quality_score(&features);

    let mut tags = vec![theme.to_string()];
    if let Some(color) = dominant_colors.first() {
        if !tags.contains(&color.name) {
            tags.push(color.name.clone());
        }
    }
    if features.symmetry > 0.8 {
        tags.push("symmetric".to_string());
    }
    if confidence > 0.8 {
        tags.push("high_quality".to_string());
    }

    ImageAnalysis {
        theme: theme.to_string(),
        confidence,
        tags,
        dominant_colors,
        quality_score: round_to(quality_score, 3),
        composition: Composition {
            aspect_ratio: features.aspect_ratio,
            symmetry_score: round_to(features.symmetry, 3),
        },
        dimensions: Dimensions { width, height },
        features,
    }
}

/// Theme and confidence from the first matching rule
pub fn classify(features: &ImageFeatures) -> (&'static str, f64) {
    let ImageFeatures {
        brightness,
        contrast,
        edge_density,
        color_diversity,
        symmetry,
        ..
    } = *features;

    if brightness > 0.6 && contrast < 0.4 && color_diversity >= 3 {
        ("nature_landscape", 0.85)
    } else if edge_density > 0.15 && contrast > 0.4 {
        ("city_architecture", 0.8)
    } else if edge_density < 0.08 && brightness > 0.3 && brightness < 0.8 && symmetry > 0.85 {
        ("portrait", 0.8)
    } else if brightness > 0.4
        && brightness < 0.8
        && contrast > 0.2
        && contrast < 0.6
        && color_diversity >= 4
    {
        ("animals_plants", 0.75)
    } else if brightness > 0.6 {
        ("nature_landscape", 0.6)
    } else if edge_density > 0.1 {
        ("city_architecture", 0.6)
    } else {
        ("portrait", 0.6)
    }
}

pub fn quality_score(features: &ImageFeatures) -> f64 {
    let sharpness = (features.sharpness / 1000.0).min(1.0);
    let contrast = (features.contrast * 2.0).min(1.0);
    let exposure = 1.0 - (features.brightness - 0.5).abs() * 2.0;
    let cleanliness = (1.0 - features.noise).max(0.0);

    (sharpness * 0.4 + contrast * 0.3 + exposure * 0.2 + cleanliness * 0.1).clamp(0.0, 1.0)
}

fn luma_plane(image: &RgbImage) -> Vec<f64> {
    image
        .pixels()
        .map(|p| 0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64)
        .collect()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn measure(image: &RgbImage) -> ImageFeatures {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let luma = luma_plane(image);
    let at = |x: usize, y: usize| luma[y * w + x];

    let (mean, std) = mean_and_std(&luma);

    let mut edges = 0usize;
    let mut laplacians = Vec::new();
    let mut residuals = Vec::new();
    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
                let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                    - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
                if (gx * gx + gy * gy).sqrt() > EDGE_THRESHOLD {
                    edges += 1;
                }

                laplacians.push(
                    at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y),
                );

                let mut window = 0.0;
                for dy in 0..3 {
                    for dx in 0..3 {
                        window += at(x + dx - 1, y + dy - 1);
                    }
                }
                residuals.push(at(x, y) - window / 9.0);
            }
        }
    }
    let interior = laplacians.len();

    let mut mirrored_diff = 0.0;
    let mut mirrored_pairs = 0usize;
    for y in 0..h {
        for x in 0..w / 2 {
            mirrored_diff += (at(x, y) - at(w - 1 - x, y)).abs();
            mirrored_pairs += 1;
        }
    }

    let (_, sharpness_std) = mean_and_std(&laplacians);
    let (_, noise_std) = mean_and_std(&residuals);
    let bins = color_bins(image);
    let total = (w * h).max(1) as f64;
    let diverse_bins = bins
        .iter()
        .filter(|count| **count as f64 / total >= COLOR_BIN_MIN_SHARE)
        .count() as u32;

    ImageFeatures {
        brightness: mean / 255.0,
        contrast: std / 255.0,
        edge_density: if interior == 0 {
            0.0
        } else {
            edges as f64 / interior as f64
        },
        color_diversity: diverse_bins.min(5),
        aspect_ratio: 0.0,
        sharpness: sharpness_std * sharpness_std,
        noise: noise_std / 255.0,
        symmetry: if mirrored_pairs == 0 {
            1.0
        } else {
            1.0 - mirrored_diff / mirrored_pairs as f64 / 255.0
        },
    }
}

/// Pixel counts over a 4x4x4 RGB quantisation
fn color_bins(image: &RgbImage) -> [u32; 64] {
    let mut bins = [0u32; 64];
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let index = (r as usize / 64) * 16 + (g as usize / 64) * 4 + (b as usize / 64);
        bins[index] += 1;
    }
    bins
}

fn dominant_colors(image: &RgbImage, count: usize) -> Vec<DominantColor> {
    let bins = color_bins(image);
    let total = (image.width() * image.height()).max(1) as f64;

    let mut ranked: Vec<(usize, u32)> = bins
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, pixels)| *pixels > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(count)
        .map(|(index, pixels)| {
            let level = |q: usize| (q * 64 + 32) as u8;
            let rgb = [level(index / 16), level((index / 4) % 4), level(index % 4)];
            DominantColor {
                name: color_name(rgb).to_string(),
                percentage: round_to(pixels as f64 / total * 100.0, 1),
                hex: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
            }
        })
        .collect()
}

/// Coarse colour name from HSV
pub fn color_name(rgb: [u8; 3]) -> &'static str {
    let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let value = max;
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    if value < 0.2 {
        return "black";
    }
    if saturation < 0.15 {
        return if value > 0.85 { "white" } else { "gray" };
    }

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    match hue {
        h if !(15.0..345.0).contains(&h) => "red",
        h if h < 45.0 => "orange",
        h if h < 70.0 => "yellow",
        h if h < 160.0 => "green",
        h if h < 200.0 => "cyan",
        h if h < 260.0 => "blue",
        h if h < 290.0 => "purple",
        _ => "pink",
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
