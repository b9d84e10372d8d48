//! Image quality metrics for a face region.
//!
//! All functions are pure and total: degenerate input (empty region, zero
//! mean luminance, zero spectrum energy) yields a defined sentinel instead
//! of a fault. Sharpness is estimated three independent ways — Laplacian
//! variance, Tenengrad, and the high-frequency share of the spectrum — so
//! the axis aggregator can blend them.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::{filter3x3, gaussian_blur_f32};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::types::{BoundingBox, ExposureReport, QualityReport, SharpnessMap};

// --- Kernels and thresholds ---
const LAPLACIAN_KERNEL: [i32; 9] = [0, 1, 0, 1, -4, 1, 0, 1, 0];
const SOBEL_X_KERNEL: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
const SOBEL_Y_KERNEL: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Ideal mean brightness (middle gray).
const IDEAL_BRIGHTNESS: f64 = 128.0;
/// Luminance strictly above this counts as overexposed.
const OVEREXPOSED_LUMA: u8 = 240;
/// Luminance strictly below this counts as underexposed.
const UNDEREXPOSED_LUMA: u8 = 15;
/// Gaussian sigma for the noise-estimate blur (what OpenCV derives for its
/// default 5×5 kernel).
const NOISE_BLUR_SIGMA: f32 = 1.1;
/// Sentinel when the bokeh ratio is undecidable: the face region has no
/// sharpness signal, or the bounding box leaves no background pixels.
const BOKEH_DEFAULT: f64 = 50.0;

/// Compute the full quality report for a face region.
pub fn report(gray: &GrayImage, face_bbox: &BoundingBox) -> QualityReport {
    QualityReport {
        sharpness_laplacian: sharpness_laplacian(gray),
        sharpness_tenengrad: sharpness_tenengrad(gray),
        sharpness_fft: sharpness_fft(gray),
        contrast_rms: contrast_rms(gray),
        exposure: exposure(gray),
        noise: noise_estimate(gray),
        bokeh: background_bokeh(gray, face_bbox),
        sharpness_map: local_sharpness_map(gray),
    }
}

/// Laplacian-variance sharpness: variance of the 3×3 Laplacian response.
pub fn sharpness_laplacian(gray: &GrayImage) -> f64 {
    variance(&laplacian_response(gray))
}

/// Tenengrad sharpness: sum of squared Sobel gradient magnitudes.
pub fn sharpness_tenengrad(gray: &GrayImage) -> f64 {
    if gray.width() < 3 || gray.height() < 3 {
        return 0.0;
    }
    let gx: ImageBuffer<Luma<i16>, Vec<i16>> = filter3x3(gray, &SOBEL_X_KERNEL);
    let gy: ImageBuffer<Luma<i16>, Vec<i16>> = filter3x3(gray, &SOBEL_Y_KERNEL);
    gx.as_raw()
        .iter()
        .zip(gy.as_raw().iter())
        .map(|(&x, &y)| {
            let gx = f64::from(x);
            let gy = f64::from(y);
            gx * gx + gy * gy
        })
        .sum()
}

/// Frequency-domain sharpness: fraction of centered-spectrum magnitude
/// outside radius `min(h, w) / 4` from the spectrum center, in [0, 1].
pub fn sharpness_fft(gray: &GrayImage) -> f64 {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    if w == 0 || h == 0 {
        return 0.0;
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(w);
    let col_fft = planner.plan_fft_forward(h);

    // Row-column decomposition of the 2-D transform.
    let mut rows: Vec<Complex<f64>> = gray
        .as_raw()
        .iter()
        .map(|&p| Complex::new(f64::from(p), 0.0))
        .collect();
    for row in rows.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let mut cols = vec![Complex::new(0.0, 0.0); w * h];
    for y in 0..h {
        for x in 0..w {
            cols[x * h + y] = rows[y * w + x];
        }
    }
    for col in cols.chunks_exact_mut(h) {
        col_fft.process(col);
    }

    let cx = (w / 2) as i64;
    let cy = (h / 2) as i64;
    let radius = (w.min(h) / 4) as i64;
    let mut total = 0.0;
    let mut high = 0.0;
    for x in 0..w {
        for y in 0..h {
            let magnitude = cols[x * h + y].norm();
            total += magnitude;
            // Bin position after centering the spectrum.
            let sx = ((x + w / 2) % w) as i64 - cx;
            let sy = ((y + h / 2) % h) as i64 - cy;
            if sx * sx + sy * sy > radius * radius {
                high += magnitude;
            }
        }
    }

    if total > 0.0 {
        high / total
    } else {
        0.0
    }
}

/// RMS contrast: RMS deviation of luminance from its mean, as % of the
/// mean. 0 when the mean is 0.
pub fn contrast_rms(gray: &GrayImage) -> f64 {
    let pixels = gray.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = pixels
        .iter()
        .map(|&p| (f64::from(p) - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean * 100.0
}

/// Exposure statistics around the ideal mean brightness of 128.
pub fn exposure(gray: &GrayImage) -> ExposureReport {
    let pixels = gray.as_raw();
    if pixels.is_empty() {
        return ExposureReport {
            score: 0.0,
            mean_brightness: 0.0,
            overexposed_pct: 0.0,
            underexposed_pct: 0.0,
            exposure_diff: -IDEAL_BRIGHTNESS,
        };
    }
    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
    let score = (100.0 - (mean - IDEAL_BRIGHTNESS).abs() / IDEAL_BRIGHTNESS * 100.0).clamp(0.0, 100.0);
    let overexposed = pixels.iter().filter(|&&p| p > OVEREXPOSED_LUMA).count() as f64 / n * 100.0;
    let underexposed = pixels.iter().filter(|&&p| p < UNDEREXPOSED_LUMA).count() as f64 / n * 100.0;
    ExposureReport {
        score,
        mean_brightness: mean,
        overexposed_pct: overexposed,
        underexposed_pct: underexposed,
        exposure_diff: mean - IDEAL_BRIGHTNESS,
    }
}

/// Noise estimate: stddev of the residual after a light Gaussian blur.
pub fn noise_estimate(gray: &GrayImage) -> f64 {
    if gray.width() == 0 || gray.height() == 0 {
        return 0.0;
    }
    let blurred = gaussian_blur_f32(gray, NOISE_BLUR_SIGMA);
    let residual: Vec<f64> = gray
        .as_raw()
        .iter()
        .zip(blurred.as_raw().iter())
        .map(|(&a, &b)| f64::from(a) - f64::from(b))
        .collect();
    variance(&residual).sqrt()
}

/// Background-blur (bokeh) estimate: compares Laplacian sharpness of the
/// pixels outside the face box with the face region itself.
pub fn background_bokeh(gray: &GrayImage, face_bbox: &BoundingBox) -> f64 {
    let img_w = gray.width();
    let img_h = gray.height();
    if img_w == 0 || img_h == 0 {
        return BOKEH_DEFAULT;
    }

    let x0 = face_bbox.x.max(0.0) as u32;
    let y0 = face_bbox.y.max(0.0) as u32;
    let x1 = (face_bbox.x + face_bbox.width).clamp(0.0, img_w as f32) as u32;
    let y1 = (face_bbox.y + face_bbox.height).clamp(0.0, img_h as f32) as u32;
    if x1 <= x0 || y1 <= y0 {
        return BOKEH_DEFAULT;
    }

    let face = image::imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image();
    let face_sharpness = sharpness_laplacian(&face);

    let response = laplacian_response(gray);
    let mut background = Vec::new();
    for y in 0..img_h {
        for x in 0..img_w {
            let inside = x >= x0 && x < x1 && y >= y0 && y < y1;
            if !inside {
                background.push(response[(y * img_w + x) as usize]);
            }
        }
    }
    if background.is_empty() || face_sharpness == 0.0 {
        return BOKEH_DEFAULT;
    }

    let bg_sharpness = variance(&background);
    ((1.0 - bg_sharpness / face_sharpness) * 100.0).clamp(0.0, 100.0)
}

/// Per-pixel |Laplacian| map. Diagnostic only.
pub fn local_sharpness_map(gray: &GrayImage) -> SharpnessMap {
    SharpnessMap {
        width: gray.width(),
        height: gray.height(),
        values: laplacian_response(gray).iter().map(|v| v.abs()).collect(),
    }
}

/// Signed 3×3 Laplacian response, one value per pixel (replicated border).
/// Regions smaller than the kernel get a flat zero response.
fn laplacian_response(gray: &GrayImage) -> Vec<f64> {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    if w == 0 || h == 0 {
        return Vec::new();
    }
    if w < 3 || h < 3 {
        return vec![0.0; w * h];
    }
    let filtered: ImageBuffer<Luma<i16>, Vec<i16>> = filter3x3(gray, &LAPLACIAN_KERNEL);
    filtered.as_raw().iter().map(|&v| f64::from(v)).collect()
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
