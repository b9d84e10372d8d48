//! Axis aggregation: quality metrics and geometry scores → the five axes.

use crate::types::{AxisScores, QualityReport};

/// Fallback for the pose/jawline axes when no dense mesh is available.
const NO_MESH_AXIS: f64 = 50.0;

/// Blend the quality report and optional geometry scores into the
/// five-axis record consumed by the classifier.
///
/// Sharpness and contrast are the only formula-clamped axes.
pub fn aggregate(
    quality: &QualityReport,
    pose_score: Option<f64>,
    jawline_score: Option<f64>,
) -> AxisScores {
    let sharpness = (quality.sharpness_laplacian / 1000.0 * 50.0
        + quality.sharpness_tenengrad / 100_000.0 * 30.0
        + quality.sharpness_fft * 20.0)
        .min(100.0);

    let lighting = quality.exposure.score * 0.7
        + (100.0 - quality.exposure.overexposed_pct - quality.exposure.underexposed_pct) * 0.3;

    let contrast = (quality.contrast_rms * 2.0).min(100.0);

    AxisScores {
        sharpness,
        lighting,
        pose: pose_score.unwrap_or(NO_MESH_AXIS),
        jawline: jawline_score.unwrap_or(NO_MESH_AXIS),
        contrast,
    }
}
