use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Pixel-space bounding box for a detected face.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A detected face as supplied by the detection collaborator.
#[derive(Debug, Clone)]
pub struct FaceLandmarks {
    pub bbox: BoundingBox,
    /// Dense fixed-topology landmark mesh ([`crate::mesh::MESH_POINT_COUNT`]
    /// points; pixel-scale x/y, pixel-scale-relative z). `None` when the
    /// detector produced a box but no mesh.
    pub mesh: Option<Vec<[f32; 3]>>,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

/// Face detection collaborator.
///
/// A detection call returns landmarks or an absence signal, synchronously
/// and unconditionally — never an error. Implementations own a
/// non-reentrant handle: `detect` takes `&mut self` and a handle must not
/// be invoked concurrently from multiple workers.
pub trait FaceDetector: Send {
    fn detect(&mut self, image: &DynamicImage) -> Option<FaceLandmarks>;
}

/// Exposure statistics of a face region.
#[derive(Debug, Clone, Serialize)]
pub struct ExposureReport {
    /// 0–100; 100 at ideal mean brightness, 0 at the extremes.
    pub score: f64,
    pub mean_brightness: f64,
    /// Share of pixels above the overexposure threshold, in percent.
    pub overexposed_pct: f64,
    /// Share of pixels below the underexposure threshold, in percent.
    pub underexposed_pct: f64,
    /// Signed deviation of mean brightness from ideal (128).
    pub exposure_diff: f64,
}

/// Per-pixel sharpness map. Diagnostic only — never consumed by scoring
/// and never serialized.
#[derive(Debug, Clone, Default)]
pub struct SharpnessMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f64>,
}

/// Image-quality metrics of a face region.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    /// Variance of the Laplacian response.
    pub sharpness_laplacian: f64,
    /// Sum of squared Sobel gradient magnitudes.
    pub sharpness_tenengrad: f64,
    /// Fraction of spectrum energy outside the low-frequency disc, [0, 1].
    pub sharpness_fft: f64,
    /// RMS deviation of luminance from its mean, as % of the mean.
    pub contrast_rms: f64,
    pub exposure: ExposureReport,
    /// Stddev of (image − blurred image).
    pub noise: f64,
    /// Background-blur estimate, 0–100 (50 when undecidable).
    pub bokeh: f64,
    #[serde(skip)]
    pub sharpness_map: SharpnessMap,
}

/// Head pose angles in degrees, unclamped.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Facial proportions derived from the landmark mesh.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Proportions {
    /// Angle at the chin between the two jaw corners, degrees.
    pub jaw_angle: f64,
    pub eye_distance: f64,
    pub face_width: f64,
    pub face_height: f64,
    /// 0–100, floor-clamped at 0.
    pub symmetry_score: f64,
    /// Cheek-to-cheek distance as % of face width, unclamped above 0.
    pub cheekbone_prominence: f64,
}

/// The five normalized quality axes. Nominally 0–100, but only sharpness
/// and contrast are formula-clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub sharpness: f64,
    pub lighting: f64,
    pub pose: f64,
    pub jawline: f64,
    pub contrast: f64,
}

impl AxisScores {
    /// Canonical axis order: sharpness, lighting, pose, jawline, contrast.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.sharpness,
            self.lighting,
            self.pose,
            self.jawline,
            self.contrast,
        ]
    }

    pub fn min(&self) -> f64 {
        self.as_array().into_iter().fold(f64::INFINITY, f64::min)
    }

    pub fn mean(&self) -> f64 {
        self.as_array().into_iter().sum::<f64>() / 5.0
    }
}

/// Categorical style label, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLabel {
    God,
    Mogged,
    Sigma,
    Average,
    Meh,
    Trash,
}

impl StyleLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleLabel::God => "god",
            StyleLabel::Mogged => "mogged",
            StyleLabel::Sigma => "sigma",
            StyleLabel::Average => "average",
            StyleLabel::Meh => "meh",
            StyleLabel::Trash => "trash",
        }
    }
}

impl fmt::Display for StyleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cheap boolean technical flag, distinct from human-readable reason text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    VeryBlurry,
    Blurry,
    Dark,
    Overexposed,
    BadPose,
    WeakJaw,
    LowContrast,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::VeryBlurry => "very_blurry",
            Tag::Blurry => "blurry",
            Tag::Dark => "dark",
            Tag::Overexposed => "overexposed",
            Tag::BadPose => "bad_pose",
            Tag::WeakJaw => "weak_jaw",
            Tag::LowContrast => "low_contrast",
        }
    }
}

/// Output of a [`crate::classifier::Classifier`] over the five axes.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub label: StyleLabel,
    /// In [0, 1] on every branch.
    pub confidence: f64,
    /// Weighted-and-penalized aggregate of the axes, in [0, 100].
    pub composite: f64,
    /// Ordered technical flags.
    pub tags: Vec<Tag>,
    /// Human-readable justifications, positive before negative.
    pub reasons: Vec<String>,
}

/// Complete analysis result for one image.
///
/// Axes and sub-records are `None` on the early failure paths (no
/// detection, empty crop, undecodable image); pose and proportions stay
/// `None` whenever the landmark mesh was absent.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axes: Option<AxisScores>,
    pub label: StyleLabel,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub abstain: bool,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proportions: Option<Proportions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StyleLabel::Mogged).unwrap(), "\"mogged\"");
        assert_eq!(serde_json::to_string(&StyleLabel::God).unwrap(), "\"god\"");
    }

    #[test]
    fn test_label_as_str_matches_serde() {
        for label in [
            StyleLabel::God,
            StyleLabel::Mogged,
            StyleLabel::Sigma,
            StyleLabel::Average,
            StyleLabel::Meh,
            StyleLabel::Trash,
        ] {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
    }

    #[test]
    fn test_tag_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Tag::VeryBlurry).unwrap(), "\"very_blurry\"");
        assert_eq!(serde_json::to_string(&Tag::BadPose).unwrap(), "\"bad_pose\"");
    }

    #[test]
    fn test_axis_scores_min_and_mean() {
        let axes = AxisScores {
            sharpness: 90.0,
            lighting: 70.0,
            pose: 70.0,
            jawline: 80.0,
            contrast: 70.0,
        };
        assert_eq!(axes.min(), 70.0);
        assert!((axes.mean() - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_result_omits_optional_fields() {
        let result = AnalysisResult {
            ok: false,
            axes: None,
            label: StyleLabel::Meh,
            confidence: 0.0,
            reasons: vec!["no face detected".to_string()],
            abstain: true,
            model_version: "1.0.0".to_string(),
            pose: None,
            proportions: None,
            quality: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("\"axes\""));
        assert!(!json.contains("\"pose\""));
        assert!(!json.contains("\"proportions\""));
        assert!(!json.contains("\"quality\""));
        assert!(json.contains("\"abstain\":true"));
    }

    #[test]
    fn test_sharpness_map_not_serialized() {
        let report = QualityReport {
            sharpness_laplacian: 1.0,
            sharpness_tenengrad: 2.0,
            sharpness_fft: 0.3,
            contrast_rms: 4.0,
            exposure: ExposureReport {
                score: 100.0,
                mean_brightness: 128.0,
                overexposed_pct: 0.0,
                underexposed_pct: 0.0,
                exposure_diff: 0.0,
            },
            noise: 0.5,
            bokeh: 50.0,
            sharpness_map: SharpnessMap {
                width: 2,
                height: 2,
                values: vec![0.0; 4],
            },
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("sharpness_map"));
    }
}
