//! Analysis orchestrator: detection → crop → quality metrics → geometry →
//! axes → abstention check → classification → reason assembly.
//!
//! Every stage failure short-circuits into a structured abstain result;
//! the pipeline never errors for image content.

use std::path::Path;

use image::DynamicImage;

use crate::axes;
use crate::classifier::{Classifier, RuleClassifier};
use crate::geometry;
use crate::quality;
use crate::types::{
    AnalysisResult, AxisScores, BoundingBox, FaceDetector, FaceLandmarks, Pose, QualityReport,
    StyleLabel,
};
use crate::MODEL_VERSION;

// --- Abstention gates ---
const MIN_DETECTOR_CONFIDENCE: f32 = 0.3;
const MAX_ABS_YAW: f64 = 45.0;
const MAX_ABS_PITCH: f64 = 45.0;
const MIN_MEAN_AXIS: f64 = 20.0;

// --- Appended reason-note thresholds ---
const NOTE_TILT_DEGREES: f64 = 15.0;
const NOTE_EXPOSURE_DIFF: f64 = 10.0;
const NOTE_SYMMETRY: f64 = 70.0;

/// The analysis pipeline. Owns the detector handle for its lifetime; the
/// handle is released when the analyzer is dropped.
pub struct FaceAnalyzer {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn Classifier>,
    model_version: String,
}

impl FaceAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            detector,
            classifier: Box::new(RuleClassifier),
            model_version: MODEL_VERSION.to_string(),
        }
    }

    /// Swap the classification strategy.
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Decode and analyze an image file.
    pub fn analyze_file(&mut self, path: &Path) -> AnalysisResult {
        match image::open(path) {
            Ok(image) => self.analyze(&image),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "image decode failed");
                self.abstain_result("could not decode image")
            }
        }
    }

    /// Analyze a decoded image. Always returns a result; failures and
    /// low-quality inputs come back as abstain results, never errors.
    pub fn analyze(&mut self, image: &DynamicImage) -> AnalysisResult {
        let Some(face) = self.detector.detect(image) else {
            return self.abstain_result("no face detected");
        };

        let Some(crop) = crop_face(image, &face) else {
            return self.abstain_result("could not extract face region");
        };

        let gray = crop.to_luma8();
        let crop_bbox = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: gray.width() as f32,
            height: gray.height() as f32,
        };
        let quality = quality::report(&gray, &crop_bbox);

        let (pose, proportions) = match face.mesh.as_deref() {
            Some(mesh) => (
                Some(geometry::pose(mesh)),
                Some(geometry::proportions(mesh)),
            ),
            None => (None, None),
        };

        let axes = axes::aggregate(
            &quality,
            pose.as_ref().map(geometry::pose_score),
            proportions
                .as_ref()
                .map(|p| geometry::jawline_score(p.jaw_angle, p.symmetry_score)),
        );

        let abstain = should_abstain(&axes, face.confidence, pose.as_ref());
        let classification = self.classifier.classify(&axes);
        let reasons = assemble_reasons(
            classification.reasons,
            pose.as_ref(),
            &quality,
            proportions.as_ref().map(|p| p.symmetry_score),
        );

        tracing::debug!(
            label = %classification.label,
            confidence = classification.confidence,
            composite = classification.composite,
            abstain,
            "analysis complete"
        );

        AnalysisResult {
            ok: true,
            axes: Some(axes),
            label: classification.label,
            confidence: classification.confidence,
            reasons,
            abstain,
            model_version: self.model_version.clone(),
            pose,
            proportions,
            quality: Some(quality),
        }
    }

    fn abstain_result(&self, reason: &str) -> AnalysisResult {
        AnalysisResult {
            ok: false,
            axes: None,
            label: StyleLabel::Meh,
            confidence: 0.0,
            reasons: vec![reason.to_string()],
            abstain: true,
            model_version: self.model_version.clone(),
            pose: None,
            proportions: None,
            quality: None,
        }
    }
}

/// Extract the face region clamped to the image bounds. `None` for a
/// zero-area region.
fn crop_face(image: &DynamicImage, face: &FaceLandmarks) -> Option<DynamicImage> {
    let img_w = image.width() as f32;
    let img_h = image.height() as f32;
    let x0 = face.bbox.x.max(0.0);
    let y0 = face.bbox.y.max(0.0);
    let x1 = (face.bbox.x + face.bbox.width).min(img_w);
    let y1 = (face.bbox.y + face.bbox.height).min(img_h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let width = (x1 as u32).saturating_sub(x0);
    let height = (y1 as u32).saturating_sub(y0);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image.crop_imm(x0, y0, width, height))
}

fn should_abstain(axes: &AxisScores, detector_confidence: f32, pose: Option<&Pose>) -> bool {
    if detector_confidence < MIN_DETECTOR_CONFIDENCE {
        return true;
    }
    if let Some(pose) = pose {
        if pose.yaw.abs() > MAX_ABS_YAW || pose.pitch.abs() > MAX_ABS_PITCH {
            return true;
        }
    }
    axes.mean() < MIN_MEAN_AXIS
}

/// Append independent technical notes after the classifier's reasons.
fn assemble_reasons(
    mut reasons: Vec<String>,
    pose: Option<&Pose>,
    quality: &QualityReport,
    symmetry_score: Option<f64>,
) -> Vec<String> {
    if let Some(pose) = pose {
        if pose.yaw.abs() > NOTE_TILT_DEGREES {
            reasons.push(format!("head turned to the side (yaw≈{:.1}°)", pose.yaw));
        }
        if pose.pitch.abs() > NOTE_TILT_DEGREES {
            reasons.push(format!("head tilted (pitch≈{:.1}°)", pose.pitch));
        }
    }

    let diff = quality.exposure.exposure_diff;
    if diff.abs() > NOTE_EXPOSURE_DIFF {
        let sign = if diff > 0.0 { "+" } else { "" };
        reasons.push(format!("exposure {sign}{diff:.0}"));
    }

    if let Some(symmetry) = symmetry_score {
        if symmetry < NOTE_SYMMETRY {
            reasons.push("low facial symmetry".to_string());
        }
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh;
    use crate::types::ExposureReport;
    use image::{GrayImage, Luma};

    /// Detector stub returning a canned response.
    struct StubDetector {
        response: Option<FaceLandmarks>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _image: &DynamicImage) -> Option<FaceLandmarks> {
            self.response.clone()
        }
    }

    fn analyzer(response: Option<FaceLandmarks>) -> FaceAnalyzer {
        FaceAnalyzer::new(Box::new(StubDetector { response }))
    }

    fn test_image() -> DynamicImage {
        // 64×64 with texture so the quality metrics have signal.
        let gray = GrayImage::from_fn(64, 64, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]));
        DynamicImage::ImageLuma8(gray)
    }

    fn face(confidence: f32, with_mesh: bool) -> FaceLandmarks {
        let mesh = with_mesh.then(|| {
            let mut points = vec![[0.0f32; 3]; mesh::MESH_POINT_COUNT];
            points[mesh::LEFT_EYE_OUTER] = [20.0, 24.0, 0.0];
            points[mesh::RIGHT_EYE_OUTER] = [44.0, 24.0, 0.0];
            points[mesh::NOSE_TIP] = [32.0, 34.0, 0.0];
            points[mesh::CHIN] = [32.0, 52.0, 0.0];
            points[mesh::LEFT_JAW] = [18.0, 46.0, 0.0];
            points[mesh::RIGHT_JAW] = [46.0, 46.0, 0.0];
            points[mesh::LEFT_MOUTH] = [26.0, 44.0, 0.0];
            points[mesh::RIGHT_MOUTH] = [38.0, 44.0, 0.0];
            points[mesh::LEFT_CHEEKBONE] = [19.0, 32.0, 0.0];
            points[mesh::RIGHT_CHEEKBONE] = [45.0, 32.0, 0.0];
            points[mesh::FOREHEAD] = [32.0, 10.0, 0.0];
            points
        });
        FaceLandmarks {
            bbox: BoundingBox { x: 8.0, y: 8.0, width: 48.0, height: 48.0 },
            mesh,
            confidence,
        }
    }

    #[test]
    fn test_no_face_abstains() {
        let result = analyzer(None).analyze(&test_image());
        assert!(!result.ok);
        assert!(result.abstain);
        assert_eq!(result.reasons, vec!["no face detected"]);
        assert_eq!(result.label, StyleLabel::Meh);
        assert_eq!(result.confidence, 0.0);
        assert!(result.axes.is_none());
        assert!(result.quality.is_none());
    }

    #[test]
    fn test_empty_crop_abstains() {
        let mut landmarks = face(0.9, false);
        landmarks.bbox = BoundingBox { x: 200.0, y: 200.0, width: 10.0, height: 10.0 };
        let result = analyzer(Some(landmarks)).analyze(&test_image());
        assert!(!result.ok);
        assert!(result.abstain);
        assert_eq!(result.reasons, vec!["could not extract face region"]);
    }

    #[test]
    fn test_zero_area_bbox_abstains() {
        let mut landmarks = face(0.9, false);
        landmarks.bbox = BoundingBox { x: 10.0, y: 10.0, width: 0.0, height: 20.0 };
        let result = analyzer(Some(landmarks)).analyze(&test_image());
        assert!(!result.ok);
        assert_eq!(result.reasons, vec!["could not extract face region"]);
    }

    #[test]
    fn test_mesh_absent_fields_stay_none() {
        let result = analyzer(Some(face(0.9, false))).analyze(&test_image());
        assert!(result.ok);
        assert!(result.pose.is_none());
        assert!(result.proportions.is_none());
        let axes = result.axes.expect("axes present on success");
        assert_eq!(axes.pose, 50.0);
        assert_eq!(axes.jawline, 50.0);
        assert!(result.quality.is_some());
    }

    #[test]
    fn test_mesh_present_populates_geometry() {
        let result = analyzer(Some(face(0.9, true))).analyze(&test_image());
        assert!(result.ok);
        assert!(result.pose.is_some());
        assert!(result.proportions.is_some());
        let axes = result.axes.unwrap();
        assert_ne!(axes.pose, 50.0);
    }

    #[test]
    fn test_low_detector_confidence_flips_abstain() {
        let confident = analyzer(Some(face(0.31, false))).analyze(&test_image());
        assert!(!confident.abstain);

        let shaky = analyzer(Some(face(0.29, false))).analyze(&test_image());
        assert!(shaky.ok);
        assert!(shaky.abstain);
    }

    #[test]
    fn test_abstain_on_extreme_pose() {
        let axes = AxisScores { sharpness: 60.0, lighting: 60.0, pose: 60.0, jawline: 60.0, contrast: 60.0 };
        let straight = Pose { yaw: 10.0, pitch: 45.0, roll: 0.0 };
        assert!(!should_abstain(&axes, 0.9, Some(&straight)));

        let turned = Pose { yaw: 46.0, pitch: 0.0, roll: 0.0 };
        assert!(should_abstain(&axes, 0.9, Some(&turned)));

        let nodding = Pose { yaw: 0.0, pitch: -46.0, roll: 0.0 };
        assert!(should_abstain(&axes, 0.9, Some(&nodding)));
    }

    #[test]
    fn test_abstain_on_low_mean_axes() {
        let weak = AxisScores { sharpness: 10.0, lighting: 10.0, pose: 30.0, jawline: 30.0, contrast: 10.0 };
        assert!(should_abstain(&weak, 0.9, None));

        let borderline = AxisScores { sharpness: 20.0, lighting: 20.0, pose: 20.0, jawline: 20.0, contrast: 20.0 };
        // Mean exactly 20 is not below the gate.
        assert!(!should_abstain(&borderline, 0.9, None));
    }

    #[test]
    fn test_reason_notes_appended_after_classifier_reasons() {
        let quality = QualityReport {
            sharpness_laplacian: 0.0,
            sharpness_tenengrad: 0.0,
            sharpness_fft: 0.0,
            contrast_rms: 0.0,
            exposure: ExposureReport {
                score: 70.0,
                mean_brightness: 158.0,
                overexposed_pct: 0.0,
                underexposed_pct: 0.0,
                exposure_diff: 30.0,
            },
            noise: 0.0,
            bokeh: 50.0,
            sharpness_map: Default::default(),
        };
        let pose = Pose { yaw: 21.3, pitch: -17.0, roll: 2.0 };
        let reasons = assemble_reasons(
            vec!["good lighting".to_string()],
            Some(&pose),
            &quality,
            Some(55.0),
        );
        assert_eq!(
            reasons,
            vec![
                "good lighting",
                "head turned to the side (yaw≈21.3°)",
                "head tilted (pitch≈-17.0°)",
                "exposure +30",
                "low facial symmetry",
            ]
        );
    }

    #[test]
    fn test_negative_exposure_note_keeps_sign() {
        let quality = QualityReport {
            sharpness_laplacian: 0.0,
            sharpness_tenengrad: 0.0,
            sharpness_fft: 0.0,
            contrast_rms: 0.0,
            exposure: ExposureReport {
                score: 70.0,
                mean_brightness: 98.0,
                overexposed_pct: 0.0,
                underexposed_pct: 0.0,
                exposure_diff: -30.0,
            },
            noise: 0.0,
            bokeh: 50.0,
            sharpness_map: Default::default(),
        };
        let reasons = assemble_reasons(Vec::new(), None, &quality, None);
        assert_eq!(reasons, vec!["exposure -30"]);
    }

    #[test]
    fn test_notes_quiet_within_thresholds() {
        let quality = QualityReport {
            sharpness_laplacian: 0.0,
            sharpness_tenengrad: 0.0,
            sharpness_fft: 0.0,
            contrast_rms: 0.0,
            exposure: ExposureReport {
                score: 95.0,
                mean_brightness: 134.0,
                overexposed_pct: 0.0,
                underexposed_pct: 0.0,
                exposure_diff: 6.0,
            },
            noise: 0.0,
            bokeh: 50.0,
            sharpness_map: Default::default(),
        };
        let pose = Pose { yaw: 8.0, pitch: -14.9, roll: 30.0 };
        let reasons = assemble_reasons(Vec::new(), Some(&pose), &quality, Some(92.0));
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_crop_clamps_to_image_bounds() {
        let image = test_image();
        let landmarks = FaceLandmarks {
            bbox: BoundingBox { x: -10.0, y: -10.0, width: 40.0, height: 40.0 },
            mesh: None,
            confidence: 0.9,
        };
        let crop = crop_face(&image, &landmarks).expect("clamped crop");
        assert_eq!(crop.width(), 30);
        assert_eq!(crop.height(), 30);
    }

    #[test]
    fn test_analyze_file_missing_path_abstains() {
        let mut analyzer = analyzer(Some(face(0.9, false)));
        let result = analyzer.analyze_file(Path::new("/nonexistent/face.jpg"));
        assert!(!result.ok);
        assert!(result.abstain);
        assert_eq!(result.reasons, vec!["could not decode image"]);
    }

    #[test]
    fn test_model_version_stamped() {
        let result = analyzer(None).analyze(&test_image());
        assert_eq!(result.model_version, crate::MODEL_VERSION);
    }
}
