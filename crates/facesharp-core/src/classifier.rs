//! Style classification over the five axes.
//!
//! The rule ladder is a pure, deterministic function: identical axes give
//! identical label, confidence, tags, reasons, and composite. A trainable
//! strategy slot exists behind the same trait but is never the active path.

use crate::types::{AxisScores, ClassificationResult, StyleLabel, Tag};

/// Strategy seam for label decisions over the five axes.
pub trait Classifier: Send {
    fn classify(&self, axes: &AxisScores) -> ClassificationResult;
}

// --- Composite weights, canonical axis order ---
const WEIGHTS: [f64; 5] = [0.30, 0.18, 0.20, 0.22, 0.10];

// --- Tag thresholds ---
const TH_BLURRY: f64 = 45.0;
const TH_VERY_BLURRY: f64 = 30.0;
const TH_DARK: f64 = 42.0;
const TH_OVEREXPOSED: f64 = 88.0;
const TH_BAD_POSE: f64 = 55.0;
const TH_WEAK_JAW: f64 = 52.0;
const TH_LOW_CONTRAST: f64 = 45.0;

/// A confidence band with a composite floor and per-axis floors.
struct Tier {
    label: StyleLabel,
    min_composite: f64,
    min_sharpness: f64,
    min_jawline: f64,
    min_pose: Option<f64>,
    min_axis: f64,
    conf_base: f64,
    conf_cap: f64,
}

const TIERS: [Tier; 3] = [
    Tier {
        label: StyleLabel::God,
        min_composite: 87.0,
        min_sharpness: 80.0,
        min_jawline: 75.0,
        min_pose: Some(75.0),
        min_axis: 0.0,
        conf_base: 0.75,
        conf_cap: 0.22,
    },
    Tier {
        label: StyleLabel::Mogged,
        min_composite: 78.0,
        min_sharpness: 72.0,
        min_jawline: 70.0,
        min_pose: Some(68.0),
        min_axis: 0.0,
        conf_base: 0.67,
        conf_cap: 0.25,
    },
    Tier {
        label: StyleLabel::Sigma,
        min_composite: 65.0,
        min_sharpness: 60.0,
        min_jawline: 58.0,
        min_pose: None,
        min_axis: 50.0,
        conf_base: 0.60,
        conf_cap: 0.27,
    },
];

/// The deterministic rule ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl Classifier for RuleClassifier {
    fn classify(&self, axes: &AxisScores) -> ClassificationResult {
        let tags = tags(axes);
        let reasons = reasons(axes);
        let composite = composite(axes);
        let (label, confidence) = decide(axes, composite, &tags);
        ClassificationResult {
            label,
            confidence,
            composite,
            tags,
            reasons,
        }
    }
}

/// Trainable alternate strategy. No training pipeline exists yet; without a
/// loaded model it scores through the same rule ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainedClassifier {
    rules: RuleClassifier,
}

impl Classifier for TrainedClassifier {
    fn classify(&self, axes: &AxisScores) -> ClassificationResult {
        self.rules.classify(axes)
    }
}

/// Weighted sum of the clamped axes minus soft penalties for weak axes.
///
/// The penalty cap `8.0 + 3.0 × (penalized − 1)` is re-applied after every
/// axis once any axis has been penalized — incremental, not a single final
/// clamp.
fn composite(axes: &AxisScores) -> f64 {
    let values = axes.as_array();

    let mut score = 0.0;
    for (value, weight) in values.iter().zip(WEIGHTS) {
        score += weight * value.clamp(0.0, 100.0);
    }

    // Lighting and contrast carry lighter penalty factors than
    // sharpness/pose/jawline.
    let entries = [
        (axes.sharpness, false),
        (axes.lighting, true),
        (axes.pose, false),
        (axes.jawline, false),
        (axes.contrast, true),
    ];

    let mut penalty = 0.0;
    let mut penalized = 0usize;
    for (value, soft) in entries {
        if value < 45.0 {
            penalized += 1;
            penalty += (45.0 - value) * if soft { 0.06 } else { 0.09 };
        }
        if value < 30.0 {
            penalty += (30.0 - value) * if soft { 0.12 } else { 0.18 };
        }
        if penalized > 0 {
            penalty = penalty.min(8.0 + 3.0 * (penalized - 1) as f64);
        }
    }

    (score - penalty).clamp(0.0, 100.0)
}

/// Ordered technical flags. `very_blurry` and `blurry` are exclusive.
fn tags(axes: &AxisScores) -> Vec<Tag> {
    let mut tags = Vec::new();
    if axes.sharpness < TH_VERY_BLURRY {
        tags.push(Tag::VeryBlurry);
    } else if axes.sharpness < TH_BLURRY {
        tags.push(Tag::Blurry);
    }
    if axes.lighting < TH_DARK {
        tags.push(Tag::Dark);
    }
    if axes.lighting > TH_OVEREXPOSED {
        tags.push(Tag::Overexposed);
    }
    if axes.pose < TH_BAD_POSE {
        tags.push(Tag::BadPose);
    }
    if axes.jawline < TH_WEAK_JAW {
        tags.push(Tag::WeakJaw);
    }
    if axes.contrast < TH_LOW_CONTRAST {
        tags.push(Tag::LowContrast);
    }
    tags
}

/// Human-readable justifications, at most one per axis, positive entries
/// before negative ones.
fn reasons(axes: &AxisScores) -> Vec<String> {
    let mut positive: Vec<&str> = Vec::new();
    let mut negative: Vec<&str> = Vec::new();
    if axes.sharpness >= 80.0 {
        positive.push("very high sharpness");
    }
    if axes.lighting >= 72.0 {
        positive.push("good lighting");
    }
    if axes.pose >= 80.0 {
        positive.push("good angle/pose");
    }
    if axes.jawline >= 76.0 {
        positive.push("strong jawline");
    }
    if axes.contrast >= 70.0 {
        positive.push("sufficient contrast");
    }
    if axes.sharpness < 45.0 {
        negative.push("low sharpness");
    }
    if axes.lighting < 45.0 {
        negative.push("insufficient lighting");
    }
    if axes.pose < 55.0 {
        negative.push("suboptimal pose/angle");
    }
    if axes.jawline < 52.0 {
        negative.push("weak jawline");
    }
    if axes.contrast < 45.0 {
        negative.push("low contrast");
    }
    positive
        .into_iter()
        .chain(negative)
        .map(str::to_string)
        .collect()
}

/// First-match label decision. Ordering and early exits are load-bearing.
fn decide(axes: &AxisScores, composite: f64, tags: &[Tag]) -> (StyleLabel, f64) {
    let min_axis = axes.min();
    let very_bad_axes = axes.as_array().iter().filter(|&&v| v < 30.0).count();

    // Hero override: crisp, well-posed faces skip the tier ladder. The
    // margin term can pull confidence below its base when the composite
    // sits under the branch reference point.
    if axes.sharpness >= 78.0 && axes.jawline >= 54.0 && axes.pose >= 60.0 {
        if composite >= 75.0 || (axes.sharpness >= 75.0 && axes.jawline >= 72.0) {
            let conf = 0.80 + ((composite - 80.0) / 20.0).min(0.20);
            return (StyleLabel::Mogged, conf.min(0.96));
        }
        let conf = 0.70 + ((composite - 70.0).max(0.0) / 20.0).min(0.20);
        return (StyleLabel::Sigma, conf.min(0.90));
    }

    if very_bad_axes >= 2
        || (composite < 45.0 && (tags.contains(&Tag::VeryBlurry) || tags.contains(&Tag::Dark)))
    {
        let conf = 0.68 + (55.0 - composite).max(0.0) / 55.0 * 0.25;
        return (StyleLabel::Trash, conf.min(0.96));
    }

    if composite < 50.0 {
        return (StyleLabel::Meh, 0.60);
    }
    if composite < 62.0 || min_axis < 48.0 {
        return (StyleLabel::Average, 0.55);
    }

    for tier in &TIERS {
        if composite >= tier.min_composite
            && axes.sharpness >= tier.min_sharpness
            && axes.jawline >= tier.min_jawline
            && tier.min_pose.map_or(true, |floor| axes.pose >= floor)
            && min_axis >= tier.min_axis
        {
            let margin = (composite - tier.min_composite).max(0.0);
            let conf = tier.conf_base + (margin / 15.0).min(tier.conf_cap);
            return (tier.label, conf.min(0.98));
        }
    }

    if composite >= 62.0 && min_axis >= 55.0 {
        (StyleLabel::Average, 0.54)
    } else {
        (StyleLabel::Meh, 0.56)
    }
}
