//! facesharp-core — face quality scoring and style classification.
//!
//! Turns a detected face's geometry and image-quality signals into a single
//! categorical style label with a confidence score and human-readable
//! reasons. The pipeline is: quality metrics over the face crop, geometry
//! over the dense landmark mesh, aggregation into five axes, and a
//! deterministic rule classifier with an abstention gate.
//!
//! Face detection itself is an external collaborator behind the
//! [`FaceDetector`] trait — this crate never runs a model.

pub mod analyzer;
pub mod axes;
pub mod classifier;
pub mod geometry;
pub mod mesh;
pub mod quality;
pub mod types;

pub use analyzer::FaceAnalyzer;
pub use classifier::{Classifier, RuleClassifier, TrainedClassifier};
pub use types::{
    AnalysisResult, AxisScores, BoundingBox, ClassificationResult, FaceDetector, FaceLandmarks,
    Pose, Proportions, QualityReport, StyleLabel, Tag,
};

/// Version tag stamped into every [`AnalysisResult`].
pub const MODEL_VERSION: &str = "1.0.0";
