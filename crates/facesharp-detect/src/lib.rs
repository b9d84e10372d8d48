//! Face-mesh detector via ONNX Runtime.
//!
//! Runs a MediaPipe-style dense face-mesh model: one forward pass yields a
//! 468-point landmark tensor plus a face-presence score. Implements the
//! [`FaceDetector`] collaborator trait from facesharp-core — the handle is
//! non-reentrant and should be owned by a single worker.

use std::path::{Path, PathBuf};

use facesharp_core::mesh::MESH_POINT_COUNT;
use facesharp_core::types::{BoundingBox, FaceDetector, FaceLandmarks};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use thiserror::Error;

// --- Named constants ---
const MESH_INPUT_SIZE: usize = 192;
/// Minimum sigmoid(presence score) for a detection to count.
const MESH_PRESENCE_THRESHOLD: f32 = 0.5;
const MESH_MODEL_FILE: &str = "face_mesh.onnx";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — set FACESHARP_MODEL_DIR or place the face-mesh model in models/")]
    ModelNotFound(String),
    #[error("face-mesh model must expose landmark and score outputs, got {0}")]
    UnexpectedOutputs(usize),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Dense face-mesh detector.
pub struct MeshDetector {
    session: Session,
    num_outputs: usize,
}

impl MeshDetector {
    /// Load the face-mesh ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face-mesh model"
        );

        if num_outputs < 2 {
            return Err(DetectorError::UnexpectedOutputs(num_outputs));
        }

        Ok(Self { session, num_outputs })
    }

    fn run(&mut self, image: &DynamicImage) -> Result<Option<FaceLandmarks>, ort::Error> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }

        let rgb = image.to_rgb8();
        let (input, letterbox) = preprocess(&rgb);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        // Identify the landmark and score tensors by length; exports differ
        // in output ordering.
        let mut coords: Option<&[f32]> = None;
        let mut raw_score: Option<f32> = None;
        for idx in 0..self.num_outputs {
            let (_, data) = outputs[idx].try_extract_tensor::<f32>()?;
            if data.len() >= MESH_POINT_COUNT * 3 {
                coords = Some(data);
            } else if raw_score.is_none() {
                raw_score = data.first().copied();
            }
        }

        let (Some(coords), Some(raw_score)) = (coords, raw_score) else {
            tracing::warn!("face-mesh output tensors not recognized");
            return Ok(None);
        };

        let confidence = sigmoid(raw_score);
        if confidence < MESH_PRESENCE_THRESHOLD {
            tracing::debug!(confidence, "no face: presence score below threshold");
            return Ok(None);
        }

        let mesh = decode_mesh(coords, &letterbox);
        let bbox = bbox_from_mesh(&mesh);
        Ok(Some(FaceLandmarks {
            bbox,
            mesh: Some(mesh),
            confidence,
        }))
    }
}

impl FaceDetector for MeshDetector {
    /// Returns landmarks or an absence signal. Inference faults are logged
    /// and reported as absence — detection never errors.
    fn detect(&mut self, image: &DynamicImage) -> Option<FaceLandmarks> {
        match self.run(image) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "face-mesh inference failed");
                None
            }
        }
    }
}

/// Default on-disk location of the face-mesh model. Honors
/// `FACESHARP_MODEL_DIR`, then `XDG_DATA_HOME`, then `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FACESHARP_MODEL_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facesharp/models")
}

/// Default path of the face-mesh model file.
pub fn default_model_path() -> String {
    default_model_dir()
        .join(MESH_MODEL_FILE)
        .to_string_lossy()
        .into_owned()
}

/// Preprocess an RGB frame into a NCHW float tensor with letterbox padding,
/// normalized to [0, 1]. Resizes with bilinear interpolation.
fn preprocess(rgb: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;

    let scale_w = MESH_INPUT_SIZE as f32 / width as f32;
    let scale_h = MESH_INPUT_SIZE as f32 / height as f32;
    let scale = scale_w.min(scale_h);

    let new_w = ((width as f32 * scale).round() as usize).max(1);
    let new_h = ((height as f32 * scale).round() as usize).max(1);
    let pad_x = (MESH_INPUT_SIZE - new_w) as f32 / 2.0;
    let pad_y = (MESH_INPUT_SIZE - new_h) as f32 / 2.0;

    let letterbox = LetterboxInfo { scale, pad_x, pad_y };

    let pad_x_start = pad_x.floor() as usize;
    let pad_y_start = pad_y.floor() as usize;
    let inv_scale = 1.0 / scale;

    // Pad value 0 is already the tensor default.
    let mut tensor = Array4::<f32>::zeros((1, 3, MESH_INPUT_SIZE, MESH_INPUT_SIZE));

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * inv_scale - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * inv_scale - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = rgb.get_pixel(x0 as u32, y0 as u32).0;
            let tr = rgb.get_pixel(x1 as u32, y0 as u32).0;
            let bl = rgb.get_pixel(x0 as u32, y1 as u32).0;
            let br = rgb.get_pixel(x1 as u32, y1 as u32).0;

            for channel in 0..3 {
                let value = tl[channel] as f32 * (1.0 - fx) * (1.0 - fy)
                    + tr[channel] as f32 * fx * (1.0 - fy)
                    + bl[channel] as f32 * (1.0 - fx) * fy
                    + br[channel] as f32 * fx * fy;
                tensor[[0, channel, y + pad_y_start, x + pad_x_start]] = value / 255.0;
            }
        }
    }

    (tensor, letterbox)
}

/// Map the raw landmark tensor from model space back to pixel space.
/// z is pixel-scale-relative and is scaled like x.
fn decode_mesh(coords: &[f32], letterbox: &LetterboxInfo) -> Vec<[f32; 3]> {
    let mut mesh = Vec::with_capacity(MESH_POINT_COUNT);
    for i in 0..MESH_POINT_COUNT {
        let x = (coords[i * 3] - letterbox.pad_x) / letterbox.scale;
        let y = (coords[i * 3 + 1] - letterbox.pad_y) / letterbox.scale;
        let z = coords[i * 3 + 2] / letterbox.scale;
        mesh.push([x, y, z]);
    }
    mesh
}

/// Bounding box spanned by the landmark extent.
fn bbox_from_mesh(mesh: &[[f32; 3]]) -> BoundingBox {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for point in mesh {
        min_x = min_x.min(point[0]);
        min_y = min_y.min(point[1]);
        max_x = max_x.max(point[0]);
        max_y = max_y.max(point[1]);
    }
    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_output_shape() {
        let rgb = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
        let (tensor, _) = preprocess(&rgb);
        assert_eq!(tensor.shape(), &[1, 3, MESH_INPUT_SIZE, MESH_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let rgb = RgbImage::from_pixel(192, 192, Rgb([255, 0, 128]));
        let (tensor, letterbox) = preprocess(&rgb);
        assert_eq!(letterbox.scale, 1.0);
        assert!((tensor[[0, 0, 96, 96]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 96, 96]].abs() < 1e-6);
        assert!((tensor[[0, 2, 96, 96]] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_letterbox_padding_is_zero() {
        // 320×240 letterboxed into 192×192: vertical bands above and below
        // the resized content stay at the zero pad value.
        let rgb = RgbImage::from_pixel(320, 240, Rgb([200, 200, 200]));
        let (tensor, letterbox) = preprocess(&rgb);
        assert!(letterbox.pad_y > 0.0);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 0, MESH_INPUT_SIZE - 1, 0]], 0.0);
        // Center is inside the content.
        assert!((tensor[[0, 0, 96, 96]] - 200.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let width = 320.0f32;
        let height = 240.0f32;
        let scale = (MESH_INPUT_SIZE as f32 / width).min(MESH_INPUT_SIZE as f32 / height);
        let new_w = (width * scale).round();
        let new_h = (height * scale).round();
        let letterbox = LetterboxInfo {
            scale,
            pad_x: (MESH_INPUT_SIZE as f32 - new_w) / 2.0,
            pad_y: (MESH_INPUT_SIZE as f32 - new_h) / 2.0,
        };

        // A landmark at pixel (100, 50) mapped into model space and back.
        let model_x = 100.0 * scale + letterbox.pad_x;
        let model_y = 50.0 * scale + letterbox.pad_y;
        let mut coords = vec![0.0f32; MESH_POINT_COUNT * 3];
        coords[0] = model_x;
        coords[1] = model_y;
        coords[2] = 4.0;

        let mesh = decode_mesh(&coords, &letterbox);
        assert!((mesh[0][0] - 100.0).abs() < 0.1, "x: {}", mesh[0][0]);
        assert!((mesh[0][1] - 50.0).abs() < 0.1, "y: {}", mesh[0][1]);
        assert!((mesh[0][2] - 4.0 / scale).abs() < 1e-3);
        assert_eq!(mesh.len(), MESH_POINT_COUNT);
    }

    #[test]
    fn test_bbox_from_mesh_extent() {
        let mut mesh = vec![[50.0f32, 60.0, 0.0]; MESH_POINT_COUNT];
        mesh[10] = [10.0, 20.0, 0.0];
        mesh[200] = [110.0, 140.0, 0.0];
        let bbox = bbox_from_mesh(&mesh);
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 20.0);
        assert_eq!(bbox.width, 100.0);
        assert_eq!(bbox.height, 120.0);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_load_missing_model_fails_fast() {
        let result = MeshDetector::load("/nonexistent/face_mesh.onnx");
        assert!(matches!(result, Err(DetectorError::ModelNotFound(_))));
    }
}
