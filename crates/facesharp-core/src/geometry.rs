//! Face geometry: pose angles, jawline, and proportions from the dense
//! landmark mesh.
//!
//! Every function guards its own degenerate inputs — a short mesh, a zero
//! face width, colinear jaw vectors — and returns defined defaults instead
//! of faulting.

use crate::mesh;
use crate::types::{Pose, Proportions};

/// Jaw angle reported when the mesh is unusable.
const DEFAULT_JAW_ANGLE: f64 = 90.0;
/// Jaw angle considered ideal by the jawline score.
const IDEAL_JAW_ANGLE: f64 = 70.0;

/// Occlusion flags. Detection is a declared stub and always reports
/// nothing occluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occlusions {
    pub glasses: bool,
    pub mask: bool,
    pub hand: bool,
}

/// Head pose from the landmark mesh; zeros when the mesh is too short.
pub fn pose(mesh_points: &[[f32; 3]]) -> Pose {
    if mesh_points.len() < mesh::MESH_POINT_COUNT {
        return Pose { yaw: 0.0, pitch: 0.0, roll: 0.0 };
    }

    let left_eye = point2(mesh_points, mesh::LEFT_EYE_OUTER);
    let right_eye = point2(mesh_points, mesh::RIGHT_EYE_OUTER);
    let nose_tip = point2(mesh_points, mesh::NOSE_TIP);
    let chin = point2(mesh_points, mesh::CHIN);

    // Roll: tilt of the eye-to-eye vector against horizontal.
    let eye_vec = sub(right_eye, left_eye);
    let roll = eye_vec.1.atan2(eye_vec.0).to_degrees();

    // Pitch: vertical component of nose-tip→chin against its own length.
    let vertical = sub(chin, nose_tip);
    let pitch = vertical.1.atan2(norm(vertical)).to_degrees();

    // Yaw: horizontal offset of the nose tip from the eye center, against
    // half the inter-eye distance.
    let eye_center = ((left_eye.0 + right_eye.0) / 2.0, (left_eye.1 + right_eye.1) / 2.0);
    let nose_offset_x = nose_tip.0 - eye_center.0;
    let eye_width = norm(eye_vec);
    let yaw = nose_offset_x.atan2(eye_width / 2.0).to_degrees();

    Pose { yaw, pitch, roll }
}

/// Angle at the chin between the two jaw corners, degrees.
pub fn jaw_angle(mesh_points: &[[f32; 3]]) -> f64 {
    if mesh_points.len() < mesh::MESH_POINT_COUNT {
        return DEFAULT_JAW_ANGLE;
    }

    let chin = point2(mesh_points, mesh::CHIN);
    let v1 = sub(point2(mesh_points, mesh::LEFT_JAW), chin);
    let v2 = sub(point2(mesh_points, mesh::RIGHT_JAW), chin);

    let n1 = norm(v1);
    let n2 = norm(v2);
    if n1 == 0.0 || n2 == 0.0 {
        return DEFAULT_JAW_ANGLE;
    }

    let cos_angle = ((v1.0 * v2.0 + v1.1 * v2.1) / (n1 * n2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Facial proportions from the landmark mesh; defaults when too short.
pub fn proportions(mesh_points: &[[f32; 3]]) -> Proportions {
    if mesh_points.len() < mesh::MESH_POINT_COUNT {
        return Proportions {
            jaw_angle: DEFAULT_JAW_ANGLE,
            eye_distance: 0.0,
            face_width: 0.0,
            face_height: 0.0,
            symmetry_score: 0.0,
            cheekbone_prominence: 0.0,
        };
    }

    let left_jaw = point2(mesh_points, mesh::LEFT_JAW);
    let right_jaw = point2(mesh_points, mesh::RIGHT_JAW);

    let eye_distance = distance(
        point2(mesh_points, mesh::LEFT_EYE_OUTER),
        point2(mesh_points, mesh::RIGHT_EYE_OUTER),
    );
    let face_width = distance(left_jaw, right_jaw);
    let face_height = distance(
        point2(mesh_points, mesh::FOREHEAD),
        point2(mesh_points, mesh::CHIN),
    );

    // Symmetry: mirror the right-side landmarks across the vertical face
    // midline and measure how far they land from their left counterparts.
    let pairs = [
        (mesh::LEFT_EYE_OUTER, mesh::RIGHT_EYE_OUTER),
        (mesh::LEFT_JAW, mesh::RIGHT_JAW),
        (mesh::LEFT_MOUTH, mesh::RIGHT_MOUTH),
        (mesh::LEFT_CHEEKBONE, mesh::RIGHT_CHEEKBONE),
    ];
    let center_x = (left_jaw.0 + right_jaw.0) / 2.0;
    let avg_distance = pairs
        .iter()
        .map(|&(left, right)| {
            let lp = point2(mesh_points, left);
            let rp = point2(mesh_points, right);
            let mirrored = (2.0 * center_x - rp.0, rp.1);
            distance(lp, mirrored)
        })
        .sum::<f64>()
        / pairs.len() as f64;
    let symmetry_score = if face_width > 0.0 {
        (100.0 - avg_distance / face_width * 100.0).max(0.0)
    } else {
        0.0
    };

    let cheek_width = distance(
        point2(mesh_points, mesh::LEFT_CHEEKBONE),
        point2(mesh_points, mesh::RIGHT_CHEEKBONE),
    );
    let cheekbone_prominence = if face_width > 0.0 {
        cheek_width / face_width * 100.0
    } else {
        0.0
    };

    Proportions {
        jaw_angle: jaw_angle(mesh_points),
        eye_distance,
        face_width,
        face_height,
        symmetry_score,
        cheekbone_prominence,
    }
}

/// Pose quality, 0–100. Ideal at yaw = pitch = roll = 0.
pub fn pose_score(pose: &Pose) -> f64 {
    let yaw_score = (100.0 - pose.yaw.abs() * 2.0).max(0.0);
    let pitch_score = (100.0 - pose.pitch.abs() * 2.0).max(0.0);
    let roll_score = (100.0 - pose.roll.abs() * 2.0).max(0.0);
    yaw_score * 0.4 + pitch_score * 0.4 + roll_score * 0.2
}

/// Jawline quality, 0–100: distance from the ideal jaw angle blended with
/// facial symmetry.
pub fn jawline_score(jaw_angle: f64, symmetry_score: f64) -> f64 {
    let angle_score = (100.0 - (jaw_angle - IDEAL_JAW_ANGLE).abs() * 2.0).max(0.0);
    angle_score * 0.6 + symmetry_score * 0.4
}

/// Occlusion detection stub.
pub fn occlusions(_mesh_points: &[[f32; 3]]) -> Occlusions {
    Occlusions::default()
}

fn point2(mesh_points: &[[f32; 3]], index: usize) -> (f64, f64) {
    let p = mesh_points[index];
    (f64::from(p[0]), f64::from(p[1]))
}

fn sub(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0 - b.0, a.1 - b.1)
}

fn norm(v: (f64, f64)) -> f64 {
    (v.0 * v.0 + v.1 * v.1).sqrt()
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    norm(sub(a, b))
}
