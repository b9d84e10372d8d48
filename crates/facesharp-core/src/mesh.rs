//! Dense landmark mesh topology.
//!
//! The detection collaborator supplies a fixed-topology 468-point face mesh
//! (MediaPipe Face Mesh ordering). Geometry only ever reads the named
//! semantic points below; everything else is carried opaquely.

/// Number of points in the dense landmark mesh.
pub const MESH_POINT_COUNT: usize = 468;

pub const NOSE_TIP: usize = 4;
pub const FOREHEAD: usize = 10;
pub const LEFT_EYE_OUTER: usize = 33;
pub const LEFT_MOUTH: usize = 61;
pub const LEFT_CHEEKBONE: usize = 116;
pub const LEFT_EYE_INNER: usize = 133;
pub const CHIN: usize = 152;
pub const LEFT_JAW: usize = 172;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_MOUTH: usize = 291;
pub const RIGHT_CHEEKBONE: usize = 345;
pub const RIGHT_EYE_INNER: usize = 362;
pub const RIGHT_JAW: usize = 397;
