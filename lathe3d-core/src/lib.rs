/// Lathe3D Core Library - Profile curves, revolution meshes and projection
///
/// This library provides the geometric engine behind the viewer: affine
/// transforms, B-spline profile curves, revolution mesh generation, the
/// scene graph, camera projection and scene files.

pub mod error;
pub mod geometry;
pub mod projection;
pub mod revolution;
pub mod scene;
pub mod scene_file;
pub mod spline;
pub mod transform;

// Re-export commonly used types
pub use error::{Error, Result};
pub use geometry::{Edge, Mesh, MeshKind, RevolutionParams};
pub use projection::{ProjectedEdge, ProjectedMesh, Screen};
pub use scene::{CameraNode, MeshNode, NodeId, NodeKind, Scene, SceneGraph};
pub use spline::BSpline;
pub use transform::{Mat4, Vec4};
