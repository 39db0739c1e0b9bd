/// Camera projection, near/far clipping and screen mapping
use crate::error::{Error, Result};
use crate::geometry::Edge;
use crate::scene::{CameraNode, NodeId, NodeKind, Scene, SceneGraph};
use crate::transform::{point, Mat4, Vec4};

/// Pixel dimensions of the render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Screen {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Map a projected point from viewport units to pixels.
    ///
    /// Offsets are truncated toward zero and saturate at the `i32` range;
    /// NaN maps to the center.
    pub fn to_pixel(&self, v: &Vec4, camera: &CameraNode) -> (i32, i32) {
        let (cx, cy) = self.center();
        let x = (v.x * self.width as f64 / camera.viewport_width) as i32;
        let y = (v.y * self.height as f64 / camera.viewport_height) as i32;
        (x.saturating_add(cx), y.saturating_add(cy))
    }
}

/// Whether a projected point lies between the clipping planes
pub fn is_visible(v: &Vec4) -> bool {
    v.z > 0.0 && v.z <= 1.0
}

/// An edge that survived clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedEdge {
    pub edge: Edge,
    pub start: (i32, i32),
    pub end: (i32, i32),
    /// Depth of the nearer endpoint, in `(0, 1]`
    pub min_z: f64,
}

impl ProjectedEdge {
    /// Display weight in `[0, 1)`: nearer edges weigh more
    pub fn weight(&self) -> f64 {
        1.0 - self.min_z
    }
}

/// A unit axis of a mesh node's coordinate system, drawn from its origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLine {
    pub axis: usize,
    pub start: (i32, i32),
    pub end: (i32, i32),
}

/// Result of pushing one mesh node through a camera
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedMesh {
    pub node: NodeId,
    /// Every vertex after the perspective divide, clipped or not
    pub vertices: Vec<Vec4>,
    pub edges: Vec<ProjectedEdge>,
    pub axes: Vec<AxisLine>,
}

/// Full projection for a mesh node seen through a camera:
/// `viewport * camera_global * mesh_global * bounding_scale`
pub fn projection_matrix(graph: &SceneGraph, camera: NodeId, mesh: NodeId) -> Result<Mat4> {
    let viewport = graph
        .camera(camera)
        .ok_or_else(|| not_a("camera", camera))?
        .viewport_transform();
    let bound_scale = graph
        .mesh_node(mesh)
        .ok_or_else(|| not_a("mesh", mesh))?
        .bounding_scale_transform();

    Ok(viewport
        .multiply(&graph.global_transform(camera))
        .multiply(&graph.global_transform(mesh))
        .multiply(&bound_scale))
}

/// Project one mesh node. A node without a mesh projects to nothing.
pub fn project_mesh_node(
    graph: &SceneGraph,
    camera: NodeId,
    mesh: NodeId,
    screen: Screen,
) -> Result<ProjectedMesh> {
    let matrix = projection_matrix(graph, camera, mesh)?;
    let params = graph.camera(camera).ok_or_else(|| not_a("camera", camera))?;
    let Some(source) = graph.mesh_node(mesh).and_then(|node| node.mesh.as_ref()) else {
        return Ok(ProjectedMesh {
            node: mesh,
            vertices: Vec::new(),
            edges: Vec::new(),
            axes: Vec::new(),
        });
    };

    let vertices: Vec<Vec4> = source
        .vertices
        .iter()
        .map(|v| matrix.transform(v, true))
        .collect();

    let edges = source
        .edges
        .iter()
        .filter_map(|&edge| {
            let (a, b) = (vertices.get(edge.start)?, vertices.get(edge.end)?);
            if !is_visible(a) || !is_visible(b) {
                return None;
            }
            Some(ProjectedEdge {
                edge,
                start: screen.to_pixel(a, params),
                end: screen.to_pixel(b, params),
                min_z: a.z.min(b.z),
            })
        })
        .collect();

    Ok(ProjectedMesh {
        node: mesh,
        vertices,
        edges,
        axes: project_axes(&matrix, params, screen),
    })
}

/// Project every mesh node in the scene through `camera`, in tree order
pub fn project_scene(scene: &Scene, camera: NodeId, screen: Screen) -> Result<Vec<ProjectedMesh>> {
    let graph = scene.graph();
    graph
        .descendants(scene.root())
        .into_iter()
        .filter(|&id| matches!(graph.node(id).kind, NodeKind::Mesh(_)))
        .map(|id| project_mesh_node(graph, camera, id, screen))
        .collect()
}

/// Unit X, Y and Z axes from the mesh origin; axes with a clipped end are skipped
fn project_axes(matrix: &Mat4, camera: &CameraNode, screen: Screen) -> Vec<AxisLine> {
    let origin = matrix.transform(&point(0.0, 0.0, 0.0), true);
    if !is_visible(&origin) {
        return Vec::new();
    }
    let start = screen.to_pixel(&origin, camera);

    [point(1.0, 0.0, 0.0), point(0.0, 1.0, 0.0), point(0.0, 0.0, 1.0)]
        .iter()
        .enumerate()
        .filter_map(|(axis, tip)| {
            let tip = matrix.transform(tip, true);
            is_visible(&tip).then(|| AxisLine {
                axis,
                start,
                end: screen.to_pixel(&tip, camera),
            })
        })
        .collect()
}

fn not_a(kind: &str, id: NodeId) -> Error {
    Error::InvalidArgument(format!("node {} is not a {} node", id.index(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, MeshKind};
    use crate::scene::MeshNode;
    use approx::assert_relative_eq;

    fn single_edge_scene(a: Vec4, b: Vec4, camera_z: f64) -> Scene {
        let mut scene = Scene::empty();
        let mesh = Mesh::from_buffers(vec![a, b], vec![Edge::new(0, 1)], MeshKind::Plain).unwrap();
        scene.set_mesh(Some(mesh));
        let camera = scene.create_camera();
        scene.graph_mut().translate(camera, 0.0, 0.0, camera_z);
        scene
    }

    fn project_model(scene: &Scene, camera: NodeId, screen: Screen) -> ProjectedMesh {
        project_mesh_node(scene.graph(), camera, scene.mesh_node(), screen).unwrap()
    }

    #[test]
    fn test_origin_maps_to_screen_center() {
        let scene = Scene::with_cube();
        let camera = scene.cameras()[0];
        let screen = Screen::new(801, 600);

        let matrix = projection_matrix(scene.graph(), camera, scene.mesh_node()).unwrap();
        let origin = matrix.transform(&point(0.0, 0.0, 0.0), true);
        assert!(is_visible(&origin));
        assert_relative_eq!(origin.z, 16.0 / 37.0, epsilon = 1e-12);

        let pixel = screen.to_pixel(&origin, scene.camera(camera).unwrap());
        assert_eq!(pixel, (400, 300));
        assert_eq!(pixel, screen.center());
    }

    #[test]
    fn test_origin_on_eye_plane_is_clipped() {
        // Identity camera: the origin sits on the eye plane where w = 0
        let mut scene = Scene::empty();
        let camera = scene.create_camera();
        let matrix = projection_matrix(scene.graph(), camera, scene.mesh_node()).unwrap();
        let origin = matrix.transform(&point(0.0, 0.0, 0.0), true);
        assert!(!is_visible(&origin));

        let screen = Screen::new(640, 480);
        let pixel = screen.to_pixel(&origin, scene.camera(camera).unwrap());
        assert_eq!(pixel, screen.center());
    }

    #[test]
    fn test_degenerate_viewport_does_not_overflow() {
        let mut scene = single_edge_scene(point(-1.0, 1.0, 0.0), point(1.0, -1.0, 0.0), -5.0);
        let camera = scene.cameras()[0];
        if let Some(params) = scene.camera_mut(camera) {
            params.viewport_width = 0.0;
            params.viewport_height = 0.0;
        }
        let screen = Screen::new(80, 48);
        let projected = project_model(&scene, camera, screen);
        let edge = projected.edges[0];
        // The perspective divide by negative camera z mirrors both axes
        assert_eq!(edge.start, (i32::MAX, i32::MIN + 24));
        assert_eq!(edge.end, (i32::MIN + 40, i32::MAX));
    }

    #[test]
    fn test_edge_with_missing_vertex_is_skipped() {
        let mut scene = Scene::with_cube();
        let camera = scene.cameras()[0];
        let mesh = Mesh {
            vertices: vec![point(0.0, 0.0, 0.0), point(1.0, 1.0, 1.0)],
            edges: vec![Edge::new(0, 1), Edge::new(1, 7)],
            kind: MeshKind::Plain,
        };
        scene.set_mesh(Some(mesh));
        let projected = project_model(&scene, camera, Screen::new(100, 100));
        assert_eq!(projected.edges.len(), 1);
        assert_eq!(projected.edges[0].edge, Edge::new(0, 1));
    }

    #[test]
    fn test_matrix_composition_order() {
        let mut scene = Scene::with_cube();
        let camera = scene.cameras()[0];
        let (root, mesh) = (scene.root(), scene.mesh_node());
        scene.graph_mut().translate(mesh, 0.5, -0.25, 1.0);
        scene.graph_mut().scale(root, 1.5, 1.5, 1.5);

        let graph = scene.graph();
        let expected = graph
            .camera(camera)
            .unwrap()
            .viewport_transform()
            .multiply(&graph.global_transform(camera))
            .multiply(&graph.global_transform(mesh))
            .multiply(&graph.mesh_node(mesh).unwrap().bounding_scale_transform());
        assert_eq!(projection_matrix(graph, camera, mesh).unwrap(), expected);
    }

    #[test]
    fn test_edge_clipped_when_either_end_is_outside() {
        // Bounding scale halves z; camera space z lands at -3.5 and -2.5,
        // while the visible range is [-40, -3)
        let inside = point(0.0, 0.0, -1.0);
        let behind = point(0.0, 0.0, 1.0);
        let scene = single_edge_scene(inside, behind, -3.0);
        let camera = scene.cameras()[0];
        let projected = project_model(&scene, camera, Screen::new(100, 100));
        assert_eq!(projected.vertices.len(), 2);
        assert!(projected.edges.is_empty());
    }

    #[test]
    fn test_edge_depth_and_weight() {
        let far = point(0.0, 0.0, -0.5);
        let near = point(0.0, 0.0, 0.5);
        let scene = single_edge_scene(far, near, -5.0);
        let camera = scene.cameras()[0];
        let projected = project_model(&scene, camera, Screen::new(100, 100));
        assert_eq!(projected.edges.len(), 1);

        let edge = projected.edges[0];
        // Bounding scale is 1 here; the near end sits at camera z = -4.5
        let expected = 40.0 * (-4.5 + 3.0) / (37.0 * -4.5);
        assert_relative_eq!(edge.min_z, expected, epsilon = 1e-12);
        assert_relative_eq!(edge.weight(), 1.0 - expected, epsilon = 1e-12);
        assert_eq!(edge.start, (50, 50));
    }

    #[test]
    fn test_far_plane_is_inclusive() {
        let camera = CameraNode::new();
        let v = camera.viewport_transform().transform(&point(0.0, 0.0, -40.0), true);
        assert_relative_eq!(v.z, 1.0, epsilon = 1e-12);
        let v = camera.viewport_transform().transform(&point(0.0, 0.0, -3.0), true);
        assert!(!is_visible(&v));
    }

    #[test]
    fn test_project_scene_visits_mesh_nodes() {
        let mut scene = Scene::with_cube();
        let camera = scene.cameras()[0];
        let root = scene.root();
        let extra = scene
            .graph_mut()
            .add_child(root, NodeKind::Mesh(MeshNode::new(Mesh::cube())));

        let meshes = project_scene(&scene, camera, Screen::new(320, 200)).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].node, scene.mesh_node());
        assert_eq!(meshes[1].node, extra);
        assert!(meshes.iter().all(|m| m.edges.len() == 12));
        assert_eq!(meshes[0].axes.len(), 3);
    }

    #[test]
    fn test_non_camera_node_rejected() {
        let scene = Scene::with_cube();
        let result = projection_matrix(scene.graph(), scene.root(), scene.mesh_node());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
