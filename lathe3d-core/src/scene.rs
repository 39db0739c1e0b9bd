/// Scene graph: an arena of nodes with local and global affine transforms
use log::debug;

use crate::error::{Error, Result};
use crate::geometry::{Mesh, RevolutionParams};
use crate::revolution;
use crate::spline::BSpline;
use crate::transform::{Mat4, Vec4};

/// Handle to a node inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Perspective camera parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraNode {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub near: f64,
    pub far: f64,
}

impl CameraNode {
    pub fn new() -> Self {
        Self {
            viewport_width: 4.0,
            viewport_height: 2.0,
            near: 3.0,
            far: 40.0,
        }
    }

    /// Whether `far > near > 0` and the viewport has a finite positive size
    pub fn is_valid(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        positive(self.near)
            && positive(self.far)
            && self.far > self.near
            && positive(self.viewport_width)
            && positive(self.viewport_height)
    }

    /// Projection from camera space onto the near plane.
    ///
    /// After the perspective divide, points between the clipping planes end
    /// up with `z` in `(0, 1]`; larger `z` is further from the camera.
    pub fn viewport_transform(&self) -> Mat4 {
        let (n, f) = (self.near, self.far);
        Mat4::from_rows([
            [n, 0.0, 0.0, 0.0],
            [0.0, n, 0.0, 0.0],
            [0.0, 0.0, f / (f - n), f * n / (f - n)],
            [0.0, 0.0, 1.0, 0.0],
        ])
    }

    /// Match the viewport's aspect ratio to a screen, keeping the shorter
    /// side at 1.5 units
    pub fn fit_viewport(&mut self, screen_width: u32, screen_height: u32) {
        if screen_width == 0 || screen_height == 0 {
            return;
        }
        let (w, h) = (screen_width as f64, screen_height as f64);
        if screen_width < screen_height {
            self.viewport_width = 1.5;
            self.viewport_height = 1.5 * h / w;
        } else {
            self.viewport_height = 1.5;
            self.viewport_width = 1.5 * w / h;
        }
    }
}

impl Default for CameraNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Node carrying a mesh in its own coordinate system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshNode {
    pub mesh: Option<Mesh>,
}

impl MeshNode {
    pub fn new(mesh: Mesh) -> Self {
        Self { mesh: Some(mesh) }
    }

    /// Uniform scale fitting the mesh's largest extent into one unit.
    ///
    /// Identity when there is no mesh or the mesh has no extent.
    pub fn bounding_scale_transform(&self) -> Mat4 {
        let Some((min, max)) = self.mesh.as_ref().and_then(Mesh::bounds) else {
            return Mat4::identity();
        };
        let extent = (0..3).map(|axis| max[axis] - min[axis]).fold(0.0, f64::max);
        if extent <= 0.0 {
            return Mat4::identity();
        }
        let s = 1.0 / extent;
        Mat4::scaling(s, s, s)
    }
}

/// Kind-specific node data
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Camera(CameraNode),
    Mesh(MeshNode),
}

/// One entry of the arena
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Mat4,
    pub kind: NodeKind,
}

impl Node {
    fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            parent,
            children: Vec::new(),
            local: Mat4::identity(),
            kind,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_transform(&self) -> &Mat4 {
        &self.local
    }
}

/// Arena of scene nodes addressed by [`NodeId`].
///
/// Nodes are never removed, so handles stay valid for the graph's lifetime.
/// Passing a handle from a different graph panics.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a parentless node
    pub fn add_root(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(None, kind));
        id
    }

    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(Some(parent), kind));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn camera(&self, id: NodeId) -> Option<&CameraNode> {
        match &self.node(id).kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Option<&mut CameraNode> {
        match &mut self.node_mut(id).kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn mesh_node(&self, id: NodeId) -> Option<&MeshNode> {
        match &self.node(id).kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_node_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        match &mut self.node_mut(id).kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn local_transform(&self, id: NodeId) -> Mat4 {
        self.node(id).local
    }

    /// Composition of local transforms from the root down to `id`
    pub fn global_transform(&self, id: NodeId) -> Mat4 {
        let mut node = self.node(id);
        let mut global = node.local;
        while let Some(parent) = node.parent {
            node = self.node(parent);
            global = node.local.multiply(&global);
        }
        global
    }

    pub fn set_local_transform(&mut self, id: NodeId, matrix: Mat4) {
        self.node_mut(id).local = matrix;
    }

    pub fn translate(&mut self, id: NodeId, dx: f64, dy: f64, dz: f64) {
        let node = self.node_mut(id);
        node.local = node.local.translate(dx, dy, dz);
    }

    pub fn rotate(&mut self, id: NodeId, axis: &Vec4, degrees: f64) -> Result<()> {
        let node = self.node_mut(id);
        node.local = node.local.rotate(axis, degrees)?;
        Ok(())
    }

    pub fn scale(&mut self, id: NodeId, sx: f64, sy: f64, sz: f64) {
        let node = self.node_mut(id);
        node.local = node.local.scale(sx, sy, sz);
    }

    /// `id` and everything below it, parents before children
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.node(current).children.iter().rev());
        }
        order
    }
}

/// A scene: node tree, its cameras, the edited model and its profile curve.
///
/// The camera list and mesh handle index into the tree; they do not own
/// anything beyond it.
#[derive(Debug, Clone)]
pub struct Scene {
    graph: SceneGraph,
    root: NodeId,
    cameras: Vec<NodeId>,
    mesh: NodeId,
    spline: BSpline,
}

impl Scene {
    /// Root plus an empty mesh node, no cameras and an empty curve
    pub fn empty() -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(NodeKind::Group);
        let mesh = graph.add_child(root, NodeKind::Mesh(MeshNode::default()));
        Self {
            graph,
            root,
            cameras: Vec::new(),
            mesh,
            spline: BSpline::new(),
        }
    }

    /// A cube model watched by one camera five units back
    pub fn with_cube() -> Self {
        let mut scene = Self::empty();
        scene.set_mesh(Some(Mesh::cube()));
        let camera = scene.create_camera();
        scene.graph.translate(camera, 0.0, 0.0, -5.0);
        scene
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn cameras(&self) -> &[NodeId] {
        &self.cameras
    }

    pub fn mesh_node(&self) -> NodeId {
        self.mesh
    }

    /// Create a camera as a direct child of the root and register it
    pub fn create_camera(&mut self) -> NodeId {
        let camera = self.graph.add_child(self.root, NodeKind::Camera(CameraNode::new()));
        self.cameras.push(camera);
        camera
    }

    /// Register an existing camera node elsewhere in the tree
    pub fn add_camera(&mut self, id: NodeId) -> Result<()> {
        if self.graph.camera(id).is_none() {
            return Err(Error::InvalidArgument(format!(
                "node {} is not a camera",
                id.index()
            )));
        }
        if !self.cameras.contains(&id) {
            self.cameras.push(id);
        }
        Ok(())
    }

    pub fn camera(&self, id: NodeId) -> Option<&CameraNode> {
        self.graph.camera(id)
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Option<&mut CameraNode> {
        self.graph.camera_mut(id)
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.graph.mesh_node(self.mesh).and_then(|node| node.mesh.as_ref())
    }

    pub fn set_mesh(&mut self, mesh: Option<Mesh>) {
        if let Some(node) = self.graph.mesh_node_mut(self.mesh) {
            node.mesh = mesh;
        }
    }

    pub fn spline(&self) -> &BSpline {
        &self.spline
    }

    pub fn spline_mut(&mut self) -> &mut BSpline {
        &mut self.spline
    }

    pub fn set_spline(&mut self, spline: BSpline) {
        self.spline = spline;
    }

    /// Revolve the scene's curve into its mesh node.
    ///
    /// Returns `Ok(None)` and keeps the current mesh while the curve is not
    /// drawable yet.
    pub fn rebuild_mesh(&mut self, params: RevolutionParams) -> Result<Option<&Mesh>> {
        match revolution::revolve(self.spline.samples(), params)? {
            Some(mesh) => {
                self.set_mesh(Some(mesh));
                Ok(self.mesh())
            }
            None => {
                debug!("curve not drawable yet, keeping current mesh");
                Ok(None)
            }
        }
    }

    /// Move a camera's clipping planes by `-offset` and the camera itself
    /// by `offset` along Z.
    ///
    /// Returns `false` without changes when the move would put the near
    /// plane at or behind the camera.
    pub fn zoom(&mut self, camera: NodeId, offset: f64) -> bool {
        let Some(params) = self.graph.camera_mut(camera) else {
            return false;
        };
        if params.near - offset <= 0.0 {
            return false;
        }
        params.near -= offset;
        params.far -= offset;
        self.graph.translate(camera, 0.0, 0.0, offset);
        true
    }

    /// Rotate `node` about the axis perpendicular to a screen drag of
    /// `(dx, dy)` pixels. Zero drags are ignored.
    pub fn drag_rotate(&mut self, node: NodeId, dx: f64, dy: f64, degrees: f64) -> Result<()> {
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }
        self.graph.rotate(node, &Vec4::new(dy, -dx, 0.0, 1.0), degrees)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_cube()
    }
}
