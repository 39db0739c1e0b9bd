/// Wireframe geometry: vertex and edge buffers
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transform::{point, Vec4};

/// An edge joining two entries of a mesh's vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub start: usize,
    pub end: usize,
}

impl Edge {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Parameters a revolution mesh was generated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevolutionParams {
    /// Vertices generated per curve sample
    pub rotation_count: usize,
    /// Longitudinal rails running between neighbouring samples
    pub along_layer_count: usize,
    /// Rings connecting rotation neighbours at a fixed sample
    pub across_layer_count: usize,
}

impl Default for RevolutionParams {
    fn default() -> Self {
        Self {
            rotation_count: 6,
            along_layer_count: 6,
            across_layer_count: 0,
        }
    }
}

/// How a mesh came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    Plain,
    Revolution(RevolutionParams),
}

/// A wireframe mesh: vertices in the owning node's coordinates plus edges
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec4>,
    pub edges: Vec<Edge>,
    pub kind: MeshKind,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            kind: MeshKind::Plain,
        }
    }

    /// Build a mesh from raw buffers, checking every edge index
    pub fn from_buffers(vertices: Vec<Vec4>, edges: Vec<Edge>, kind: MeshKind) -> Result<Self> {
        if let Some(edge) = edges
            .iter()
            .find(|e| e.start >= vertices.len() || e.end >= vertices.len())
        {
            return Err(Error::InvalidArgument(format!(
                "edge ({}, {}) references a vertex outside a buffer of {}",
                edge.start,
                edge.end,
                vertices.len()
            )));
        }
        Ok(Self {
            vertices,
            edges,
            kind,
        })
    }

    pub fn revolution_params(&self) -> Option<RevolutionParams> {
        match self.kind {
            MeshKind::Revolution(params) => Some(params),
            MeshKind::Plain => None,
        }
    }

    /// Axis-aligned bounds as (min, max) xyz, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = self.vertices.first()?;
        let mut min = [first.x, first.y, first.z];
        let mut max = min;
        for v in &self.vertices {
            for (axis, value) in [v.x, v.y, v.z].into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
        Some((min, max))
    }

    /// Edge buffer flattened to start/end index pairs
    pub fn edge_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges.iter().flat_map(|e| [e.start, e.end])
    }

    /// Create a 2x2x2 cube wireframe centered on the origin
    pub fn cube() -> Self {
        let mut vertices = Vec::with_capacity(8);
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    vertices.push(point(x, y, z));
                }
            }
        }

        // Vertex index bits are (x, y, z); an edge flips exactly one bit
        let mut edges = Vec::with_capacity(12);
        for start in 0..8usize {
            for bit in [4usize, 2, 1] {
                if start & bit == 0 {
                    edges.push(Edge::new(start, start | bit));
                }
            }
        }
        edges.sort_by_key(|e| (e.start, e.end));

        Self {
            vertices,
            edges,
            kind: MeshKind::Plain,
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_topology() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.edges.len(), 12);
        assert_eq!(cube.edges[0], Edge::new(0, 1));
        assert_eq!(cube.edges[11], Edge::new(6, 7));

        // Every vertex has three neighbours
        let mut degree = [0; 8];
        for e in &cube.edges {
            degree[e.start] += 1;
            degree[e.end] += 1;
        }
        assert!(degree.iter().all(|&d| d == 3));
    }

    #[test]
    fn test_cube_bounds() {
        let (min, max) = Mesh::cube().bounds().unwrap();
        assert_eq!(min, [-1.0, -1.0, -1.0]);
        assert_eq!(max, [1.0, 1.0, 1.0]);
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn test_from_buffers_rejects_bad_index() {
        let vertices = vec![point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)];
        let result = Mesh::from_buffers(vertices, vec![Edge::new(0, 2)], MeshKind::Plain);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_edge_indices_flatten() {
        let vertices = vec![point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0), point(0.0, 1.0, 0.0)];
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2)];
        let mesh = Mesh::from_buffers(vertices, edges, MeshKind::Plain).unwrap();
        assert_eq!(mesh.edge_indices().collect::<Vec<_>>(), vec![0, 1, 1, 2]);
    }
}
