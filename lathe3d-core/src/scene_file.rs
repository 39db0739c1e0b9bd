/// Binary scene files: root, first camera, mesh node, profile curve and mesh.
///
/// All values are big-endian. Layout, in order:
///
/// | field                                   | encoding              |
/// |-----------------------------------------|-----------------------|
/// | root local transform                    | 16 × f64, row-major   |
/// | camera local transform                  | 16 × f64              |
/// | near, far, viewport width, height       | 4 × f64               |
/// | mesh node local transform               | 16 × f64              |
/// | samples per segment                     | i32                   |
/// | control points                          | i32 count, (f64, f64)…|
/// | mesh type (0 plain, 1 revolution)       | i32                   |
/// | rotation, across, along (revolution)    | 3 × i32               |
/// | vertices                                | i32 count, 4 × f64 …  |
/// | edge indices (two per edge)             | i32 count, i32 …      |
use std::fs;
use std::path::Path;

use log::{info, warn};
use nalgebra::Point2;
use nom::{
    combinator::map_res,
    error::{make_error, ErrorKind},
    multi::count,
    number::complete::{be_f64, be_i32},
    sequence::tuple,
    IResult,
};

use crate::error::{Error, Result};
use crate::geometry::{Edge, Mesh, MeshKind, RevolutionParams};
use crate::scene::{CameraNode, Scene};
use crate::spline::BSpline;
use crate::transform::{Mat4, Vec4};

const PLAIN_MESH: i32 = 0;
const REVOLUTION_MESH: i32 = 1;

/// Everything a scene file holds, before it is assembled into a [`Scene`]
struct SceneRecord {
    root_transform: Mat4,
    camera_transform: Mat4,
    near: f64,
    far: f64,
    viewport_width: f64,
    viewport_height: f64,
    mesh_transform: Mat4,
    samples_per_segment: usize,
    control_points: Vec<Point2<f64>>,
    kind: MeshKind,
    vertices: Vec<Vec4>,
    edge_indices: Vec<usize>,
}

/// Read a scene file. Nothing is returned unless the whole file parses.
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene> {
    let path = path.as_ref();
    let result = fs::read(path).map_err(Error::from).and_then(|data| parse_scene(&data));
    match &result {
        Ok(scene) => info!(
            "loaded scene from {}: {} vertices",
            path.display(),
            scene.mesh().map_or(0, |m| m.vertices.len())
        ),
        Err(e) => warn!("failed to load scene from {}: {}", path.display(), e),
    }
    result
}

/// Write a scene file.
///
/// The scene is encoded in memory and written to a sibling temporary file
/// that replaces `path` only once complete.
pub fn save_scene<P: AsRef<Path>>(scene: &Scene, path: P) -> Result<()> {
    let path = path.as_ref();
    let data = encode_scene(scene)?;

    let partial = path.with_extension("partial");
    if let Err(e) = fs::write(&partial, &data).and_then(|_| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        warn!("failed to save scene to {}: {}", path.display(), e);
        return Err(e.into());
    }

    info!("saved scene to {} ({} bytes)", path.display(), data.len());
    Ok(())
}

/// Decode a scene from bytes
pub fn parse_scene(data: &[u8]) -> Result<Scene> {
    let record = match scene_record(data) {
        Ok((rest, _)) if !rest.is_empty() => {
            return Err(Error::MalformedInput(format!(
                "{} unexpected bytes after the edge buffer",
                rest.len()
            )))
        }
        Ok((_, record)) => record,
        Err(nom::Err::Incomplete(_)) => {
            return Err(Error::MalformedInput("unexpected end of data".to_string()))
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            return Err(Error::MalformedInput(format!(
                "{:?} at byte {}",
                e.code,
                data.len() - e.input.len()
            )))
        }
    };
    assemble(record)
}

/// Encode a scene to bytes.
///
/// Only the first camera is stored. A scene without a mesh is stored with
/// empty buffers and loads back without one.
pub fn encode_scene(scene: &Scene) -> Result<Vec<u8>> {
    let camera_id = *scene
        .cameras()
        .first()
        .ok_or_else(|| Error::InvalidArgument("scene has no camera to save".to_string()))?;
    let camera = scene
        .camera(camera_id)
        .ok_or_else(|| Error::InvalidArgument("registered camera is not a camera".to_string()))?;
    let graph = scene.graph();
    let spline = scene.spline();

    let mut out = Encoder::default();
    out.matrix(&graph.local_transform(scene.root()));
    out.matrix(&graph.local_transform(camera_id));
    for value in [camera.near, camera.far, camera.viewport_width, camera.viewport_height] {
        out.f64(value);
    }
    out.matrix(&graph.local_transform(scene.mesh_node()));

    out.count(spline.samples_per_segment())?;
    out.count(spline.control_points().len())?;
    for p in spline.control_points() {
        out.f64(p.x);
        out.f64(p.y);
    }

    let empty = Mesh::new();
    let mesh = scene.mesh().unwrap_or(&empty);
    match mesh.kind {
        MeshKind::Plain => out.i32(PLAIN_MESH),
        MeshKind::Revolution(params) => {
            out.i32(REVOLUTION_MESH);
            out.count(params.rotation_count)?;
            out.count(params.across_layer_count)?;
            out.count(params.along_layer_count)?;
        }
    }

    out.count(mesh.vertices.len())?;
    for v in &mesh.vertices {
        for value in [v.x, v.y, v.z, v.w] {
            out.f64(value);
        }
    }
    out.count(mesh.edges.len() * 2)?;
    for index in mesh.edge_indices() {
        out.count(index)?;
    }

    Ok(out.buf)
}

fn assemble(record: SceneRecord) -> Result<Scene> {
    let malformed = |e: Error| Error::MalformedInput(e.to_string());

    let camera_params = CameraNode {
        viewport_width: record.viewport_width,
        viewport_height: record.viewport_height,
        near: record.near,
        far: record.far,
    };
    if !camera_params.is_valid() {
        return Err(Error::MalformedInput(format!(
            "unusable camera: near {}, far {}, viewport {} x {}",
            record.near, record.far, record.viewport_width, record.viewport_height
        )));
    }

    if record.edge_indices.len() % 2 != 0 {
        return Err(Error::MalformedInput(format!(
            "edge buffer holds an odd number of indices ({})",
            record.edge_indices.len()
        )));
    }
    let edges = record
        .edge_indices
        .chunks_exact(2)
        .map(|pair| Edge::new(pair[0], pair[1]))
        .collect();

    let spline = BSpline::from_control_points(record.control_points, record.samples_per_segment)
        .map_err(malformed)?;

    let mesh = if record.vertices.is_empty() && matches!(record.kind, MeshKind::Plain) {
        None
    } else {
        Some(Mesh::from_buffers(record.vertices, edges, record.kind).map_err(malformed)?)
    };

    let mut scene = Scene::empty();
    let (root, mesh_node) = (scene.root(), scene.mesh_node());
    let camera = scene.create_camera();

    let graph = scene.graph_mut();
    graph.set_local_transform(root, record.root_transform);
    graph.set_local_transform(camera, record.camera_transform);
    graph.set_local_transform(mesh_node, record.mesh_transform);
    if let Some(params) = graph.camera_mut(camera) {
        *params = camera_params;
    }

    scene.set_spline(spline);
    scene.set_mesh(mesh);
    Ok(scene)
}

#[derive(Default)]
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn count(&mut self, value: usize) -> Result<()> {
        let value = i32::try_from(value).map_err(|_| {
            Error::InvalidArgument(format!("{} does not fit a 32-bit field", value))
        })?;
        self.i32(value);
        Ok(())
    }

    fn matrix(&mut self, matrix: &Mat4) {
        for row in matrix.to_rows() {
            for value in row {
                self.f64(value);
            }
        }
    }
}

fn scene_record(input: &[u8]) -> IResult<&[u8], SceneRecord> {
    let (input, root_transform) = matrix(input)?;
    let (input, camera_transform) = matrix(input)?;
    let (input, (near, far, viewport_width, viewport_height)) =
        tuple((be_f64, be_f64, be_f64, be_f64))(input)?;
    let (input, mesh_transform) = matrix(input)?;

    let (input, samples_per_segment) = length(input)?;
    let (input, point_count) = length(input)?;
    let (input, control_points) = sized_count(input, point_count, 16, |i| {
        let (i, (x, y)) = tuple((be_f64, be_f64))(i)?;
        Ok((i, Point2::new(x, y)))
    })?;

    let (input, kind) = mesh_kind(input)?;

    let (input, vertex_count) = length(input)?;
    let (input, vertices) = sized_count(input, vertex_count, 32, |i| {
        let (i, (x, y, z, w)) = tuple((be_f64, be_f64, be_f64, be_f64))(i)?;
        Ok((i, Vec4::new(x, y, z, w)))
    })?;

    let (input, index_count) = length(input)?;
    let (input, edge_indices) = sized_count(input, index_count, 4, length)?;

    Ok((
        input,
        SceneRecord {
            root_transform,
            camera_transform,
            near,
            far,
            viewport_width,
            viewport_height,
            mesh_transform,
            samples_per_segment,
            control_points,
            kind,
            vertices,
            edge_indices,
        },
    ))
}

fn mesh_kind(input: &[u8]) -> IResult<&[u8], MeshKind> {
    let (rest, tag) = be_i32(input)?;
    match tag {
        PLAIN_MESH => Ok((rest, MeshKind::Plain)),
        REVOLUTION_MESH => {
            let (rest, (rotation_count, across_layer_count, along_layer_count)) =
                tuple((length, length, length))(rest)?;
            Ok((
                rest,
                MeshKind::Revolution(RevolutionParams {
                    rotation_count,
                    along_layer_count,
                    across_layer_count,
                }),
            ))
        }
        _ => Err(nom::Err::Failure(make_error(input, ErrorKind::Tag))),
    }
}

fn matrix(input: &[u8]) -> IResult<&[u8], Mat4> {
    let (input, values) = count(be_f64, 16)(input)?;
    let mut rows = [[0.0; 4]; 4];
    for (i, value) in values.into_iter().enumerate() {
        rows[i / 4][i % 4] = value;
    }
    Ok((input, Mat4::from_rows(rows)))
}

/// A non-negative i32 count or index
fn length(input: &[u8]) -> IResult<&[u8], usize> {
    map_res(be_i32, usize::try_from)(input)
}

/// `count` that first checks the input can hold `n` items of `item_size`
/// bytes, so a corrupt count cannot trigger a huge allocation
fn sized_count<'a, O, F>(
    input: &'a [u8],
    n: usize,
    item_size: usize,
    parser: F,
) -> IResult<&'a [u8], Vec<O>>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
{
    match n.checked_mul(item_size) {
        Some(bytes) if bytes <= input.len() => count(parser, n)(input),
        _ => Err(nom::Err::Failure(make_error(input, ErrorKind::Eof))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> Scene {
        let mut scene = Scene::with_cube();
        for (x, y) in [(-1.0, 0.5), (0.0, 1.0), (1.0, 0.25), (2.0, 1.5)] {
            scene.spline_mut().push(Point2::new(x, y));
        }
        scene
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse_scene(&[]), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_header_size() {
        let data = encode_scene(&sample_scene()).unwrap();
        // 3 matrices, 4 camera values, resolution, point count, 4 points,
        // type tag, 8 vertices, 24 edge indices
        let expected = 3 * 128 + 32 + 4 + 4 + 4 * 16 + 4 + 4 + 8 * 32 + 4 + 24 * 4;
        assert_eq!(data.len(), expected);
    }

    #[test]
    fn test_big_endian_layout() {
        let data = encode_scene(&sample_scene()).unwrap();
        // Root transform starts with the identity's 1.0
        assert_eq!(&data[0..8], &1.0f64.to_be_bytes());
        // Resolution follows the three matrices and camera values
        assert_eq!(&data[416..420], &10i32.to_be_bytes());
        assert_eq!(&data[420..424], &4i32.to_be_bytes());
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        let data = encode_scene(&sample_scene()).unwrap();
        for len in [1, 127, 416, 430, data.len() - 1] {
            assert!(
                matches!(parse_scene(&data[..len]), Err(Error::MalformedInput(_))),
                "truncation at {} should fail",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut data = encode_scene(&sample_scene()).unwrap();
        data.push(0);
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_bad_edge_index_is_rejected() {
        let mut data = encode_scene(&sample_scene()).unwrap();
        let last = data.len() - 4;
        data[last..].copy_from_slice(&99i32.to_be_bytes());
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));

        data[last..].copy_from_slice(&(-1i32).to_be_bytes());
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_huge_count_is_rejected() {
        let mut data = encode_scene(&sample_scene()).unwrap();
        data[420..424].copy_from_slice(&i32::MAX.to_be_bytes());
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_unknown_mesh_type_is_rejected() {
        let mut data = encode_scene(&sample_scene()).unwrap();
        let tag = 424 + 4 * 16;
        assert_eq!(&data[tag..tag + 4], &PLAIN_MESH.to_be_bytes());
        data[tag..tag + 4].copy_from_slice(&7i32.to_be_bytes());
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_unusable_camera_is_rejected() {
        let data = encode_scene(&sample_scene()).unwrap();
        // near, far, viewport width, viewport height
        for (offset, value) in [(256, 0.0), (264, 2.0), (272, 0.0), (280, -1.5), (272, f64::NAN)] {
            let mut corrupt = data.clone();
            corrupt[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
            assert!(
                matches!(parse_scene(&corrupt), Err(Error::MalformedInput(_))),
                "{} at byte {} should be rejected",
                value,
                offset
            );
        }
    }

    #[test]
    fn test_oversized_resolution_is_rejected() {
        let mut data = encode_scene(&sample_scene()).unwrap();
        data[416..420].copy_from_slice(&i32::MAX.to_be_bytes());
        assert!(matches!(parse_scene(&data), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_scene_without_camera_cannot_be_saved() {
        assert!(matches!(encode_scene(&Scene::empty()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_scene_without_mesh_round_trips() {
        let mut scene = Scene::empty();
        scene.create_camera();
        let loaded = parse_scene(&encode_scene(&scene).unwrap()).unwrap();
        assert!(loaded.mesh().is_none());
        assert_eq!(loaded.cameras().len(), 1);
    }
}
