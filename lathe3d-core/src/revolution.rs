/// Revolution mesh generation: spin a sampled profile curve about the X axis
use log::debug;
use nalgebra::Point2;

use crate::error::{Error, Result};
use crate::geometry::{Edge, Mesh, MeshKind, RevolutionParams};
use crate::transform::{point, Mat4, Vec4};

/// Revolve `curve` about the X axis.
///
/// Every sample yields `rotation_count` vertices, emitted sample-major so
/// vertex `s * rotation_count + k` is sample `s` rotated by
/// `360 * k / rotation_count` degrees. An empty curve yields `Ok(None)`.
/// Parameters are validated before any buffer is allocated.
pub fn revolve(curve: &[Point2<f64>], params: RevolutionParams) -> Result<Option<Mesh>> {
    if curve.is_empty() {
        return Ok(None);
    }
    validate(curve.len(), &params)?;

    let RevolutionParams {
        rotation_count,
        along_layer_count,
        across_layer_count,
    } = params;

    let x_axis = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let rotations = (0..rotation_count)
        .map(|k| Mat4::rotation(&x_axis, 360.0 * k as f64 / rotation_count as f64))
        .collect::<Result<Vec<_>>>()?;

    let mut vertices = Vec::with_capacity(curve.len() * rotation_count);
    for sample in curve {
        let base = point(sample.x, sample.y, 0.0);
        vertices.extend(rotations.iter().map(|r| r.transform(&base, true)));
    }

    let mut edges = across_edges(rotation_count, across_layer_count, curve.len());
    edges.extend(along_edges(rotation_count, along_layer_count, curve.len()));

    debug!(
        "revolved {} samples: {} vertices, {} edges ({:?})",
        curve.len(),
        vertices.len(),
        edges.len(),
        params
    );

    Ok(Some(Mesh {
        vertices,
        edges,
        kind: MeshKind::Revolution(params),
    }))
}

fn validate(sample_count: usize, params: &RevolutionParams) -> Result<()> {
    if params.along_layer_count > params.rotation_count {
        return Err(Error::InvalidArgument(format!(
            "along layer count {} is greater than rotation count {}",
            params.along_layer_count, params.rotation_count
        )));
    }
    if params.across_layer_count > sample_count {
        return Err(Error::InvalidArgument(format!(
            "across layer count {} is greater than the curve's {} samples",
            params.across_layer_count, sample_count
        )));
    }
    if params.along_layer_count == 0 {
        return Err(Error::InvalidArgument(
            "along layer count must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Sample indices that receive a ring.
///
/// The first sample always gets one; the remaining `across_layer_count - 1`
/// rings are spaced by `(samples - layers) / (layers - 1)` with the
/// remainder handed out one unit at a time to the earliest rings. More
/// rings than samples yields none.
fn across_layer_samples(across_layer_count: usize, sample_count: usize) -> Vec<usize> {
    if across_layer_count > sample_count {
        return Vec::new();
    }
    let mut layers = Vec::with_capacity(across_layer_count);
    if across_layer_count >= 1 {
        layers.push(0);
    }
    if across_layer_count >= 2 {
        let gaps = across_layer_count - 1;
        let step = (sample_count - across_layer_count) / gaps;
        let extra = (sample_count - across_layer_count) % gaps;

        let mut extra_used = 0;
        for layer in 1..across_layer_count {
            if extra_used < extra {
                extra_used += 1;
            }
            layers.push(step * layer + extra_used + layer);
        }
    }
    layers
}

fn across_edges(
    rotation_count: usize,
    across_layer_count: usize,
    sample_count: usize,
) -> Vec<Edge> {
    let layers = across_layer_samples(across_layer_count, sample_count);
    let mut edges = Vec::with_capacity(layers.len() * rotation_count);
    for sample in layers {
        let base = sample * rotation_count;
        for k in 0..rotation_count {
            edges.push(Edge::new(base + k, base + (k + 1) % rotation_count));
        }
    }
    edges
}

fn along_edges(rotation_count: usize, along_layer_count: usize, sample_count: usize) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(sample_count.saturating_sub(1) * along_layer_count);
    for sample in 0..sample_count.saturating_sub(1) {
        for layer in 0..along_layer_count {
            let k = layer * rotation_count / along_layer_count;
            edges.push(Edge::new(
                sample * rotation_count + k,
                (sample + 1) * rotation_count + k,
            ));
        }
    }
    edges
}
