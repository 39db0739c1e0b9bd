/// Uniform cubic B-spline over 2D control points
use log::debug;
use nalgebra::Point2;

use crate::error::{Error, Result};
use crate::transform::{Mat4, Vec4};

/// Samples generated per spline segment unless configured otherwise
pub const DEFAULT_SEGMENT_SAMPLES: usize = 10;

/// Largest curve a resolution may produce when the resolution or the whole
/// control point list is replaced
pub const MAX_CURVE_SAMPLES: usize = 1 << 20;

/// Uniform cubic B-spline basis, scaled by 1/6
fn basis_matrix() -> Mat4 {
    Mat4::from_rows([
        [-1.0, 3.0, -3.0, 1.0],
        [3.0, -6.0, 3.0, 0.0],
        [-3.0, 0.0, 3.0, 0.0],
        [1.0, 4.0, 1.0, 0.0],
    ])
    .multiply_scalar(1.0 / 6.0)
}

/// Sample the spline defined by `control_points`.
///
/// Each window of four neighbouring control points contributes
/// `samples_per_segment` points, so `n >= 4` points give
/// `(n - 3) * samples_per_segment` samples. Fewer than four control points
/// give an empty curve.
pub fn evaluate(control_points: &[Point2<f64>], samples_per_segment: usize) -> Vec<Point2<f64>> {
    if control_points.len() < 4 {
        return Vec::new();
    }

    let basis = basis_matrix();
    let mut samples = Vec::with_capacity((control_points.len() - 3) * samples_per_segment);

    for window in control_points.windows(4) {
        let xs = Vec4::new(window[0].x, window[1].x, window[2].x, window[3].x);
        let ys = Vec4::new(window[0].y, window[1].y, window[2].y, window[3].y);

        // Polynomial coefficients (a, b, c, d) per axis
        let cx = basis.transform(&xs, false);
        let cy = basis.transform(&ys, false);

        for j in 0..samples_per_segment {
            let t = j as f64 / samples_per_segment as f64;
            let x = cx.x * t * t * t + cx.y * t * t + cx.z * t + cx.w;
            let y = cy.x * t * t * t + cy.y * t * t + cy.z * t + cy.w;
            samples.push(Point2::new(x, y));
        }
    }

    samples
}

/// Profile curve: editable control points plus the sampled curve they define.
///
/// Every mutation re-evaluates the whole curve before returning, so the
/// samples are never stale. Mutators hand back the fresh samples.
#[derive(Debug, Clone)]
pub struct BSpline {
    control_points: Vec<Point2<f64>>,
    samples: Vec<Point2<f64>>,
    samples_per_segment: usize,
}

impl BSpline {
    pub fn new() -> Self {
        Self {
            control_points: Vec::new(),
            samples: Vec::new(),
            samples_per_segment: DEFAULT_SEGMENT_SAMPLES,
        }
    }

    /// Build a spline from existing control points
    pub fn from_control_points(
        control_points: Vec<Point2<f64>>,
        samples_per_segment: usize,
    ) -> Result<Self> {
        check_resolution(samples_per_segment)?;
        check_sample_count(control_points.len(), samples_per_segment)?;
        let mut spline = Self {
            control_points,
            samples: Vec::new(),
            samples_per_segment,
        };
        spline.evaluate();
        Ok(spline)
    }

    pub fn control_points(&self) -> &[Point2<f64>] {
        &self.control_points
    }

    pub fn samples(&self) -> &[Point2<f64>] {
        &self.samples
    }

    pub fn samples_per_segment(&self) -> usize {
        self.samples_per_segment
    }

    /// Whether enough control points exist to produce a curve
    pub fn is_drawable(&self) -> bool {
        self.control_points.len() >= 4
    }

    /// Recompute the sampled curve from the current control points
    pub fn evaluate(&mut self) -> &[Point2<f64>] {
        self.samples = evaluate(&self.control_points, self.samples_per_segment);
        debug!(
            "spline evaluated: {} control points -> {} samples",
            self.control_points.len(),
            self.samples.len()
        );
        &self.samples
    }

    pub fn push(&mut self, point: Point2<f64>) -> &[Point2<f64>] {
        self.control_points.push(point);
        self.evaluate()
    }

    pub fn set(&mut self, index: usize, point: Point2<f64>) -> Result<&[Point2<f64>]> {
        *self.control_point_mut(index)? = point;
        Ok(self.evaluate())
    }

    pub fn set_x(&mut self, index: usize, x: f64) -> Result<&[Point2<f64>]> {
        self.control_point_mut(index)?.x = x;
        Ok(self.evaluate())
    }

    pub fn set_y(&mut self, index: usize, y: f64) -> Result<&[Point2<f64>]> {
        self.control_point_mut(index)?.y = y;
        Ok(self.evaluate())
    }

    pub fn remove(&mut self, index: usize) -> Result<&[Point2<f64>]> {
        if index >= self.control_points.len() {
            return Err(out_of_range(index, self.control_points.len()));
        }
        self.control_points.remove(index);
        Ok(self.evaluate())
    }

    pub fn set_samples_per_segment(
        &mut self,
        samples_per_segment: usize,
    ) -> Result<&[Point2<f64>]> {
        check_resolution(samples_per_segment)?;
        check_sample_count(self.control_points.len(), samples_per_segment)?;
        self.samples_per_segment = samples_per_segment;
        Ok(self.evaluate())
    }

    fn control_point_mut(&mut self, index: usize) -> Result<&mut Point2<f64>> {
        let len = self.control_points.len();
        self.control_points
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))
    }
}

impl Default for BSpline {
    fn default() -> Self {
        Self::new()
    }
}

fn check_resolution(samples_per_segment: usize) -> Result<()> {
    if samples_per_segment == 0 {
        return Err(Error::InvalidArgument(
            "samples per segment must be positive".to_string(),
        ));
    }
    Ok(())
}

/// `(points - 3) * samples_per_segment` must stay within [`MAX_CURVE_SAMPLES`]
fn check_sample_count(point_count: usize, samples_per_segment: usize) -> Result<()> {
    let segments = point_count.saturating_sub(3).max(1);
    match segments.checked_mul(samples_per_segment) {
        Some(total) if total <= MAX_CURVE_SAMPLES => Ok(()),
        _ => Err(Error::InvalidArgument(format!(
            "{} samples per segment over {} segments exceeds {} curve samples",
            samples_per_segment, segments, MAX_CURVE_SAMPLES
        ))),
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::InvalidArgument(format!(
        "control point index {} out of range for {} points",
        index, len
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_profile() -> Vec<Point2<f64>> {
        vec![
            Point2::new(-1.0, -1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, -1.0),
            Point2::new(-1.0, -1.0),
            Point2::new(-1.0, 1.0),
        ]
    }

    #[test]
    fn test_fewer_than_four_points_is_empty() {
        let mut spline = BSpline::new();
        assert!(spline.samples().is_empty());
        for i in 0..3 {
            let samples = spline.push(Point2::new(i as f64, 0.0));
            assert!(samples.is_empty());
        }
        assert!(!spline.is_drawable());
    }

    #[test]
    fn test_sample_count() {
        let mut spline = BSpline::new();
        for n in 1..=8 {
            spline.push(Point2::new(n as f64, (n * n) as f64));
            let expected = if n < 4 { 0 } else { (n - 3) * DEFAULT_SEGMENT_SAMPLES };
            assert_eq!(spline.samples().len(), expected);
        }
        spline.set_samples_per_segment(3).unwrap();
        assert_eq!(spline.samples().len(), 5 * 3);
    }

    #[test]
    fn test_square_profile_first_point() {
        let spline = BSpline::from_control_points(square_profile(), 10).unwrap();
        let samples = spline.samples();
        assert_eq!(samples.len(), 30);

        // At t = 0 the basis reduces to (p0 + 4 p1 + p2) / 6
        assert_relative_eq!(samples[0].x, (-1.0 - 4.0 + 1.0) / 6.0, epsilon = 1e-12);
        assert_relative_eq!(samples[0].y, (-1.0 + 4.0 + 1.0) / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mutations_reevaluate() {
        let mut spline = BSpline::from_control_points(square_profile(), 10).unwrap();
        let before = spline.samples()[0];

        let after = spline.set(1, Point2::new(5.0, 5.0)).unwrap()[0];
        assert!(after.x != before.x);

        spline.set_y(0, 2.0).unwrap();
        assert_eq!(spline.control_points()[0].y, 2.0);

        let samples = spline.remove(5).unwrap();
        assert_eq!(samples.len(), 20);

        spline.remove(0).unwrap();
        spline.remove(0).unwrap();
        assert!(spline.samples().is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut spline = BSpline::new();
        assert!(matches!(spline.set_x(0, 1.0), Err(Error::InvalidArgument(_))));
        assert!(matches!(spline.remove(3), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut spline = BSpline::from_control_points(square_profile(), 4).unwrap();
        assert!(spline.set_samples_per_segment(0).is_err());
        assert_eq!(spline.samples_per_segment(), 4);
        assert_eq!(spline.samples().len(), 12);
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let result = BSpline::from_control_points(square_profile(), i32::MAX as usize);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let mut spline = BSpline::from_control_points(square_profile(), 4).unwrap();
        assert!(spline.set_samples_per_segment(MAX_CURVE_SAMPLES).is_err());
        assert_eq!(spline.samples().len(), 12);

        spline.set_samples_per_segment(MAX_CURVE_SAMPLES / 3).unwrap();
        assert_eq!(spline.samples().len(), MAX_CURVE_SAMPLES / 3 * 3);
    }
}
