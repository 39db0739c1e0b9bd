/// Homogeneous vectors, 4x4 matrices and affine builders
use std::ops::Mul;

use nalgebra::{Matrix4, Rotation3, Unit, Vector3, Vector4};

use crate::error::{Error, Result};

/// Homogeneous vector (x, y, z, w)
pub type Vec4 = Vector4<f64>;

/// A homogeneous point with `w = 1`
pub fn point(x: f64, y: f64, z: f64) -> Vec4 {
    Vec4::new(x, y, z, 1.0)
}

/// Perspective divide: scales x, y, z by `1/w` and sets `w = 1`.
///
/// A vector whose `w` is already 1 is returned unchanged. A zero `w` yields
/// non-finite components, which the clip test rejects.
pub fn correct_w(v: &Vec4) -> Vec4 {
    if v.w == 1.0 {
        return *v;
    }
    Vec4::new(v.x / v.w, v.y / v.w, v.z / v.w, 1.0)
}

/// Scale the xyz part of a vector to unit length, leaving `w` untouched
pub fn normalize(v: &Vec4) -> Result<Vec4> {
    let length = v.xyz().norm();
    if length == 0.0 {
        return Err(Error::DegenerateVector);
    }
    Ok(Vec4::new(v.x / length, v.y / length, v.z / length, v.w))
}

/// 4x4 transform or projection matrix, indexed `(row, column)`
///
/// Values are immutable: every operation returns a new matrix. Affine
/// operations left-multiply onto the existing matrix, so
/// `m.translate(..)` means "apply `m`, then translate".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(Matrix4<f64>);

impl Mat4 {
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.0[(r, c)];
            }
        }
        rows
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[(row, col)]
    }

    pub fn as_matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Multiply each element by `value`
    pub fn multiply_scalar(&self, value: f64) -> Self {
        Self(self.0 * value)
    }

    /// Row-by-column product `self * other` (apply `other`, then `self`)
    pub fn multiply(&self, other: &Mat4) -> Self {
        Self(self.0 * other.0)
    }

    /// Transform a column vector, optionally applying the perspective divide
    pub fn transform(&self, v: &Vec4, w_correct: bool) -> Vec4 {
        let result = self.0 * v;
        if w_correct {
            correct_w(&result)
        } else {
            result
        }
    }

    /// Create a translation matrix
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self(Matrix4::new_translation(&Vector3::new(dx, dy, dz)))
    }

    /// Create a scale matrix
    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        Self(Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz)))
    }

    /// Create a rotation of `degrees` about `axis` (Rodrigues' formula).
    ///
    /// The axis is normalized first; only its xyz part is used.
    pub fn rotation(axis: &Vec4, degrees: f64) -> Result<Self> {
        let axis = normalize(axis)?;
        let axis = Unit::new_unchecked(axis.xyz());
        let rotation = Rotation3::from_axis_angle(&axis, degrees.to_radians());
        Ok(Self(rotation.to_homogeneous()))
    }

    pub fn translate(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::translation(dx, dy, dz).multiply(self)
    }

    pub fn rotate(&self, axis: &Vec4, degrees: f64) -> Result<Self> {
        Ok(Self::rotation(axis, degrees)?.multiply(self))
    }

    pub fn scale(&self, sx: f64, sy: f64, sz: f64) -> Self {
        Self::scaling(sx, sy, sz).multiply(self)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f64>> for Mat4 {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        self.multiply(&rhs)
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, rhs: Vec4) -> Vec4 {
        self.transform(&rhs, false)
    }
}
