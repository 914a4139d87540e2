// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Projective planar motion: a 3x3 matrix normalized by its bottom-right entry.
//!
//! The parameter layout is the row-major list of the 9 entries.
//! Only the first 8 are free, the last one stays equal to 1.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::math::motion_model::{check_shape, MotionModel};
use crate::misc::type_aliases::{Float, Point2, Pose};

/// Below this magnitude, the normalization entry is considered null.
const EPSILON_NORMALIZATION: Float = 1e-12;

/// Homography motion model.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    pose: Pose,
}

impl Homography {
    /// Homography at identity.
    pub fn new() -> Self {
        Self {
            pose: Pose::identity(3, 3),
        }
    }

    /// Divide the matrix by its bottom-right entry.
    fn normalize(mut mat: Pose, context: &str) -> Result<Pose> {
        let z = mat[(2, 2)];
        if z.abs() < EPSILON_NORMALIZATION || !z.is_finite() {
            return Err(Error::numerical(
                context,
                format!("cannot normalize homography, bottom-right entry is {}", z),
            ));
        }
        mat /= z;
        Ok(mat)
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionModel for Homography {
    fn name(&self) -> &'static str {
        "Homography"
    }

    fn parameter_size(&self) -> usize {
        8
    }

    fn identity(&self) -> Pose {
        Pose::identity(3, 3)
    }

    fn pose(&self) -> &Pose {
        &self.pose
    }

    /// The pose is normalized by its bottom-right entry.
    /// Fails with `NumericalError` if it cannot be normalized or is singular.
    fn set(&mut self, pose: &Pose) -> Result<()> {
        check_shape("Homography::set", (3, 3), pose)?;
        let normalized = Self::normalize(pose.clone(), "Homography::set")?;
        let det = normalized.determinant();
        if det.abs() < EPSILON_NORMALIZATION || !det.is_finite() {
            return Err(Error::numerical(
                "Homography::set",
                format!("homography is singular (determinant {})", det),
            ));
        }
        self.pose = normalized;
        Ok(())
    }

    fn reset(&mut self) {
        self.pose.fill_with_identity();
    }

    fn transform(&self, point: &Point2) -> Point2 {
        let h = &self.pose;
        let x = h[(0, 0)] * point.x + h[(0, 1)] * point.y + h[(0, 2)];
        let y = h[(1, 0)] * point.x + h[(1, 1)] * point.y + h[(1, 2)];
        let z = h[(2, 0)] * point.x + h[(2, 1)] * point.y + h[(2, 2)];
        Point2::new(x / z, y / z)
    }

    fn compose(&mut self, delta: &Pose) -> Result<Pose> {
        check_shape("Homography::compose", (3, 3), delta)?;
        let composed = Self::normalize(&self.pose * delta, "Homography::compose")?;
        self.pose = composed;
        Ok(self.pose.clone())
    }

    fn inverse(&self) -> Result<Pose> {
        let inv = self.pose.clone().try_inverse().ok_or_else(|| {
            Error::numerical("Homography::inverse", "homography matrix is singular")
        })?;
        Self::normalize(inv, "Homography::inverse")
    }

    /// Derivative of the projected point with respect to the 9 entries.
    ///
    /// With `z = h6 x + h7 y + h8` and `(u, v)` the transformed point:
    ///   [ x/z  y/z  1/z   0    0    0   -x u/z  -y u/z  0 ]
    ///   [  0    0    0   x/z  y/z  1/z  -x v/z  -y v/z  0 ]
    /// The last column stays zero since the normalized entry is not free.
    #[allow(clippy::many_single_char_names)]
    fn jacobian(&self, point: &Point2) -> DMatrix<Float> {
        let (x, y) = (point.x, point.y);
        let h = &self.pose;
        let z = h[(2, 0)] * x + h[(2, 1)] * y + h[(2, 2)];
        let u = (h[(0, 0)] * x + h[(0, 1)] * y + h[(0, 2)]) / z;
        let v = (h[(1, 0)] * x + h[(1, 1)] * y + h[(1, 2)]) / z;
        let _z = 1.0 / z;
        #[rustfmt::skip]
        let jac = DMatrix::from_row_slice(2, 9, &[
            x * _z, y * _z, _z,     0.0,    0.0,    0.0, -x * u * _z, -y * u * _z, 0.0,
            0.0,    0.0,    0.0, x * _z, y * _z, _z,     -x * v * _z, -y * v * _z, 0.0,
        ]);
        jac
    }
}

// TESTS #############################################################
