// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Affine planar motion, parameterized relative to identity.
//!
//! The pose is a 3x2 matrix whose row-major entries are `p0 .. p5`:
//!
//! ```text
//! x' = (1+p0) x +    p2  y + p4
//! y' =    p1  x + (1+p3) y + p5
//! ```
//!
//! so the identity is the zero matrix.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::math::motion_model::{check_shape, MotionModel};
use crate::misc::type_aliases::{Float, Mat3, Point2, Pose};

/// Below this magnitude, the determinant of the linear part is considered null.
const EPSILON_DETERMINANT: Float = 1e-12;

/// Affine motion model.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    pose: Pose,
}

impl Affine {
    /// Affine model at identity.
    pub fn new() -> Self {
        Self {
            pose: Pose::zeros(3, 2),
        }
    }

    /// The 6 parameters of the current pose.
    pub fn params(&self) -> [Float; 6] {
        params_of(&self.pose)
    }

    /// Homogeneous matrix form of the current pose:
    /// [ 1+p0  p2  p4 ]
    /// [  p1  1+p3 p5 ]
    /// [  0    0   1  ]
    #[rustfmt::skip]
    pub fn to_mat3(&self) -> Mat3 {
        let p = self.params();
        Mat3::new(
            1.0 + p[0], p[2],       p[4],
            p[1],       1.0 + p[3], p[5],
            0.0,        0.0,        1.0,
        )
    }

    /// Pose from the homogeneous matrix form, inverse of `to_mat3`.
    /// The last row of the matrix is ignored.
    pub fn pose_from_mat3(mat: &Mat3) -> Pose {
        pose_of(&[
            mat.m11 - 1.0,
            mat.m21,
            mat.m12,
            mat.m22 - 1.0,
            mat.m13,
            mat.m23,
        ])
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionModel for Affine {
    fn name(&self) -> &'static str {
        "Affine"
    }

    fn parameter_size(&self) -> usize {
        6
    }

    fn identity(&self) -> Pose {
        Pose::zeros(3, 2)
    }

    fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Fails with `NumericalError` if the linear part is singular.
    fn set(&mut self, pose: &Pose) -> Result<()> {
        check_shape("Affine::set", (3, 2), pose)?;
        let det = determinant(&params_of(pose));
        if det.abs() < EPSILON_DETERMINANT || !det.is_finite() {
            return Err(Error::numerical(
                "Affine::set",
                format!("linear part is singular (determinant {})", det),
            ));
        }
        self.pose.copy_from(pose);
        Ok(())
    }

    fn reset(&mut self) {
        self.pose.fill(0.0);
    }

    fn transform(&self, point: &Point2) -> Point2 {
        let p = self.params();
        Point2::new(
            (1.0 + p[0]) * point.x + p[2] * point.y + p[4],
            p[1] * point.x + (1.0 + p[3]) * point.y + p[5],
        )
    }

    /// First order combination of two affine maps,
    /// equal to the product of their homogeneous matrices.
    fn compose(&mut self, delta: &Pose) -> Result<Pose> {
        check_shape("Affine::compose", (3, 2), delta)?;
        let p = self.params();
        let d = params_of(delta);
        self.pose = pose_of(&[
            p[0] + d[0] + p[0] * d[0] + p[2] * d[1],
            p[1] + d[1] + p[1] * d[0] + p[3] * d[1],
            p[2] + d[2] + p[0] * d[2] + p[2] * d[3],
            p[3] + d[3] + p[1] * d[2] + p[3] * d[3],
            p[4] + d[4] + p[0] * d[4] + p[2] * d[5],
            p[5] + d[5] + p[1] * d[4] + p[3] * d[5],
        ]);
        Ok(self.pose.clone())
    }

    /// Closed form inverse, from the adjugate of the linear part.
    fn inverse(&self) -> Result<Pose> {
        let p = self.params();
        let det = determinant(&p);
        if det.abs() < EPSILON_DETERMINANT || !det.is_finite() {
            return Err(Error::numerical(
                "Affine::inverse",
                format!("linear part is singular (determinant {})", det),
            ));
        }
        let inv = pose_of(&[
            -p[0] - p[0] * p[3] + p[1] * p[2],
            -p[1],
            -p[2],
            -p[3] - p[0] * p[3] + p[1] * p[2],
            -p[4] - p[3] * p[4] + p[2] * p[5],
            -p[5] - p[0] * p[5] + p[1] * p[4],
        ]);
        Ok(inv / det)
    }

    /// Jacobian (cf Baker and Matthews), independent of the pose:
    ///   [ x  0  y  0  1  0 ]
    ///   [ 0  x  0  y  0  1 ]
    fn jacobian(&self, point: &Point2) -> DMatrix<Float> {
        let (x, y) = (point.x, point.y);
        #[rustfmt::skip]
        let jac = DMatrix::from_row_slice(2, 6, &[
            x,   0.0, y,   0.0, 1.0, 0.0,
            0.0, x,   0.0, y,   0.0, 1.0,
        ]);
        jac
    }
}

// Helper ######################################################################

fn params_of(pose: &Pose) -> [Float; 6] {
    [
        pose[(0, 0)],
        pose[(0, 1)],
        pose[(1, 0)],
        pose[(1, 1)],
        pose[(2, 0)],
        pose[(2, 1)],
    ]
}

/// Determinant of the linear part.
fn determinant(p: &[Float; 6]) -> Float {
    (1.0 + p[0]) * (1.0 + p[3]) - p[1] * p[2]
}

fn pose_of(params: &[Float; 6]) -> Pose {
    Pose::from_row_slice(3, 2, params)
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    const EPSILON_ROUNDTRIP_APPROX: Float = 1e-9;

    #[test]
    fn starts_at_identity() {
        let model = Affine::new();
        assert_eq!(Pose::zeros(3, 2), model.get());
        let p = Point2::new(-2.0, 5.0);
        assert_eq!(p, model.transform(&p));
    }

    #[test]
    fn translation_only() {
        let mut model = Affine::new();
        model
            .set(&pose_of(&[0.0, 0.0, 0.0, 0.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(Point2::new(4.0, 6.0), model.transform(&Point2::new(2.0, 3.0)));
    }

    #[test]
    fn compose_is_matrix_product() {
        let mut model = Affine::new();
        let a = pose_of(&[0.1, -0.2, 0.05, 0.3, 4.0, -1.0]);
        let b = pose_of(&[-0.05, 0.02, 0.1, -0.1, 2.0, 7.0]);
        model.set(&a).unwrap();
        let mat_a = model.to_mat3();
        model.set(&b).unwrap();
        let mat_b = model.to_mat3();
        model.set(&a).unwrap();
        let composed = model.compose(&b).unwrap();
        assert!(approx::relative_eq!(
            Affine::pose_from_mat3(&(mat_a * mat_b)),
            composed,
            epsilon = EPSILON_ROUNDTRIP_APPROX
        ));
    }

    #[test]
    fn inverse_composes_to_identity() {
        let mut model = Affine::new();
        model
            .set(&pose_of(&[0.2, 0.1, -0.3, -0.1, 10.0, -4.0]))
            .unwrap();
        let inv = model.inverse().unwrap();
        let identity = model.compose(&inv).unwrap();
        assert!(approx::relative_eq!(
            Pose::zeros(3, 2),
            identity,
            epsilon = EPSILON_ROUNDTRIP_APPROX
        ));
    }

    #[test]
    fn singular_linear_part_is_rejected() {
        let mut model = Affine::new();
        match model.set(&pose_of(&[-1.0, 0.0, 0.0, 0.5, 1.0, 1.0])) {
            Err(Error::NumericalError { context, .. }) => assert_eq!("Affine::set", context),
            other => panic!("expected a numerical error, got {:?}", other),
        }
        assert_eq!(Pose::zeros(3, 2), model.get());
    }

    #[test]
    fn jacobian_is_constant() {
        let mut model = Affine::new();
        let p = Point2::new(3.0, 4.0);
        let at_identity = model.jacobian(&p);
        model
            .set(&pose_of(&[0.2, 0.1, -0.3, -0.1, 10.0, -4.0]))
            .unwrap();
        assert_eq!(at_identity, model.jacobian(&p));
        assert_eq!(3.0, at_identity[(0, 0)]);
        assert_eq!(4.0, at_identity[(1, 3)]);
        assert_eq!(1.0, at_identity[(1, 5)]);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn compose_with_identity(a: i8, b: i8, c: i8, d: i8, e: i8, f: i8) -> bool {
        let mut model = Affine::new();
        model.set(&gen_pose(a, b, c, d, e, f)).unwrap();
        let before = model.get();
        let after = model.compose(&Pose::zeros(3, 2)).unwrap();
        before == after
    }

    #[quickcheck_macros::quickcheck]
    fn inverse_round_trip(a: i8, b: i8, c: i8, d: i8, e: i8, f: i8, x: i8, y: i8) -> bool {
        let mut model = Affine::new();
        model.set(&gen_pose(a, b, c, d, e, f)).unwrap();
        let pt = Point2::new(Float::from(x), Float::from(y));
        let moved = model.transform(&pt);
        let inv = model.inverse().unwrap();
        model.set(&inv).unwrap();
        approx::relative_eq!(pt, model.transform(&moved), epsilon = 1e-6)
    }

    // GENERATORS ####################################################

    /// Affine pose with a linear part within 0.2 of identity.
    fn gen_pose(a: i8, b: i8, c: i8, d: i8, e: i8, f: i8) -> Pose {
        let s = |v: i8| Float::from(v) / 640.0;
        pose_of(&[s(a), s(b), s(c), s(d), 100.0 * s(e), 100.0 * s(f)])
    }
}
