// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Precomputations of the inverse compositional algorithm:
//! steepest descent images and the inverse of the Gauss-Newton Hessian.
//!
//! Both only depend on the template, so they are computed once per template.

use nalgebra::DMatrix;

use crate::core::gradient::GradientField;
use crate::core::warp;
use crate::error::{Error, Result};
use crate::math::motion_model::MotionModel;
use crate::misc::type_aliases::Float;

/// `parameter_size x pixel_count` matrix.
/// Column `row * cols + col` is the steepest descent direction of pixel `(row, col)`.
pub type DescentMatrix = DMatrix<Float>;

/// `parameter_size x parameter_size` inverse of `D * D^t`.
pub type HessianInverse = DMatrix<Float>;

/// Project template gradients through the warp Jacobian at identity.
///
/// The model is temporarily reset to identity and restored before returning.
pub fn steepest_descent<M: MotionModel + ?Sized>(
    model: &mut M,
    gradients: &GradientField,
) -> Result<DescentMatrix> {
    let pose = model.get();
    model.reset();
    let descent = steepest_descent_at_current_pose(model, gradients);
    model.set(&pose)?;
    Ok(descent)
}

fn steepest_descent_at_current_pose<M: MotionModel + ?Sized>(
    model: &M,
    gradients: &GradientField,
) -> DescentMatrix {
    let shape = gradients.gx.shape();
    let (nb_rows, nb_cols) = shape;
    let nb_params = model.parameter_size();
    let mut descent = DescentMatrix::zeros(nb_params, nb_rows * nb_cols);
    for row in 0..nb_rows {
        for col in 0..nb_cols {
            let gx = gradients.gx[(row, col)];
            let gy = gradients.gy[(row, col)];
            if gx == 0.0 && gy == 0.0 {
                continue;
            }
            let jac = model.jacobian(&warp::local_point(shape, row, col));
            let pixel = row * nb_cols + col;
            for p in 0..nb_params {
                descent[(p, pixel)] = jac[(0, p)] * gx + jac[(1, p)] * gy;
            }
        }
    }
    descent
}

/// Inverse of the Gauss-Newton Hessian `D * D^t`.
///
/// Fails with `NumericalError` if the Hessian is not positive definite,
/// typically a template without enough texture in some parameter direction.
pub fn hessian_inverse(descent: &DescentMatrix) -> Result<HessianInverse> {
    if descent.nrows() == 0 || descent.ncols() == 0 {
        return Err(Error::not_initialized(
            "HessianSolver::hessian_inverse",
            "steepest descent images not computed",
        ));
    }
    let hessian = descent * descent.transpose();
    let inverse = hessian
        .cholesky()
        .ok_or_else(|| {
            Error::numerical(
                "HessianSolver::hessian_inverse",
                "hessian is singular, the template lacks texture",
            )
        })?
        .inverse();
    if inverse.iter().all(|x| x.is_finite()) {
        Ok(inverse)
    } else {
        Err(Error::numerical(
            "HessianSolver::hessian_inverse",
            "hessian inverse is not finite",
        ))
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::gradient;
    use crate::math::{affine::Affine, homography::Homography};
    use crate::misc::synthetic;
    use crate::misc::type_aliases::{Img, Pose};

    #[test]
    fn descent_rows_follow_the_jacobian() {
        let template = synthetic::render((9, 11), synthetic::texture);
        let grad = gradient::centered(&template, 1.0).unwrap();
        let mut model = Affine::new();
        let descent = steepest_descent(&mut model, &grad).unwrap();
        assert_eq!((6, 99), descent.shape());
        // Pixel (row 2, col 7) has local coordinates (1.5, -2.5).
        let (gx, gy) = (grad.gx[(2, 7)], grad.gy[(2, 7)]);
        let pixel = 2 * 11 + 7;
        assert_eq!(1.5 * gx, descent[(0, pixel)]);
        assert_eq!(1.5 * gy, descent[(1, pixel)]);
        assert_eq!(-2.5 * gx, descent[(2, pixel)]);
        assert_eq!(-2.5 * gy, descent[(3, pixel)]);
        assert_eq!(gx, descent[(4, pixel)]);
        assert_eq!(gy, descent[(5, pixel)]);
    }

    #[test]
    fn descent_is_evaluated_at_identity() {
        let template = synthetic::render((9, 9), synthetic::texture);
        let grad = gradient::centered(&template, 1.0).unwrap();
        let mut model = Homography::new();
        let at_identity = steepest_descent(&mut model, &grad).unwrap();

        let mut pose = Pose::identity(3, 3);
        pose[(0, 2)] = 3.0;
        pose[(2, 0)] = 1e-3;
        model.set(&pose).unwrap();
        let descent = steepest_descent(&mut model, &grad).unwrap();
        assert_eq!(at_identity, descent);
        assert_eq!(pose, model.get());
    }

    #[test]
    fn textured_template_has_an_inverse_hessian() {
        let template = synthetic::render((21, 21), synthetic::texture);
        let grad = gradient::centered(&template, 1.0 / 255.0).unwrap();
        let mut model = Homography::new();
        let descent = steepest_descent(&mut model, &grad).unwrap();
        let hessian_inv = hessian_inverse(&descent).unwrap();
        let identity = hessian_inv * (&descent * descent.transpose());
        assert!(approx::relative_eq!(
            DMatrix::identity(8, 8),
            identity,
            epsilon = 1e-6
        ));
    }

    #[test]
    fn flat_template_is_singular() {
        let template = Img::from_element(15, 15, 128);
        let grad = gradient::centered(&template, 1.0 / 255.0).unwrap();
        let mut model = Affine::new();
        let descent = steepest_descent(&mut model, &grad).unwrap();
        match hessian_inverse(&descent) {
            Err(Error::NumericalError { .. }) => (),
            other => panic!("expected NumericalError, got {:?}", other),
        }
    }

    #[test]
    fn empty_descent_is_not_initialized() {
        match hessian_inverse(&DescentMatrix::zeros(6, 0)) {
            Err(Error::NotInitialized { .. }) => (),
            other => panic!("expected NotInitialized, got {:?}", other),
        }
    }
}
