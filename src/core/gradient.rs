// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to compute gradients of the template.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::misc::type_aliases::{Float, Img};

/// Horizontal and vertical derivatives of an image, same shape as the image.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    /// Derivative along x (columns).
    pub gx: DMatrix<Float>,
    /// Derivative along y (rows).
    pub gy: DMatrix<Float>,
}

/// Compute centered gradients of an image, scaled by `scale`:
///
/// ```text
/// gx(r, c) = scale * (I(r, c+1) - I(r, c-1)) / 2
/// gy(r, c) = scale * (I(r+1, c) - I(r-1, c)) / 2
/// ```
///
/// Border pixels, where the stencil is not complete, are set to 0.
/// Fails with `NotInitialized` for an empty image.
pub fn centered(img: &Img, scale: Float) -> Result<GradientField> {
    let (nb_rows, nb_cols) = img.shape();
    if nb_rows == 0 || nb_cols == 0 {
        return Err(Error::not_initialized(
            "GradientField::centered",
            "template image not initialized",
        ));
    }
    let half_scale = 0.5 * scale;
    let inside = |r: usize, c: usize| r > 0 && c > 0 && r + 1 < nb_rows && c + 1 < nb_cols;
    let gx = DMatrix::from_fn(nb_rows, nb_cols, |r, c| {
        if inside(r, c) {
            half_scale * (Float::from(img[(r, c + 1)]) - Float::from(img[(r, c - 1)]))
        } else {
            0.0
        }
    });
    let gy = DMatrix::from_fn(nb_rows, nb_cols, |r, c| {
        if inside(r, c) {
            half_scale * (Float::from(img[(r + 1, c)]) - Float::from(img[(r - 1, c)]))
        } else {
            0.0
        }
    });
    Ok(GradientField { gx, gy })
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn empty_image_is_not_initialized() {
        match centered(&Img::zeros(0, 0), 1.0) {
            Err(Error::NotInitialized { .. }) => (),
            other => panic!("expected NotInitialized, got {:?}", other),
        }
    }

    #[test]
    fn ramp_has_constant_gradient() {
        // Intensity 3*col + 5*row.
        let img = Img::from_fn(5, 6, |r, c| (3 * c + 5 * r) as u8);
        let grad = centered(&img, 1.0).unwrap();
        assert_eq!(3.0, grad.gx[(2, 3)]);
        assert_eq!(5.0, grad.gy[(2, 3)]);
        assert_eq!(3.0, grad.gx[(1, 1)]);
        assert_eq!(5.0, grad.gy[(3, 4)]);
    }

    #[test]
    fn borders_are_zero() {
        let img = Img::from_fn(4, 4, |r, c| (10 * c + 20 * r) as u8);
        let grad = centered(&img, 1.0).unwrap();
        for i in 0..4 {
            assert_eq!(0.0, grad.gx[(0, i)]);
            assert_eq!(0.0, grad.gx[(3, i)]);
            assert_eq!(0.0, grad.gy[(i, 0)]);
            assert_eq!(0.0, grad.gy[(i, 3)]);
        }
    }

    #[test]
    fn scale_is_applied() {
        let img = Img::from_fn(3, 3, |_, c| (51 * c) as u8);
        let grad = centered(&img, 1.0 / 255.0).unwrap();
        assert!(approx::relative_eq!(0.2, grad.gx[(1, 1)], epsilon = 1e-12));
        assert_eq!(0.0, grad.gy[(1, 1)]);
    }
}
