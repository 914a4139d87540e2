// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-pixel residual between the warped frame and the template.

use itertools::izip;
use nalgebra::{DMatrix, DVector};

use crate::core::warp::WarpedFrame;
use crate::misc::type_aliases::{Float, Img};

/// Scaled residuals, flattened in the same row-major order
/// as the columns of the descent matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorField {
    values: DVector<Float>,
    nb_valid: usize,
    abs_sum: Float,
}

impl Default for ErrorField {
    fn default() -> Self {
        Self::zeros(0)
    }
}

impl ErrorField {
    /// Buffer for `nb_pixels` residuals, all zero.
    pub fn zeros(nb_pixels: usize) -> Self {
        Self {
            values: DVector::zeros(nb_pixels),
            nb_valid: 0,
            abs_sum: 0.0,
        }
    }

    /// Refill the residuals: `scale * (warped - template)` on valid samples,
    /// 0 on the others.
    /// The buffer is resized if it does not match the template.
    pub fn compute(&mut self, warped: &WarpedFrame, template: &Img, scale: Float) {
        let (nb_rows, nb_cols) = template.shape();
        if self.values.len() != nb_rows * nb_cols {
            self.values = DVector::zeros(nb_rows * nb_cols);
        }
        self.nb_valid = 0;
        self.abs_sum = 0.0;
        // Matrices are column major, residuals are row major.
        let pixels = izip!(
            warped.intensities.iter(),
            warped.valid.iter(),
            template.iter()
        );
        for (idx, (&im, &valid, &tmp)) in pixels.enumerate() {
            let (col, row) = (idx / nb_rows, idx % nb_rows);
            let r = im - Float::from(tmp);
            let value = if valid {
                self.nb_valid += 1;
                self.abs_sum += r.abs();
                scale * r
            } else {
                0.0
            };
            self.values[row * nb_cols + col] = value;
        }
    }

    /// Flat vector of residuals.
    pub fn values(&self) -> &DVector<Float> {
        &self.values
    }

    /// Number of pixels with a valid sample at the last computation.
    pub fn nb_valid(&self) -> usize {
        self.nb_valid
    }

    /// Sum of absolute intensity differences divided by the template pixel count,
    /// normalized to `[0, 1]` by the 8 bits intensity range.
    /// Invalid pixels count as zero error.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_abs_error(&self) -> Float {
        if self.values.is_empty() {
            0.0
        } else {
            self.abs_sum / (self.values.len() as Float * 255.0)
        }
    }

    /// Residuals reshaped as an image of the template shape.
    pub fn to_matrix(&self, shape: (usize, usize)) -> DMatrix<Float> {
        DMatrix::from_row_slice(shape.0, shape.1, self.values.as_slice())
    }
}

// TESTS #############################################################
