// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Gaussian pre-smoothing of templates and frames.
//!
//! Smoothing both images with the same kernel widens
//! the convergence basin of the tracker and reduces noise in the gradients.

use image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

use crate::error::{Error, Result};
use crate::misc::type_aliases::Img;

/// Blur an image with a Gaussian kernel of standard deviation `sigma` (pixels).
///
/// Filtering is done in single precision with a normalized kernel,
/// so flat regions keep their intensity.
/// Fails with `InvalidParameters` if `sigma` is not strictly positive.
/// An empty image is returned as is.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn gaussian(img: &Img, sigma: f32) -> Result<Img> {
    check_sigma(sigma)?;
    if img.is_empty() {
        return Ok(img.clone());
    }
    let (nb_rows, nb_cols) = img.shape();
    let float_img: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(nb_cols as u32, nb_rows as u32, |x, y| {
            Luma([f32::from(img[(y as usize, x as usize)])])
        });
    let blurred = separable_filter_equal(&float_img, &kernel(sigma));
    Ok(Img::from_fn(nb_rows, nb_cols, |r, c| {
        let value = blurred.get_pixel(c as u32, r as u32)[0];
        value.round().max(0.0).min(255.0) as u8
    }))
}

/// Normalized Gaussian kernel, truncated at 3 sigma.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil() as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Check that a standard deviation is usable for blurring.
pub fn check_sigma(sigma: f32) -> Result<()> {
    if sigma > 0.0 && sigma.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameters(
            "smoothing::gaussian",
            format!("sigma must be positive, got {}", sigma),
        ))
    }
}

// TESTS #############################################################
