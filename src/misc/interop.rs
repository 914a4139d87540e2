// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::{DynamicImage, GrayImage, Luma};
use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::misc::type_aliases::Img;

/// Convert an `u8` matrix into a `GrayImage`.
/// Inverse operation of `matrix_from_image`.
///
/// Performs a transposition to accomodate for the
/// column major matrix into the row major image.
#[allow(clippy::cast_possible_truncation)]
pub fn image_from_matrix(mat: &Img) -> GrayImage {
    let (nb_rows, nb_cols) = mat.shape();
    let mut img_buf = GrayImage::new(nb_cols as u32, nb_rows as u32);
    for (x, y, pixel) in img_buf.enumerate_pixels_mut() {
        *pixel = Luma([mat[(y as usize, x as usize)]]);
    }
    img_buf
}

/// Convert a `GrayImage` into an `u8` matrix.
/// Inverse operation of `image_from_matrix`.
pub fn matrix_from_image(img: GrayImage) -> Img {
    let (width, height) = img.dimensions();
    DMatrix::from_row_slice(height as usize, width as usize, &img.into_raw())
}

/// Convert a decoded image into an `u8` matrix.
///
/// Only single channel images are accepted,
/// 16 bits gray images are reduced to 8 bits.
pub fn matrix_from_dynamic(img: &DynamicImage) -> Result<Img> {
    let color = img.color();
    if color.channel_count() != 1 {
        return Err(Error::invalid_parameters(
            "interop::matrix_from_dynamic",
            format!(
                "expected a single channel image, got {:?} with {} channels",
                color,
                color.channel_count()
            ),
        ));
    }
    Ok(matrix_from_image(img.to_luma8()))
}

/// Build an `u8` matrix from a raw row major buffer of 8 bits samples.
///
/// Fails with `InvalidParameters` if `channels` is not 1
/// or if the buffer length is not `width * height`.
pub fn matrix_from_raw(width: usize, height: usize, channels: usize, data: &[u8]) -> Result<Img> {
    if channels != 1 {
        return Err(Error::invalid_parameters(
            "interop::matrix_from_raw",
            format!("expected a single channel buffer, got {} channels", channels),
        ));
    }
    if data.len() != width * height {
        return Err(Error::invalid_parameters(
            "interop::matrix_from_raw",
            format!(
                "buffer of length {} does not match a {}x{} image",
                data.len(),
                width,
                height
            ),
        ));
    }
    Ok(DMatrix::from_row_slice(height, width, data))
}

// TESTS #############################################################
