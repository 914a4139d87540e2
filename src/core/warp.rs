// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resampling of a frame into the template coordinates.
//!
//! Template pixel `(r, c)` has local coordinates `(c - cols/2, r - rows/2)`,
//! so the local origin is the template center.
//! The motion model maps local coordinates into the frame,
//! and an offset (see `Anchor`) places the local origin in the frame.

use nalgebra::DMatrix;

use crate::math::motion_model::MotionModel;
use crate::misc::type_aliases::{Float, Img, Point2, Vec2};

/// Where the template local origin lies in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// At the frame center: identity maps the template on the central crop.
    FrameCenter,
    /// At the template center: identity maps the template on the top-left crop.
    TopLeft,
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::FrameCenter
    }
}

impl Anchor {
    /// Frame position of the template local origin.
    #[allow(clippy::cast_precision_loss)]
    pub fn offset(self, frame_shape: (usize, usize), template_shape: (usize, usize)) -> Vec2 {
        let (rows, cols) = match self {
            Anchor::FrameCenter => frame_shape,
            Anchor::TopLeft => template_shape,
        };
        Vec2::new(cols as Float / 2.0, rows as Float / 2.0)
    }
}

/// Policy for samples falling outside of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// The sample is invalid: it reads as 0 and is excluded from residuals.
    Skip,
    /// Coordinates are clamped into the frame, the sample is always valid.
    Clamp,
}

impl Default for Border {
    fn default() -> Self {
        Border::Skip
    }
}

/// A frame resampled in template coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpedFrame {
    /// Interpolated intensities, 0 where invalid.
    pub intensities: DMatrix<Float>,
    /// Whether each sample fell inside the frame.
    pub valid: DMatrix<bool>,
}

impl Default for WarpedFrame {
    fn default() -> Self {
        Self {
            intensities: DMatrix::zeros(0, 0),
            valid: DMatrix::from_element(0, 0, false),
        }
    }
}

impl WarpedFrame {
    /// Number of valid samples.
    pub fn nb_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Displayable 8 bits version of the warped frame.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_image(&self) -> Img {
        self.intensities.map(|x| x.round().max(0.0).min(255.0) as u8)
    }
}

/// Local coordinates of the template pixel at `(row, col)`.
#[allow(clippy::cast_precision_loss)]
pub fn local_point(template_shape: (usize, usize), row: usize, col: usize) -> Point2 {
    let (rows, cols) = template_shape;
    Point2::new(
        col as Float - cols as Float / 2.0,
        row as Float - rows as Float / 2.0,
    )
}

/// Warp `frame` into a `template_shape` image under the model current pose.
pub fn warp<M: MotionModel + ?Sized>(
    frame: &Img,
    model: &M,
    template_shape: (usize, usize),
    offset: Vec2,
    border: Border,
) -> WarpedFrame {
    let mut warped = WarpedFrame::default();
    warp_into(&mut warped, frame, model, template_shape, offset, border);
    warped
}

/// Same as `warp`, refilling an existing buffer.
/// The buffer is reallocated only if its shape differs from `template_shape`.
pub fn warp_into<M: MotionModel + ?Sized>(
    warped: &mut WarpedFrame,
    frame: &Img,
    model: &M,
    template_shape: (usize, usize),
    offset: Vec2,
    border: Border,
) {
    let (rows, cols) = template_shape;
    if warped.intensities.shape() != template_shape {
        warped.intensities = DMatrix::zeros(rows, cols);
        warped.valid = DMatrix::from_element(rows, cols, false);
    }
    for row in 0..rows {
        for col in 0..cols {
            let p = model.transform(&local_point(template_shape, row, col)) + offset;
            let value = sample(p.x, p.y, frame, border);
            warped.intensities[(row, col)] = value.unwrap_or(0.0);
            warped.valid[(row, col)] = value.is_some();
        }
    }
}

/// Sample the frame at a floating point position, with the given border policy.
pub fn sample(x: Float, y: Float, image: &Img, border: Border) -> Option<Float> {
    let (height, width) = image.shape();
    if height == 0 || width == 0 {
        return None;
    }
    let max_x = (width - 1) as Float;
    let max_y = (height - 1) as Float;
    match border {
        Border::Skip => interpolate(x, y, image),
        Border::Clamp => interpolate(x.max(0.0).min(max_x), y.max(0.0).min(max_y), image),
    }
}

/// Simple linear interpolation of a pixel with floating point coordinates.
/// Return `None` if the point is outside of the image boundaries.
#[allow(clippy::many_single_char_names)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn interpolate(x: Float, y: Float, image: &Img) -> Option<Float> {
    let (height, width) = image.shape();
    if height == 0 || width == 0 {
        return None;
    }
    let u = x.floor();
    let v = y.floor();
    if x >= 0.0 && x <= (width - 1) as Float && y >= 0.0 && y <= (height - 1) as Float {
        let u_0 = u as usize;
        let v_0 = v as usize;
        let u_1 = (u_0 + 1).min(width - 1);
        let v_1 = (v_0 + 1).min(height - 1);
        let vu_00 = Float::from(image[(v_0, u_0)]);
        let vu_10 = Float::from(image[(v_1, u_0)]);
        let vu_01 = Float::from(image[(v_0, u_1)]);
        let vu_11 = Float::from(image[(v_1, u_1)]);
        let a = x - u;
        let b = y - v;
        Some(
            (1.0 - b) * (1.0 - a) * vu_00
                + b * (1.0 - a) * vu_10
                + (1.0 - b) * a * vu_01
                + b * a * vu_11,
        )
    } else {
        None
    }
}

// TESTS #############################################################
