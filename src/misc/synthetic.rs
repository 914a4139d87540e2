// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Procedural scenes with a known motion, for tests and benchmarks.
//!
//! Images are rendered from a continuous intensity function
//! evaluated at the local coordinates of each pixel,
//! i.e. `(col - cols/2, row - rows/2)`, the convention of the tracker.

use crate::error::Result;
use crate::math::motion_model::MotionModel;
use crate::misc::type_aliases::{Float, Img, Point2, Pose};

/// Smooth texture, with enough structure in every direction
/// for the tracking Hessian to be well conditioned.
/// Values stay within `[8, 248]`.
pub fn texture(x: Float, y: Float) -> Float {
    128.0
        + 60.0 * (x / 7.0).sin() * (y / 9.0).cos()
        + 40.0 * ((x + y) / 13.0).sin()
        + 20.0 * ((x - 2.0 * y) / 11.0).cos()
}

/// Render an image of the given `(rows, cols)` shape,
/// where `f` receives the local coordinates of each pixel.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn render<F: Fn(Float, Float) -> Float>(shape: (usize, usize), f: F) -> Img {
    let (rows, cols) = shape;
    let half_w = cols as Float / 2.0;
    let half_h = rows as Float / 2.0;
    Img::from_fn(rows, cols, |r, c| {
        let value = f(c as Float - half_w, r as Float - half_h);
        value.round().max(0.0).min(255.0) as u8
    })
}

/// A template and a frame in which it appears moved by `pose`.
///
/// The frame is rendered such that warping it with `pose`,
/// anchored at the frame center, gives back the template
/// (up to interpolation and quantization).
pub fn scene<M: MotionModel + Default>(
    pose: &Pose,
    template_shape: (usize, usize),
    frame_shape: (usize, usize),
) -> Result<(Img, Img)> {
    let mut model = M::default();
    model.set(pose)?;
    let inverse = model.inverse()?;
    model.set(&inverse)?;
    let template = render(template_shape, texture);
    let frame = render(frame_shape, |x, y| {
        let p = model.transform(&Point2::new(x, y));
        texture(p.x, p.y)
    });
    Ok((template, frame))
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::warp::{self, Anchor, Border};
    use crate::math::homography::Homography;

    #[test]
    fn texture_fits_in_8_bits() {
        for i in -50..50 {
            for j in -50..50 {
                let v = texture(Float::from(i) * 0.7, Float::from(j) * 1.3);
                assert!(v >= 8.0 && v <= 248.0);
            }
        }
    }

    #[test]
    fn render_uses_local_coordinates() {
        let img = render((4, 6), |x, y| 100.0 + 10.0 * x + y);
        // Pixel (0, 0) is local (-3, -2).
        assert_eq!(68, img[(0, 0)]);
        assert_eq!(100, img[(2, 3)]);
    }

    #[test]
    fn warped_scene_gives_back_the_template() {
        #[rustfmt::skip]
        let pose = Pose::from_row_slice(3, 3, &[
            1.02, 0.01, 1.5,
            -0.01, 0.99, -2.0,
            0.0, 0.0, 1.0,
        ]);
        let (template, frame) = scene::<Homography>(&pose, (21, 21), (41, 41)).unwrap();
        let mut model = Homography::new();
        model.set(&pose).unwrap();
        let offset = Anchor::FrameCenter.offset(frame.shape(), template.shape());
        let warped = warp::warp(&frame, &model, template.shape(), offset, Border::Skip);
        assert_eq!(21 * 21, warped.nb_valid());
        for (a, b) in warped.intensities.iter().zip(template.iter()) {
            assert!((a - Float::from(*b)).abs() < 3.0);
        }
    }
}
