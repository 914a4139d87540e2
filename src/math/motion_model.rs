// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameterization of planar motions, shared interface of all models.
//!
//! A model holds a pose matrix whose shape is model specific.
//! Its parameter layout is the row-major flattening of that matrix,
//! and the first `parameter_size()` entries of the layout are the free parameters.

use nalgebra::DMatrix;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::math::{affine::Affine, homography::Homography};
use crate::misc::type_aliases::{Float, Point2, Pose, Vec2};

/// Interface of a motion model used by the inverse compositional tracker.
pub trait MotionModel {
    /// Name of the model, used in error contexts.
    fn name(&self) -> &'static str;

    /// Number of free parameters.
    fn parameter_size(&self) -> usize;

    /// Identity transform in the parameter layout of the model.
    fn identity(&self) -> Pose;

    /// Borrow the current pose.
    fn pose(&self) -> &Pose;

    /// Replace the current pose.
    /// Fails with `InvalidParameters` if the shape is not the model's one.
    fn set(&mut self, pose: &Pose) -> Result<()>;

    /// Reset the pose to identity.
    fn reset(&mut self);

    /// Apply the current pose to a point.
    fn transform(&self, point: &Point2) -> Point2;

    /// Right-compose the current pose with `delta` and return the new pose.
    fn compose(&mut self, delta: &Pose) -> Result<Pose>;

    /// Group inverse of the current pose.
    fn inverse(&self) -> Result<Pose>;

    /// Derivative of `transform` with respect to the layout entries,
    /// at the given point and the current pose.
    /// Shape is 2 x (number of entries of the pose).
    fn jacobian(&self, point: &Point2) -> DMatrix<Float>;

    /// Shape of the pose matrix.
    fn shape(&self) -> (usize, usize) {
        self.pose().shape()
    }

    /// Copy of the current pose.
    fn get(&self) -> Pose {
        self.pose().clone()
    }
}

impl<M: MotionModel + ?Sized> MotionModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn parameter_size(&self) -> usize {
        (**self).parameter_size()
    }
    fn identity(&self) -> Pose {
        (**self).identity()
    }
    fn pose(&self) -> &Pose {
        (**self).pose()
    }
    fn set(&mut self, pose: &Pose) -> Result<()> {
        (**self).set(pose)
    }
    fn reset(&mut self) {
        (**self).reset()
    }
    fn transform(&self, point: &Point2) -> Point2 {
        (**self).transform(point)
    }
    fn compose(&mut self, delta: &Pose) -> Result<Pose> {
        (**self).compose(delta)
    }
    fn inverse(&self) -> Result<Pose> {
        (**self).inverse()
    }
    fn jacobian(&self, point: &Point2) -> DMatrix<Float> {
        (**self).jacobian(point)
    }
}

/// Available motion models, to pick one at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// 8 parameters projective transform.
    Homography,
    /// 6 parameters affine transform.
    Affine,
}

impl ModelKind {
    /// Create a model of this kind, at identity.
    pub fn build(self) -> Box<dyn MotionModel + Send> {
        match self {
            ModelKind::Homography => Box::new(Homography::new()),
            ModelKind::Affine => Box::new(Affine::new()),
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "homography" => Ok(ModelKind::Homography),
            "affine" => Ok(ModelKind::Affine),
            _ => Err(Error::invalid_parameters(
                "ModelKind::from_str",
                format!("unknown motion model: {}", s),
            )),
        }
    }
}

// Layout helpers ##############################################################

/// Check that a pose has the expected shape.
pub fn check_shape(context: &str, expected: (usize, usize), pose: &Pose) -> Result<()> {
    if pose.shape() == expected {
        Ok(())
    } else {
        Err(Error::invalid_parameters(
            context,
            format!(
                "not matched pose size (input: {}x{}, target: {}x{})",
                pose.nrows(),
                pose.ncols(),
                expected.0,
                expected.1
            ),
        ))
    }
}

/// Entry `k` of the row-major parameter layout.
pub fn layout_get(pose: &Pose, k: usize) -> Float {
    let cols = pose.ncols();
    pose[(k / cols, k % cols)]
}

/// Mutable entry `k` of the row-major parameter layout.
pub fn layout_get_mut(pose: &mut Pose, k: usize) -> &mut Float {
    let cols = pose.ncols();
    &mut pose[(k / cols, k % cols)]
}

/// Build the incremental pose `identity + delta`,
/// with `delta` added to the first entries of the parameter layout.
pub fn delta_pose<M: MotionModel + ?Sized>(model: &M, delta: &[Float]) -> Pose {
    let mut pose = model.identity();
    for (k, d) in delta.iter().enumerate().take(model.parameter_size()) {
        *layout_get_mut(&mut pose, k) += d;
    }
    pose
}

/// Sum of absolute differences between a pose and the identity,
/// over the free parameters only.
pub fn distance_to_identity<M: MotionModel + ?Sized>(model: &M, pose: &Pose) -> Float {
    let identity = model.identity();
    (0..model.parameter_size())
        .map(|k| (layout_get(pose, k) - layout_get(&identity, k)).abs())
        .sum()
}

/// Corners of a template of shape `(rows, cols)` mapped into the frame,
/// in the order top-left, top-right, bottom-right, bottom-left.
///
/// `offset` is the frame position of the template local origin.
#[allow(clippy::cast_precision_loss)]
pub fn corners<M: MotionModel + ?Sized>(
    model: &M,
    shape: (usize, usize),
    offset: Vec2,
) -> [Point2; 4] {
    let half_w = shape.1 as Float / 2.0;
    let half_h = shape.0 as Float / 2.0;
    let map = |x, y| model.transform(&Point2::new(x, y)) + offset;
    [
        map(-half_w, -half_h),
        map(half_w, -half_h),
        map(half_w, half_h),
        map(-half_w, half_h),
    ]
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn model_kind_from_str() {
        assert_eq!(Ok(ModelKind::Homography), "homography".parse());
        assert_eq!(Ok(ModelKind::Affine), "Affine".parse());
        assert!("similarity".parse::<ModelKind>().is_err());
    }

    #[test]
    fn boxed_models_keep_their_layout() {
        let homography = ModelKind::Homography.build();
        assert_eq!((3, 3), homography.shape());
        assert_eq!(8, homography.parameter_size());
        let affine = ModelKind::Affine.build();
        assert_eq!((3, 2), affine.shape());
        assert_eq!(6, affine.parameter_size());
    }

    #[test]
    fn delta_pose_skips_normalized_entry() {
        let model = Homography::new();
        let delta: Vec<Float> = (1..=8).map(Float::from).collect();
        let pose = delta_pose(&model, &delta);
        assert_eq!(2.0, pose[(0, 0)]);
        assert_eq!(3.0, pose[(0, 2)]);
        assert_eq!(6.0, pose[(1, 1)]);
        assert_eq!(8.0, pose[(2, 1)]);
        assert_eq!(1.0, pose[(2, 2)]);
        assert_eq!(36.0, distance_to_identity(&model, &pose));
    }

    #[test]
    fn corners_of_identity_are_centered() {
        let model = Affine::new();
        let c = corners(&model, (10, 20), Vec2::new(50.0, 40.0));
        assert_eq!(Point2::new(40.0, 35.0), c[0]);
        assert_eq!(Point2::new(60.0, 35.0), c[1]);
        assert_eq!(Point2::new(60.0, 45.0), c[2]);
        assert_eq!(Point2::new(40.0, 45.0), c[3]);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut model = ModelKind::Homography.build();
        let err = model.set(&Pose::zeros(3, 2)).unwrap_err();
        match err {
            Error::InvalidParameters { context, .. } => assert_eq!("Homography::set", context),
            _ => panic!("unexpected error: {}", err),
        }
    }
}
