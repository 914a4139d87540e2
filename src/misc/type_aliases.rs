// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Type aliases for common types used all over the code base.

use nalgebra as na;

/// The library computes in double precision.
///
/// Homography Jacobian terms grow with the square of the template radius,
/// and the Hessian inversion is not reliable in single precision.
pub type Float = f64;

/// A point with two Float coordinates.
pub type Point2 = na::Point2<Float>;

/// A vector with two Float coordinates.
pub type Vec2 = na::Vector2<Float>;

/// A 3x3 matrix of Floats.
pub type Mat3 = na::Matrix3<Float>;

/// Pose of a motion model, its shape depends on the model.
pub type Pose = na::DMatrix<Float>;

/// An 8 bits gray image, stored as a (rows = height, cols = width) matrix.
pub type Img = na::DMatrix<u8>;
