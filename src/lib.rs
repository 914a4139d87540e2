// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Direct template tracking in Rust.
//!
//! A template, cropped from a reference image, is tracked in successive
//! frames by minimizing the photometric error with the inverse compositional
//! variant of the Lucas-Kanade algorithm.
//! The planar motion is any type implementing
//! [`MotionModel`](math/motion_model/trait.MotionModel.html),
//! with `Homography` and `Affine` provided.
//!
//! ```
//! use template_tracking::core::track::inverse_compositional::Config;
//! use template_tracking::math::homography::Homography;
//! use template_tracking::misc::synthetic;
//!
//! # fn main() -> template_tracking::error::Result<()> {
//! let frame = synthetic::render((80, 80), synthetic::texture);
//! let mut tracker = Config::default().init(Homography::new())?;
//! tracker.set_template_from_frame(&frame, 40, 40)?;
//! tracker.initialize()?;
//! tracker.track(&frame)?;
//! assert!(tracker.diagnostics().converged);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod core;
pub mod error;
pub mod math;
pub mod misc;
