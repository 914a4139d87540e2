// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Math modules: motion models and the optimizer skeleton.

pub mod affine;
pub mod homography;
pub mod motion_model;
pub mod optimizer;
