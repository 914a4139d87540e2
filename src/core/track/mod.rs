// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful types and functions for tracking a template.

pub mod descent;
pub mod inverse_compositional;
pub mod residual;
