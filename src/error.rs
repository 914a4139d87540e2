// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors raised by the tracking core.
//!
//! All of them are programming errors (wrong call order, wrong shapes)
//! or degenerate numerical inputs, so nothing is retried internally.
//! A frame that fails to converge is not an error,
//! it is reported through the tracker diagnostics.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of the tracking core.
///
/// `context` names the component and operation where the error originated,
/// for example `"Homography::set"`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Shape mismatch of a pose or an image, wrong channel count,
    /// or an invalid configuration value.
    #[error("[InvalidParameters] [{context}] {message}")]
    InvalidParameters {
        /// Originating component and operation.
        context: String,
        /// Human readable description.
        message: String,
    },
    /// Computation attempted before a template was set and initialized.
    #[error("[NotInitialized] [{context}] {message}")]
    NotInitialized {
        /// Originating component and operation.
        context: String,
        /// Human readable description.
        message: String,
    },
    /// Singular matrix or degenerate transform.
    #[error("[NumericalError] [{context}] {message}")]
    NumericalError {
        /// Originating component and operation.
        context: String,
        /// Human readable description.
        message: String,
    },
}

impl Error {
    /// Build an `InvalidParameters` error.
    pub fn invalid_parameters<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Error::InvalidParameters {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Build a `NotInitialized` error.
    pub fn not_initialized<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Error::NotInitialized {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Build a `NumericalError` error.
    pub fn numerical<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Error::NumericalError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Component and operation where the error originated.
    pub fn context(&self) -> &str {
        match self {
            Error::InvalidParameters { context, .. }
            | Error::NotInitialized { context, .. }
            | Error::NumericalError { context, .. } => context,
        }
    }
}

// TESTS #############################################################
