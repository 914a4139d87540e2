// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Types and functions to implement an inverse compositional tracking algorithm.
//!
//! Implementation of "Lucas-kanade 20 years on: A unifying framework"
//! in the inverse compositional case.
//! The warping function is any planar `MotionModel`.
//!
//! All the expensive work only depends on the template
//! and is done once in `Tracker::initialize`.
//! Each iteration of `Tracker::track` then costs a warp,
//! a residual and a `parameter_size x pixel_count` product.

use image::DynamicImage;
use log::{debug, trace, warn};
use std::borrow::Cow;
use std::mem;
use std::time::{Duration, Instant};

use crate::core::{
    gradient, smoothing,
    track::descent::{self, DescentMatrix, HessianInverse},
    track::residual::ErrorField,
    warp::{self, Anchor, Border, WarpedFrame},
};
use crate::error::{Error, Result};
use crate::math::motion_model::{self, MotionModel};
use crate::math::optimizer::{Continue, OptimizerState};
use crate::misc::interop;
use crate::misc::type_aliases::{Float, Img, Point2, Pose, Vec2};

/// Struct used for tracking a template in successive frames.
/// Can only be constructed by initialization from a `Config`.
pub struct Tracker<M> {
    config: Config,
    model: M,
    state: TrackerState,
    template: Img,
    precomputed: Option<Precomputed>,
    warped: WarpedFrame,
    error: ErrorField,
    trace: Vec<Pose>,
    diagnostics: Diagnostics,
}

/// Configuration of the Tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of iterations per frame.
    pub max_iteration: usize,
    /// Iterations stop when the sum of absolute differences
    /// between the inverted increment and identity is below this value.
    pub threshold_sum_of_compose_delta: Float,
    /// Multiplier applied to intensities in gradients and residuals.
    pub intensity_scale: Float,
    /// Where the template local origin lies in the frame.
    pub anchor: Anchor,
    /// Policy for samples falling outside of the frame.
    pub border: Border,
    /// Standard deviation of the Gaussian blur applied to the template
    /// and to every frame. No blur if `None`.
    pub smoothing_sigma: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iteration: 100,
            threshold_sum_of_compose_delta: 1e-3,
            intensity_scale: 1.0 / 255.0,
            anchor: Anchor::default(),
            border: Border::default(),
            smoothing_sigma: None,
        }
    }
}

/// Lifecycle of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No template yet.
    Uninitialized,
    /// A template is set but its precomputations are not done.
    TemplateSet,
    /// Ready to track frames.
    Ready,
}

/// Summary of the last call to `Tracker::track`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostics {
    /// Number of pose updates, equal to the length of the pose trace.
    pub iterations: usize,
    /// Convergence statistic of the last iteration,
    /// infinite if the template lost all overlap with the frame.
    pub sum_of_compose_delta: Float,
    /// Whether the statistic went below the configured threshold.
    pub converged: bool,
    /// Mean absolute intensity error in `[0, 1]` at the last evaluated pose,
    /// averaged over all template pixels (samples outside the frame count as 0).
    pub residual: Float,
    /// Time spent in `track`.
    pub elapsed: Duration,
}

/// Template data that does not change between frames.
struct Precomputed {
    descent: DescentMatrix,
    hessian_inv: HessianInverse,
}

impl Config {
    /// Initialize a tracker owning the given motion model.
    ///
    /// The tracker starts without a template,
    /// and the model pose is kept as the starting pose of the first frame.
    pub fn init<M: MotionModel>(self, model: M) -> Result<Tracker<M>> {
        self.check()?;
        Ok(Tracker {
            config: self,
            model,
            state: TrackerState::Uninitialized,
            template: Img::zeros(0, 0),
            precomputed: None,
            warped: WarpedFrame::default(),
            error: ErrorField::default(),
            trace: Vec::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    fn check(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::invalid_parameters("Config::init", message));
        if self.max_iteration == 0 {
            return invalid("max_iteration must be at least 1".to_string());
        }
        if !(self.threshold_sum_of_compose_delta > 0.0) {
            return invalid(format!(
                "threshold_sum_of_compose_delta must be positive, got {}",
                self.threshold_sum_of_compose_delta
            ));
        }
        if !(self.intensity_scale > 0.0) || !self.intensity_scale.is_finite() {
            return invalid(format!(
                "intensity_scale must be positive, got {}",
                self.intensity_scale
            ));
        }
        if let Some(sigma) = self.smoothing_sigma {
            smoothing::check_sigma(sigma)?;
        }
        Ok(())
    }
} // impl Config

impl<M: MotionModel> Tracker<M> {
    /// Set the template to track.
    /// Previous precomputations are discarded, `initialize` must be called again.
    pub fn set_template(&mut self, template: Img) -> Result<()> {
        let template = match self.config.smoothing_sigma {
            Some(sigma) => smoothing::gaussian(&template, sigma)?,
            None => template,
        };
        self.store_template(template);
        Ok(())
    }

    /// Set the template from a decoded image.
    /// Fails with `InvalidParameters` if the image has more than one channel.
    pub fn set_template_image(&mut self, img: &DynamicImage) -> Result<()> {
        self.set_template(interop::matrix_from_dynamic(img)?)
    }

    /// Extract a `rows x cols` template from a frame,
    /// warped with the current pose and anchored as configured.
    ///
    /// With the default configuration, and the model at identity,
    /// this is the central crop of the frame.
    pub fn set_template_from_frame(&mut self, frame: &Img, rows: usize, cols: usize) -> Result<()> {
        let context = "Tracker::set_template_from_frame";
        if rows == 0 || cols == 0 || rows > frame.nrows() || cols > frame.ncols() {
            return Err(Error::invalid_parameters(
                context,
                format!(
                    "cannot extract a {}x{} template from a {}x{} frame",
                    rows,
                    cols,
                    frame.nrows(),
                    frame.ncols()
                ),
            ));
        }
        let frame = prepare(&self.config, frame)?;
        let shape = (rows, cols);
        let offset = self.config.anchor.offset(frame.shape(), shape);
        let extracted = warp::warp(&frame, &self.model, shape, offset, self.config.border);
        if extracted.nb_valid() != rows * cols {
            return Err(Error::invalid_parameters(
                context,
                "the template does not fit in the frame at the current pose",
            ));
        }
        self.store_template(extracted.to_image());
        Ok(())
    }

    fn store_template(&mut self, template: Img) {
        debug!(
            "{} tracker: new {}x{} template",
            self.model.name(),
            template.nrows(),
            template.ncols()
        );
        self.template = template;
        self.precomputed = None;
        self.trace.clear();
        self.state = TrackerState::TemplateSet;
    }

    /// Precompute the template gradients, steepest descent images
    /// and the inverse of the Hessian.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state == TrackerState::Uninitialized {
            return Err(Error::not_initialized(
                "Tracker::initialize",
                "a template must be set before initialization",
            ));
        }
        let gradients = gradient::centered(&self.template, self.config.intensity_scale)?;
        let descent = descent::steepest_descent(&mut self.model, &gradients)?;
        let hessian_inv = descent::hessian_inverse(&descent)?;
        let (rows, cols) = self.template.shape();
        self.error = ErrorField::zeros(rows * cols);
        self.warped = WarpedFrame::default();
        self.precomputed = Some(Precomputed {
            descent,
            hessian_inv,
        });
        self.state = TrackerState::Ready;
        debug!(
            "{} tracker initialized: {} parameters, {}x{} template",
            self.model.name(),
            self.model.parameter_size(),
            rows,
            cols
        );
        Ok(())
    }

    /// Track the template in a new frame.
    /// Internally mutates the tracker state.
    ///
    /// Iterations start from the current pose.
    /// Use `tracker.pose()` after tracking to retrieve the new pose,
    /// and `tracker.diagnostics()` to know if it converged.
    ///
    /// If an iteration fails, its error is returned and the tracker keeps
    /// the pose, trace, buffers and diagnostics of the iterations before it.
    pub fn track(&mut self, frame: &Img) -> Result<()> {
        let start = Instant::now();
        let precomputed = match (self.state, &self.precomputed) {
            (TrackerState::Ready, Some(precomputed)) => precomputed,
            _ => {
                return Err(Error::not_initialized(
                    "Tracker::track",
                    "the tracker must be initialized with a template",
                ))
            }
        };
        let (t_rows, t_cols) = self.template.shape();
        if frame.nrows() < t_rows || frame.ncols() < t_cols {
            return Err(Error::invalid_parameters(
                "Tracker::track",
                format!(
                    "frame of size {}x{} is smaller than the {}x{} template",
                    frame.nrows(),
                    frame.ncols(),
                    t_rows,
                    t_cols
                ),
            ));
        }
        let frame = prepare(&self.config, frame)?;
        let obs = Obs {
            frame: &frame,
            template: &self.template,
            descent: &precomputed.descent,
            hessian_inv: &precomputed.hessian_inv,
            offset: self.config.anchor.offset(frame.shape(), self.template.shape()),
            config: &self.config,
        };

        // Reuse the buffers of the previous frame.
        self.trace.clear();
        let mut ic_state = IcState {
            warped: mem::take(&mut self.warped),
            error: mem::take(&mut self.error),
            trace: mem::take(&mut self.trace),
            sum_of_compose_delta: Float::INFINITY,
            lost: false,
        };
        let solved = ic_state.iterative_solve(&obs, &mut self.model);

        // Buffers and diagnostics reflect the completed iterations, even after a failure.
        let sum_of_compose_delta = ic_state.sum_of_compose_delta;
        self.diagnostics = Diagnostics {
            iterations: ic_state.trace.len(),
            sum_of_compose_delta,
            converged: solved.is_ok()
                && sum_of_compose_delta < self.config.threshold_sum_of_compose_delta,
            residual: ic_state.error.mean_abs_error(),
            elapsed: start.elapsed(),
        };
        self.warped = ic_state.warped;
        self.error = ic_state.error;
        self.trace = ic_state.trace;
        if let Err(err) = solved {
            warn!(
                "{} tracker: stopped after {} iterations: {}",
                self.model.name(),
                self.diagnostics.iterations,
                err
            );
            return Err(err);
        }
        debug!(
            "{} tracker: {} iterations, converged: {}, sum of compose delta: {:e}, residual: {:.4}",
            self.model.name(),
            self.diagnostics.iterations,
            self.diagnostics.converged,
            sum_of_compose_delta,
            self.diagnostics.residual
        );
        Ok(())
    } // track

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Configuration the tracker was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The owned motion model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Current pose.
    pub fn pose(&self) -> &Pose {
        self.model.pose()
    }

    /// Poses after each iteration of the last `track` call.
    pub fn pose_trace(&self) -> &[Pose] {
        &self.trace
    }

    /// Summary of the last `track` call.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Template, smoothed if configured so.
    pub fn template(&self) -> &Img {
        &self.template
    }

    /// Frame warped into template coordinates at the last evaluated pose.
    pub fn warped(&self) -> &WarpedFrame {
        &self.warped
    }

    /// Residuals at the last evaluated pose.
    pub fn error_field(&self) -> &ErrorField {
        &self.error
    }

    /// Template corners in a frame of the given shape, at the current pose.
    /// Order is top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self, frame_shape: (usize, usize)) -> [Point2; 4] {
        let offset = self.config.anchor.offset(frame_shape, self.template.shape());
        motion_model::corners(&self.model, self.template.shape(), offset)
    }

    /// Start the next frame from the given pose.
    pub fn set_pose(&mut self, pose: &Pose) -> Result<()> {
        self.model.set(pose)
    }

    /// Start the next frame from identity.
    pub fn reset_pose(&mut self) {
        self.model.reset();
    }
} // impl Tracker

// Optimizer ###################################################################

/// Data available for the optimizer iterations.
struct Obs<'a> {
    frame: &'a Img,
    template: &'a Img,
    descent: &'a DescentMatrix,
    hessian_inv: &'a HessianInverse,
    offset: Vec2,
    config: &'a Config,
}

/// State of the inverse compositional iterations.
struct IcState {
    warped: WarpedFrame,
    error: ErrorField,
    trace: Vec<Pose>,
    sum_of_compose_delta: Float,
    lost: bool,
}

/// Evaluation returns the number of valid pixels.
impl<'a, M: MotionModel> OptimizerState<Obs<'a>, usize, M, Error> for IcState {
    /// Warp the frame at the current pose and compute the residuals.
    fn eval(&mut self, obs: &Obs<'a>, model: &M) -> usize {
        warp::warp_into(
            &mut self.warped,
            obs.frame,
            model,
            obs.template.shape(),
            obs.offset,
            obs.config.border,
        );
        self.error
            .compute(&self.warped, obs.template, obs.config.intensity_scale);
        self.error.nb_valid()
    }

    /// Solve for the increment and compose the pose with its inverse.
    fn step(&mut self, obs: &Obs<'a>, nb_valid: usize, model: &mut M) -> Result<()> {
        if nb_valid == 0 {
            warn!(
                "{} tracker: no overlap between the warped template and the frame",
                model.name()
            );
            self.sum_of_compose_delta = Float::INFINITY;
            self.lost = true;
            return Ok(());
        }
        let delta = obs.hessian_inv * (obs.descent * self.error.values());

        // Invert the increment with the model itself.
        let current = model.get();
        let delta_pose = motion_model::delta_pose(model, delta.as_slice());
        model.set(&delta_pose)?;
        let delta_inv = model.inverse();
        model.set(&current)?;
        let delta_inv = delta_inv?;

        self.sum_of_compose_delta = motion_model::distance_to_identity(model, &delta_inv);
        let pose = model.compose(&delta_inv)?;
        trace!(
            "iteration {}: {} valid pixels, sum of compose delta {:e}",
            self.trace.len() + 1,
            nb_valid,
            self.sum_of_compose_delta
        );
        self.trace.push(pose);
        Ok(())
    }

    /// Stop when converged, lost, or after too many iterations.
    fn stop_criterion(&self, obs: &Obs<'a>, nb_iter: usize) -> Continue {
        let converged = self.sum_of_compose_delta < obs.config.threshold_sum_of_compose_delta;
        if self.lost || converged || nb_iter >= obs.config.max_iteration {
            Continue::Stop
        } else {
            Continue::Forward
        }
    }
} // impl OptimizerState<...> for IcState

// Helper ######################################################################

/// Apply the configured smoothing to an image.
fn prepare<'a>(config: &Config, img: &'a Img) -> Result<Cow<'a, Img>> {
    match config.smoothing_sigma {
        Some(sigma) => Ok(Cow::Owned(smoothing::gaussian(img, sigma)?)),
        None => Ok(Cow::Borrowed(img)),
    }
}

// TESTS #############################################################
