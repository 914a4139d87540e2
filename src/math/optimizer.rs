// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Guiding traits to implement iterative optimization algorithms.

/// Enum used to indicate if iterations should continue or stop.
/// Must be returned by the stop_criterion function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    /// Stop iterations.
    Stop,
    /// Continue iterations.
    Forward,
}

/// An `OptimizerState<Observations, EvalState, Model, Error>`
/// is capable of iteratively refining a model in place,
/// if provided few functions that are evaluated during iterations.
///
/// Here is a simple description of its generic types.
///
/// * `Observations`: the data used as reference during evaluations.
/// * `EvalState`: result of the evaluation of the current model,
///   consumed by the next step.
/// * `Model`: the model of what you are trying to optimize.
///   It is updated in place by each step.
/// * `Error`: the error returned when a step fails.
pub trait OptimizerState<Observations, EvalState, Model, Error>
where
    Self: std::marker::Sized,
{
    /// Evaluates the current model against the observations.
    fn eval(&mut self, obs: &Observations, model: &Model) -> EvalState;

    /// Computes the iteration step from the last evaluation
    /// and applies it to the model.
    /// In case of an error, iterations are stopped and `iterative_solve` returns it.
    fn step(
        &mut self,
        obs: &Observations,
        eval_state: EvalState,
        model: &mut Model,
    ) -> Result<(), Error>;

    /// Function deciding if iterations should continue after a step.
    fn stop_criterion(&self, obs: &Observations, nb_iter: usize) -> Continue;

    /// Iteratively solve your optimization problem,
    /// with the provided functions by the trait implementation.
    /// Returns the number of iterations.
    ///
    /// The state is borrowed, so whatever it accumulated
    /// is still available to the caller when a step fails.
    fn iterative_solve(&mut self, obs: &Observations, model: &mut Model) -> Result<usize, Error> {
        let mut nb_iter = 0;
        loop {
            nb_iter += 1;
            let eval_state = self.eval(obs, model);
            self.step(obs, eval_state, model)?;
            if let Continue::Stop = self.stop_criterion(obs, nb_iter) {
                return Ok(nb_iter);
            }
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    /// Newton iterations for the square root of `obs`.
    struct SqrtState {
        residual: f64,
        nb_steps: usize,
    }

    impl OptimizerState<f64, f64, f64, String> for SqrtState {
        fn eval(&mut self, obs: &f64, model: &f64) -> f64 {
            model * model - obs
        }

        fn step(&mut self, _obs: &f64, eval_state: f64, model: &mut f64) -> Result<(), String> {
            if *model == 0.0 {
                return Err("null derivative".to_string());
            }
            self.residual = eval_state;
            self.nb_steps += 1;
            *model -= eval_state / (2.0 * *model);
            Ok(())
        }

        fn stop_criterion(&self, _obs: &f64, nb_iter: usize) -> Continue {
            if self.residual.abs() < 1e-12 || nb_iter >= 50 {
                Continue::Stop
            } else {
                Continue::Forward
            }
        }
    }

    #[test]
    fn newton_square_root() {
        let mut model = 1.0;
        let mut state = SqrtState {
            residual: 1.0,
            nb_steps: 0,
        };
        let nb_iter = state.iterative_solve(&2.0, &mut model).unwrap();
        assert!(nb_iter < 50);
        assert_eq!(nb_iter, state.nb_steps);
        assert!(approx::relative_eq!(2.0_f64.sqrt(), model, epsilon = 1e-9));
    }

    #[test]
    fn step_error_stops_iterations() {
        let mut model = 0.0;
        let mut state = SqrtState {
            residual: 1.0,
            nb_steps: 0,
        };
        assert!(state.iterative_solve(&2.0, &mut model).is_err());
        assert_eq!(0, state.nb_steps);
    }

    #[test]
    fn state_survives_a_failed_step() {
        // Newton on x^2 + 1 from x = 1 reaches 0 after one step.
        let mut model = 1.0;
        let mut state = SqrtState {
            residual: 1.0,
            nb_steps: 0,
        };
        assert!(state.iterative_solve(&-1.0, &mut model).is_err());
        assert_eq!(1, state.nb_steps);
        assert_eq!(2.0, state.residual);
        assert_eq!(0.0, model);
    }
}
