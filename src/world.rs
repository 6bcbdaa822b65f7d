use std::collections::VecDeque;

use crate::config::{DEFAULT_HISTORY_CAPACITY, DEFAULT_TIME_STEP};
use crate::core::vars::VariableStore;
use crate::dynamics::integrator::RungeKutta4;
use crate::dynamics::system::DifferentiableSystem;
use crate::error::SimResult;
use crate::utils::logging::ScopedTimer;

/// Simulation driver owning a model, its state vector, and the integrator.
///
/// `step` advances with a fixed-timestep accumulator: callers hand in wall
/// time and the driver performs as many fixed sub-steps as fit. Each
/// committed sub-step refreshes the model's computed variables and is
/// snapshotted into a bounded history ring for diagnostics.
pub struct Simulation<S: DifferentiableSystem> {
    pub model: S,
    pub vars: VariableStore,
    integrator: RungeKutta4,
    time_step: f64,
    time_accumulated: f64,
    history: VecDeque<Vec<f64>>,
    history_capacity: usize,
}

impl<S: DifferentiableSystem> Simulation<S> {
    pub fn new(model: S, vars: VariableStore, time_step: f64) -> Self {
        let ts = if time_step <= 0.0 {
            DEFAULT_TIME_STEP
        } else {
            time_step
        };
        Self {
            model,
            vars,
            integrator: RungeKutta4::new(),
            time_step: ts,
            time_accumulated: 0.0,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Recent committed state vectors, oldest first.
    pub fn history(&self) -> &VecDeque<Vec<f64>> {
        &self.history
    }

    /// Caps the diagnostic history; zero disables snapshotting.
    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history_capacity = capacity;
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }

    /// Advances the simulation by `dt`, performing whole fixed sub-steps.
    /// On error the failing sub-step has not been committed and the
    /// remaining accumulated time is preserved.
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        self.time_accumulated += dt;
        while self.time_accumulated >= self.time_step {
            self.advance()?;
            self.time_accumulated -= self.time_step;
        }
        Ok(())
    }

    /// Performs exactly one fixed sub-step.
    pub fn advance(&mut self) -> SimResult<()> {
        {
            let _timer = ScopedTimer::new("integrator");
            self.integrator
                .step(&mut self.model, &mut self.vars, self.time_step)?;
        }
        self.model.refresh_computed(&mut self.vars)?;
        if self.history_capacity > 0 {
            if self.history.len() == self.history_capacity {
                self.history.pop_front();
            }
            self.history.push_back(self.vars.values(true));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimResult;
    use approx::assert_relative_eq;

    struct Decay;

    impl DifferentiableSystem for Decay {
        fn evaluate(&mut self, vars: &[f64], change: &mut [f64], _dt: f64) -> SimResult<()> {
            change[0] = -vars[0];
            Ok(())
        }
    }

    fn decay_sim() -> Simulation<Decay> {
        let mut vars = VariableStore::new();
        vars.add_variable("x").unwrap();
        vars.set_value(0, 1.0, false).unwrap();
        Simulation::new(Decay, vars, 0.1)
    }

    #[test]
    fn accumulator_performs_whole_substeps() {
        let mut sim = decay_sim();
        sim.step(0.25).unwrap();
        // two sub-steps of 0.1, with 0.05 carried over
        assert_eq!(sim.history().len(), 2);
        sim.step(0.05).unwrap();
        assert_eq!(sim.history().len(), 3);
        assert_relative_eq!(
            sim.vars.get_value(0).unwrap(),
            (-0.3f64).exp(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn history_ring_is_bounded() {
        let mut sim = decay_sim();
        sim.set_history_capacity(4);
        for _ in 0..10 {
            sim.advance().unwrap();
        }
        assert_eq!(sim.history().len(), 4);
    }

    #[test]
    fn zero_capacity_disables_history() {
        let mut sim = decay_sim();
        sim.set_history_capacity(0);
        sim.advance().unwrap();
        assert!(sim.history().is_empty());
    }

    #[test]
    fn nonpositive_time_step_falls_back_to_default() {
        let mut vars = VariableStore::new();
        vars.add_variable("x").unwrap();
        let sim = Simulation::new(Decay, vars, 0.0);
        assert_eq!(sim.time_step(), crate::config::DEFAULT_TIME_STEP);
    }
}
